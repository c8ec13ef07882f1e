//! Conversions between the type a pointer was created with and the type a
//! [`SharedPtr`](crate::SharedPtr) presents.
//!
//! Rust has no implicit derived-to-base conversion for smart pointers, so both
//! directions are spelled out as capabilities:
//! - [`Upcast`] is static and cannot fail (concrete type to trait object).
//! - [`Cast`] is checked at runtime and returns `None` when the object is not
//!   of the requested type.
//!
//! The [`upcast!`](crate::upcast) macro implements both for a concrete type and
//! the trait objects it should be viewable as.

use core::any::Any;
use core::ptr::NonNull;

/// Infallible pointer conversion from `Self` to `U`.
///
/// # Safety
/// `upcast` must return a pointer to the same object (or a sub-object of it),
/// valid for as long as the input pointer is.
pub unsafe trait Upcast<U: ?Sized> {
    fn upcast(ptr: NonNull<Self>) -> NonNull<U>;
}

/// Runtime-checked pointer conversion from `Self` to `U`.
///
/// # Safety
/// When `cast` returns `Some`, the pointer must refer to the same object (or a
/// sub-object of it) and be valid for as long as the input pointer is.
pub unsafe trait Cast<U: ?Sized> {
    /// # Safety
    /// `ptr` must point to a live `Self`.
    unsafe fn cast(ptr: NonNull<Self>) -> Option<NonNull<U>>;
}

unsafe impl<U: Any> Cast<U> for dyn Any + Send + Sync {
    #[inline]
    unsafe fn cast(ptr: NonNull<Self>) -> Option<NonNull<U>> {
        unsafe { ptr.as_ref() }.downcast_ref::<U>().map(NonNull::from)
    }
}

/// Implement [`Upcast`] and [`Cast`] from a concrete type to one or more
/// unsized targets (usually trait objects).
///
/// ```
/// use sharc::{upcast, SharedPtr};
///
/// trait Animal: Send + Sync {
///     fn noise(&self) -> &'static str;
/// }
///
/// struct Dog;
///
/// impl Animal for Dog {
///     fn noise(&self) -> &'static str {
///         "woof"
///     }
/// }
///
/// upcast!(Dog => dyn Animal);
///
/// let dog = SharedPtr::new(Dog);
/// let animal: SharedPtr<dyn Animal> = SharedPtr::upcast(&dog);
/// assert_eq!(animal.noise(), "woof");
/// assert_eq!(SharedPtr::use_count(&dog), 2);
/// ```
#[macro_export]
macro_rules! upcast {
    ($from:ty => $($to:ty),+ $(,)?) => {
        $(
            unsafe impl $crate::Upcast<$to> for $from {
                #[inline]
                fn upcast(ptr: ::core::ptr::NonNull<Self>) -> ::core::ptr::NonNull<$to> {
                    ptr
                }
            }

            unsafe impl $crate::Cast<$to> for $from {
                #[inline]
                unsafe fn cast(
                    ptr: ::core::ptr::NonNull<Self>,
                ) -> ::core::option::Option<::core::ptr::NonNull<$to>> {
                    ::core::option::Option::Some(<Self as $crate::Upcast<$to>>::upcast(ptr))
                }
            }
        )+
    };
}
