use core::{
    cmp::Ordering,
    fmt::{Debug, Display, Pointer},
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::{self, ManuallyDrop},
    ops::Deref,
    ptr::NonNull,
};
use std::panic::{RefUnwindSafe, UnwindSafe};

use crate::{
    cast::{Cast, Upcast},
    control::{BlockRef, DefaultDeleter, Deleter},
    error::{Rejected, TypeMismatch},
};

/// `SharedPtr` is a heap-allocated smart pointer with shared ownership and an out-of-line control block.
/// Every `SharedPtr` that owns the same object points to the same control block, which holds an atomic strong
/// count, an atomic weak count, and the means to destroy the object. The object is destroyed exactly once, when
/// the last owning `SharedPtr` is dropped or reset, no matter which thread does it.
///
/// A `SharedPtr<T>` keeps two pointers:
/// - the *stored* pointer, of type `T`, which is what [`Deref`] and [`SharedPtr::get`] return;
/// - the control block, which governs the lifetime of the *managed* object.
///
/// Usually they refer to the same object. They differ after an upcast (the stored pointer is a trait object),
/// after [`SharedPtr::project`] or [`SharedPtr::aliasing`] (the stored pointer is a part of the managed object),
/// or when the managed object was created with a custom [`Deleter`].
///
/// ## Breaking reference cycles with `Weak<T>`
/// A cycle between `SharedPtr`s cannot be deallocated as the strong counts never reach zero. The solution is a
/// [`Weak<T>`]: it does not keep the object alive, only the control block, and must be upgraded to a `SharedPtr<T>`
/// before the object can be used.
///
/// ## Empty pointers
/// A `SharedPtr` may be empty ([`SharedPtr::null`], [`Default`], a null raw pointer, or the source of
/// [`SharedPtr::take`]). Dereferencing an empty `SharedPtr` panics; use [`SharedPtr::get`] to check.
///
/// To prevent name clashes with `T`'s methods, `SharedPtr<T>`'s functions are associated.
///
/// ## Examples
///
/// ```
/// use sharc::SharedPtr;
///
/// let a = SharedPtr::new(String::from("shared"));
/// let b = a.clone();
/// assert_eq!(SharedPtr::use_count(&a), 2);
/// drop(a);
/// assert_eq!(SharedPtr::use_count(&b), 1);
/// assert_eq!(*b, "shared");
/// ```
///
/// Example with multiple threads:
/// ```
/// use std::thread;
/// use sharc::SharedPtr;
///
/// let ptr = SharedPtr::new(100);
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let local = ptr.clone();
///         thread::spawn(move || assert_eq!(*local, 100))
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(SharedPtr::use_count(&ptr), 1);
/// ```
pub struct SharedPtr<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    block: Option<BlockRef>,
    phantom: PhantomData<T>,
}

unsafe impl<T: ?Sized + Sync + Send> Send for SharedPtr<T> {}
unsafe impl<T: ?Sized + Sync + Send> Sync for SharedPtr<T> {}

impl<T: ?Sized> SharedPtr<T> {
    /// Creates an empty `SharedPtr<T>` that owns nothing.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr = SharedPtr::<str>::null();
    /// assert!(SharedPtr::is_null(&ptr));
    /// assert_eq!(SharedPtr::use_count(&ptr), 0);
    /// ```
    #[inline]
    pub const fn null() -> Self {
        SharedPtr {
            ptr: None,
            block: None,
            phantom: PhantomData,
        }
    }

    #[inline]
    fn from_parts(ptr: Option<NonNull<T>>, block: Option<BlockRef>) -> Self {
        SharedPtr {
            ptr,
            block,
            phantom: PhantomData,
        }
    }

    /// Take the stored pointer and the control block out of `this` without touching the counters.
    #[inline]
    fn into_parts(this: Self) -> (Option<NonNull<T>>, Option<BlockRef>) {
        let this = ManuallyDrop::new(this);
        (this.ptr, this.block)
    }

    /// Wrap `managed` in a fresh control block; `stored` is what the new `SharedPtr` presents.
    ///
    /// # Safety
    /// `managed` must be valid until `deleter` is called on it, and `stored` must stay valid for as long as
    /// `managed` does.
    unsafe fn adopt<M, D>(managed: NonNull<M>, stored: NonNull<T>, deleter: D) -> Self
    where
        M: ?Sized + Send + Sync + 'static,
        D: Deleter<M> + Send + 'static,
    {
        Self::from_parts(Some(stored), Some(BlockRef::with_pointer(managed, deleter)))
    }

    /// Creates a `SharedPtr<T>` that owns a `Y` through a pointer checked at runtime to be viewable as `T`.
    /// The object is released with [`DefaultDeleter`], as a `Y`.
    ///
    /// A null pointer gives an empty `SharedPtr`. If the check fails, [`TypeMismatch`] is returned, nothing is
    /// allocated, and `ptr` still belongs to the caller.
    ///
    /// # Safety
    /// `ptr` must be null or come from [`Box::into_raw`], and must not be owned by anything else.
    ///
    /// ```
    /// use std::any::Any;
    /// use sharc::SharedPtr;
    ///
    /// let raw: *mut (dyn Any + Send + Sync) = Box::into_raw(Box::new(3i32));
    /// let ptr = unsafe { SharedPtr::<i32>::try_from_raw(raw) }.unwrap();
    /// assert_eq!(*ptr, 3);
    ///
    /// let raw: *mut (dyn Any + Send + Sync) = Box::into_raw(Box::new("text"));
    /// assert!(unsafe { SharedPtr::<i32>::try_from_raw(raw) }.is_err());
    /// drop(unsafe { Box::from_raw(raw) });
    /// ```
    pub unsafe fn try_from_raw<Y>(ptr: *mut Y) -> Result<Self, TypeMismatch>
    where
        Y: ?Sized + Cast<T> + Send + Sync + 'static,
    {
        unsafe { Self::try_from_raw_with(ptr, DefaultDeleter) }
    }

    /// Like [`SharedPtr::try_from_raw`], but the object is released by `deleter`, which receives the pointer as
    /// a `Y`. The deleter is dropped without being called if `ptr` is null or the check fails.
    ///
    /// # Safety
    /// `ptr` must be null or valid until `deleter` is called on it, and must not be owned by anything else.
    pub unsafe fn try_from_raw_with<Y, D>(ptr: *mut Y, deleter: D) -> Result<Self, TypeMismatch>
    where
        Y: ?Sized + Cast<T> + Send + Sync + 'static,
        D: Deleter<Y> + Send + 'static,
    {
        let Some(managed) = NonNull::new(ptr) else {
            return Ok(Self::null());
        };
        let stored = unsafe { Y::cast(managed) }.ok_or_else(TypeMismatch::new::<Y, T>)?;
        Ok(unsafe { Self::adopt(managed, stored, deleter) })
    }

    /// Takes ownership of a boxed `Y` if it can be viewed as a `T`. On failure the box comes back, untouched,
    /// inside the [`Rejected`] error.
    ///
    /// ```
    /// use std::any::Any;
    /// use sharc::SharedPtr;
    ///
    /// let boxed: Box<dyn Any + Send + Sync> = Box::new(String::from("owned"));
    /// let ptr = SharedPtr::<String>::try_from_box(boxed).unwrap();
    /// assert_eq!(*ptr, "owned");
    /// assert_eq!(SharedPtr::use_count(&ptr), 1);
    /// ```
    pub fn try_from_box<Y>(value: Box<Y>) -> Result<Self, Rejected<Box<Y>>>
    where
        Y: ?Sized + Cast<T> + Send + Sync + 'static,
    {
        let raw = Box::into_raw(value);
        match unsafe { Self::try_from_raw(raw) } {
            Ok(this) => Ok(this),
            Err(mismatch) => Err(Rejected::new(mismatch, unsafe { Box::from_raw(raw) })),
        }
    }

    /// Creates a `SharedPtr<T>` that shares ownership with `owner` but stores `ptr`.
    /// The strong count of `owner` is incremented. A null `ptr` gives a `SharedPtr` that keeps the object alive
    /// but presents nothing.
    ///
    /// # Safety
    /// `ptr` must be valid for as long as the object managed by `owner` is alive. If `owner` is empty the result
    /// owns nothing, and `ptr` must outlive every use of the result.
    ///
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let pair = SharedPtr::new((1u8, 2u16));
    /// let second: SharedPtr<u16> = unsafe { SharedPtr::aliasing(&pair, &pair.1) };
    /// assert_eq!(*second, 2);
    /// assert_eq!(SharedPtr::use_count(&pair), 2);
    /// ```
    #[inline]
    pub unsafe fn aliasing<Y: ?Sized>(owner: &SharedPtr<Y>, ptr: *const T) -> Self {
        unsafe { Self::aliasing_from(owner.clone(), ptr) }
    }

    /// Like [`SharedPtr::aliasing`], but takes over `owner`'s reference instead of adding one.
    ///
    /// # Safety
    /// Same as [`SharedPtr::aliasing`].
    #[inline]
    pub unsafe fn aliasing_from<Y: ?Sized>(owner: SharedPtr<Y>, ptr: *const T) -> Self {
        let (_, block) = SharedPtr::into_parts(owner);
        Self::from_parts(NonNull::new(ptr as *mut T), block)
    }

    /// Creates a `SharedPtr<U>` to a part of the object (or anything reachable from it) that keeps the whole
    /// object alive. An empty `this` gives an empty result.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// struct Config {
    ///     name: String,
    ///     retries: u32,
    /// }
    ///
    /// let config = SharedPtr::new(Config { name: "main".into(), retries: 3 });
    /// let name: SharedPtr<str> = SharedPtr::project(&config, |c| c.name.as_str());
    /// drop(config);
    /// assert_eq!(&*name, "main");
    /// ```
    pub fn project<U: ?Sized, F>(this: &Self, project: F) -> SharedPtr<U>
    where
        F: for<'x> FnOnce(&'x T) -> &'x U,
    {
        match SharedPtr::get(this) {
            Some(value) => {
                let target: *const U = project(value);
                unsafe { SharedPtr::aliasing(this, target) }
            }
            None => SharedPtr::null(),
        }
    }

    /// Converts to a `SharedPtr<U>` sharing the same object; the strong count is incremented.
    /// ```
    /// use std::fmt::Debug;
    /// use sharc::{upcast, SharedPtr};
    ///
    /// #[derive(Debug)]
    /// struct Point(i32, i32);
    /// upcast!(Point => dyn Debug + Send + Sync);
    ///
    /// let point = SharedPtr::new(Point(1, 2));
    /// let debug: SharedPtr<dyn Debug + Send + Sync> = SharedPtr::upcast(&point);
    /// assert_eq!(format!("{:?}", debug), "Point(1, 2)");
    /// assert_eq!(SharedPtr::use_count(&debug), 2);
    /// ```
    #[inline]
    pub fn upcast<U: ?Sized>(this: &Self) -> SharedPtr<U>
    where
        T: Upcast<U>,
    {
        SharedPtr::into_upcast(this.clone())
    }

    /// Converts to a `SharedPtr<U>` by moving `this`; no counter changes.
    #[inline]
    pub fn into_upcast<U: ?Sized>(this: Self) -> SharedPtr<U>
    where
        T: Upcast<U>,
    {
        let (ptr, block) = SharedPtr::into_parts(this);
        SharedPtr::from_parts(ptr.map(T::upcast), block)
    }

    /// Converts to a `SharedPtr<U>` sharing the same object if the object can be viewed as a `U`.
    /// On success the strong count is incremented. An empty `this` gives an empty result.
    /// ```
    /// use std::any::Any;
    /// use sharc::SharedPtr;
    ///
    /// let boxed: Box<dyn Any + Send + Sync> = Box::new(9u16);
    /// let any = SharedPtr::from_box(boxed);
    /// let number = SharedPtr::<dyn Any + Send + Sync>::try_cast::<u16>(&any).unwrap();
    /// assert_eq!(*number, 9);
    /// assert!(SharedPtr::<dyn Any + Send + Sync>::try_cast::<u8>(&any).is_err());
    /// ```
    pub fn try_cast<U: ?Sized>(this: &Self) -> Result<SharedPtr<U>, TypeMismatch>
    where
        T: Cast<U>,
    {
        let Some(ptr) = this.ptr else {
            return Ok(SharedPtr::null());
        };
        let target = unsafe { T::cast(ptr) }.ok_or_else(TypeMismatch::new::<T, U>)?;
        Ok(unsafe { SharedPtr::aliasing(this, target.as_ptr()) })
    }

    /// Releases this `SharedPtr`'s ownership, leaving it empty. If it was the last owner, the object is
    /// destroyed.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let mut ptr = SharedPtr::new(5);
    /// SharedPtr::reset(&mut ptr);
    /// assert!(SharedPtr::is_null(&ptr));
    /// assert_eq!(SharedPtr::use_count(&ptr), 0);
    /// ```
    #[inline]
    pub fn reset(this: &mut Self) {
        this.ptr = None;
        if let Some(block) = this.block.take() {
            unsafe { block.decrement_strong() };
        }
    }

    /// Checked version of [`SharedPtr::reset_raw`]. On a [`TypeMismatch`], `this` is left untouched and `ptr`
    /// still belongs to the caller.
    ///
    /// # Safety
    /// Same as [`SharedPtr::try_from_raw`].
    pub unsafe fn try_reset_raw<Y>(this: &mut Self, ptr: *mut Y) -> Result<(), TypeMismatch>
    where
        Y: ?Sized + Cast<T> + Send + Sync + 'static,
    {
        let mut temp = unsafe { Self::try_from_raw(ptr) }?;
        SharedPtr::swap(this, &mut temp);
        Ok(())
    }

    /// Checked version of [`SharedPtr::reset_raw_with`].
    ///
    /// # Safety
    /// Same as [`SharedPtr::try_from_raw_with`].
    pub unsafe fn try_reset_raw_with<Y, D>(
        this: &mut Self,
        ptr: *mut Y,
        deleter: D,
    ) -> Result<(), TypeMismatch>
    where
        Y: ?Sized + Cast<T> + Send + Sync + 'static,
        D: Deleter<Y> + Send + 'static,
    {
        let mut temp = unsafe { Self::try_from_raw_with(ptr, deleter) }?;
        SharedPtr::swap(this, &mut temp);
        Ok(())
    }

    /// Exchanges the contents of two `SharedPtr`s. No counter changes.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let mut a = SharedPtr::new(1);
    /// let mut b = SharedPtr::new(2);
    /// SharedPtr::swap(&mut a, &mut b);
    /// assert_eq!((*a, *b), (2, 1));
    /// ```
    #[inline]
    pub fn swap(this: &mut Self, other: &mut Self) {
        mem::swap(this, other);
    }

    /// Moves the contents out of `this`, leaving it empty. No counter changes.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let mut source = SharedPtr::new(7);
    /// let dest = SharedPtr::take(&mut source);
    /// assert!(SharedPtr::get(&source).is_none());
    /// assert_eq!(SharedPtr::use_count(&source), 0);
    /// assert_eq!(SharedPtr::use_count(&dest), 1);
    /// ```
    #[inline]
    pub fn take(this: &mut Self) -> Self {
        mem::take(this)
    }

    /// Returns a reference to the stored object, or [`None`] if `this` is empty.
    #[inline]
    pub fn get(this: &Self) -> Option<&T> {
        this.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Returns the stored pointer.
    #[inline]
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.ptr
    }

    /// Returns the address of the stored pointer, or 0 if `this` is empty. This is what `SharedPtr`s are
    /// compared and hashed by.
    #[inline]
    pub fn addr(this: &Self) -> usize {
        this.ptr.map_or(0, |ptr| ptr.cast::<u8>().as_ptr() as usize)
    }

    /// Returns `true` if the stored pointer is null.
    #[inline]
    pub fn is_null(this: &Self) -> bool {
        this.ptr.is_none()
    }

    /// Returns the number of `SharedPtr`s owning the object, or 0 if `this` owns nothing.
    /// The value is a snapshot; other threads may change it at any time.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr = SharedPtr::new(100);
    /// let copies: Vec<_> = (0..3).map(|_| ptr.clone()).collect();
    /// assert_eq!(SharedPtr::use_count(&ptr), 4);
    /// drop(copies);
    /// assert_eq!(SharedPtr::use_count(&ptr), 1);
    /// ```
    #[inline]
    pub fn use_count(this: &Self) -> usize {
        this.block.map_or(0, BlockRef::strong_count)
    }

    /// Returns the weak count of the control block, or 0 if `this` owns nothing.
    /// It includes the implicit weak reference held by the `SharedPtr`s as a group.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr = SharedPtr::new(100);
    /// let _weak = SharedPtr::downgrade(&ptr);
    /// assert_eq!(SharedPtr::weak_count(&ptr), 2);
    /// ```
    #[inline]
    pub fn weak_count(this: &Self) -> usize {
        this.block.map_or(0, BlockRef::weak_count)
    }

    /// Returns `true` if both share one control block, whatever they point to.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let pair = SharedPtr::new((1, 2));
    /// let first = SharedPtr::project(&pair, |p| &p.0);
    /// assert!(SharedPtr::same_owner(&pair, &first));
    /// assert!(!SharedPtr::same_owner(&pair, &SharedPtr::new((1, 2))));
    /// ```
    #[inline]
    pub fn same_owner<U: ?Sized>(this: &Self, other: &SharedPtr<U>) -> bool {
        this.block.map(BlockRef::addr) == other.block.map(BlockRef::addr)
    }

    /// Create a [`Weak<T>`] from a `SharedPtr<T>`. This increments the weak count.
    /// ```
    /// use sharc::{SharedPtr, Weak};
    ///
    /// let ptr = SharedPtr::new(100);
    /// let weak = SharedPtr::downgrade(&ptr);
    /// assert_eq!(*Weak::upgrade(&weak).unwrap(), 100);
    /// ```
    #[inline]
    pub fn downgrade(this: &Self) -> Weak<T> {
        if let Some(block) = this.block {
            block.increment_weak();
        }
        Weak {
            ptr: this.ptr,
            block: this.block,
        }
    }
}

impl<T: Send + Sync + 'static> SharedPtr<T> {
    /// Creates a new `SharedPtr<T>` from the provided data. The data is stored inside the control block, so
    /// only one allocation is made.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr = SharedPtr::new(100);
    /// assert_eq!(*ptr, 100);
    /// ```
    #[inline]
    pub fn new(value: T) -> Self {
        let (block, ptr) = BlockRef::with_value(value);
        Self::from_parts(Some(ptr), Some(block))
    }
}

impl<T: ?Sized + Send + Sync + 'static> SharedPtr<T> {
    /// Takes ownership of a boxed value.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr: SharedPtr<[u8]> = SharedPtr::from_box(vec![1, 2, 3].into_boxed_slice());
    /// assert_eq!(&*ptr, &[1, 2, 3]);
    /// ```
    #[inline]
    pub fn from_box(value: Box<T>) -> Self {
        unsafe { Self::from_raw(Box::into_raw(value)) }
    }

    /// Takes ownership of a raw pointer, released with [`DefaultDeleter`]. A null pointer gives an empty
    /// `SharedPtr`.
    ///
    /// # Safety
    /// `ptr` must be null or come from [`Box::into_raw`], and must not be owned by anything else.
    ///
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr = unsafe { SharedPtr::from_raw(Box::into_raw(Box::new(42))) };
    /// assert_eq!(*ptr, 42);
    ///
    /// let empty = unsafe { SharedPtr::<i32>::from_raw(std::ptr::null_mut()) };
    /// assert!(SharedPtr::is_null(&empty));
    /// ```
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        unsafe { Self::from_raw_with(ptr, DefaultDeleter) }
    }

    /// Takes ownership of a raw pointer, released by `deleter`. A null pointer gives an empty `SharedPtr` and
    /// the deleter is dropped without being called.
    ///
    /// # Safety
    /// `ptr` must be null or valid until `deleter` is called on it, and must not be owned by anything else.
    pub unsafe fn from_raw_with<D>(ptr: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + Send + 'static,
    {
        match NonNull::new(ptr) {
            Some(ptr) => unsafe { Self::adopt(ptr, ptr, deleter) },
            None => Self::null(),
        }
    }

    /// Replaces the owned object with a boxed value. The previous object is released as by
    /// [`SharedPtr::reset`].
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let mut ptr = SharedPtr::new(1);
    /// SharedPtr::reset_box(&mut ptr, Box::new(2));
    /// assert_eq!(*ptr, 2);
    /// ```
    #[inline]
    pub fn reset_box(this: &mut Self, value: Box<T>) {
        let mut temp = Self::from_box(value);
        SharedPtr::swap(this, &mut temp);
    }

    /// Replaces the owned object with a raw pointer, released with [`DefaultDeleter`].
    ///
    /// # Safety
    /// Same as [`SharedPtr::from_raw`].
    #[inline]
    pub unsafe fn reset_raw(this: &mut Self, ptr: *mut T) {
        let mut temp = unsafe { Self::from_raw(ptr) };
        SharedPtr::swap(this, &mut temp);
    }

    /// Replaces the owned object with a raw pointer, released by `deleter`.
    ///
    /// # Safety
    /// Same as [`SharedPtr::from_raw_with`].
    #[inline]
    pub unsafe fn reset_raw_with<D>(this: &mut Self, ptr: *mut T, deleter: D)
    where
        D: Deleter<T> + Send + 'static,
    {
        let mut temp = unsafe { Self::from_raw_with(ptr, deleter) };
        SharedPtr::swap(this, &mut temp);
    }
}

impl<T: ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    /// Get an immutable reference to the stored object.
    ///
    /// # Panics
    /// If the `SharedPtr` is empty.
    #[inline]
    fn deref(&self) -> &Self::Target {
        match SharedPtr::get(self) {
            Some(value) => value,
            None => panic!("dereferenced an empty `SharedPtr`"),
        }
    }
}

impl<T: ?Sized> Drop for SharedPtr<T> {
    #[inline]
    fn drop(&mut self) {
        SharedPtr::reset(self);
    }
}

impl<T: ?Sized> Clone for SharedPtr<T> {
    /// Clone a `SharedPtr<T>` (increment the strong count).
    /// It will panic if the strong count overflows.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr = SharedPtr::new(100);
    /// let ptr2 = ptr.clone();
    /// assert_eq!(SharedPtr::use_count(&ptr), 2);
    /// assert_eq!(ptr, ptr2);
    /// ```
    #[inline]
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            block.increment_strong();
        }
        Self::from_parts(self.ptr, self.block)
    }

    /// Copy-and-swap: the new reference is taken before the old one is released.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        let mut temp = source.clone();
        SharedPtr::swap(self, &mut temp);
    }
}

impl<T: ?Sized> Default for SharedPtr<T> {
    /// An empty `SharedPtr`, same as [`SharedPtr::null`].
    #[inline]
    fn default() -> Self {
        SharedPtr::null()
    }
}

impl<T: ?Sized> AsRef<T> for SharedPtr<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: Send + Sync + 'static> From<T> for SharedPtr<T> {
    /// Equivalent to calling [`SharedPtr::new`].
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized + Send + Sync + 'static> From<Box<T>> for SharedPtr<T> {
    /// Equivalent to calling [`SharedPtr::from_box`].
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized + Display> Display for SharedPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match SharedPtr::get(self) {
            Some(value) => Display::fmt(value, f),
            None => f.write_str("null"),
        }
    }
}

impl<T: ?Sized + Debug> Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match SharedPtr::get(self) {
            Some(value) => Debug::fmt(value, f),
            None => f.write_str("null"),
        }
    }
}

impl<T: ?Sized> Pointer for SharedPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Pointer::fmt(&(SharedPtr::addr(self) as *const u8), f)
    }
}

impl<T: ?Sized, U: ?Sized> PartialEq<SharedPtr<U>> for SharedPtr<T> {
    /// Equality of the stored addresses, not of the values.
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let a = SharedPtr::new(100);
    /// let b = SharedPtr::new(100);
    /// assert!(a != b);
    /// assert!(a == a.clone());
    /// assert!(SharedPtr::<i32>::null() == SharedPtr::<u8>::null());
    /// ```
    #[inline]
    fn eq(&self, other: &SharedPtr<U>) -> bool {
        SharedPtr::addr(self) == SharedPtr::addr(other)
    }
}

impl<T: ?Sized> Eq for SharedPtr<T> {}

impl<T: ?Sized, U: ?Sized> PartialOrd<SharedPtr<U>> for SharedPtr<T> {
    /// Ordering of the stored addresses. An empty `SharedPtr` is less than any other.
    #[inline]
    fn partial_cmp(&self, other: &SharedPtr<U>) -> Option<Ordering> {
        Some(SharedPtr::addr(self).cmp(&SharedPtr::addr(other)))
    }
}

impl<T: ?Sized> Ord for SharedPtr<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        SharedPtr::addr(self).cmp(&SharedPtr::addr(other))
    }
}

impl<T: ?Sized> Hash for SharedPtr<T> {
    /// Hashes the stored address.
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        SharedPtr::addr(self).hash(state);
    }
}

impl<T: ?Sized> Unpin for SharedPtr<T> {}

impl<T: ?Sized + RefUnwindSafe> UnwindSafe for SharedPtr<T> {}

/// `Weak<T>` is a non-owning reference to the object of a [`SharedPtr<T>`]. It keeps the control block alive but
/// not the object, and must be upgraded to a `SharedPtr<T>` before the object can be used.
///
/// Upgrading only succeeds while the strong count is nonzero; the check and the increment are one
/// compare-and-swap, so a destroyed object is never brought back.
///
/// To prevent name clashes with [`SharedPtr`], `Weak<T>`'s functions are associated.
///
/// ```
/// use sharc::{SharedPtr, Weak};
///
/// let ptr = SharedPtr::new(100);
/// let weak = SharedPtr::downgrade(&ptr);
/// assert_eq!(Weak::strong_count(&weak), 1);
/// drop(ptr);
/// assert!(Weak::expired(&weak));
/// assert!(Weak::upgrade(&weak).is_none());
/// ```
pub struct Weak<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    block: Option<BlockRef>,
}

unsafe impl<T: ?Sized + Sync + Send> Send for Weak<T> {}
unsafe impl<T: ?Sized + Sync + Send> Sync for Weak<T> {}

impl<T: ?Sized> Weak<T> {
    /// Creates a `Weak<T>` that observes nothing. Upgrading it always fails.
    #[inline]
    pub const fn new() -> Self {
        Weak {
            ptr: None,
            block: None,
        }
    }

    /// Create a [`SharedPtr<T>`] from a `Weak<T>`. Because `Weak<T>` does not own the object, it might have
    /// been destroyed already. If it has, a [`None`] is returned.
    #[inline]
    pub fn upgrade(this: &Self) -> Option<SharedPtr<T>> {
        let block = this.block?;
        if !block.try_increment_strong() {
            return None;
        }
        Some(SharedPtr::from_parts(this.ptr, Some(block)))
    }

    /// Returns the number of `SharedPtr`s owning the object, or 0 if it is gone.
    #[inline]
    pub fn strong_count(this: &Self) -> usize {
        this.block.map_or(0, BlockRef::strong_count)
    }

    /// Returns the weak count of the control block, or 0 if `this` observes nothing.
    #[inline]
    pub fn weak_count(this: &Self) -> usize {
        this.block.map_or(0, BlockRef::weak_count)
    }

    /// Returns `true` if the object has been destroyed (or was never there).
    #[inline]
    pub fn expired(this: &Self) -> bool {
        Weak::strong_count(this) == 0
    }
}

impl<T: ?Sized> Default for Weak<T> {
    fn default() -> Self {
        Weak::new()
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    /// Clone a `Weak<T>` (increment the weak count).
    /// ```
    /// use sharc::SharedPtr;
    ///
    /// let ptr = SharedPtr::new(100);
    /// let weak1 = SharedPtr::downgrade(&ptr);
    /// let _weak2 = weak1.clone();
    /// assert_eq!(SharedPtr::weak_count(&ptr), 3);
    /// ```
    #[inline]
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            block.increment_weak();
        }
        Weak {
            ptr: self.ptr,
            block: self.block,
        }
    }
}

impl<T: ?Sized> Drop for Weak<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            unsafe { block.decrement_weak() };
        }
    }
}

impl<T: ?Sized> Debug for Weak<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "(Weak)")
    }
}
