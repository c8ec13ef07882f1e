use core::fmt::{self, Debug};

use thiserror::Error;

/// A pointer could not be viewed as the requested type.
///
/// Returned by the checked constructors and conversions of
/// [`SharedPtr`](crate::SharedPtr). Nothing is allocated and no deleter runs when
/// this error is produced.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("a pointer to `{from}` cannot be viewed as `{to}`")]
pub struct TypeMismatch {
    from: &'static str,
    to: &'static str,
}

impl TypeMismatch {
    pub(crate) fn new<Y: ?Sized, T: ?Sized>() -> Self {
        TypeMismatch {
            from: core::any::type_name::<Y>(),
            to: core::any::type_name::<T>(),
        }
    }

    /// Name of the type the pointer had.
    pub fn from_type(&self) -> &'static str {
        self.from
    }

    /// Name of the type that was requested.
    pub fn to_type(&self) -> &'static str {
        self.to
    }
}

/// A failed conversion that hands the original exclusive pointer back.
///
/// ```
/// use std::any::Any;
/// use sharc::SharedPtr;
///
/// let boxed: Box<dyn Any + Send + Sync> = Box::new(7u8);
/// let rejected = SharedPtr::<u32>::try_from_box(boxed).unwrap_err();
/// let boxed = rejected.into_inner();
/// assert_eq!(boxed.downcast_ref::<u8>(), Some(&7));
/// ```
#[derive(Error)]
#[error("{mismatch}")]
pub struct Rejected<P> {
    mismatch: TypeMismatch,
    original: P,
}

impl<P> Rejected<P> {
    pub(crate) fn new(mismatch: TypeMismatch, original: P) -> Self {
        Rejected { mismatch, original }
    }

    /// The reason the conversion failed.
    pub fn mismatch(&self) -> TypeMismatch {
        self.mismatch
    }

    /// Take back the pointer that was offered.
    pub fn into_inner(self) -> P {
        self.original
    }
}

impl<P> Debug for Rejected<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("mismatch", &self.mismatch)
            .finish_non_exhaustive()
    }
}
