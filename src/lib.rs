//! `SharedPtr<T>` is a heap-allocated smart pointer for sharing one object between many owners, across threads,
//! without putting locks on the data.
//! Every owner points to an out-of-line control block holding two atomic counters. The object is destroyed
//! exactly once, when the last owner releases it, whichever owner and whichever thread that is.
//!
//! On top of what `Arc<T>` offers, `SharedPtr<T>` supports:
//! - custom destruction through a [`Deleter`];
//! - taking over raw pointers and `Box`es, with a runtime type check ([`Cast`]) that hands the pointer back on
//!   failure;
//! - upcasting to trait objects ([`Upcast`], [`upcast!`]);
//! - aliasing: a `SharedPtr` can present a part of the object (or anything kept alive by it) while owning the
//!   whole ([`SharedPtr::project`], [`SharedPtr::aliasing`]);
//! - an empty state, like a null pointer.
//!
//! A cycle between `SharedPtr` pointers cannot be deallocated as the strong counts will never reach zero. The
//! solution is a [`Weak<T>`], which observes the object without keeping it alive and must be upgraded back to a
//! `SharedPtr<T>` to access it.

pub mod cast;
mod control;
pub mod error;
pub mod shared;

pub use crate::cast::{Cast, Upcast};
pub use crate::control::{DefaultDeleter, Deleter};
pub use crate::error::{Rejected, TypeMismatch};
pub use crate::shared::{SharedPtr, Weak};
