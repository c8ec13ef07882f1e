//! The out-of-line control block shared by every handle of one managed object.
//!
//! A block carries two counters. `strong` is the number of [`SharedPtr`]s
//! keeping the object alive. `weak` is the number of [`Weak`]s plus one unit
//! held collectively by the strong side while `strong > 0`. The object is
//! destroyed when `strong` drops to zero; the block itself is freed when `weak`
//! drops to zero, which cannot happen before the strong side has given its unit
//! back.
//!
//! [`SharedPtr`]: crate::SharedPtr
//! [`Weak`]: crate::Weak

use core::{
    cell::UnsafeCell,
    mem::ManuallyDrop,
    ptr::{addr_of_mut, NonNull},
    sync::atomic::{fence, AtomicUsize, Ordering},
};

#[cfg(not(target_has_atomic = "ptr"))]
compile_error!("Cannot use `SharedPtr` on a system without atomics.");

pub(crate) const MAX_REFCOUNT: usize = (isize::MAX) as usize;

/// The destruction policy of a managed object.
///
/// Any `FnOnce(NonNull<M>)` is a deleter. [`DefaultDeleter`] frees a pointer
/// obtained from [`Box::into_raw`].
///
/// ```
/// use std::ptr::NonNull;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use sharc::SharedPtr;
///
/// let called = Arc::new(AtomicBool::new(false));
/// let flag = called.clone();
/// let raw = Box::into_raw(Box::new(5u64));
/// let ptr = unsafe {
///     SharedPtr::from_raw_with(raw, move |p: NonNull<u64>| {
///         drop(unsafe { Box::from_raw(p.as_ptr()) });
///         flag.store(true, Ordering::SeqCst);
///     })
/// };
/// drop(ptr);
/// assert!(called.load(Ordering::SeqCst));
/// ```
pub trait Deleter<M: ?Sized> {
    /// Release the object behind `ptr`.
    ///
    /// # Safety
    /// `ptr` is the pointer the deleter was registered with, and it is handed
    /// over exactly once.
    unsafe fn delete(self, ptr: NonNull<M>);
}

impl<M: ?Sized, F> Deleter<M> for F
where
    F: FnOnce(NonNull<M>),
{
    #[inline]
    unsafe fn delete(self, ptr: NonNull<M>) {
        self(ptr)
    }
}

/// Frees a pointer that came from [`Box::into_raw`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDeleter;

impl<M: ?Sized> Deleter<M> for DefaultDeleter {
    #[inline]
    unsafe fn delete(self, ptr: NonNull<M>) {
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

/// Releases the managed object without touching the block's own storage.
pub(crate) trait Destroy {
    /// # Safety
    /// Called at most once, by the thread that observed `strong` reach zero.
    unsafe fn destroy(&mut self);
}

/// A managed object living in its own allocation, released by a deleter.
pub(crate) struct WithPointer<M: ?Sized, D> {
    ptr: Option<NonNull<M>>,
    deleter: Option<D>,
}

impl<M: ?Sized, D: Deleter<M>> Destroy for WithPointer<M, D> {
    unsafe fn destroy(&mut self) {
        if let (Some(ptr), Some(deleter)) = (self.ptr.take(), self.deleter.take()) {
            unsafe { deleter.delete(ptr) };
        }
    }
}

/// A managed object embedded in the block.
pub(crate) struct WithValue<T> {
    value: ManuallyDrop<T>,
}

impl<T> Destroy for WithValue<T> {
    unsafe fn destroy(&mut self) {
        unsafe { ManuallyDrop::drop(&mut self.value) };
    }
}

#[repr(C)]
pub(crate) struct ControlBlock<P: ?Sized = dyn Destroy> {
    strong: AtomicUsize,
    weak: AtomicUsize,
    payload: UnsafeCell<P>,
}

impl<P: Destroy> ControlBlock<P> {
    fn allocate(payload: P) -> NonNull<ControlBlock<P>> {
        let block = Box::new(ControlBlock {
            strong: AtomicUsize::new(1),
            weak: AtomicUsize::new(1),
            payload: UnsafeCell::new(payload),
        });
        NonNull::from(Box::leak(block))
    }
}

/// A copyable reference to a control block.
///
/// It does not own anything by itself: every holder is accounted for in one of
/// the counters, and the counting primitives below are the only way the block
/// is ever destroyed or freed.
#[derive(Clone, Copy)]
pub(crate) struct BlockRef(NonNull<ControlBlock>);

impl BlockRef {
    /// Allocate a block with `strong == 1` and `weak == 1` that will hand `ptr`
    /// to `deleter` when the last strong reference goes away.
    pub(crate) fn with_pointer<M, D>(ptr: NonNull<M>, deleter: D) -> Self
    where
        M: ?Sized + 'static,
        D: Deleter<M> + 'static,
    {
        let block = ControlBlock::allocate(WithPointer {
            ptr: Some(ptr),
            deleter: Some(deleter),
        });
        BlockRef(block)
    }

    /// Allocate a block that embeds `value`, returning the value's address.
    pub(crate) fn with_value<T: 'static>(value: T) -> (Self, NonNull<T>) {
        let block = ControlBlock::allocate(WithValue {
            value: ManuallyDrop::new(value),
        });
        let value = unsafe {
            let payload = (*block.as_ptr()).payload.get();
            NonNull::new_unchecked(addr_of_mut!((*payload).value)).cast::<T>()
        };
        (BlockRef(block), value)
    }

    /// Address of the block, without the vtable.
    #[inline]
    pub(crate) fn addr(self) -> usize {
        self.0.cast::<u8>().as_ptr() as usize
    }

    #[inline]
    fn block(&self) -> &ControlBlock {
        unsafe { self.0.as_ref() }
    }

    #[inline]
    pub(crate) fn strong_count(self) -> usize {
        self.block().strong.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn weak_count(self) -> usize {
        self.block().weak.load(Ordering::Relaxed)
    }

    /// Take one more strong unit. The caller must already hold a strong unit
    /// (or otherwise know the block is alive).
    #[inline]
    pub(crate) fn increment_strong(self) {
        let prev = self.block().strong.fetch_add(1, Ordering::Relaxed);
        if prev > MAX_REFCOUNT {
            panic!("Overflow of maximum strong reference count.");
        }
        if prev == 0 {
            log::warn!("strong count of control block {:p} raised from zero", self.0);
            self.block().weak.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take one more strong unit unless the object has already been destroyed.
    #[inline]
    pub(crate) fn try_increment_strong(self) -> bool {
        self.block()
            .strong
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| {
                // Zero is permanent: once observed, the object is gone.
                if n == 0 {
                    return None;
                }
                assert!(
                    n <= MAX_REFCOUNT,
                    "Overflow of maximum strong reference count."
                );
                Some(n + 1)
            })
            .is_ok()
    }

    /// Give back one strong unit, destroying the object on the last one.
    ///
    /// # Safety
    /// The caller owns a strong unit and must not use the block afterwards
    /// through that unit.
    #[inline]
    pub(crate) unsafe fn decrement_strong(self) {
        let prev = self.block().strong.fetch_sub(1, Ordering::Release);
        if prev == 0 {
            invariant_violation(self, "strong count decremented below zero");
        }
        if prev != 1 {
            return;
        }

        // Pairs with the Release above on every other thread's decrement, so
        // their writes to the object happen-before its destruction.
        fence(Ordering::Acquire);
        log::trace!("destroying object managed by control block {:p}", self.0);
        unsafe { (*self.block().payload.get()).destroy() };

        // Return the unit the strong side held on the weak count.
        unsafe { self.decrement_weak() };
    }

    #[inline]
    pub(crate) fn increment_weak(self) {
        let prev = self.block().weak.fetch_add(1, Ordering::Relaxed);
        if prev > MAX_REFCOUNT {
            panic!("Overflow of maximum weak reference count.");
        }
    }

    /// Give back one weak unit, freeing the block on the last one.
    ///
    /// # Safety
    /// The caller owns a weak unit and must not use the block afterwards
    /// through that unit.
    #[inline]
    pub(crate) unsafe fn decrement_weak(self) {
        let prev = self.block().weak.fetch_sub(1, Ordering::Release);
        if prev == 0 {
            invariant_violation(self, "weak count decremented below zero");
        }
        if prev != 1 {
            return;
        }

        fence(Ordering::Acquire);
        log::trace!("freeing control block {:p}", self.0);
        drop(unsafe { Box::from_raw(self.0.as_ptr()) });
    }
}

#[cold]
#[inline(never)]
fn invariant_violation(block: BlockRef, what: &str) -> ! {
    log::error!("control block {:p}: {what}", block.0);
    std::process::abort()
}
