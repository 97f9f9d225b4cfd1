//! The control block shared by strong and weak handles.
//!
//! One block exists per allocation. It holds three counters:
//! - `strong`: handles that keep the payload alive. Reaching zero runs the
//!   destructor, and the count is never raised again afterwards.
//! - `weak`: handles that observe the payload. Starts at zero and only moves
//!   when a weak handle is made or dropped.
//! - `refs`: strong plus weak. Reaching zero frees the block itself.
//!
//! Deciding the block's release on `refs` alone means the last strong and the
//! last weak handle can drop concurrently without both (or neither) freeing it.

use super::count::{RefCount, LOCKED};
use super::destructor::Destructor;
use crate::error::{fail, PtrError};
use core::alloc::Layout;
use core::ptr::{self, NonNull};
use std::alloc::{alloc, dealloc};

pub(crate) struct ControlBlock<T, C> {
    strong: C,
    weak: C,
    refs: C,
    destructor: Destructor<T>,
}

impl<T, C: RefCount> ControlBlock<T, C> {
    /// Allocates a block accounting for one strong handle and no weak ones.
    pub(crate) fn allocate(destructor: Destructor<T>) -> Result<NonNull<Self>, PtrError> {
        let layout = Layout::new::<Self>();
        // SAFETY: the block holds a function pointer, so the layout is not zero-sized.
        let raw = unsafe { alloc(layout) }.cast::<Self>();
        let Some(block) = NonNull::new(raw) else {
            return Err(fail(PtrError::AllocationFailed));
        };

        // SAFETY: freshly allocated with the layout of `Self`.
        unsafe {
            ptr::write(
                block.as_ptr(),
                ControlBlock {
                    strong: C::new(1),
                    weak: C::new(0),
                    refs: C::new(1),
                    destructor,
                },
            );
        }
        tracing::trace!(block = ?block, "control block allocated");
        Ok(block)
    }

    #[inline]
    pub(crate) fn strong_count(&self) -> usize {
        self.strong.get()
    }

    #[inline]
    pub(crate) fn weak_count(&self) -> usize {
        match self.weak.get() {
            LOCKED => 0,
            n => n,
        }
    }

    /// `true` if the calling strong handle is the only handle of any kind.
    ///
    /// The weak count is locked at zero while the strong count is read, so a
    /// weak handle cannot promote and then drop between the two checks.
    pub(crate) fn is_unique(&self) -> bool {
        if !self.weak.lock_zero() {
            return false;
        }
        let unique = self.strong.get() == 1;
        self.weak.unlock();
        unique
    }

    /// Accounts for one more strong handle. The caller holds a strong handle.
    #[inline]
    pub(crate) fn acquire_strong(&self) {
        self.strong.increment();
        self.refs.increment();
    }

    /// Accounts for a weak handle made from a strong one.
    #[inline]
    pub(crate) fn downgrade(&self) {
        self.weak.increment_unlocked();
        self.refs.increment();
    }

    /// Accounts for one more weak handle. The caller holds a weak handle, so
    /// the weak count cannot be locked.
    #[inline]
    pub(crate) fn acquire_weak(&self) {
        self.weak.increment();
        self.refs.increment();
    }

    /// Attempts to account for one more strong handle on behalf of a weak one.
    ///
    /// Fails, leaving every counter untouched, once the strong count is zero.
    #[inline]
    pub(crate) fn promote(&self) -> bool {
        if self.strong.try_increment() {
            self.refs.increment();
            true
        } else {
            tracing::trace!("promotion refused: payload already destroyed");
            false
        }
    }

    /// Drops one strong handle, running the destructor on the last one.
    ///
    /// # Safety
    ///
    /// `block` must be live and the caller must give up one strong count.
    /// `payload` must be the address the block's destructor is responsible for.
    pub(crate) unsafe fn release_strong(block: NonNull<Self>, payload: NonNull<T>) {
        let (last, destructor) = {
            let cb = block.as_ref();
            (cb.strong.decrement(), cb.destructor)
        };
        if last {
            tracing::trace!(payload = ?payload, "last strong handle dropped, running destructor");
            destructor(payload);
        }
        Self::release_ref(block);
    }

    /// Drops one weak handle. Never runs the destructor.
    ///
    /// # Safety
    ///
    /// `block` must be live and the caller must give up one weak count.
    pub(crate) unsafe fn release_weak(block: NonNull<Self>) {
        block.as_ref().weak.decrement();
        Self::release_ref(block);
    }

    unsafe fn release_ref(block: NonNull<Self>) {
        if block.as_ref().refs.decrement() {
            ptr::drop_in_place(block.as_ptr());
            dealloc(block.as_ptr().cast::<u8>(), Layout::new::<Self>());
            tracing::trace!(block = ?block, "control block freed");
        }
    }
}
