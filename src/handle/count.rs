//! Counting policies for the control block.
//!
//! The control block's counting logic is written once against [`RefCount`].
//! [`LocalCount`] is a plain cell for single-threaded handles;
//! [`AtomicCount`](super::atomic::AtomicCount) is the lock-free variant.

use super::kind::HandleKind;
use core::cell::Cell;

/// Largest count a handle family can reach before the process is aborted.
pub const MAX_REFCOUNT: usize = isize::MAX as usize;

/// Value a counter holds between [`RefCount::lock_zero`] and
/// [`RefCount::unlock`]. Above [`MAX_REFCOUNT`], so never a real count.
pub const LOCKED: usize = usize::MAX;

mod private {
    pub trait Sealed {}
}

/// A reference counter.
///
/// A strong count that reached zero is never raised again: promotion goes
/// through [`try_increment`](RefCount::try_increment), which refuses a zero
/// count.
pub trait RefCount: private::Sealed + Sized {
    /// Variant tag of strong handles using this policy.
    const STRONG: HandleKind;
    /// Variant tag of weak handles using this policy.
    const WEAK: HandleKind;

    /// Creates a counter holding `n`.
    fn new(n: usize) -> Self;

    /// Current value.
    fn get(&self) -> usize;

    /// Adds one.
    ///
    /// Aborts the process if the count would exceed [`MAX_REFCOUNT`].
    fn increment(&self);

    /// Adds one, waiting first for a [`lock_zero`](RefCount::lock_zero) held
    /// elsewhere to be released.
    ///
    /// Aborts the process if the count would exceed [`MAX_REFCOUNT`].
    fn increment_unlocked(&self);

    /// Adds one unless the value is zero. Returns whether it added.
    fn try_increment(&self) -> bool;

    /// Swaps a zero count for [`LOCKED`], holding off
    /// [`increment_unlocked`](RefCount::increment_unlocked) until
    /// [`unlock`](RefCount::unlock). Returns `false`, changing nothing, if the
    /// count was not zero.
    fn lock_zero(&self) -> bool;

    /// Puts back the zero taken by a successful [`lock_zero`](RefCount::lock_zero).
    fn unlock(&self);

    /// Subtracts one. Returns `true` if this brought the count to zero, in
    /// which case every write made before other threads' decrements is visible
    /// to the caller.
    fn decrement(&self) -> bool;
}

/// Counter for single-threaded handles.
#[derive(Debug)]
pub struct LocalCount(Cell<usize>);

impl private::Sealed for LocalCount {}
impl private::Sealed for super::atomic::AtomicCount {}

impl RefCount for LocalCount {
    const STRONG: HandleKind = HandleKind::Strong;
    const WEAK: HandleKind = HandleKind::Weak;

    #[inline]
    fn new(n: usize) -> Self {
        LocalCount(Cell::new(n))
    }

    #[inline]
    fn get(&self) -> usize {
        self.0.get()
    }

    #[inline]
    fn increment(&self) {
        let n = self.0.get();
        if n >= MAX_REFCOUNT {
            std::process::abort();
        }
        self.0.set(n + 1);
    }

    #[inline]
    fn increment_unlocked(&self) {
        // A local lock never outlives the call that took it.
        self.increment();
    }

    #[inline]
    fn try_increment(&self) -> bool {
        match self.0.get() {
            0 => false,
            n if n >= MAX_REFCOUNT => std::process::abort(),
            n => {
                self.0.set(n + 1);
                true
            }
        }
    }

    #[inline]
    fn lock_zero(&self) -> bool {
        if self.0.get() == 0 {
            self.0.set(LOCKED);
            true
        } else {
            false
        }
    }

    #[inline]
    fn unlock(&self) {
        debug_assert_eq!(self.0.get(), LOCKED, "unlock without lock_zero");
        self.0.set(0);
    }

    #[inline]
    fn decrement(&self) -> bool {
        let n = self.0.get();
        debug_assert!(n > 0, "reference count underflow");
        self.0.set(n - 1);
        n == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_count_reports_zero_crossing() {
        let c = LocalCount::new(1);
        c.increment();
        assert_eq!(c.get(), 2);
        assert!(!c.decrement());
        assert!(c.decrement());
        assert_eq!(c.get(), 0);
    }

    #[test]
    fn try_increment_refuses_zero() {
        let c = LocalCount::new(0);
        assert!(!c.try_increment());
        assert_eq!(c.get(), 0);

        let c = LocalCount::new(3);
        assert!(c.try_increment());
        assert_eq!(c.get(), 4);
    }

    #[test]
    fn lock_zero_only_takes_an_empty_count() {
        let c = LocalCount::new(1);
        assert!(!c.lock_zero());
        assert_eq!(c.get(), 1);

        let c = LocalCount::new(0);
        assert!(c.lock_zero());
        assert_eq!(c.get(), LOCKED);
        c.unlock();
        assert_eq!(c.get(), 0);
        c.increment_unlocked();
        assert_eq!(c.get(), 1);
    }
}
