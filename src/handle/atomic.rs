//! Thread-safe strong/weak handles.
//!
//! [`AtomicStrong`] and [`AtomicWeak`] are the shared handle pair instantiated
//! with [`AtomicCount`]: every counter mutation is a single lock-free atomic
//! read-modify-write.
//!
//! Memory ordering:
//! - Increments from a held handle (clone, downgrade) are `Relaxed`: the caller
//!   already keeps the allocation alive, there is nothing to synchronise with.
//! - Promotion is a CAS loop whose success ordering is `Acquire`. It checks for
//!   zero *before* attempting the increment, so a strong count that reached
//!   zero is never raised again.
//! - Downgrading a strong handle waits out a uniqueness check in progress:
//!   [`StrongHandle::get_mut`] briefly parks the weak count at
//!   [`LOCKED`](super::count::LOCKED) while it reads the strong count, so no
//!   weak handle can appear, promote and vanish in between.
//! - Decrements are `Release`. The thread that takes a count to zero issues an
//!   `Acquire` fence before running the destructor or freeing the control
//!   block, so every write other threads made before their own decrement is
//!   visible to the cleanup.
//!
//! ```
//! use custody::AtomicStrong;
//! use std::thread;
//!
//! let strong = AtomicStrong::new(vec![1, 2, 3]).unwrap();
//! let weak = AtomicStrong::downgrade(&strong);
//!
//! let reader = thread::spawn(move || weak.upgrade().map(|s| s.len()));
//! let len = reader.join().unwrap();
//! assert!(len.is_none() || len == Some(3));
//! drop(strong);
//! ```

use super::count::{RefCount, LOCKED, MAX_REFCOUNT};
use super::kind::{HandleKind, SharedHandle};
use super::shared::{StrongHandle, WeakHandle};
use crate::sync::{fence, AtomicUsize, Backoff, Ordering};
use core::fmt;

/// Thread-safe strong handle.
pub type AtomicStrong<T> = StrongHandle<T, AtomicCount>;
/// Thread-safe weak handle.
pub type AtomicWeak<T> = WeakHandle<T, AtomicCount>;
/// Result of a tagged clone of a thread-safe handle.
pub type AtomicShared<T> = SharedHandle<T, AtomicCount>;

/// Lock-free counter for thread-safe handles.
pub struct AtomicCount(AtomicUsize);

impl RefCount for AtomicCount {
    const STRONG: HandleKind = HandleKind::StrongAtomic;
    const WEAK: HandleKind = HandleKind::WeakAtomic;

    #[inline]
    fn new(n: usize) -> Self {
        AtomicCount(AtomicUsize::new(n))
    }

    #[inline]
    fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    fn increment(&self) {
        let old = self.0.fetch_add(1, Ordering::Relaxed);
        if old >= MAX_REFCOUNT {
            std::process::abort();
        }
    }

    fn increment_unlocked(&self) {
        let backoff = Backoff::new();
        let mut n = self.0.load(Ordering::Relaxed);
        loop {
            if n == LOCKED {
                backoff.spin();
                n = self.0.load(Ordering::Relaxed);
                continue;
            }
            if n >= MAX_REFCOUNT {
                std::process::abort();
            }
            // Acquire pairs with the Release in `unlock`.
            match self
                .0
                .compare_exchange_weak(n, n + 1, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => n = actual,
            }
        }
    }

    fn try_increment(&self) -> bool {
        let backoff = Backoff::new();
        let mut n = self.0.load(Ordering::Relaxed);
        loop {
            if n == 0 {
                return false;
            }
            if n >= MAX_REFCOUNT {
                std::process::abort();
            }
            match self
                .0
                .compare_exchange_weak(n, n + 1, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(actual) => {
                    n = actual;
                    backoff.spin();
                }
            }
        }
    }

    #[inline]
    fn lock_zero(&self) -> bool {
        // Acquire pairs with the Release decrement of the last weak handle, so
        // a promotion it made beforehand is visible to the caller.
        self.0
            .compare_exchange(0, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    fn unlock(&self) {
        self.0.store(0, Ordering::Release);
    }

    #[inline]
    fn decrement(&self) -> bool {
        if self.0.fetch_sub(1, Ordering::Release) != 1 {
            return false;
        }
        fence(Ordering::Acquire);
        true
    }
}

impl fmt::Debug for AtomicCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCount").field(&self.get()).finish()
    }
}

// SAFETY: handles only share the control block, whose counters are `Sync`
// exactly when the policy is atomic. The payload is read from any thread
// holding a strong handle and destroyed by whichever drops last, hence
// `T: Send + Sync`.
unsafe impl<T: Send + Sync, C: RefCount + Send + Sync> Send for StrongHandle<T, C> {}
unsafe impl<T: Send + Sync, C: RefCount + Send + Sync> Sync for StrongHandle<T, C> {}
unsafe impl<T: Send + Sync, C: RefCount + Send + Sync> Send for WeakHandle<T, C> {}
unsafe impl<T: Send + Sync, C: RefCount + Send + Sync> Sync for WeakHandle<T, C> {}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::error::PtrError;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn assert_send_sync<T: Send + Sync>() {}

    const CANARY: u64 = 0x5eed_cafe;

    struct Tracked {
        canary: AtomicUsize,
        drops: Arc<AtomicUsize>,
    }

    impl Tracked {
        fn new(drops: &Arc<AtomicUsize>) -> Self {
            Tracked {
                canary: AtomicUsize::new(CANARY as usize),
                drops: drops.clone(),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.canary.store(0, Ordering::Relaxed);
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn atomic_handles_are_send_sync() {
        assert_send_sync::<AtomicStrong<u64>>();
        assert_send_sync::<AtomicWeak<u64>>();
    }

    #[test]
    fn tags_use_atomic_variants() {
        let a = AtomicStrong::new(1u8).unwrap();
        let s = AtomicStrong::clone_as(&a, HandleKind::StrongAtomic).unwrap();
        assert_eq!(s.kind(), HandleKind::StrongAtomic);
        let w = AtomicStrong::clone_as(&a, HandleKind::WeakAtomic).unwrap();
        assert_eq!(w.kind(), HandleKind::WeakAtomic);
        assert_eq!(
            AtomicStrong::clone_as(&a, HandleKind::Strong).unwrap_err(),
            PtrError::InvalidVariant
        );
    }

    #[test]
    fn concurrent_clone_drop_runs_destructor_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let root = AtomicStrong::new(Tracked::new(&drops)).unwrap();

        thread::scope(|s| {
            for _ in 0..8 {
                let mine = root.clone();
                s.spawn(move || {
                    for _ in 0..1_000 {
                        let c = mine.clone();
                        assert_eq!(c.canary.load(Ordering::Relaxed), CANARY as usize);
                        drop(c);
                    }
                });
            }
        });

        assert_eq!(AtomicStrong::strong_count(&root), 1);
        drop(root);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn promote_races_with_clone_and_drop() {
        for _ in 0..50 {
            let drops = Arc::new(AtomicUsize::new(0));
            let root = AtomicStrong::new(Tracked::new(&drops)).unwrap();
            let weak = AtomicStrong::downgrade(&root);
            let started = AtomicBool::new(false);

            thread::scope(|s| {
                let started = &started;
                s.spawn(move || {
                    started.store(true, Ordering::Release);
                    for _ in 0..200 {
                        drop(root.clone());
                    }
                    drop(root);
                });
                s.spawn(move || {
                    while !started.load(Ordering::Acquire) {
                        std::hint::spin_loop();
                    }
                    while let Some(promoted) = weak.upgrade() {
                        assert_eq!(promoted.canary.load(Ordering::Relaxed), CANARY as usize);
                    }
                    assert_eq!(weak.strong_count(), 0);
                    assert!(weak.upgrade().is_none());
                });
            });

            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn last_strong_and_last_weak_drop_concurrently() {
        for _ in 0..200 {
            let drops = Arc::new(AtomicUsize::new(0));
            let strong = AtomicStrong::new(Tracked::new(&drops)).unwrap();
            let weak = AtomicStrong::downgrade(&strong);

            thread::scope(|s| {
                s.spawn(move || drop(strong));
                s.spawn(move || drop(weak));
            });

            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
    }
}
