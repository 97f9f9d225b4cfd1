//! Atomic shim: `core` atomics normally, `loom` atomics under the `loom` feature.

#[cfg(not(feature = "loom"))]
pub use core::sync::atomic::{fence, AtomicUsize, Ordering};
#[cfg(feature = "loom")]
pub use loom::sync::atomic::{fence, AtomicUsize, Ordering};

#[cfg(not(feature = "loom"))]
pub use crossbeam_utils::Backoff;

/// Retry pacing for CAS loops. Under loom a failed CAS already implies another
/// thread made progress, so this only hints the scheduler.
#[cfg(feature = "loom")]
#[derive(Debug, Default)]
pub struct Backoff;

#[cfg(feature = "loom")]
impl Backoff {
    /// Creates a new backoff.
    pub fn new() -> Self {
        Backoff
    }

    /// Backs off in a lock-free loop.
    pub fn spin(&self) {
        loom::hint::spin_loop();
    }
}

#[cfg(feature = "loom")]
pub use loom::thread;
#[cfg(all(not(feature = "loom"), test))]
pub use std::thread;
