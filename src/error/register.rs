//! The process-wide sticky error register.
//!
//! Bits accumulate with `fetch_or` and are only cleared by the caller through
//! [`take`] or [`clear`]. Nothing in this crate clears the register on its own.
//!
//! The register always uses `core` atomics, even under the `loom` feature:
//! it is a `static` and is never part of a modelled interleaving.

use super::{ErrorFlags, PtrError};
use core::sync::atomic::{AtomicU32, Ordering};

static REGISTER: AtomicU32 = AtomicU32::new(0);

/// Records `err`.
pub fn raise(err: PtrError) {
    let prev = REGISTER.fetch_or(err.flag().bits(), Ordering::AcqRel);
    tracing::warn!(
        error = %err,
        flags = ?ErrorFlags::from_bits_truncate(prev | err.flag().bits()),
        "handle operation rejected"
    );
}

/// Snapshot of the currently set bits.
pub fn current() -> ErrorFlags {
    ErrorFlags::from_bits_truncate(REGISTER.load(Ordering::Acquire))
}

/// Returns `true` if every bit in `flags` is set.
pub fn contains(flags: ErrorFlags) -> bool {
    current().contains(flags)
}

/// Returns `true` if no error has been recorded since the last clear.
pub fn is_clear() -> bool {
    current().is_empty()
}

/// Consumes the register: returns the set bits and clears them atomically.
pub fn take() -> ErrorFlags {
    ErrorFlags::from_bits_truncate(REGISTER.swap(0, Ordering::AcqRel))
}

/// Clears every bit.
pub fn clear() {
    REGISTER.store(0, Ordering::Release);
}
