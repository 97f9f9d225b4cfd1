//! # `custody` - Ownership and Lifetime Handles
//!
//! Four pointer disciplines over heap allocations, for code that hands raw
//! allocations around and needs their lifetime managed:
//!
//! - [`Unique`]: exclusive ownership. One handle, one destructor run.
//! - [`Strong`] / [`Weak`]: reference-counted shared ownership with
//!   observing handles that can be promoted while the payload lives.
//! - [`AtomicStrong`] / [`AtomicWeak`]: the same, with lock-free atomic counts
//!   and a CAS-based promotion that never resurrects a dead payload.
//! - [`Relay`]: many read views, one owner, ownership explicitly handed from
//!   one handle to another.
//!
//! ## Construction
//!
//! Every handle can be built from a value (`new`) or from a raw allocation
//! plus a [`Destructor`] (`from_raw`). The destructor runs exactly once, by
//! whichever handle is responsible when the payload's lifetime ends.
//!
//! ## Errors
//!
//! Operations never panic on a precondition violation. They return
//! `Err(`[`PtrError`]`)` and set the matching bit in the process-wide sticky
//! [`error::register`], which only the caller clears.
//!
//! ```rust
//! use custody::{error::register, HandleKind, Strong};
//!
//! let strong = Strong::new(5).unwrap();
//! let weak = Strong::clone_as(&strong, HandleKind::Weak)
//!     .unwrap()
//!     .into_weak()
//!     .unwrap();
//!
//! drop(strong);
//! assert!(weak.upgrade().is_none());
//!
//! assert!(Strong::clone_as(&Strong::new(1).unwrap(), HandleKind::Unique).is_err());
//! assert!(register::contains(custody::ErrorFlags::INVALID_VARIANT));
//! ```
//!
//! ## Threads
//!
//! Only the atomic handles are `Send`/`Sync`. Using [`Strong`], [`Weak`] or
//! [`Relay`] from several threads is a compile error.
//!
//! ## Loom
//!
//! The atomic handles are model-checked under `loom`:
//!
//! ```text
//! cargo test --features loom --lib
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod handle;
pub mod sync;

#[cfg(all(test, feature = "loom"))]
mod loom_tests;

pub use error::{ErrorFlags, PtrError};
pub use handle::{
    drop_boxed, AtomicShared, AtomicStrong, AtomicWeak, Destructor, HandleKind, Relay, Shared,
    Strong, Unique, Weak,
};

// Compile-time assertions for handle layout.
const _: () = {
    use core::mem;

    const WORD: usize = mem::size_of::<usize>();

    // Shared handles are a payload pointer plus a control block pointer.
    assert!(mem::size_of::<Strong<u64>>() == 2 * WORD);
    assert!(mem::size_of::<AtomicStrong<u64>>() == 2 * WORD);
    // The empty state of a weak handle fits in the pointer niche.
    assert!(mem::size_of::<Weak<u64>>() == 2 * WORD);
    // Unique and relay handles keep the destructor inline, niche-packed.
    assert!(mem::size_of::<Unique<u64>>() == 2 * WORD);
    assert!(mem::size_of::<Relay<u64>>() == 3 * WORD);
};
