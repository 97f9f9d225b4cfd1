//! Ownership handles over heap allocations.
//!
//! | Handle | Bookkeeping | Threads |
//! |---|---|---|
//! | [`Unique`] | destructor slot | `Send` if `T: Send` |
//! | [`Strong`] / [`Weak`] | control block, [`LocalCount`] | single |
//! | [`AtomicStrong`] / [`AtomicWeak`] | control block, [`AtomicCount`] | any |
//! | [`Relay`] | shared handle counter + movable destructor slot | single |

pub mod atomic;
mod control;
pub mod count;
pub mod destructor;
pub mod kind;
pub mod relay;
pub mod shared;
pub mod unique;

pub use atomic::{AtomicCount, AtomicShared, AtomicStrong, AtomicWeak};
pub use count::{LocalCount, RefCount, MAX_REFCOUNT};
pub use destructor::{drop_boxed, Destructor};
pub use kind::{HandleKind, Shared, SharedHandle};
pub use relay::Relay;
pub use shared::{Strong, StrongHandle, Weak, WeakHandle};
pub use unique::Unique;
