//! Handle variant tags and the tagged clone result.

use super::count::{LocalCount, RefCount};
use super::shared::{StrongHandle, WeakHandle};
use crate::error::{fail, PtrError};
use core::fmt;

/// Every handle variant in the crate, with stable numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandleKind {
    /// [`Unique`](super::Unique).
    Unique = 0,
    /// Single-threaded [`Strong`](super::Strong).
    Strong = 1,
    /// Single-threaded [`Weak`](super::Weak).
    Weak = 2,
    /// [`AtomicStrong`](super::AtomicStrong).
    StrongAtomic = 3,
    /// [`AtomicWeak`](super::AtomicWeak).
    WeakAtomic = 4,
    /// A [`Relay`](super::Relay) holding the destructor.
    RelayOwner = 5,
    /// A [`Relay`](super::Relay) without the destructor.
    RelayView = 6,
}

impl HandleKind {
    /// The numeric code of this variant.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for HandleKind {
    type Error = PtrError;

    fn try_from(code: u8) -> Result<Self, PtrError> {
        Ok(match code {
            0 => HandleKind::Unique,
            1 => HandleKind::Strong,
            2 => HandleKind::Weak,
            3 => HandleKind::StrongAtomic,
            4 => HandleKind::WeakAtomic,
            5 => HandleKind::RelayOwner,
            6 => HandleKind::RelayView,
            _ => return Err(fail(PtrError::InvalidVariant)),
        })
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleKind::Unique => "unique",
            HandleKind::Strong => "strong",
            HandleKind::Weak => "weak",
            HandleKind::StrongAtomic => "strong-atomic",
            HandleKind::WeakAtomic => "weak-atomic",
            HandleKind::RelayOwner => "relay-owner",
            HandleKind::RelayView => "relay-view",
        })
    }
}

/// Result of a tagged clone of a single-threaded handle.
pub type Shared<T> = SharedHandle<T, LocalCount>;

/// Result of a tagged clone: a strong or a weak handle to the same allocation.
pub enum SharedHandle<T, C: RefCount> {
    /// The strong count was incremented.
    Strong(StrongHandle<T, C>),
    /// The weak count was incremented.
    Weak(WeakHandle<T, C>),
}

impl<T, C: RefCount> SharedHandle<T, C> {
    /// The variant tag of the contained handle.
    pub fn kind(&self) -> HandleKind {
        match self {
            SharedHandle::Strong(_) => C::STRONG,
            SharedHandle::Weak(_) => C::WEAK,
        }
    }

    /// Returns the strong handle, or `None` for a weak one.
    pub fn into_strong(self) -> Option<StrongHandle<T, C>> {
        match self {
            SharedHandle::Strong(s) => Some(s),
            SharedHandle::Weak(_) => None,
        }
    }

    /// Returns the weak handle, or `None` for a strong one.
    pub fn into_weak(self) -> Option<WeakHandle<T, C>> {
        match self {
            SharedHandle::Strong(_) => None,
            SharedHandle::Weak(w) => Some(w),
        }
    }
}

impl<T: fmt::Debug, C: RefCount> fmt::Debug for SharedHandle<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedHandle::Strong(s) => f.debug_tuple("Strong").field(s).finish(),
            SharedHandle::Weak(w) => f.debug_tuple("Weak").field(w).finish(),
        }
    }
}
