//! Error taxonomy for handle operations.
//!
//! Handle operations never panic on a precondition violation. They record the
//! violation in the process-wide [`register`] and hand back an `Err` (the
//! "empty" result). Callers that batch several operations can check the
//! register once at the end instead of inspecting every result.

pub mod register;

use bitflags::bitflags;
use core::fmt;

/// Precondition violations detected by handle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtrError {
    /// A constructor was given a null payload address.
    NullAllocation,
    /// The handle carries no control block.
    NullControlBlock,
    /// A clone requested a handle variant this family cannot produce.
    InvalidVariant,
    /// Relay hand-off target already holds the destructor.
    DestinationAlreadyOwns,
    /// Relay hand-off source holds no destructor to give away.
    SourceDoesNotOwn,
    /// Relay hand-off between handles that view different payloads.
    PointerMismatch,
    /// The bookkeeping record could not be allocated.
    AllocationFailed,
}

impl PtrError {
    /// Every error, in flag order.
    pub const ALL: [PtrError; 7] = [
        PtrError::NullAllocation,
        PtrError::NullControlBlock,
        PtrError::InvalidVariant,
        PtrError::DestinationAlreadyOwns,
        PtrError::SourceDoesNotOwn,
        PtrError::PointerMismatch,
        PtrError::AllocationFailed,
    ];

    /// The register bit recorded for this error.
    #[inline]
    pub const fn flag(self) -> ErrorFlags {
        match self {
            PtrError::NullAllocation => ErrorFlags::NULL_ALLOCATION,
            PtrError::NullControlBlock => ErrorFlags::NULL_CONTROL_BLOCK,
            PtrError::InvalidVariant => ErrorFlags::INVALID_VARIANT,
            PtrError::DestinationAlreadyOwns => ErrorFlags::DESTINATION_ALREADY_OWNS,
            PtrError::SourceDoesNotOwn => ErrorFlags::SOURCE_DOES_NOT_OWN,
            PtrError::PointerMismatch => ErrorFlags::POINTER_MISMATCH,
            PtrError::AllocationFailed => ErrorFlags::ALLOCATION_FAILED,
        }
    }
}

impl fmt::Display for PtrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PtrError::NullAllocation => "handle constructed from a null allocation",
            PtrError::NullControlBlock => "handle has no control block",
            PtrError::InvalidVariant => "requested handle variant is not valid here",
            PtrError::DestinationAlreadyOwns => "relay destination already owns the payload",
            PtrError::SourceDoesNotOwn => "relay source does not own the payload",
            PtrError::PointerMismatch => "relay handles reference different payloads",
            PtrError::AllocationFailed => "control block allocation failed",
        })
    }
}

impl std::error::Error for PtrError {}

bitflags! {
    /// Sticky error bits, one per [`PtrError`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ErrorFlags: u32 {
        /// See [`PtrError::NullAllocation`].
        const NULL_ALLOCATION = 1 << 0;
        /// See [`PtrError::NullControlBlock`].
        const NULL_CONTROL_BLOCK = 1 << 1;
        /// See [`PtrError::InvalidVariant`].
        const INVALID_VARIANT = 1 << 2;
        /// See [`PtrError::DestinationAlreadyOwns`].
        const DESTINATION_ALREADY_OWNS = 1 << 3;
        /// See [`PtrError::SourceDoesNotOwn`].
        const SOURCE_DOES_NOT_OWN = 1 << 4;
        /// See [`PtrError::PointerMismatch`].
        const POINTER_MISMATCH = 1 << 5;
        /// See [`PtrError::AllocationFailed`].
        const ALLOCATION_FAILED = 1 << 6;
    }
}

impl ErrorFlags {
    /// The errors whose bits are set, in flag order.
    pub fn errors(self) -> impl Iterator<Item = PtrError> {
        PtrError::ALL
            .into_iter()
            .filter(move |e| self.contains(e.flag()))
    }
}

impl From<PtrError> for ErrorFlags {
    fn from(err: PtrError) -> Self {
        err.flag()
    }
}

/// Records `err` in the register and returns it, for `Err(fail(..))` sites.
#[inline]
pub(crate) fn fail(err: PtrError) -> PtrError {
    register::raise(err);
    err
}
