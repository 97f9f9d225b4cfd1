//! `Relay` - many viewers, one owner, explicit hand-off.
//!
//! All relay handles of one payload share a small heap counter. The counter
//! tracks how many handles exist; it says nothing about ownership. Ownership,
//! the duty to run the destructor, is the destructor slot itself: exactly one
//! handle holds it, and [`Relay::pass_ownership`] moves it between handles.
//!
//! The counter record outlives the payload when a view dies last, so views can
//! ask [`Relay::is_released`] instead of touching a destroyed payload.
//!
//! Relay handles are single-threaded (`!Send`, `!Sync`).
//!
//! ```
//! use custody::Relay;
//!
//! let mut owner = Relay::new(String::from("baton")).unwrap();
//! let mut runner = owner.view();
//! assert!(owner.owns() && !runner.owns());
//!
//! Relay::pass_ownership(&mut runner, &mut owner).unwrap();
//! assert!(runner.owns() && !owner.owns());
//! assert_eq!(runner.get().map(String::as_str), Some("baton"));
//!
//! drop(runner);
//! assert!(owner.is_released());
//! ```

use super::count::MAX_REFCOUNT;
use super::destructor::{boxed, drop_boxed, Destructor};
use super::kind::HandleKind;
use crate::error::{fail, PtrError};
use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use std::alloc::{alloc, dealloc};

struct RelayCounter {
    handles: Cell<usize>,
    released: Cell<bool>,
}

impl RelayCounter {
    fn allocate() -> Result<NonNull<Self>, PtrError> {
        let layout = Layout::new::<Self>();
        // SAFETY: the layout is not zero-sized.
        let raw = unsafe { alloc(layout) }.cast::<Self>();
        let counter = NonNull::new(raw).ok_or_else(|| fail(PtrError::AllocationFailed))?;
        // SAFETY: freshly allocated with the layout of `Self`.
        unsafe {
            ptr::write(
                counter.as_ptr(),
                RelayCounter {
                    handles: Cell::new(1),
                    released: Cell::new(false),
                },
            );
        }
        Ok(counter)
    }
}

/// A relay handle: an owner (holding the destructor) or a view.
pub struct Relay<T> {
    ptr: NonNull<T>,
    counter: NonNull<RelayCounter>,
    destructor: Option<Destructor<T>>,
    _marker: PhantomData<T>,
}

impl<T> Relay<T> {
    /// Moves `value` to the heap behind a new owning handle.
    ///
    /// # Errors
    ///
    /// [`PtrError::AllocationFailed`] if the shared counter cannot be
    /// allocated. The value is dropped in that case.
    pub fn new(value: T) -> Result<Self, PtrError> {
        let ptr = boxed(value);
        // SAFETY: `ptr` came from `Box::into_raw`, matching `drop_boxed`.
        match unsafe { Self::from_raw(ptr.as_ptr(), drop_boxed::<T>) } {
            Ok(relay) => Ok(relay),
            Err(err) => {
                // SAFETY: ownership never left this function.
                unsafe { drop_boxed(ptr) };
                Err(err)
            }
        }
    }

    /// Takes responsibility for a caller-made allocation. The returned handle
    /// is the owner and the shared counter starts at one.
    ///
    /// # Errors
    ///
    /// - [`PtrError::NullAllocation`] if `ptr` is null.
    /// - [`PtrError::AllocationFailed`] if the counter cannot be allocated.
    ///
    /// On error the allocation still belongs to the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live `T` that nothing else frees, and `destructor`
    /// must be the right way to release it.
    pub unsafe fn from_raw(ptr: *mut T, destructor: Destructor<T>) -> Result<Self, PtrError> {
        let ptr = NonNull::new(ptr).ok_or_else(|| fail(PtrError::NullAllocation))?;
        let counter = RelayCounter::allocate()?;
        Ok(Relay {
            ptr,
            counter,
            destructor: Some(destructor),
            _marker: PhantomData,
        })
    }

    #[inline]
    fn counter(&self) -> &RelayCounter {
        // SAFETY: every relay handle keeps the counter alive.
        unsafe { self.counter.as_ref() }
    }

    /// Creates a non-owning view of the same payload. Works from owners and
    /// views alike.
    ///
    /// Aborts the process if the handle count would exceed [`MAX_REFCOUNT`].
    pub fn view(&self) -> Self {
        let counter = self.counter();
        let n = counter.handles.get();
        if n >= MAX_REFCOUNT {
            std::process::abort();
        }
        counter.handles.set(n + 1);
        Relay {
            ptr: self.ptr,
            counter: self.counter,
            destructor: None,
            _marker: PhantomData,
        }
    }

    /// Moves the destructor from `source` to `destination`. The shared counter
    /// is untouched.
    ///
    /// # Errors
    ///
    /// Checked in this order, leaving both handles unchanged on failure:
    /// - [`PtrError::DestinationAlreadyOwns`] if `destination` owns.
    /// - [`PtrError::SourceDoesNotOwn`] if `source` does not own.
    /// - [`PtrError::PointerMismatch`] if they view different payloads.
    pub fn pass_ownership(destination: &mut Self, source: &mut Self) -> Result<(), PtrError> {
        if destination.owns() {
            return Err(fail(PtrError::DestinationAlreadyOwns));
        }
        if !source.owns() {
            return Err(fail(PtrError::SourceDoesNotOwn));
        }
        if destination.ptr != source.ptr {
            return Err(fail(PtrError::PointerMismatch));
        }
        destination.destructor = source.destructor.take();
        tracing::trace!(payload = ?destination.ptr, "relay ownership passed");
        Ok(())
    }

    /// `true` if this handle will run the destructor.
    #[inline]
    pub fn owns(&self) -> bool {
        self.destructor.is_some()
    }

    /// [`HandleKind::RelayOwner`] or [`HandleKind::RelayView`].
    pub fn kind(&self) -> HandleKind {
        if self.owns() {
            HandleKind::RelayOwner
        } else {
            HandleKind::RelayView
        }
    }

    /// Number of relay handles (owner and views) sharing the counter.
    pub fn handles(&self) -> usize {
        self.counter().handles.get()
    }

    /// `true` once the owner has run the destructor.
    pub fn is_released(&self) -> bool {
        self.counter().released.get()
    }

    /// The payload, if this handle is the owner.
    ///
    /// The owner's payload stays alive for as long as the borrow: giving the
    /// destructor away needs `&mut self`.
    pub fn get(&self) -> Option<&T> {
        if self.owns() {
            // SAFETY: the destructor only runs when this handle drops.
            Some(unsafe { self.ptr.as_ref() })
        } else {
            None
        }
    }

    /// The payload, from any handle.
    ///
    /// # Safety
    ///
    /// The owning handle must not drop while the returned reference is in use.
    /// In particular [`is_released`](Relay::is_released) must be `false`.
    pub unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(!self.is_released(), "relay payload already released");
        self.ptr.as_ref()
    }

    /// Raw payload address. Dangling once released.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<T> Drop for Relay<T> {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.take() {
            tracing::trace!(payload = ?self.ptr, "relay owner dropped, running destructor");
            // SAFETY: holding the destructor makes this handle the only one
            // responsible for the payload.
            unsafe { destructor(self.ptr) };
            self.counter().released.set(true);
        }
        let counter = self.counter();
        let remaining = counter.handles.get() - 1;
        counter.handles.set(remaining);
        if remaining == 0 {
            // SAFETY: this was the last handle referencing the counter.
            unsafe {
                ptr::drop_in_place(self.counter.as_ptr());
                dealloc(self.counter.as_ptr().cast::<u8>(), Layout::new::<RelayCounter>());
            }
            tracing::trace!("relay counter freed");
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Relay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Relay");
        d.field("kind", &self.kind()).field("handles", &self.handles());
        if let Some(value) = self.get() {
            d.field("value", value);
        }
        d.finish()
    }
}
