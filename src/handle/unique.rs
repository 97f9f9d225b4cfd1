//! `Unique` - exclusive ownership of one allocation.
//!
//! There is no control block: the handle carries the payload address and the
//! destructor. It has no `Clone` impl, so two destructor-bearing handles to the
//! same payload cannot be made from safe code:
//!
//! ```compile_fail
//! use custody::Unique;
//!
//! let a = Unique::new(1);
//! let b = a.clone();
//! ```
//!
//! Ownership moves either by an ordinary Rust move or through
//! [`Unique::take`], which leaves the source empty. Dropping an empty handle
//! does nothing.

use super::destructor::{boxed, drop_boxed, Destructor};
use super::shared::Strong;
use crate::error::{fail, PtrError};
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// An exclusively owning handle. The destructor runs when it drops, unless
/// ownership was taken out first.
pub struct Unique<T> {
    ptr: NonNull<T>,
    destructor: Option<Destructor<T>>,
    _marker: PhantomData<T>,
}

impl<T> Unique<T> {
    /// Moves `value` to the heap.
    pub fn new(value: T) -> Self {
        Unique {
            ptr: boxed(value),
            destructor: Some(drop_boxed::<T>),
            _marker: PhantomData,
        }
    }

    /// Takes responsibility for a caller-made allocation.
    ///
    /// # Errors
    ///
    /// [`PtrError::NullAllocation`] if `ptr` is null.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live `T` that nothing else frees, and `destructor`
    /// must be the right way to release it.
    pub unsafe fn from_raw(ptr: *mut T, destructor: Destructor<T>) -> Result<Self, PtrError> {
        let ptr = NonNull::new(ptr).ok_or_else(|| fail(PtrError::NullAllocation))?;
        Ok(Unique {
            ptr,
            destructor: Some(destructor),
            _marker: PhantomData,
        })
    }

    /// An empty handle. Dropping it is a no-op.
    pub const fn empty() -> Self {
        Unique {
            ptr: NonNull::dangling(),
            destructor: None,
            _marker: PhantomData,
        }
    }

    /// Moves ownership into a new handle and leaves `self` empty.
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Self::empty())
    }

    /// `true` once ownership has been moved out.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.destructor.is_none()
    }

    /// Shared access to the payload, `None` if empty.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: a non-empty handle exclusively owns a live payload.
        self.destructor.map(|_| unsafe { self.ptr.as_ref() })
    }

    /// Exclusive access to the payload, `None` if empty.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: as in `get`, and `&mut self` rules out other borrows.
        Some(unsafe { self.ptr.as_mut() })
    }

    /// Raw payload address, `None` if empty.
    #[inline]
    pub fn as_ptr(&self) -> Option<*const T> {
        self.destructor.map(|_| self.ptr.as_ptr().cast_const())
    }

    /// Gives up ownership without running the destructor.
    ///
    /// The caller becomes responsible for calling the returned destructor on
    /// the returned address. `None` if empty.
    pub fn into_raw(mut self) -> Option<(NonNull<T>, Destructor<T>)> {
        let destructor = self.destructor.take()?;
        Some((self.ptr, destructor))
    }

    /// Converts exclusive ownership into shared ownership. The payload is not
    /// moved and its destructor carries over.
    ///
    /// # Errors
    ///
    /// - [`PtrError::NullAllocation`] if the handle is empty.
    /// - [`PtrError::AllocationFailed`] if the control block cannot be
    ///   allocated; the payload is destroyed in that case.
    pub fn into_strong(self) -> Result<Strong<T>, PtrError> {
        let Some((ptr, destructor)) = self.into_raw() else {
            return Err(fail(PtrError::NullAllocation));
        };
        // SAFETY: the payload and destructor came out of a live unique handle.
        unsafe {
            Strong::from_raw(ptr.as_ptr(), destructor).map_err(|err| {
                destructor(ptr);
                err
            })
        }
    }
}

impl<T> Drop for Unique<T> {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.take() {
            tracing::trace!(payload = ?self.ptr, "unique handle dropped, running destructor");
            // SAFETY: this handle is the sole owner and gives the payload up here.
            unsafe { destructor(self.ptr) }
        }
    }
}

impl<T> Default for Unique<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Unique<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Unique").field(value).finish(),
            None => f.write_str("Unique(<empty>)"),
        }
    }
}

// SAFETY: the handle is the only path to the payload, like `Box<T>`.
unsafe impl<T: Send> Send for Unique<T> {}
unsafe impl<T: Sync> Sync for Unique<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked(Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn scope_exit_runs_destructor_once() {
        let drops = Rc::new(Cell::new(0));
        {
            let u = Unique::new(Tracked(drops.clone()));
            assert!(!u.is_empty());
        }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn take_leaves_source_empty() {
        let drops = Rc::new(Cell::new(0));
        let mut src = Unique::new(Tracked(drops.clone()));
        let dst = src.take();
        assert!(src.is_empty());
        assert!(src.get().is_none());
        drop(src);
        assert_eq!(drops.get(), 0);
        drop(dst);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn get_mut_writes_through() {
        let mut u = Unique::new(10);
        *u.get_mut().unwrap() += 5;
        assert_eq!(u.get(), Some(&15));
    }

    #[test]
    fn from_raw_rejects_null() {
        let res = unsafe { Unique::<u8>::from_raw(core::ptr::null_mut(), drop_boxed::<u8>) };
        assert_eq!(res.unwrap_err(), PtrError::NullAllocation);
    }

    #[test]
    fn into_raw_hands_back_destructor() {
        let drops = Rc::new(Cell::new(0));
        let u = Unique::new(Tracked(drops.clone()));
        let (ptr, destructor) = u.into_raw().unwrap();
        assert_eq!(drops.get(), 0);
        unsafe { destructor(ptr) };
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn into_strong_keeps_payload_in_place() {
        let drops = Rc::new(Cell::new(0));
        let u = Unique::new(Tracked(drops.clone()));
        let addr = u.as_ptr().unwrap();
        let s = u.into_strong().unwrap();
        assert_eq!(Strong::as_ptr(&s), addr);
        let s2 = s.clone();
        drop(s);
        assert_eq!(drops.get(), 0);
        drop(s2);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn empty_into_strong_is_null_allocation() {
        let u: Unique<u32> = Unique::empty();
        assert_eq!(u.into_strong().unwrap_err(), PtrError::NullAllocation);
    }
}
