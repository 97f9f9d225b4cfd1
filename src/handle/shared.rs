//! `Strong` / `Weak` - reference-counted shared ownership with promotable
//! observers.
//!
//! [`StrongHandle`] and [`WeakHandle`] are generic over the counting policy.
//! [`Strong`] and [`Weak`] fix it to [`LocalCount`]: those are single-threaded,
//! neither `Send` nor `Sync`, so cloning or dropping handles of one allocation
//! from several threads does not compile. The thread-safe instantiation lives
//! in [`super::atomic`].
//!
//! ```
//! use custody::{Strong, Weak};
//!
//! let strong = Strong::new(5).unwrap();
//! let weak: Weak<i32> = Strong::downgrade(&strong);
//! assert_eq!(*weak.upgrade().unwrap(), 5);
//!
//! drop(strong);
//! assert!(weak.upgrade().is_none());
//! ```

use super::control::ControlBlock;
use super::count::{LocalCount, RefCount};
use super::destructor::{boxed, drop_boxed, Destructor};
use super::kind::{HandleKind, SharedHandle};
use crate::error::{fail, PtrError};
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;

/// Single-threaded strong handle.
pub type Strong<T> = StrongHandle<T, LocalCount>;
/// Single-threaded weak handle.
pub type Weak<T> = WeakHandle<T, LocalCount>;

/// An owning handle. The payload lives while at least one exists.
pub struct StrongHandle<T, C: RefCount> {
    ptr: NonNull<T>,
    block: NonNull<ControlBlock<T, C>>,
    _marker: PhantomData<T>,
}

/// An observing handle. Must be promoted with [`WeakHandle::upgrade`] before use.
pub struct WeakHandle<T, C: RefCount> {
    ptr: NonNull<T>,
    block: Option<NonNull<ControlBlock<T, C>>>,
    _marker: PhantomData<T>,
}

impl<T, C: RefCount> StrongHandle<T, C> {
    /// Moves `value` to the heap and manages it with a fresh control block.
    ///
    /// # Errors
    ///
    /// [`PtrError::AllocationFailed`] if the control block cannot be allocated.
    /// The value is dropped in that case.
    pub fn new(value: T) -> Result<Self, PtrError> {
        let ptr = boxed(value);
        // SAFETY: `ptr` came from `Box::into_raw`, matching `drop_boxed`.
        match unsafe { Self::from_raw(ptr.as_ptr(), drop_boxed::<T>) } {
            Ok(strong) => Ok(strong),
            Err(err) => {
                // SAFETY: ownership never left this function.
                unsafe { drop_boxed(ptr) };
                Err(err)
            }
        }
    }

    /// Takes responsibility for a caller-made allocation.
    ///
    /// `destructor` runs exactly once, when the last strong handle drops.
    ///
    /// # Errors
    ///
    /// - [`PtrError::NullAllocation`] if `ptr` is null.
    /// - [`PtrError::AllocationFailed`] if the control block cannot be allocated.
    ///
    /// On error the allocation still belongs to the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live `T` that nothing else frees, and `destructor`
    /// must be the right way to release it.
    pub unsafe fn from_raw(ptr: *mut T, destructor: Destructor<T>) -> Result<Self, PtrError> {
        let ptr = NonNull::new(ptr).ok_or_else(|| fail(PtrError::NullAllocation))?;
        let block = ControlBlock::allocate(destructor)?;
        Ok(StrongHandle {
            ptr,
            block,
            _marker: PhantomData,
        })
    }

    #[inline]
    fn block(&self) -> &ControlBlock<T, C> {
        // SAFETY: a strong handle keeps the block alive.
        unsafe { self.block.as_ref() }
    }

    /// Creates another handle, tagged by which count was incremented.
    ///
    /// `kind` must be this family's strong or weak variant
    /// ([`HandleKind::Strong`]/[`HandleKind::Weak`] for single-threaded
    /// handles, the `*Atomic` variants for atomic ones).
    ///
    /// # Errors
    ///
    /// [`PtrError::InvalidVariant`] for any other `kind`. No count changes.
    pub fn clone_as(this: &Self, kind: HandleKind) -> Result<SharedHandle<T, C>, PtrError> {
        if kind == C::STRONG {
            Ok(SharedHandle::Strong(this.clone()))
        } else if kind == C::WEAK {
            Ok(SharedHandle::Weak(Self::downgrade(this)))
        } else {
            Err(fail(PtrError::InvalidVariant))
        }
    }

    /// Creates a weak handle to the same allocation.
    pub fn downgrade(this: &Self) -> WeakHandle<T, C> {
        this.block().downgrade();
        WeakHandle {
            ptr: this.ptr,
            block: Some(this.block),
            _marker: PhantomData,
        }
    }

    /// Number of strong handles, including this one.
    #[inline]
    pub fn strong_count(this: &Self) -> usize {
        this.block().strong_count()
    }

    /// Number of weak handles.
    #[inline]
    pub fn weak_count(this: &Self) -> usize {
        this.block().weak_count()
    }

    /// Always `true`: a strong handle keeps the payload alive.
    #[inline]
    pub fn is_alive(this: &Self) -> bool {
        Self::strong_count(this) > 0
    }

    /// Raw address of the payload, for collaborators that take borrowed views.
    #[inline]
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }

    /// Returns `true` if both handles share one allocation.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.block == other.block
    }

    /// Mutable access when this is the only handle of any kind.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if this.block().is_unique() {
            // SAFETY: no other handle can observe the payload.
            Some(unsafe { this.ptr.as_mut() })
        } else {
            None
        }
    }
}

impl<T, C: RefCount> Clone for StrongHandle<T, C> {
    fn clone(&self) -> Self {
        self.block().acquire_strong();
        StrongHandle {
            ptr: self.ptr,
            block: self.block,
            _marker: PhantomData,
        }
    }
}

impl<T, C: RefCount> Drop for StrongHandle<T, C> {
    fn drop(&mut self) {
        // SAFETY: this handle owns one strong count on a live block.
        unsafe { ControlBlock::release_strong(self.block, self.ptr) }
    }
}

impl<T, C: RefCount> Deref for StrongHandle<T, C> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the destructor has not run while a strong handle exists.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, C: RefCount> AsRef<T> for StrongHandle<T, C> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: fmt::Debug, C: RefCount> fmt::Debug for StrongHandle<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strong")
            .field("value", &**self)
            .field("strong", &Self::strong_count(self))
            .field("weak", &Self::weak_count(self))
            .finish()
    }
}

impl<T, C: RefCount> WeakHandle<T, C> {
    /// A weak handle with no control block. It never promotes.
    pub const fn empty() -> Self {
        WeakHandle {
            ptr: NonNull::dangling(),
            block: None,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn block(&self) -> Option<&ControlBlock<T, C>> {
        // SAFETY: a weak handle keeps the block (not the payload) alive.
        self.block.map(|b| unsafe { &*b.as_ptr() })
    }

    /// Promotes to a strong handle if the payload is still alive.
    ///
    /// A dead payload is an expected outcome, not an error: `None` is returned,
    /// no counter changes and the error register is untouched.
    pub fn upgrade(&self) -> Option<StrongHandle<T, C>> {
        let block = self.block?;
        if self.block()?.promote() {
            Some(StrongHandle {
                ptr: self.ptr,
                block,
                _marker: PhantomData,
            })
        } else {
            None
        }
    }

    /// Creates another handle, tagged by which count was incremented.
    ///
    /// Asking for the strong variant promotes. If the payload is already dead
    /// the strong count stays at zero and a weak clone comes back instead,
    /// tagged [`SharedHandle::Weak`].
    ///
    /// # Errors
    ///
    /// - [`PtrError::InvalidVariant`] if `kind` is not this family's strong or
    ///   weak variant.
    /// - [`PtrError::NullControlBlock`] for an [empty](WeakHandle::empty) handle.
    pub fn clone_as(&self, kind: HandleKind) -> Result<SharedHandle<T, C>, PtrError> {
        if kind != C::STRONG && kind != C::WEAK {
            return Err(fail(PtrError::InvalidVariant));
        }
        if self.block.is_none() {
            return Err(fail(PtrError::NullControlBlock));
        }
        if kind == C::STRONG {
            if let Some(strong) = self.upgrade() {
                return Ok(SharedHandle::Strong(strong));
            }
        }
        Ok(SharedHandle::Weak(self.clone()))
    }

    /// Number of strong handles; zero once the payload is destroyed.
    pub fn strong_count(&self) -> usize {
        self.block().map_or(0, ControlBlock::strong_count)
    }

    /// Number of weak handles, including this one. Zero for an empty handle.
    pub fn weak_count(&self) -> usize {
        self.block().map_or(0, ControlBlock::weak_count)
    }

    /// `true` while the payload has not been destroyed.
    pub fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }

    /// `true` if this handle has no control block.
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    /// Raw payload address. Dangling once the payload is dead; never
    /// dereference it without holding a strong handle.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns `true` if both handles share one control block. Two empty
    /// handles compare equal.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.block == other.block
    }
}

impl<T, C: RefCount> Default for WeakHandle<T, C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, C: RefCount> Clone for WeakHandle<T, C> {
    fn clone(&self) -> Self {
        if let Some(block) = self.block() {
            block.acquire_weak();
        }
        WeakHandle {
            ptr: self.ptr,
            block: self.block,
            _marker: PhantomData,
        }
    }
}

impl<T, C: RefCount> Drop for WeakHandle<T, C> {
    fn drop(&mut self) {
        if let Some(block) = self.block {
            // SAFETY: this handle owns one weak count on a live block.
            unsafe { ControlBlock::release_weak(block) }
        }
    }
}

impl<T, C: RefCount> fmt::Debug for WeakHandle<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weak")
            .field("alive", &self.is_alive())
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}
