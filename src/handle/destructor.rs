//! Destructor callbacks handed to handle constructors.

use core::ptr::NonNull;

/// Cleanup callback run on a payload exactly once, by whichever handle is
/// responsible for it when its lifetime ends.
///
/// # Safety
///
/// The callback receives the address the handle was constructed with. It must
/// release that allocation in the way it was made; the handle never touches
/// the address afterwards.
pub type Destructor<T> = unsafe fn(NonNull<T>);

/// The destructor for payloads that came from [`Box::into_raw`].
///
/// # Safety
///
/// `ptr` must have been produced by `Box::<T>::into_raw` and not freed since.
pub unsafe fn drop_boxed<T>(ptr: NonNull<T>) {
    drop(Box::from_raw(ptr.as_ptr()));
}

/// Moves `value` to the heap and returns its address.
#[inline]
pub(crate) fn boxed<T>(value: T) -> NonNull<T> {
    // SAFETY: `Box::into_raw` never returns null.
    unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(value))) }
}
