//! The register is process-wide, so every test here serialises on one lock
//! and starts from a cleared register.

use custody::error::register;
use custody::{ErrorFlags, HandleKind, PtrError, Relay, Strong, Unique, Weak};
use std::sync::{Mutex, MutexGuard};

static SERIAL: Mutex<()> = Mutex::new(());

fn exclusive() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    register::clear();
    guard
}

#[test]
fn failures_accumulate_until_taken() {
    let _guard = exclusive();

    let res = unsafe { Strong::<u8>::from_raw(std::ptr::null_mut(), custody::drop_boxed::<u8>) };
    assert_eq!(res.unwrap_err(), PtrError::NullAllocation);
    assert_eq!(register::current(), ErrorFlags::NULL_ALLOCATION);

    let empty: Weak<u8> = Weak::empty();
    assert!(empty.clone_as(HandleKind::Weak).is_err());
    assert!(register::contains(
        ErrorFlags::NULL_ALLOCATION | ErrorFlags::NULL_CONTROL_BLOCK
    ));

    // A later success does not clear anything.
    let _ok = Strong::new(1u8).unwrap();
    assert!(register::contains(ErrorFlags::NULL_CONTROL_BLOCK));

    let taken = register::take();
    assert_eq!(
        taken.errors().collect::<Vec<_>>(),
        vec![PtrError::NullAllocation, PtrError::NullControlBlock]
    );
    assert!(register::is_clear());
}

#[test]
fn relay_preconditions_set_their_bits() {
    let _guard = exclusive();

    let mut owner = Relay::new(0u16).unwrap();
    let mut view = owner.view();
    let mut other_view = Relay::new(1u16).unwrap().view();

    assert!(Relay::pass_ownership(&mut owner, &mut view).is_err());
    assert!(Relay::pass_ownership(&mut view, &mut other_view).is_err());
    assert!(Relay::pass_ownership(&mut other_view, &mut owner).is_err());

    assert_eq!(
        register::take(),
        ErrorFlags::DESTINATION_ALREADY_OWNS
            | ErrorFlags::SOURCE_DOES_NOT_OWN
            | ErrorFlags::POINTER_MISMATCH
    );
}

#[test]
fn invalid_variant_from_clone_and_code() {
    let _guard = exclusive();

    let s = Strong::new(2u32).unwrap();
    assert!(Strong::clone_as(&s, HandleKind::RelayView).is_err());
    assert_eq!(HandleKind::try_from(42u8), Err(PtrError::InvalidVariant));
    assert_eq!(register::take(), ErrorFlags::INVALID_VARIANT);
}

#[test]
fn expected_outcomes_leave_register_clear() {
    let _guard = exclusive();

    let s = Strong::new(5i32).unwrap();
    let w = Strong::downgrade(&s);
    drop(s);
    assert!(w.upgrade().is_none());

    let mut u = Unique::new(3u8);
    drop(u.take());
    drop(u);

    let empty: Weak<i32> = Weak::empty();
    assert!(empty.upgrade().is_none());

    assert!(register::is_clear());
}

#[test]
fn empty_unique_conversion_reports_null_allocation() {
    let _guard = exclusive();

    let u: Unique<u8> = Unique::empty();
    assert_eq!(u.into_strong().unwrap_err(), PtrError::NullAllocation);
    assert_eq!(register::current(), ErrorFlags::NULL_ALLOCATION);
    register::clear();
    assert!(register::is_clear());
}
