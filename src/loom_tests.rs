#![cfg(all(test, feature = "loom"))]

use crate::handle::{AtomicStrong, AtomicWeak};
use crate::sync::{thread, AtomicUsize, Ordering};
use loom::sync::Arc;

struct Tracked(Arc<AtomicUsize>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn promote_vs_last_strong_drop() {
    loom::model(|| {
        let drops = Arc::new(AtomicUsize::new(0));
        let strong = AtomicStrong::new(Tracked(drops.clone())).unwrap();
        let weak: AtomicWeak<Tracked> = AtomicStrong::downgrade(&strong);

        let dropper = thread::spawn(move || drop(strong));
        let promoter = thread::spawn(move || {
            if let Some(promoted) = weak.upgrade() {
                // Destructor cannot have run while a promoted handle exists.
                assert_eq!(promoted.0.load(Ordering::SeqCst), 0);
            }
        });

        dropper.join().unwrap();
        promoter.join().unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn concurrent_clone_and_drop() {
    loom::model(|| {
        let drops = Arc::new(AtomicUsize::new(0));
        let a = AtomicStrong::new(Tracked(drops.clone())).unwrap();
        let b = a.clone();

        let t1 = thread::spawn(move || {
            let c = a.clone();
            drop(a);
            drop(c);
        });
        let t2 = thread::spawn(move || drop(b));

        t1.join().unwrap();
        t2.join().unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn last_strong_and_last_weak_race() {
    loom::model(|| {
        let drops = Arc::new(AtomicUsize::new(0));
        let strong = AtomicStrong::new(Tracked(drops.clone())).unwrap();
        let weak = AtomicStrong::downgrade(&strong);

        let t1 = thread::spawn(move || drop(strong));
        let t2 = thread::spawn(move || drop(weak));

        t1.join().unwrap();
        t2.join().unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn get_mut_vs_promote_then_weak_drop() {
    loom::model(|| {
        let mut strong = AtomicStrong::new(0usize).unwrap();
        let weak = AtomicStrong::downgrade(&strong);

        let promoter = thread::spawn(move || {
            let promoted = weak.upgrade();
            drop(weak);
            promoted
        });

        let exclusive = AtomicStrong::get_mut(&mut strong).is_some();
        let promoted = promoter.join().unwrap();
        assert!(
            !(exclusive && promoted.is_some()),
            "mutable access granted while another strong handle existed"
        );
    });
}

#[test]
fn downgrade_waits_out_uniqueness_check() {
    loom::model(|| {
        let mut strong = AtomicStrong::new(0usize).unwrap();
        let other = strong.clone();

        let downgrader = thread::spawn(move || {
            let weak = AtomicStrong::downgrade(&other);
            drop(other);
            weak
        });

        if let Some(value) = AtomicStrong::get_mut(&mut strong) {
            *value += 1;
        }
        let weak = downgrader.join().unwrap();
        assert_eq!(AtomicStrong::weak_count(&strong), 1);
        assert_eq!(weak.strong_count(), 1);
    });
}
