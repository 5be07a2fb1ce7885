#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    thread::LocalKey,
};

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
    static CLONES: Cell<usize> = const { Cell::new(0) };
    static DEFAULTS: Cell<usize> = const { Cell::new(0) };
    static DROPS: Cell<usize> = const { Cell::new(0) };
    static FAIL_CLONE_AT: Cell<Option<usize>> = const { Cell::new(None) };
    static FAIL_DEFAULT_AT: Cell<Option<usize>> = const { Cell::new(None) };
    static FAIL_DROP_AT: Cell<Option<usize>> = const { Cell::new(None) };
    static DROPPED: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
    static DOUBLE_DROPS: Cell<usize> = const { Cell::new(0) };
}

/// An element that counts its live instances and can be told to panic on the
/// n-th clone, default construction or drop on the current thread.
///
/// Every instance carries a unique id so that dropping the same instance twice
/// is recorded rather than silently miscounted.
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    id: u64,
}

impl Tracked {
    pub fn new(value: i32) -> Self {
        LIVE.with(|live| live.set(live.get() + 1));
        let id = NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Tracked { value, id }
    }

    /// Instances alive on this thread.
    pub fn live() -> isize {
        LIVE.with(Cell::get)
    }

    /// Drops that hit an instance which had already been dropped.
    pub fn double_drops() -> usize {
        DOUBLE_DROPS.with(Cell::get)
    }

    /// Resets every counter and disarms the failure triggers.
    pub fn reset() {
        LIVE.with(|c| c.set(0));
        CLONES.with(|c| c.set(0));
        DEFAULTS.with(|c| c.set(0));
        DROPS.with(|c| c.set(0));
        DROPPED.with(|d| d.borrow_mut().clear());
        DOUBLE_DROPS.with(|c| c.set(0));
        Tracked::disarm();
    }

    /// The `n`-th clone from now (1-based) panics.
    pub fn fail_clone_at(n: usize) {
        CLONES.with(|c| c.set(0));
        FAIL_CLONE_AT.with(|c| c.set(Some(n)));
    }

    /// The `n`-th default construction from now (1-based) panics.
    pub fn fail_default_at(n: usize) {
        DEFAULTS.with(|c| c.set(0));
        FAIL_DEFAULT_AT.with(|c| c.set(Some(n)));
    }

    /// The `n`-th drop from now (1-based) panics, after the instance has been
    /// accounted for as dead.
    pub fn fail_drop_at(n: usize) {
        DROPS.with(|c| c.set(0));
        FAIL_DROP_AT.with(|c| c.set(Some(n)));
    }

    pub fn disarm() {
        FAIL_CLONE_AT.with(|c| c.set(None));
        FAIL_DEFAULT_AT.with(|c| c.set(None));
        FAIL_DROP_AT.with(|c| c.set(None));
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Tracked {}

/// Counts one event and panics if it is the armed one. A trigger fires once.
fn tick(
    counter: &'static LocalKey<Cell<usize>>,
    trigger: &'static LocalKey<Cell<Option<usize>>>,
    what: &str,
) {
    let n = counter.with(|c| {
        c.set(c.get() + 1);
        c.get()
    });
    if trigger.with(Cell::get) == Some(n) {
        trigger.with(|t| t.set(None));
        panic!("{what} #{n} failed");
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        tick(&CLONES, &FAIL_CLONE_AT, "clone");
        Tracked::new(self.value)
    }
}

impl Default for Tracked {
    fn default() -> Self {
        tick(&DEFAULTS, &FAIL_DEFAULT_AT, "default");
        Tracked::new(0)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let first = DROPPED.with(|d| d.borrow_mut().insert(self.id));
        if !first {
            DOUBLE_DROPS.with(|c| c.set(c.get() + 1));
            return;
        }
        LIVE.with(|live| live.set(live.get() - 1));
        tick(&DROPS, &FAIL_DROP_AT, "drop");
    }
}

pub fn values<R>(v: &slotvec::SlotVec<Tracked, R>) -> Vec<i32> {
    v.iter().map(|t| t.value).collect()
}
