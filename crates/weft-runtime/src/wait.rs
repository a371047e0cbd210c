//! Single-shot rendezvous primitive
//!
//! A `Wait` parks one fiber and is fired exactly once from elsewhere on
//! the loom thread. The trigger is level-latched: a `resume` that
//! arrives before the park is remembered, so the parker returns
//! immediately instead of sleeping through its own wakeup. `reset`
//! re-arms a handle for reuse.
//!
//! A `WaitList` chains several handles so one fiber can park until any
//! of them fires.

use crate::sched::WeftHandle;
use std::cell::Cell;
use std::ptr;

/// One single-shot wait handle.
///
/// Loom-thread only; the embedding structure must not move while the
/// handle is chained or parked on.
pub struct Wait {
    triggered: Cell<bool>,
    waiter: Cell<WeftHandle>,
    next: Cell<*const Wait>,
}

impl Wait {
    pub fn new() -> Wait {
        Wait {
            triggered: Cell::new(false),
            waiter: Cell::new(WeftHandle::NONE),
            next: Cell::new(ptr::null()),
        }
    }

    /// Re-arm after a delivered trigger.
    #[inline]
    pub fn reset(&self) {
        self.triggered.set(false);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.triggered.get()
    }

    /// Fire the handle: latch the trigger and, if a fiber is parked on
    /// it, make that fiber runnable. Extra fires are absorbed by the
    /// latch.
    pub fn resume(&self) {
        self.triggered.set(true);
        let h = self.waiter.get();
        if !h.is_none() {
            crate::sched::resume(h);
        }
    }

    /// Park the current fiber until this handle fires.
    pub fn wait(&self) {
        while !self.triggered.get() {
            self.waiter.set(crate::sched::current());
            crate::sched::suspend();
            self.waiter.set(WeftHandle::NONE);
        }
    }
}

impl Default for Wait {
    fn default() -> Self {
        Wait::new()
    }
}

/// Chains wait handles so a fiber can park on all of them at once.
///
/// Handles must outlive the list; in practice both live in the same
/// stack frame of the parking fiber.
pub struct WaitList {
    head: Cell<*const Wait>,
}

impl WaitList {
    pub fn new() -> WaitList {
        WaitList {
            head: Cell::new(ptr::null()),
        }
    }

    /// Add a handle to the list.
    pub fn chain(&self, w: &Wait) {
        w.next.set(self.head.get());
        self.head.set(w as *const Wait);
    }

    /// Park the current fiber until any chained handle has fired.
    pub fn wait(&self) {
        loop {
            if self.any_triggered() {
                return;
            }
            let me = crate::sched::current();
            self.for_each(|w| w.waiter.set(me));
            crate::sched::suspend();
            self.for_each(|w| w.waiter.set(WeftHandle::NONE));
        }
    }

    fn any_triggered(&self) -> bool {
        let mut found = false;
        self.for_each(|w| found |= w.triggered.get());
        found
    }

    fn for_each(&self, mut f: impl FnMut(&Wait)) {
        let mut p = self.head.get();
        while !p.is_null() {
            let w = unsafe { &*p };
            f(w);
            p = w.next.get();
        }
    }
}

impl Default for WaitList {
    fn default() -> Self {
        WaitList::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sched::{self, Scheduler};
    use std::rc::Rc;

    #[test]
    fn latch_without_waiter() {
        let w = Wait::new();
        assert!(!w.is_triggered());
        w.resume();
        assert!(w.is_triggered());
        w.reset();
        assert!(!w.is_triggered());
    }

    #[test]
    fn chain_order() {
        let list = WaitList::new();
        let a = Wait::new();
        let b = Wait::new();
        list.chain(&a);
        list.chain(&b);
        b.resume();
        assert!(list.any_triggered());
    }

    #[test]
    fn park_and_fire_across_fibers() {
        let sched = Scheduler::new(&Config::default()).unwrap();
        sched.enter().unwrap();
        let done = Rc::new(Cell::new(false));
        let done2 = done.clone();
        sched.spawn_inner(
            "root",
            Box::new(move || {
                let wait: Rc<Wait> = Rc::new(Wait::new());
                let w2 = wait.clone();
                sched::spawn("firer", move || {
                    w2.resume();
                });
                wait.wait();
                done2.set(true);
            }),
        );
        sched.run();
        sched.exit();
        assert!(done.get());
    }

    #[test]
    fn pre_park_fire_is_latched() {
        let sched = Scheduler::new(&Config::default()).unwrap();
        sched.enter().unwrap();
        let done = Rc::new(Cell::new(false));
        let done2 = done.clone();
        sched.spawn_inner(
            "root",
            Box::new(move || {
                let wait = Wait::new();
                wait.resume(); // fires before anyone parks
                wait.wait(); // must return immediately
                done2.set(true);
            }),
        );
        sched.run();
        sched.exit();
        assert!(done.get());
    }
}
