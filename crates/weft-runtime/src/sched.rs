//! Cooperative single-threaded scheduler
//!
//! All fibers of one `Scheduler` run on the thread that called
//! [`Scheduler::run`]. Context switches happen only at explicit
//! suspension points (`yield_now`, `suspend`, the wait primitives), so
//! state shared between fibers needs no locking.
//!
//! The run loop alternates between draining the ready queue and
//! blocking in the poller. It returns when both are empty: no fiber is
//! runnable and no fd is armed, meaning nothing can ever become
//! runnable again - quiescence.

use crate::arch::{self, SavedRegs};
use crate::config::Config;
use crate::memory::StackMemory;
use crate::poller::Poller;
use crate::tls;
use crate::weft::Weft;

use weft_core::{werror, LoomResult, WeftId, WeftState};

use std::cell::{Cell, RefCell, UnsafeCell};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

/// A copyable reference to a fiber of the current runtime.
///
/// Valid while the fiber is alive; fibers that never finish (service
/// fibers parked forever) keep their handles valid for the scheduler's
/// lifetime. Not sendable: handles only mean something on the loom
/// thread.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WeftHandle {
    pub(crate) ptr: *mut Weft,
}

impl WeftHandle {
    /// Handle referring to no fiber.
    pub const NONE: WeftHandle = WeftHandle {
        ptr: ptr::null_mut(),
    };

    #[inline]
    pub fn is_none(self) -> bool {
        self.ptr.is_null()
    }

    /// Id of the referenced fiber.
    pub fn id(self) -> WeftId {
        if self.ptr.is_null() {
            WeftId::NONE
        } else {
            unsafe { (*self.ptr).id }
        }
    }
}

/// The cooperative scheduler for one loom thread.
pub struct Scheduler {
    ready: RefCell<VecDeque<*mut Weft>>,
    wefts: RefCell<Vec<*mut Weft>>,
    sched_regs: UnsafeCell<SavedRegs>,
    current: Cell<*mut Weft>,
    pub(crate) poller: Poller,
    next_id: Cell<u32>,
    stack_size: usize,
    running: Cell<bool>,
}

impl Scheduler {
    pub fn new(config: &Config) -> LoomResult<Scheduler> {
        config.validate()?;
        Ok(Scheduler {
            ready: RefCell::new(VecDeque::new()),
            wefts: RefCell::new(Vec::new()),
            sched_regs: UnsafeCell::new(SavedRegs::zeroed()),
            current: Cell::new(ptr::null_mut()),
            poller: Poller::new()?,
            next_id: Cell::new(0),
            stack_size: config.stack_size,
            running: Cell::new(false),
        })
    }

    /// Install this scheduler on the calling thread, making it the loom
    /// thread. Rejects nesting.
    pub fn enter(&self) -> LoomResult<()> {
        tls::enter_loom(self as *const Scheduler)
    }

    /// Remove this scheduler from the calling thread.
    pub fn exit(&self) {
        tls::exit_loom();
    }

    /// Run until quiescence: no ready fiber and no armed fd.
    ///
    /// Fibers still blocked at that point (with nothing armed that
    /// could resume them) stay parked; service fibers rely on this to
    /// survive across consecutive runs.
    pub fn run(&self) {
        assert!(!self.running.replace(true), "scheduler already running");
        loop {
            loop {
                let next = self.ready.borrow_mut().pop_front();
                match next {
                    Some(w) => self.run_weft(w),
                    None => break,
                }
            }
            if self.poller.armed() == 0 {
                break;
            }
            self.poller.wait_and_dispatch();
        }
        self.running.set(false);
    }

    pub(crate) fn spawn_inner(&self, name: &str, entry: Box<dyn FnOnce()>) -> WeftHandle {
        let stack = StackMemory::alloc(self.stack_size).expect("weft stack allocation failed");
        let id = WeftId::new(self.next_id.replace(self.next_id.get() + 1));
        let w = Box::into_raw(Box::new(Weft::new(id, name, stack, entry)));
        unsafe {
            arch::init_context(
                (*w).regs.get(),
                (*w).stack.top(),
                weft_entry as usize,
                w as usize,
            );
            (*w).state.set(WeftState::Ready);
        }
        self.wefts.borrow_mut().push(w);
        self.ready.borrow_mut().push_back(w);
        WeftHandle { ptr: w }
    }

    fn run_weft(&self, w: *mut Weft) {
        unsafe {
            (*w).state.set(WeftState::Running);
            self.current.set(w);
            arch::switch(self.sched_regs.get(), (*w).regs.get());
            self.current.set(ptr::null_mut());
            if (*w).state.get() == WeftState::Finished {
                self.release(w);
            }
        }
    }

    fn release(&self, w: *mut Weft) {
        self.wefts.borrow_mut().retain(|&p| p != w);
        drop(unsafe { Box::from_raw(w) });
    }

    #[inline]
    pub(crate) fn current_ptr(&self) -> *mut Weft {
        self.current.get()
    }

    pub(crate) fn make_ready(&self, w: *mut Weft) {
        unsafe {
            if (*w).state.get() == WeftState::Blocked {
                (*w).state.set(WeftState::Ready);
                self.ready.borrow_mut().push_back(w);
            }
        }
    }

    /// Switch from the current fiber back to the scheduler loop.
    ///
    /// The caller must have set the fiber's state first; that state
    /// decides what the loop does with it.
    pub(crate) fn switch_to_sched(&self, w: *mut Weft) {
        unsafe {
            arch::switch((*w).regs.get(), self.sched_regs.get());
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Fibers still parked at teardown are reclaimed without being
        // resumed; their stacks and entry closures go with them.
        for &w in self.wefts.borrow().iter() {
            drop(unsafe { Box::from_raw(w) });
        }
        self.wefts.borrow_mut().clear();
    }
}

/// Entry shim executed as the first frame of every fiber.
extern "C" fn weft_entry(w: usize) {
    let w = w as *mut Weft;
    let entry = unsafe { (*w).entry.take() };
    if let Some(f) = entry {
        if catch_unwind(AssertUnwindSafe(f)).is_err() {
            werror!("weft {} panicked; fiber terminated", unsafe { &(*w).name });
        }
    }
}

/// Called by the arch trampoline when a fiber's entry returns. Marks
/// the fiber finished and switches back to the scheduler loop, which
/// releases it. Never returns into the fiber.
pub(crate) extern "C" fn weft_finished() {
    let s = tls::scheduler();
    let w = s.current_ptr();
    assert!(!w.is_null(), "fiber epilogue outside a fiber");
    unsafe {
        (*w).state.set(WeftState::Finished);
    }
    s.switch_to_sched(w);
    unreachable!("finished fiber was resumed");
}

/// Spawn a fiber on the running scheduler of this thread.
///
/// The fiber starts in the ready queue and first runs when the
/// scheduler next drains it.
pub fn spawn<F>(name: &str, f: F) -> WeftHandle
where
    F: FnOnce() + 'static,
{
    tls::scheduler().spawn_inner(name, Box::new(f))
}

/// Reschedule the current fiber behind the rest of the ready queue.
/// No-op when called outside a fiber.
pub fn yield_now() {
    let s = tls::scheduler();
    let w = s.current_ptr();
    if w.is_null() {
        return;
    }
    unsafe {
        (*w).state.set(WeftState::Ready);
    }
    s.ready.borrow_mut().push_back(w);
    s.switch_to_sched(w);
}

/// Park the current fiber until an explicit [`resume`].
pub fn suspend() {
    let s = tls::scheduler();
    let w = s.current_ptr();
    assert!(!w.is_null(), "suspend outside a fiber");
    unsafe {
        (*w).state.set(WeftState::Blocked);
    }
    s.switch_to_sched(w);
}

/// Make a parked fiber runnable. Ignored unless the fiber is blocked.
pub fn resume(h: WeftHandle) {
    if h.is_none() {
        return;
    }
    tls::scheduler().make_ready(h.ptr);
}

/// Handle of the currently running fiber.
pub fn current() -> WeftHandle {
    WeftHandle {
        ptr: tls::scheduler().current_ptr(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn with_sched<F: FnOnce() + 'static>(f: F) {
        let sched = Scheduler::new(&Config::default()).unwrap();
        sched.enter().unwrap();
        sched.spawn_inner("test-root", Box::new(f));
        sched.run();
        sched.exit();
    }

    #[test]
    fn spawn_runs_to_completion() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        with_sched(move || {
            h.set(h.get() + 1);
        });
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn yield_interleaves() {
        let log: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());
        with_sched(move || {
            let b2 = b.clone();
            spawn("b", move || {
                b2.borrow_mut().push(10);
                yield_now();
                b2.borrow_mut().push(11);
            });
            a.borrow_mut().push(0);
            yield_now();
            a.borrow_mut().push(1);
        });
        assert_eq!(*log.borrow(), vec![0, 10, 1, 11]);
    }

    #[test]
    fn suspend_until_resumed() {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let outer = log.clone();
        with_sched(move || {
            let inner = outer.clone();
            let h = spawn("sleeper", move || {
                inner.borrow_mut().push("parked");
                suspend();
                inner.borrow_mut().push("woken");
            });
            yield_now(); // let the sleeper park
            outer.borrow_mut().push("resuming");
            resume(h);
        });
        assert_eq!(*log.borrow(), vec!["parked", "resuming", "woken"]);
    }

    #[test]
    fn nested_enter_rejected() {
        let sched = Scheduler::new(&Config::default()).unwrap();
        sched.enter().unwrap();
        let other = Scheduler::new(&Config::default()).unwrap();
        assert!(other.enter().is_err());
        sched.exit();
    }
}
