//! Thread-local runtime context
//!
//! One cell marks the loom thread (the OS thread running the fibers of
//! the current scheduler), one carries the scheduler pointer while that
//! scheduler is running. Worker threads set neither, which is how the
//! syscall shims tell offload from direct execution.

use crate::sched::Scheduler;
use std::cell::Cell;

thread_local! {
    static IS_LOOM_THREAD: Cell<bool> = const { Cell::new(false) };
    static SCHEDULER: Cell<*const Scheduler> = const { Cell::new(std::ptr::null()) };
}

/// True on the thread whose fibers are currently being scheduled.
#[inline]
pub fn is_loom_thread() -> bool {
    IS_LOOM_THREAD.with(|c| c.get())
}

/// Install the running scheduler on this thread. Fails if one is
/// already installed (nested runtimes are rejected, not stacked).
pub(crate) fn enter_loom(sched: *const Scheduler) -> Result<(), weft_core::LoomError> {
    if !SCHEDULER.with(|c| c.get()).is_null() {
        return Err(weft_core::LoomError::AlreadyInitialized);
    }
    SCHEDULER.with(|c| c.set(sched));
    IS_LOOM_THREAD.with(|c| c.set(true));
    Ok(())
}

/// Clear the scheduler installed by `enter_loom`.
pub(crate) fn exit_loom() {
    SCHEDULER.with(|c| c.set(std::ptr::null()));
    IS_LOOM_THREAD.with(|c| c.set(false));
}

#[inline]
pub(crate) fn scheduler_ptr() -> *const Scheduler {
    SCHEDULER.with(|c| c.get())
}

/// The scheduler running on this thread.
///
/// # Panics
///
/// Panics when called off the loom thread; every caller is a primitive
/// that is only meaningful inside a running runtime.
#[inline]
pub(crate) fn scheduler() -> &'static Scheduler {
    let p = scheduler_ptr();
    assert!(!p.is_null(), "no weft runtime is running on this thread");
    // Valid for the duration of the call: the scheduler outlives every
    // fiber it runs, and the pointer is cleared before it is dropped.
    unsafe { &*p }
}
