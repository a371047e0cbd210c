//! Submission path
//!
//! Runs in the submitting fiber. Lock contention is rare (workers hold
//! the queue mutex only to detach a head), so the enqueue itself is
//! effectively non-blocking; the only real wait is the park at the end.

use crate::action::Action;
use crate::context;
use weft_runtime::{sched, Wait, WaitList};

/// Hand a record to the worker pool and park until its completion has
/// been delivered. On return the record's `res`/`err` are final.
pub(crate) fn submit(act: &mut Action) {
    let bio = context::current().expect("blocking offload not installed on this thread");

    let wait_list = WaitList::new();
    let wait = Wait::new();
    wait_list.chain(&wait);
    act.wait = &wait as *const Wait;

    bio.shared.queue.push(act as *mut Action);

    // A zero counter means the response fiber parked itself fully
    // detached; nothing but this resume will ever wake it. Resuming
    // before the increment keeps the counter a truthful idle
    // predicate: a racing idle check at worst re-runs and re-parks.
    if bio.active.get() == 0 {
        sched::resume(bio.response.get());
    }
    bio.active.set(bio.active.get() + 1);

    // Arm read mode on the channel so the response fiber's next park
    // lands on an fd the poller is actually watching.
    bio.fd_state.mode_read();

    wait_list.wait();
}
