//! Worker pool
//!
//! Fixed set of OS threads that execute the offloaded syscalls. Each
//! worker blocks all signals (signal delivery belongs to the loom
//! thread), then loops: pop a record, run it, post the completion.
//! Workers never touch fiber state; resuming the submitter is the
//! response fiber's job.

use crate::channel;
use crate::queue::SubmitQueue;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use weft_runtime::signal;

/// State shared between submitters and workers.
pub(crate) struct Shared {
    pub(crate) queue: SubmitQueue,
    pub(crate) response_send_fd: RawFd,
}

pub(crate) fn spawn_workers(shared: &Arc<Shared>, n: usize) -> Vec<JoinHandle<()>> {
    (0..n)
        .map(|i| {
            let shared = shared.clone();
            thread::Builder::new()
                .name(format!("weft-io-{}", i))
                .spawn(move || worker_main(shared))
                .expect("failed to spawn io worker")
        })
        .collect()
}

fn worker_main(shared: Arc<Shared>) {
    signal::block_all_signals();
    loop {
        let Some(act) = shared.queue.pop_blocking() else {
            // Queue shut down and drained.
            break;
        };
        // Exclusive access: the queue handed the record to exactly this
        // worker, and the submitter is parked until the completion is
        // delivered.
        unsafe {
            crate::action::perform(&mut *act);
        }
        channel::post(shared.response_send_fd, act);
    }
}
