//! Offload context
//!
//! One `BlockIo` per runtime: the submission queue, the worker pool,
//! the response channel, the response fiber, and the outstanding-call
//! counter. The runtime's root object owns it and installs a
//! thread-local pointer for the duration of a run; the syscall shims in
//! [`crate::calls`] go through that pointer, so there is no process
//! global to initialize or tear down.

use crate::channel::ResponseChannel;
use crate::pool::{self, Shared};
use crate::queue::SubmitQueue;
use crate::response;
use std::cell::Cell;
use std::sync::Arc;
use std::thread::JoinHandle;
use weft_core::{wdebug, winfo, LoomError, LoomResult};
use weft_runtime::{sched, FdState, WeftHandle};

thread_local! {
    static BLOCKIO: Cell<*const BlockIo> = const { Cell::new(std::ptr::null()) };
}

/// The blocking-I/O offload context of one runtime.
pub struct BlockIo {
    pub(crate) shared: Arc<Shared>,
    pub(crate) chan: ResponseChannel,
    /// Readiness record for the channel's read end. Armed by
    /// submitters, disarmed by the response fiber at quiescence.
    pub(crate) fd_state: FdState,
    /// Handle of the response fiber, for the idle-wakeup in the
    /// submission path.
    pub(crate) response: Cell<WeftHandle>,
    /// Outstanding offloaded calls: submitted, not yet resumed.
    /// Loom-thread only - submitters and the response fiber are
    /// serialised by cooperative scheduling, so no lock is needed.
    pub(crate) active: Cell<usize>,
    workers: Vec<JoinHandle<()>>,
}

impl BlockIo {
    /// Build the context: socket pair, `n_workers` OS threads, and the
    /// response fiber.
    ///
    /// Must run on a thread with an entered scheduler; the response
    /// fiber is spawned into it. The returned box must not move after
    /// the response fiber has been handed its address - keep it boxed.
    pub fn init(n_workers: usize) -> Box<BlockIo> {
        let chan = ResponseChannel::pair();
        let shared = Arc::new(Shared {
            queue: SubmitQueue::new(),
            response_send_fd: chan.send_fd,
        });
        let workers = pool::spawn_workers(&shared, n_workers);

        let bio = Box::new(BlockIo {
            fd_state: FdState::new(chan.recv_fd),
            shared,
            chan,
            response: Cell::new(WeftHandle::NONE),
            active: Cell::new(0),
            workers,
        });

        let addr = &*bio as *const BlockIo as usize;
        let handle = sched::spawn("blockio-response", move || response::response_main(addr));
        bio.response.set(handle);

        winfo!("blockio: started, {} workers", n_workers);
        bio
    }

    /// Make this context the offload target for fibers of the calling
    /// thread. Rejects double installation: there is one offload
    /// context per runtime, and runtimes do not nest.
    pub fn install(&self) -> LoomResult<()> {
        BLOCKIO.with(|c| {
            if !c.get().is_null() {
                return Err(LoomError::AlreadyInitialized);
            }
            c.set(self as *const BlockIo);
            Ok(())
        })
    }

    /// Remove the thread-local installation.
    pub fn uninstall(&self) {
        BLOCKIO.with(|c| c.set(std::ptr::null()));
    }

    /// Outstanding offloaded calls. Zero iff no fiber is parked in the
    /// submission path.
    pub fn active_ios(&self) -> usize {
        self.active.get()
    }
}

impl Drop for BlockIo {
    fn drop(&mut self) {
        self.shared.queue.shutdown();
        for h in self.workers.drain(..) {
            let _ = h.join();
        }
        wdebug!("blockio: workers joined");
        // The socket pair closes with `chan`; the response fiber is
        // reclaimed by its scheduler.
    }
}

/// The offload context installed on this thread, if any.
pub(crate) fn current() -> Option<&'static BlockIo> {
    let p = BLOCKIO.with(|c| c.get());
    if p.is_null() {
        None
    } else {
        // Valid while installed: the owner uninstalls before dropping.
        Some(unsafe { &*p })
    }
}
