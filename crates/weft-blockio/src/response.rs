//! Response fiber
//!
//! Drains completed-action pointers from the channel and resumes the
//! waiting submitters. The fiber has three regimes:
//!
//! - draining: pointers are flowing, keep reading;
//! - fd-parked: nothing buffered but calls are outstanding - park on
//!   read readiness of the channel;
//! - fully suspended: nothing outstanding at all - disarm the fd and
//!   suspend, so the poller sees an empty set and the runtime can go
//!   quiescent. The next submitter resumes the fiber explicitly.
//!
//! The distinction matters: staying armed while idle would keep the
//! scheduler loop alive forever, and an embedded runtime could never
//! detect that it is done.

use crate::action::{errno, Action};
use crate::channel::{set_nonblock, MAX_RESPONSES};
use crate::context::BlockIo;
use std::mem;
use weft_core::werror;
use weft_runtime::sched;

pub(crate) fn response_main(bio_addr: usize) {
    // The context outlives this fiber: the runtime drops the scheduler
    // (and with it this fiber) only after the offload context.
    let bio = unsafe { &*(bio_addr as *const BlockIo) };

    set_nonblock(bio.chan.recv_fd);

    loop {
        let mut batch = [0usize; MAX_RESPONSES];
        let ret = unsafe {
            libc::read(
                bio.chan.recv_fd,
                batch.as_mut_ptr() as *mut libc::c_void,
                mem::size_of_val(&batch),
            )
        };
        let mut go_to_sleep = false;

        if ret > 0 {
            let n = ret as usize / mem::size_of::<usize>();
            for &p in &batch[..n] {
                let act = p as *const Action;
                // Resume the submitter and retire the call. The counter
                // must drop before this iteration can possibly sleep,
                // so the idle check below sees the post-batch value.
                unsafe { (*act).complete() };
                bio.active.set(bio.active.get() - 1);
            }
            if n < MAX_RESPONSES {
                // A short batch means the buffer is likely empty.
                go_to_sleep = true;
            }
        } else if ret < 0 {
            let e = errno();
            if e == libc::EAGAIN || e == libc::EWOULDBLOCK {
                go_to_sleep = true;
            } else {
                werror!("blockio: response channel read failed, errno {}", e);
                std::process::abort();
            }
        } else {
            // All write ends live in this process; EOF cannot happen
            // while the context exists.
            werror!("blockio: unexpected EOF on response channel");
            std::process::abort();
        }

        if go_to_sleep {
            if bio.active.get() == 0 {
                // Nothing outstanding: leave the poller's set entirely
                // so the runtime can idle out. The next submitter
                // resumes us explicitly.
                bio.fd_state.mode_none();
                sched::suspend();
            }
            // The submitter re-arms read mode; wait for the channel.
            bio.fd_state.wait.reset();
            bio.fd_state.fd_wait();
        }
    }
}
