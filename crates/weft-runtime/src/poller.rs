//! Fd readiness via epoll
//!
//! Each descriptor the runtime watches is described by an `FdState`
//! owned by the interested party. Arming registers the state's address
//! as the epoll cookie; when readiness is reported, the embedded wait
//! handle fires and the parked fiber becomes runnable.
//!
//! The armed count doubles as the scheduler's liveness signal: with
//! nothing armed and nothing ready, the runtime is quiescent.

use crate::wait::Wait;
use std::cell::Cell;
use std::mem;
use std::os::unix::io::RawFd;
use weft_core::{werror, LoomError, LoomResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FdMode {
    None,
    Read,
}

/// Readiness record for one descriptor.
///
/// Must stay at a fixed address from first arm to final disarm: the
/// poller hands its address to the kernel as the event cookie.
pub struct FdState {
    fd: RawFd,
    mode: Cell<FdMode>,
    pub wait: Wait,
}

impl FdState {
    pub fn new(fd: RawFd) -> FdState {
        FdState {
            fd,
            mode: Cell::new(FdMode::None),
            wait: Wait::new(),
        }
    }

    #[inline]
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Watch for read readiness. Idempotent.
    pub fn mode_read(&self) {
        if self.mode.get() == FdMode::Read {
            return;
        }
        crate::tls::scheduler().poller.arm_read(self);
        self.mode.set(FdMode::Read);
    }

    /// Stop watching entirely. Idempotent.
    pub fn mode_none(&self) {
        if self.mode.get() == FdMode::None {
            return;
        }
        crate::tls::scheduler().poller.disarm(self);
        self.mode.set(FdMode::None);
    }

    /// Park the current fiber until the armed readiness fires.
    pub fn fd_wait(&self) {
        self.wait.wait();
    }
}

/// The epoll instance of one scheduler.
pub(crate) struct Poller {
    epfd: RawFd,
    armed: Cell<usize>,
}

impl Poller {
    pub(crate) fn new() -> LoomResult<Poller> {
        let epfd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epfd < 0 {
            return Err(LoomError::Os(errno()));
        }
        Ok(Poller {
            epfd,
            armed: Cell::new(0),
        })
    }

    #[inline]
    pub(crate) fn armed(&self) -> usize {
        self.armed.get()
    }

    pub(crate) fn arm_read(&self, st: &FdState) {
        let mut ev = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: st as *const FdState as usize as u64,
        };
        let ret = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_ADD, st.fd, &mut ev) };
        if ret < 0 {
            werror!("poller: arming fd {} failed, errno {}", st.fd, errno());
            return;
        }
        self.armed.set(self.armed.get() + 1);
    }

    pub(crate) fn disarm(&self, st: &FdState) {
        let ret = unsafe {
            libc::epoll_ctl(
                self.epfd,
                libc::EPOLL_CTL_DEL,
                st.fd,
                std::ptr::null_mut(),
            )
        };
        if ret < 0 {
            werror!("poller: disarming fd {} failed, errno {}", st.fd, errno());
            return;
        }
        self.armed.set(self.armed.get() - 1);
    }

    /// Block until at least one armed descriptor is ready, then fire
    /// the wait handle of every reported one.
    pub(crate) fn wait_and_dispatch(&self) {
        const MAX_EVENTS: usize = 16;
        let mut events: [libc::epoll_event; MAX_EVENTS] = unsafe { mem::zeroed() };
        loop {
            let n = unsafe {
                libc::epoll_wait(self.epfd, events.as_mut_ptr(), MAX_EVENTS as i32, -1)
            };
            if n < 0 {
                if errno() == libc::EINTR {
                    continue;
                }
                werror!("poller: epoll_wait failed, errno {}", errno());
                std::process::abort();
            }
            for ev in &events[..n as usize] {
                let st = ev.u64 as usize as *const FdState;
                unsafe { (*st).wait.resume() };
            }
            return;
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epfd);
        }
    }
}

#[inline]
pub(crate) fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sched::{self, Scheduler};
    use std::rc::Rc;

    fn pipe_nonblock_read() -> (RawFd, RawFd) {
        let mut fds = [0 as RawFd; 2];
        let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK) };
        assert_eq!(ret, 0);
        (fds[0], fds[1])
    }

    #[test]
    fn readiness_wakes_parked_fiber() {
        let (rfd, wfd) = pipe_nonblock_read();
        let sched = Scheduler::new(&Config::default()).unwrap();
        sched.enter().unwrap();
        let got = Rc::new(Cell::new(0u8));
        let got2 = got.clone();
        sched.spawn_inner(
            "reader",
            Box::new(move || {
                let st = FdState::new(rfd);
                st.mode_read();
                // Writer runs only after we park: readiness arrives while
                // we are waiting, not before.
                sched::spawn("writer", move || {
                    let b = [0x5Au8];
                    unsafe { libc::write(wfd, b.as_ptr().cast(), 1) };
                });
                st.fd_wait();
                let mut b = [0u8];
                let n = unsafe { libc::read(rfd, b.as_mut_ptr().cast(), 1) };
                assert_eq!(n, 1);
                got2.set(b[0]);
                st.mode_none();
            }),
        );
        sched.run();
        sched.exit();
        assert_eq!(got.get(), 0x5A);
        unsafe {
            libc::close(rfd);
            libc::close(wfd);
        }
    }

    #[test]
    fn quiescent_with_nothing_armed() {
        let sched = Scheduler::new(&Config::default()).unwrap();
        assert_eq!(sched.poller.armed(), 0);
        sched.enter().unwrap();
        sched.run(); // returns immediately: nothing ready, nothing armed
        sched.exit();
    }
}
