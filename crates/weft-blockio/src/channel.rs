//! Response channel
//!
//! A connected AF_UNIX/SOCK_STREAM pair. Workers report a completed
//! record by writing its address - one pointer-sized write per
//! completion, well under `PIPE_BUF`, so concurrent workers never
//! interleave partial pointers. The response fiber owns the read end,
//! set non-blocking, and drains several pointers per read.

use crate::action::{errno, Action};
use std::mem;
use std::os::unix::io::RawFd;
use weft_core::werror;

/// Pointers the response fiber accepts per read.
pub(crate) const MAX_RESPONSES: usize = 32;

pub(crate) struct ResponseChannel {
    pub(crate) send_fd: RawFd,
    pub(crate) recv_fd: RawFd,
}

impl ResponseChannel {
    /// Create the socket pair. The channel is the only path completions
    /// can take, so failure to create it leaves nothing to run on.
    pub(crate) fn pair() -> ResponseChannel {
        let mut fds = [0 as RawFd; 2];
        let ret = unsafe {
            libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr())
        };
        if ret < 0 {
            werror!("blockio: socketpair failed, errno {}", errno());
            std::process::abort();
        }
        ResponseChannel {
            send_fd: fds[0],
            recv_fd: fds[1],
        }
    }
}

impl Drop for ResponseChannel {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.send_fd);
            libc::close(self.recv_fd);
        }
    }
}

/// Report a completed record back to the response fiber. Worker side.
///
/// A short or failed write is a lost wakeup and therefore a bug; it is
/// logged loudly rather than papered over with a retry that could
/// interleave with other workers' pointers.
pub(crate) fn post(send_fd: RawFd, act: *mut Action) {
    let ptr = act as usize;
    let want = mem::size_of::<usize>();
    let ret = unsafe {
        libc::write(
            send_fd,
            &ptr as *const usize as *const libc::c_void,
            want,
        )
    };
    if ret != want as isize {
        werror!(
            "blockio: posting completion failed, ret={} errno={}",
            ret,
            errno()
        );
    }
}

/// Switch a descriptor to non-blocking mode. Best effort, mirrors the
/// reader's requirement only.
pub(crate) fn set_nonblock(fd: RawFd) {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return;
        }
        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SysOp;

    #[test]
    fn roundtrip_pointers() {
        let chan = ResponseChannel::pair();
        let mut a = Box::new(Action::new(SysOp::Close { fd: 1 }));
        let mut b = Box::new(Action::new(SysOp::Close { fd: 2 }));
        post(chan.send_fd, &mut *a);
        post(chan.send_fd, &mut *b);

        let mut batch = [0usize; MAX_RESPONSES];
        let ret = unsafe {
            libc::read(
                chan.recv_fd,
                batch.as_mut_ptr() as *mut libc::c_void,
                mem::size_of_val(&batch),
            )
        };
        assert_eq!(ret as usize, 2 * mem::size_of::<usize>());
        assert_eq!(batch[0], &mut *a as *mut Action as usize);
        assert_eq!(batch[1], &mut *b as *mut Action as usize);
    }

    #[test]
    fn nonblocking_read_reports_eagain() {
        let chan = ResponseChannel::pair();
        set_nonblock(chan.recv_fd);
        let mut batch = [0usize; MAX_RESPONSES];
        let ret = unsafe {
            libc::read(
                chan.recv_fd,
                batch.as_mut_ptr() as *mut libc::c_void,
                mem::size_of_val(&batch),
            )
        };
        assert_eq!(ret, -1);
        let e = errno();
        assert!(e == libc::EAGAIN || e == libc::EWOULDBLOCK);
    }
}
