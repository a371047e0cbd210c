//! Action records
//!
//! One `Action` per outstanding offloaded call, stack-allocated in the
//! submitting fiber and borrowed (never owned) by the queue, one
//! worker, and the response fiber. The submitter stays parked on its
//! wait handle for the whole round trip, so every pointer captured
//! here - buffers, paths, the record itself - stays valid without
//! copies or allocation.
//!
//! `SysOp` is deliberately a closed set: the worker-side `perform` is a
//! single allocation-free match, and adding a syscall is one new
//! variant plus one wrapper in `calls`.

use libc::{c_char, c_int, c_ulong, c_void, mode_t, off_t, socklen_t};
use std::ptr;
use weft_runtime::Wait;

/// Inputs of one offloaded syscall, captured by value.
pub(crate) enum SysOp {
    Open {
        path: *const c_char,
        flags: c_int,
        mode: mode_t,
    },
    Close {
        fd: c_int,
    },
    Read {
        fd: c_int,
        buf: *mut c_void,
        count: usize,
    },
    Write {
        fd: c_int,
        buf: *const c_void,
        count: usize,
    },
    Pread {
        fd: c_int,
        buf: *mut c_void,
        count: usize,
        offset: off_t,
    },
    Pwrite {
        fd: c_int,
        buf: *const c_void,
        count: usize,
        offset: off_t,
    },
    Readv {
        fd: c_int,
        iov: *const libc::iovec,
        iovcnt: c_int,
    },
    Writev {
        fd: c_int,
        iov: *const libc::iovec,
        iovcnt: c_int,
    },
    Fsync {
        fd: c_int,
    },
    Fdatasync {
        fd: c_int,
    },
    Ftruncate {
        fd: c_int,
        length: off_t,
    },
    Fallocate {
        fd: c_int,
        mode: c_int,
        offset: off_t,
        len: off_t,
    },
    Stat {
        path: *const c_char,
        buf: *mut libc::stat,
    },
    Fstat {
        fd: c_int,
        buf: *mut libc::stat,
    },
    Lstat {
        path: *const c_char,
        buf: *mut libc::stat,
    },
    Statfs {
        path: *const c_char,
        buf: *mut libc::statfs,
    },
    Fstatfs {
        fd: c_int,
        buf: *mut libc::statfs,
    },
    Unlink {
        path: *const c_char,
    },
    Mkdir {
        path: *const c_char,
        mode: mode_t,
    },
    Rmdir {
        path: *const c_char,
    },
    Rename {
        old: *const c_char,
        new: *const c_char,
    },
    Dup {
        fd: c_int,
    },
    Ioctl {
        fd: c_int,
        request: c_ulong,
        argp: *mut c_void,
    },
    FcntlGetfl {
        fd: c_int,
    },
    FcntlSetfl {
        fd: c_int,
        flags: c_int,
    },
    Pipe2 {
        fds: *mut c_int,
        flags: c_int,
    },
    Socket {
        domain: c_int,
        ty: c_int,
        protocol: c_int,
    },
    Connect {
        fd: c_int,
        addr: *const libc::sockaddr,
        addrlen: socklen_t,
    },
    Accept4 {
        fd: c_int,
        addr: *mut libc::sockaddr,
        addrlen: *mut socklen_t,
        flags: c_int,
    },
    Send {
        fd: c_int,
        buf: *const c_void,
        len: usize,
        flags: c_int,
    },
    Recv {
        fd: c_int,
        buf: *mut c_void,
        len: usize,
        flags: c_int,
    },
    GetAddrInfo {
        node: *const c_char,
        service: *const c_char,
        hints: *const libc::addrinfo,
        out: *mut *mut libc::addrinfo,
    },
}

/// One outstanding offloaded call.
pub(crate) struct Action {
    /// Submission-queue link, touched only under the queue mutex.
    pub(crate) next: *mut Action,
    /// The submitter's wait handle; fired by the response fiber on the
    /// loom thread, never dereferenced by workers.
    pub(crate) wait: *const Wait,
    pub(crate) op: SysOp,
    /// Return value, written by the worker before response delivery.
    pub(crate) res: isize,
    /// `errno` as observed on the worker right after the call.
    pub(crate) err: i32,
}

impl Action {
    pub(crate) fn new(op: SysOp) -> Action {
        Action {
            next: ptr::null_mut(),
            wait: ptr::null(),
            op,
            res: 0,
            err: 0,
        }
    }

    /// Fire the submitter's wait handle. Loom thread only.
    pub(crate) unsafe fn complete(&self) {
        (*self.wait).resume();
    }
}

#[inline]
pub(crate) fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

#[inline]
pub(crate) fn set_errno(e: i32) {
    unsafe {
        *libc::__errno_location() = e;
    }
}

/// Execute the recorded syscall and capture its result. Runs on a
/// worker thread; the only fields it touches are `op` (read) and
/// `res`/`err` (write).
pub(crate) fn perform(act: &mut Action) {
    let res = unsafe {
        match act.op {
            SysOp::Open { path, flags, mode } => {
                libc::open(path, flags, mode as libc::c_uint) as isize
            }
            SysOp::Close { fd } => libc::close(fd) as isize,
            SysOp::Read { fd, buf, count } => libc::read(fd, buf, count),
            SysOp::Write { fd, buf, count } => libc::write(fd, buf, count),
            SysOp::Pread {
                fd,
                buf,
                count,
                offset,
            } => libc::pread(fd, buf, count, offset),
            SysOp::Pwrite {
                fd,
                buf,
                count,
                offset,
            } => libc::pwrite(fd, buf, count, offset),
            SysOp::Readv { fd, iov, iovcnt } => libc::readv(fd, iov, iovcnt),
            SysOp::Writev { fd, iov, iovcnt } => libc::writev(fd, iov, iovcnt),
            SysOp::Fsync { fd } => libc::fsync(fd) as isize,
            SysOp::Fdatasync { fd } => libc::fdatasync(fd) as isize,
            SysOp::Ftruncate { fd, length } => libc::ftruncate(fd, length) as isize,
            SysOp::Fallocate {
                fd,
                mode,
                offset,
                len,
            } => libc::fallocate(fd, mode, offset, len) as isize,
            SysOp::Stat { path, buf } => libc::stat(path, buf) as isize,
            SysOp::Fstat { fd, buf } => libc::fstat(fd, buf) as isize,
            SysOp::Lstat { path, buf } => libc::lstat(path, buf) as isize,
            SysOp::Statfs { path, buf } => libc::statfs(path, buf) as isize,
            SysOp::Fstatfs { fd, buf } => libc::fstatfs(fd, buf) as isize,
            SysOp::Unlink { path } => libc::unlink(path) as isize,
            SysOp::Mkdir { path, mode } => libc::mkdir(path, mode) as isize,
            SysOp::Rmdir { path } => libc::rmdir(path) as isize,
            SysOp::Rename { old, new } => libc::rename(old, new) as isize,
            SysOp::Dup { fd } => libc::dup(fd) as isize,
            SysOp::Ioctl { fd, request, argp } => libc::ioctl(fd, request, argp) as isize,
            SysOp::FcntlGetfl { fd } => libc::fcntl(fd, libc::F_GETFL) as isize,
            SysOp::FcntlSetfl { fd, flags } => {
                libc::fcntl(fd, libc::F_SETFL, flags) as isize
            }
            SysOp::Pipe2 { fds, flags } => libc::pipe2(fds, flags) as isize,
            SysOp::Socket {
                domain,
                ty,
                protocol,
            } => libc::socket(domain, ty, protocol) as isize,
            SysOp::Connect { fd, addr, addrlen } => {
                libc::connect(fd, addr, addrlen) as isize
            }
            SysOp::Accept4 {
                fd,
                addr,
                addrlen,
                flags,
            } => libc::accept4(fd, addr, addrlen, flags) as isize,
            SysOp::Send {
                fd,
                buf,
                len,
                flags,
            } => libc::send(fd, buf, len, flags),
            SysOp::Recv {
                fd,
                buf,
                len,
                flags,
            } => libc::recv(fd, buf, len, flags),
            SysOp::GetAddrInfo {
                node,
                service,
                hints,
                out,
            } => libc::getaddrinfo(node, service, hints, out) as isize,
        }
    };
    act.res = res;
    act.err = errno();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perform_records_error() {
        let mut act = Action::new(SysOp::Close { fd: -1 });
        perform(&mut act);
        assert_eq!(act.res, -1);
        assert_eq!(act.err, libc::EBADF);
    }

    #[test]
    fn perform_records_success() {
        let mut fds = [0 as c_int; 2];
        let mut act = Action::new(SysOp::Pipe2 {
            fds: fds.as_mut_ptr(),
            flags: 0,
        });
        perform(&mut act);
        assert_eq!(act.res, 0);
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
    }
}
