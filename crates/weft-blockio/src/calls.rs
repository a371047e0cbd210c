//! Blocking syscall wrappers for fibers
//!
//! Each function behaves bit-identically to the syscall it wraps: same
//! return value, same `errno` on the calling thread. Called from a
//! fiber with an installed offload context, it parks only that fiber
//! while a worker runs the call; called anywhere else (a worker thread,
//! a plain thread, a loom thread without offload), it executes the
//! syscall directly. Workers hit that second path, which is what keeps
//! them from recursing into the offload machinery.
//!
//! Wrappers are pure marshalling. No retries, no partial-read loops,
//! no interpretation of results - a short read here is a short read for
//! the caller too.
//!
//! The variadic POSIX entries are split into fixed shapes: `open` /
//! [`open_mode`], and `fcntl` as [`fcntl_getfl`] / [`fcntl_setfl`].

use crate::action::{set_errno, Action, SysOp};
use crate::context;
use crate::submit::submit;
use libc::{c_int, c_ulong, c_void, mode_t, off_t, socklen_t};
use std::ffi::CStr;
use std::ptr;

#[inline]
fn offloaded() -> bool {
    weft_runtime::tls::is_loom_thread() && context::current().is_some()
}

#[inline]
fn run(mut act: Action) -> isize {
    submit(&mut act);
    set_errno(act.err);
    act.res
}

/// Open without a mode (`O_CREAT`/`O_TMPFILE` callers want [`open_mode`]).
pub fn open(path: &CStr, flags: c_int) -> c_int {
    open_mode(path, flags, 0)
}

/// Open with an explicit create mode.
pub fn open_mode(path: &CStr, flags: c_int, mode: mode_t) -> c_int {
    if !offloaded() {
        return unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) };
    }
    run(Action::new(SysOp::Open {
        path: path.as_ptr(),
        flags,
        mode,
    })) as c_int
}

pub fn close(fd: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::close(fd) };
    }
    run(Action::new(SysOp::Close { fd })) as c_int
}

/// Read into `buf`. Short reads are returned as-is.
pub fn read(fd: c_int, buf: &mut [u8]) -> isize {
    if !offloaded() {
        return unsafe { libc::read(fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
    }
    run(Action::new(SysOp::Read {
        fd,
        buf: buf.as_mut_ptr() as *mut c_void,
        count: buf.len(),
    }))
}

/// Write from `buf`. Short writes are returned as-is.
pub fn write(fd: c_int, buf: &[u8]) -> isize {
    if !offloaded() {
        return unsafe { libc::write(fd, buf.as_ptr() as *const c_void, buf.len()) };
    }
    run(Action::new(SysOp::Write {
        fd,
        buf: buf.as_ptr() as *const c_void,
        count: buf.len(),
    }))
}

pub fn pread(fd: c_int, buf: &mut [u8], offset: off_t) -> isize {
    if !offloaded() {
        return unsafe {
            libc::pread(fd, buf.as_mut_ptr() as *mut c_void, buf.len(), offset)
        };
    }
    run(Action::new(SysOp::Pread {
        fd,
        buf: buf.as_mut_ptr() as *mut c_void,
        count: buf.len(),
        offset,
    }))
}

pub fn pwrite(fd: c_int, buf: &[u8], offset: off_t) -> isize {
    if !offloaded() {
        return unsafe {
            libc::pwrite(fd, buf.as_ptr() as *const c_void, buf.len(), offset)
        };
    }
    run(Action::new(SysOp::Pwrite {
        fd,
        buf: buf.as_ptr() as *const c_void,
        count: buf.len(),
        offset,
    }))
}

pub fn readv(fd: c_int, iov: &mut [libc::iovec]) -> isize {
    if !offloaded() {
        return unsafe { libc::readv(fd, iov.as_ptr(), iov.len() as c_int) };
    }
    run(Action::new(SysOp::Readv {
        fd,
        iov: iov.as_ptr(),
        iovcnt: iov.len() as c_int,
    }))
}

pub fn writev(fd: c_int, iov: &[libc::iovec]) -> isize {
    if !offloaded() {
        return unsafe { libc::writev(fd, iov.as_ptr(), iov.len() as c_int) };
    }
    run(Action::new(SysOp::Writev {
        fd,
        iov: iov.as_ptr(),
        iovcnt: iov.len() as c_int,
    }))
}

pub fn fsync(fd: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::fsync(fd) };
    }
    run(Action::new(SysOp::Fsync { fd })) as c_int
}

pub fn fdatasync(fd: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::fdatasync(fd) };
    }
    run(Action::new(SysOp::Fdatasync { fd })) as c_int
}

pub fn ftruncate(fd: c_int, length: off_t) -> c_int {
    if !offloaded() {
        return unsafe { libc::ftruncate(fd, length) };
    }
    run(Action::new(SysOp::Ftruncate { fd, length })) as c_int
}

pub fn fallocate(fd: c_int, mode: c_int, offset: off_t, len: off_t) -> c_int {
    if !offloaded() {
        return unsafe { libc::fallocate(fd, mode, offset, len) };
    }
    run(Action::new(SysOp::Fallocate {
        fd,
        mode,
        offset,
        len,
    })) as c_int
}

pub fn stat(path: &CStr, buf: &mut libc::stat) -> c_int {
    if !offloaded() {
        return unsafe { libc::stat(path.as_ptr(), buf) };
    }
    run(Action::new(SysOp::Stat {
        path: path.as_ptr(),
        buf: buf as *mut libc::stat,
    })) as c_int
}

pub fn fstat(fd: c_int, buf: &mut libc::stat) -> c_int {
    if !offloaded() {
        return unsafe { libc::fstat(fd, buf) };
    }
    run(Action::new(SysOp::Fstat {
        fd,
        buf: buf as *mut libc::stat,
    })) as c_int
}

pub fn lstat(path: &CStr, buf: &mut libc::stat) -> c_int {
    if !offloaded() {
        return unsafe { libc::lstat(path.as_ptr(), buf) };
    }
    run(Action::new(SysOp::Lstat {
        path: path.as_ptr(),
        buf: buf as *mut libc::stat,
    })) as c_int
}

pub fn statfs(path: &CStr, buf: &mut libc::statfs) -> c_int {
    if !offloaded() {
        return unsafe { libc::statfs(path.as_ptr(), buf) };
    }
    run(Action::new(SysOp::Statfs {
        path: path.as_ptr(),
        buf: buf as *mut libc::statfs,
    })) as c_int
}

pub fn fstatfs(fd: c_int, buf: &mut libc::statfs) -> c_int {
    if !offloaded() {
        return unsafe { libc::fstatfs(fd, buf) };
    }
    run(Action::new(SysOp::Fstatfs {
        fd,
        buf: buf as *mut libc::statfs,
    })) as c_int
}

pub fn unlink(path: &CStr) -> c_int {
    if !offloaded() {
        return unsafe { libc::unlink(path.as_ptr()) };
    }
    run(Action::new(SysOp::Unlink {
        path: path.as_ptr(),
    })) as c_int
}

pub fn mkdir(path: &CStr, mode: mode_t) -> c_int {
    if !offloaded() {
        return unsafe { libc::mkdir(path.as_ptr(), mode) };
    }
    run(Action::new(SysOp::Mkdir {
        path: path.as_ptr(),
        mode,
    })) as c_int
}

pub fn rmdir(path: &CStr) -> c_int {
    if !offloaded() {
        return unsafe { libc::rmdir(path.as_ptr()) };
    }
    run(Action::new(SysOp::Rmdir {
        path: path.as_ptr(),
    })) as c_int
}

pub fn rename(old: &CStr, new: &CStr) -> c_int {
    if !offloaded() {
        return unsafe { libc::rename(old.as_ptr(), new.as_ptr()) };
    }
    run(Action::new(SysOp::Rename {
        old: old.as_ptr(),
        new: new.as_ptr(),
    })) as c_int
}

pub fn dup(fd: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::dup(fd) };
    }
    run(Action::new(SysOp::Dup { fd })) as c_int
}

/// `ioctl` with a pointer argument, the overwhelmingly common shape.
pub fn ioctl(fd: c_int, request: c_ulong, argp: *mut c_void) -> c_int {
    if !offloaded() {
        return unsafe { libc::ioctl(fd, request, argp) };
    }
    run(Action::new(SysOp::Ioctl { fd, request, argp })) as c_int
}

pub fn fcntl_getfl(fd: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::fcntl(fd, libc::F_GETFL) };
    }
    run(Action::new(SysOp::FcntlGetfl { fd })) as c_int
}

pub fn fcntl_setfl(fd: c_int, flags: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::fcntl(fd, libc::F_SETFL, flags) };
    }
    run(Action::new(SysOp::FcntlSetfl { fd, flags })) as c_int
}

pub fn pipe2(fds: &mut [c_int; 2], flags: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::pipe2(fds.as_mut_ptr(), flags) };
    }
    run(Action::new(SysOp::Pipe2 {
        fds: fds.as_mut_ptr(),
        flags,
    })) as c_int
}

pub fn socket(domain: c_int, ty: c_int, protocol: c_int) -> c_int {
    if !offloaded() {
        return unsafe { libc::socket(domain, ty, protocol) };
    }
    run(Action::new(SysOp::Socket {
        domain,
        ty,
        protocol,
    })) as c_int
}

pub fn connect(fd: c_int, addr: *const libc::sockaddr, addrlen: socklen_t) -> c_int {
    if !offloaded() {
        return unsafe { libc::connect(fd, addr, addrlen) };
    }
    run(Action::new(SysOp::Connect { fd, addr, addrlen })) as c_int
}

pub fn accept4(
    fd: c_int,
    addr: *mut libc::sockaddr,
    addrlen: *mut socklen_t,
    flags: c_int,
) -> c_int {
    if !offloaded() {
        return unsafe { libc::accept4(fd, addr, addrlen, flags) };
    }
    run(Action::new(SysOp::Accept4 {
        fd,
        addr,
        addrlen,
        flags,
    })) as c_int
}

pub fn send(fd: c_int, buf: &[u8], flags: c_int) -> isize {
    if !offloaded() {
        return unsafe { libc::send(fd, buf.as_ptr() as *const c_void, buf.len(), flags) };
    }
    run(Action::new(SysOp::Send {
        fd,
        buf: buf.as_ptr() as *const c_void,
        len: buf.len(),
        flags,
    }))
}

pub fn recv(fd: c_int, buf: &mut [u8], flags: c_int) -> isize {
    if !offloaded() {
        return unsafe {
            libc::recv(fd, buf.as_mut_ptr() as *mut c_void, buf.len(), flags)
        };
    }
    run(Action::new(SysOp::Recv {
        fd,
        buf: buf.as_mut_ptr() as *mut c_void,
        len: buf.len(),
        flags,
    }))
}

/// Name resolution may block on DNS, so it rides the pool like any
/// other blocking call. Returns the `getaddrinfo` error code, not -1.
/// Free the result with `libc::freeaddrinfo` as usual.
pub fn getaddrinfo(
    node: Option<&CStr>,
    service: Option<&CStr>,
    hints: Option<&libc::addrinfo>,
    out: &mut *mut libc::addrinfo,
) -> c_int {
    let node_p = node.map_or(ptr::null(), |c| c.as_ptr());
    let service_p = service.map_or(ptr::null(), |c| c.as_ptr());
    let hints_p = hints.map_or(ptr::null(), |h| h as *const libc::addrinfo);
    if !offloaded() {
        return unsafe { libc::getaddrinfo(node_p, service_p, hints_p, out) };
    }
    run(Action::new(SysOp::GetAddrInfo {
        node: node_p,
        service: service_p,
        hints: hints_p,
        out: out as *mut *mut libc::addrinfo,
    })) as c_int
}
