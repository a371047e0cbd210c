//! # weft - cooperative fibers with transparent blocking I/O
//!
//! A runtime of stackful fibers ("wefts") that all execute on one OS
//! thread and switch cooperatively, plus an offload bridge that lets a
//! fiber call ordinary blocking syscalls - `read`, `open`, `stat`, ... -
//! without stalling the others. The call is marshalled to a small pool
//! of worker threads and the fiber parks until the result comes back
//! through the event loop.
//!
//! ```ignore
//! use std::ffi::CString;
//! use weft::{calls, Config, Runtime};
//!
//! fn main() {
//!     let mut rt = Runtime::new(Config::default()).unwrap();
//!     rt.block_on(|| {
//!         weft::spawn("greeter", || println!("hello from a fiber"));
//!
//!         // Looks blocking; only this fiber waits.
//!         let path = CString::new("/etc/hostname").unwrap();
//!         let fd = calls::open(&path, libc::O_RDONLY);
//!         let mut buf = [0u8; 64];
//!         let n = calls::read(fd, &mut buf);
//!         calls::close(fd);
//!         println!("read {} bytes", n);
//!     });
//! }
//! ```
//!
//! `block_on` returns once the runtime is quiescent: every fiber has
//! finished or is parked with nothing left that could wake it, and no
//! blocking call is outstanding.

// Core types
pub use weft_core::{LoomError, LoomResult, WeftId, WeftState};

// Logging macros and helpers
pub use weft_core::wprint::{init as init_logging, set_log_level, LogLevel};
pub use weft_core::{env_get, env_get_bool};
pub use weft_core::{wdebug, werror, winfo, wprintln, wtrace, wwarn};

// Runtime surface
pub use weft_runtime::{resume, spawn, suspend, yield_now, Config, WeftHandle};

// Blocking-syscall wrappers
pub use weft_blockio::calls;
pub use weft_blockio::BlockIo;

use std::cell::RefCell;
use std::rc::Rc;
use weft_runtime::Scheduler;

/// Root object of one fiber runtime.
///
/// Owns the scheduler and the blocking-I/O offload context. The thread
/// that calls [`Runtime::block_on`] becomes the loom thread for the
/// duration of the call; the offload worker threads live as long as the
/// runtime does.
pub struct Runtime {
    // Dropped before the scheduler: workers are joined while the
    // response fiber's memory is still alive.
    blockio: Option<Box<BlockIo>>,
    sched: Box<Scheduler>,
    config: Config,
}

impl Runtime {
    pub fn new(config: Config) -> LoomResult<Runtime> {
        config.validate()?;
        let sched = Box::new(Scheduler::new(&config)?);
        Ok(Runtime {
            blockio: None,
            sched,
            config,
        })
    }

    /// Run `f` as the root fiber until the runtime is quiescent, then
    /// return its result.
    ///
    /// May be called repeatedly; the offload context (worker pool and
    /// response fiber) is created on first use and reused afterwards.
    ///
    /// # Panics
    ///
    /// Panics if another runtime is already running on this thread, or
    /// if the root fiber never completes (parked forever with nothing
    /// to wake it).
    pub fn block_on<T, F>(&mut self, f: F) -> T
    where
        T: 'static,
        F: FnOnce() -> T + 'static,
    {
        self.sched
            .enter()
            .expect("another weft runtime is running on this thread");

        if self.blockio.is_none() {
            self.blockio = Some(BlockIo::init(self.config.io_workers));
        }
        let bio = self.blockio.as_ref().expect("offload context just created");
        bio.install()
            .expect("offload context already installed on this thread");

        let result: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
        let slot = result.clone();
        weft_runtime::spawn("main", move || {
            *slot.borrow_mut() = Some(f());
        });

        self.sched.run();

        bio.uninstall();
        self.sched.exit();

        let output = result
            .borrow_mut()
            .take()
            .expect("root fiber did not run to completion");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn block_on_returns_value() {
        let mut rt = Runtime::new(Config::default()).unwrap();
        let v = rt.block_on(|| 41 + 1);
        assert_eq!(v, 42);
    }

    #[test]
    fn spawned_fibers_complete_before_return() {
        let mut rt = Runtime::new(Config::default()).unwrap();
        let count = rt.block_on(|| {
            let count = Rc::new(Cell::new(0));
            for _ in 0..10 {
                let c = count.clone();
                spawn("child", move || c.set(c.get() + 1));
            }
            count
        });
        assert_eq!(count.get(), 10);
    }

    #[test]
    fn consecutive_runs_share_the_offload_context() {
        let mut rt = Runtime::new(Config::default()).unwrap();
        for _ in 0..3 {
            let n = rt.block_on(|| {
                let devnull = std::ffi::CString::new("/dev/null").unwrap();
                let fd = calls::open(&devnull, libc::O_RDONLY);
                assert!(fd >= 0);
                calls::close(fd);
                fd
            });
            assert!(n >= 0);
        }
    }

    #[test]
    fn runtimes_on_separate_threads() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let mut rt = Runtime::new(Config::default()).unwrap();
                    rt.block_on(move || i * 10)
                })
            })
            .collect();
        let mut got: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        got.sort_unstable();
        assert_eq!(got, vec![0, 10, 20, 30]);
    }
}
