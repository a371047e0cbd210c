//! Unix signal masking
//!
//! Auxiliary OS threads (the blocking-I/O workers) run with every
//! signal blocked, so signal delivery stays confined to the loom
//! thread. Called once per worker before its loop.

use std::mem;
use std::ptr;

/// Block all signals on the calling thread.
pub fn block_all_signals() {
    unsafe {
        let mut set: libc::sigset_t = mem::zeroed();
        libc::sigfillset(&mut set);
        libc::pthread_sigmask(libc::SIG_BLOCK, &set, ptr::null_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_on_a_thread() {
        // Block on a scratch thread and verify via the reported old mask
        // of a second call.
        std::thread::spawn(|| {
            block_all_signals();
            unsafe {
                let mut set: libc::sigset_t = mem::zeroed();
                libc::sigemptyset(&mut set);
                let mut old: libc::sigset_t = mem::zeroed();
                libc::pthread_sigmask(libc::SIG_BLOCK, &set, &mut old);
                assert_eq!(libc::sigismember(&old, libc::SIGUSR1), 1);
                assert_eq!(libc::sigismember(&old, libc::SIGTERM), 1);
            }
        })
        .join()
        .unwrap();
    }
}
