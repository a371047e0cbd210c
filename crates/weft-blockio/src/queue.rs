//! Submission queue
//!
//! A mutex-guarded intrusive FIFO with a condvar for worker parking.
//! Submissions arrive at fiber rate, not cache-line rate, so an
//! uncontended lock is cheap and the condvar doubles as the workers'
//! idle wait - no lock-free machinery needed.

use crate::action::Action;
use crate::list::ActionList;
use std::sync::{Condvar, Mutex};

struct QueueInner {
    list: ActionList,
    shutdown: bool,
}

pub(crate) struct SubmitQueue {
    inner: Mutex<QueueInner>,
    cond: Condvar,
}

impl SubmitQueue {
    pub(crate) fn new() -> SubmitQueue {
        SubmitQueue {
            inner: Mutex::new(QueueInner {
                list: ActionList::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Append a record and wake one worker. The signal happens after
    /// the lock is released to spare the woken worker an immediate
    /// block on the mutex.
    pub(crate) fn push(&self, act: *mut Action) {
        {
            let mut inner = self.inner.lock().expect("submission queue poisoned");
            unsafe { inner.list.push_back(act) };
        }
        self.cond.notify_one();
    }

    /// Block until a record is available and detach it. Returns `None`
    /// once the queue has been shut down and drained.
    pub(crate) fn pop_blocking(&self) -> Option<*mut Action> {
        let mut inner = self.inner.lock().expect("submission queue poisoned");
        loop {
            if let Some(act) = inner.list.pop_front() {
                return Some(act);
            }
            if inner.shutdown {
                return None;
            }
            inner = self
                .cond
                .wait(inner)
                .expect("submission queue poisoned");
        }
    }

    /// Wake every worker and make further pops return `None` once the
    /// backlog is drained.
    pub(crate) fn shutdown(&self) {
        {
            let mut inner = self.inner.lock().expect("submission queue poisoned");
            inner.shutdown = true;
        }
        self.cond.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("submission queue poisoned").list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SysOp;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_across_threads() {
        let queue = Arc::new(SubmitQueue::new());
        let mut records: Vec<Box<Action>> = (0..16)
            .map(|i| Box::new(Action::new(SysOp::Close { fd: i })))
            .collect();

        let q = queue.clone();
        let consumer = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..16 {
                let act = q.pop_blocking().unwrap();
                let fd = match unsafe { &(*act).op } {
                    SysOp::Close { fd } => *fd,
                    _ => unreachable!(),
                };
                seen.push(fd);
            }
            seen
        });

        for r in records.iter_mut() {
            queue.push(&mut **r as *mut Action);
        }
        let seen = consumer.join().unwrap();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn shutdown_releases_blocked_workers() {
        let queue = Arc::new(SubmitQueue::new());
        let q = queue.clone();
        let worker = thread::spawn(move || q.pop_blocking().is_none());
        queue.shutdown();
        assert!(worker.join().unwrap());
    }

    #[test]
    fn shutdown_drains_backlog_first() {
        let queue = SubmitQueue::new();
        let mut a = Box::new(Action::new(SysOp::Close { fd: 3 }));
        queue.push(&mut *a as *mut Action);
        queue.shutdown();
        assert!(queue.pop_blocking().is_some());
        assert!(queue.pop_blocking().is_none());
    }
}
