/// Work queue driving the fixed-size scan worker pool.
///
/// The walk is iterative, never recursive: pending directories live in an
/// explicit queue, so tree depth costs heap, not stack, and the thread count
/// never grows with directory fan-out.
///
/// Completion is detected deterministically, without timeouts, through the
/// `outstanding` count: it covers both queued and in-flight items, so when
/// it reaches zero no worker can possibly produce more work and every
/// blocked `pop` returns `None`.
use crate::model::NodeId;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// One pending directory: the tree node it was linked under and its path.
#[derive(Debug)]
pub struct WorkItem {
    pub node: NodeId,
    pub path: PathBuf,
}

struct QueueState {
    pending: VecDeque<WorkItem>,
    /// Queued + in-flight items. Incremented by `push`, decremented by
    /// `item_done` once the worker has finished expanding the directory
    /// (including enqueuing its subdirectories).
    outstanding: usize,
}

pub struct WorkQueue {
    state: Mutex<QueueState>,
    work_ready: Condvar,
    cancelled: AtomicBool,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                outstanding: 0,
            }),
            work_ready: Condvar::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Enqueue a directory for expansion.
    pub fn push(&self, item: WorkItem) {
        {
            let mut state = self.state.lock();
            state.pending.push_back(item);
            state.outstanding += 1;
        }
        self.work_ready.notify_one();
    }

    /// Take the next directory, blocking until one is available.
    ///
    /// Returns `None` when the scan is over: either all outstanding work has
    /// drained (deterministic completion) or cancellation was requested.
    /// Cancellation is only checked here, between items — an in-flight
    /// directory always finishes.
    pub fn pop(&self) -> Option<WorkItem> {
        let mut state = self.state.lock();
        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return None;
            }
            if let Some(item) = state.pending.pop_front() {
                return Some(item);
            }
            if state.outstanding == 0 {
                return None;
            }
            self.work_ready.wait(&mut state);
        }
    }

    /// Mark one popped item as fully processed.
    ///
    /// Must be called exactly once per successful `pop`, after any child
    /// directories have been pushed. When the last item drains, every
    /// blocked worker is woken so it can observe completion.
    pub fn item_done(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.outstanding > 0, "item_done without matching pop");
        state.outstanding -= 1;
        if state.outstanding == 0 {
            drop(state);
            self.work_ready.notify_all();
        }
    }

    /// Request cooperative cancellation: blocked workers wake up and return
    /// from `pop`; running workers stop after their current directory.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        self.work_ready.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
