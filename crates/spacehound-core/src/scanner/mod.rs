/// Scanner module — orchestrates one filesystem scan.
///
/// A fixed-size pool of worker threads cooperates over an explicit work
/// queue of pending directories (iterative walk, no recursion, no thread
/// growth with fan-out). Workers write into a shared
/// [`SharedTree`](crate::model::SharedTree) so the tree grows incrementally
/// while the scan runs; progress reaches the subscriber through a
/// single-slot coalescing channel.
///
/// Completion is deterministic: when the queue's outstanding count reaches
/// zero every worker returns, the orchestrator joins them all, and exactly
/// one terminal event is published.
pub mod enumerate;
pub mod progress;
pub mod queue;
mod worker;

#[cfg(target_os = "macos")]
pub mod bulk;

use crate::error::ScanError;
use crate::model::{ScanTree, SharedTree};
use enumerate::detect_enumerator;
use progress::{ProgressPublisher, ScanCounters, ScanEvent};
use queue::{WorkItem, WorkQueue};
use worker::{worker_loop, WorkerContext};

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;

/// Default worker count, deliberately independent of detected core count.
///
/// Directory walking is IO-bound: throughput scales near-linearly only up
/// to a small multiple of available cores, after which IO contention makes
/// variance spike and can push throughput below single-threaded. Four
/// workers sits on the flat part of that curve for both laptops and servers.
pub const DEFAULT_WORKERS: usize = 4;

/// Arena pre-allocation for a fresh scan. Large volumes exceed this and the
/// arena grows; small scans waste a few megabytes for the scan's lifetime.
const ESTIMATED_NODES: usize = 100_000;

/// Tunables for one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Worker thread count. `None` uses [`DEFAULT_WORKERS`]; explicit
    /// requests are clamped to `1..=2 × cores` so a caller cannot spawn an
    /// unbounded pool.
    pub workers: Option<usize>,
}

impl ScanOptions {
    fn effective_workers(&self) -> usize {
        match self.workers {
            None => DEFAULT_WORKERS,
            Some(n) => n.clamp(1, 2 * num_cpus::get().max(1)),
        }
    }
}

/// Handle to a running or completed scan: event subscription, the shared
/// tree, the live counters, and cancellation.
pub struct ScanHandle {
    /// Single-slot event stream; ends with one terminal event.
    pub events: Receiver<ScanEvent>,
    /// Tree populated incrementally during scanning; frozen (no writers
    /// left) once the terminal event is published.
    pub tree: SharedTree,
    /// Live counters, exact once the terminal event is published.
    pub counters: Arc<ScanCounters>,
    queue: Arc<WorkQueue>,
    _orchestrator: thread::JoinHandle<()>,
}

impl ScanHandle {
    /// Request cooperative cancellation: workers stop after their current
    /// directory, then the `Cancelled` terminal event is published.
    pub fn cancel(&self) {
        self.queue.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.queue.is_cancelled()
    }
}

/// Start a scan of `root` on background threads.
///
/// Fails fast — before any thread is spawned — if `root` does not exist or
/// is not a directory, and with [`ScanError::WorkerSpawn`] if the pool
/// cannot be brought up (in which case no partial scan is left running).
pub fn start_scan(root: PathBuf, options: ScanOptions) -> Result<ScanHandle, ScanError> {
    // Follow a symlinked root (on macOS, /tmp and /var are symlinks) — the
    // same semantics as platform::validate_path. Only entries discovered
    // inside the walk use lstat semantics.
    let meta = std::fs::metadata(&root).map_err(|e| ScanError::io(&root, e))?;
    if !meta.is_dir() {
        return Err(ScanError::InvalidRoot { path: root });
    }

    let started = Instant::now();
    let worker_count = options.effective_workers();

    // The enumerator is chosen once per scan, never per call.
    let enumerator: Arc<dyn enumerate::Enumerator> = Arc::from(detect_enumerator(&root));

    let tree: SharedTree = Arc::new(RwLock::new(ScanTree::new(
        root.to_string_lossy().as_ref(),
        ESTIMATED_NODES,
    )));
    let root_id = tree.read().root();

    let counters = Arc::new(ScanCounters::default());
    let (publisher, events) = ProgressPublisher::channel();
    let queue = Arc::new(WorkQueue::new());
    queue.push(WorkItem {
        node: root_id,
        path: root.clone(),
    });

    info!(root = %root.display(), workers = worker_count, "starting scan");

    let mut workers = Vec::with_capacity(worker_count);
    for i in 0..worker_count {
        let ctx = WorkerContext {
            queue: queue.clone(),
            tree: tree.clone(),
            enumerator: enumerator.clone(),
            counters: counters.clone(),
            publisher: publisher.clone(),
        };
        let spawn = thread::Builder::new()
            .name(format!("spacehound-worker-{i}"))
            .spawn(move || worker_loop(&ctx));
        match spawn {
            Ok(handle) => workers.push(handle),
            Err(source) => {
                // Tear down anything already running before reporting.
                queue.cancel();
                for handle in workers {
                    let _ = handle.join();
                }
                return Err(ScanError::WorkerSpawn { source });
            }
        }
    }

    let orchestrator = {
        let queue = queue.clone();
        let counters = counters.clone();
        thread::Builder::new()
            .name("spacehound-scan".into())
            .spawn(move || {
                for handle in workers {
                    let _ = handle.join();
                }
                // All writers are gone: the tree is frozen and the counters
                // are final from here on.
                if queue.is_cancelled() {
                    info!("scan cancelled");
                    publisher.terminal(ScanEvent::Cancelled);
                } else {
                    let duration = started.elapsed();
                    info!(
                        files = counters.files(),
                        dirs = counters.dirs(),
                        errors = counters.errors(),
                        ?duration,
                        "scan complete"
                    );
                    publisher.terminal(ScanEvent::Complete {
                        files_scanned: counters.files(),
                        dirs_scanned: counters.dirs(),
                        errors: counters.errors(),
                        duration,
                    });
                }
            })
    };

    let orchestrator = match orchestrator {
        Ok(handle) => handle,
        Err(source) => {
            queue.cancel();
            return Err(ScanError::WorkerSpawn { source });
        }
    };

    Ok(ScanHandle {
        events,
        tree,
        counters,
        queue,
        _orchestrator: orchestrator,
    })
}
