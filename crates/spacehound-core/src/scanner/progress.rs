/// Scan progress reporting — coalescing, rate-limited events from the
/// worker pool to a single subscriber.
///
/// The channel is a `crossbeam_channel::bounded(1)` slot with latest-value-
/// wins semantics: when the subscriber lags, the publisher vacates the stale
/// snapshot and replaces it with the current one. Workers therefore never
/// block on a slow consumer, and the consumer always sees the freshest
/// counters (intermediate snapshots are deliberately droppable).
///
/// Exactly one terminal event ([`ScanEvent::Complete`] or
/// [`ScanEvent::Cancelled`]) is published per scan, after every worker has
/// been joined. Delivery is at-least-once from the receiver's perspective —
/// receiving it twice must be harmless, and the session layer treats it so.
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum elapsed time between progress snapshots.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Entry-count threshold that forces a snapshot even inside the interval,
/// so huge flat directories still surface movement.
pub const PROGRESS_ENTRY_STRIDE: u64 = 4_096;

/// Shared monotonic counters for one scan session.
///
/// Plain relaxed atomics: workers bump them as they go, snapshot reads are
/// advisory until the terminal event (which happens-after all workers have
/// been joined, making the final values exact).
#[derive(Debug, Default)]
pub struct ScanCounters {
    files: AtomicU64,
    dirs: AtomicU64,
    errors: AtomicU64,
}

impl ScanCounters {
    pub fn add_files(&self, n: u64) {
        self.files.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_dirs(&self, n: u64) {
        self.dirs.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_errors(&self, n: u64) {
        self.errors.fetch_add(n, Ordering::Relaxed);
    }

    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    pub fn dirs(&self) -> u64 {
        self.dirs.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Events delivered to the scan subscriber.
///
/// Serialises with a `kind` tag so a frontend can switch on the variant.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum ScanEvent {
    /// Periodic snapshot of the running totals. Coalesced: only the most
    /// recent snapshot is guaranteed to reach the subscriber.
    Progress {
        files_scanned: u64,
        dirs_scanned: u64,
        errors: u64,
        current_path: Option<String>,
    },
    /// Terminal: the scan ran to completion and the tree is frozen.
    Complete {
        files_scanned: u64,
        dirs_scanned: u64,
        errors: u64,
        duration: Duration,
    },
    /// Terminal: the scan was cancelled; partial results are discarded with
    /// the session.
    Cancelled,
}

impl ScanEvent {
    /// `Complete` and `Cancelled` end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::Complete { .. } | ScanEvent::Cancelled)
    }
}

struct Gate {
    last_sent: Instant,
    entries_since: u64,
}

/// Worker-side handle for publishing into the single event slot.
#[derive(Clone)]
pub struct ProgressPublisher {
    tx: Sender<ScanEvent>,
    /// Publisher-side receiver clone, used only to vacate a stale snapshot
    /// when the slot is full. Racing the real subscriber for that stale
    /// message is exactly the intended drop.
    rx: Receiver<ScanEvent>,
    gate: Arc<Mutex<Gate>>,
}

impl ProgressPublisher {
    /// Create the publisher and the subscriber end of the event slot.
    pub fn channel() -> (ProgressPublisher, Receiver<ScanEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let publisher = ProgressPublisher {
            tx,
            rx: rx.clone(),
            gate: Arc::new(Mutex::new(Gate {
                last_sent: Instant::now(),
                entries_since: PROGRESS_ENTRY_STRIDE, // first tick publishes
            })),
        };
        (publisher, rx)
    }

    /// Record `batch` freshly processed entries and publish a snapshot if
    /// the rate gate allows.
    ///
    /// Never blocks: a contended gate is skipped (another worker is
    /// publishing right now), and a full slot is vacated, not waited on.
    pub fn tick(&self, counters: &ScanCounters, batch: u64, current_path: Option<&Path>) {
        let Some(mut gate) = self.gate.try_lock() else {
            return;
        };
        gate.entries_since += batch;
        if gate.entries_since < PROGRESS_ENTRY_STRIDE
            && gate.last_sent.elapsed() < PROGRESS_INTERVAL
        {
            return;
        }
        gate.entries_since = 0;
        gate.last_sent = Instant::now();
        drop(gate);

        self.replace(ScanEvent::Progress {
            files_scanned: counters.files(),
            dirs_scanned: counters.dirs(),
            errors: counters.errors(),
            current_path: current_path.map(|p| p.display().to_string()),
        });
    }

    /// Publish the terminal event, replacing whatever snapshot still sits
    /// in the slot. Called once per scan by the orchestrator after all
    /// workers have been joined.
    pub fn terminal(&self, event: ScanEvent) {
        debug_assert!(event.is_terminal());
        self.replace(event);
    }

    /// Try-send-else-replace on the single slot.
    fn replace(&self, mut event: ScanEvent) {
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(ev)) => {
                    // Drop the stale occupant (or lose the race to the
                    // subscriber, which is equivalent) and retry.
                    let _ = self.rx.try_recv();
                    event = ev;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let counters = ScanCounters::default();
        counters.add_files(3);
        counters.add_files(2);
        counters.add_dirs(1);
        counters.add_error();
        assert_eq!(counters.files(), 5);
        assert_eq!(counters.dirs(), 1);
        assert_eq!(counters.errors(), 1);
    }

    #[test]
    fn test_slot_keeps_latest_snapshot() {
        let (publisher, rx) = ProgressPublisher::channel();
        let counters = ScanCounters::default();

        counters.add_files(1);
        publisher.tick(&counters, PROGRESS_ENTRY_STRIDE, None);
        counters.add_files(1);
        publisher.tick(&counters, PROGRESS_ENTRY_STRIDE, None);

        // Two publishes without a consumer: only the second survives.
        match rx.try_recv().unwrap() {
            ScanEvent::Progress { files_scanned, .. } => assert_eq!(files_scanned, 2),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_terminal_displaces_stale_progress() {
        let (publisher, rx) = ProgressPublisher::channel();
        let counters = ScanCounters::default();
        publisher.tick(&counters, PROGRESS_ENTRY_STRIDE, None);

        publisher.terminal(ScanEvent::Cancelled);
        assert!(matches!(rx.try_recv().unwrap(), ScanEvent::Cancelled));
    }

    #[test]
    fn test_gate_suppresses_rapid_ticks() {
        let (publisher, rx) = ProgressPublisher::channel();
        let counters = ScanCounters::default();

        publisher.tick(&counters, PROGRESS_ENTRY_STRIDE, None);
        let _ = rx.try_recv();

        // Tiny batch, within the interval: no event.
        publisher.tick(&counters, 1, None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serialises_with_kind_tag() {
        let ev = ScanEvent::Progress {
            files_scanned: 10,
            dirs_scanned: 2,
            errors: 0,
            current_path: Some("/tmp".into()),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "Progress");
        assert_eq!(json["files_scanned"], 10);
    }
}
