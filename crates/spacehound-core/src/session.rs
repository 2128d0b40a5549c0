/// Session controller — owns one scan's lifecycle from start to completion
/// or discard.
///
/// The controller holds at most one [`ScanSession`]. Starting a new scan
/// cancels and discards the previous session (there is no queueing of
/// concurrent sessions); view queries are served only once the session has
/// reached `Complete`, so callers can never observe a half-aggregated tree.
use crate::error::{ScanError, ViewError};
use crate::platform;
use crate::scanner::progress::ScanEvent;
use crate::scanner::{self, ScanHandle, ScanOptions};
use crate::view::{self, DirectoryView, SortMode};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a session is in its lifecycle.
///
/// Advanced by [`SessionController::poll`] as terminal events arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Workers are active; the tree is still growing.
    Running,
    /// The terminal `Complete` event arrived; the tree is frozen and
    /// queryable.
    Complete,
    /// Cancelled before completion; partial results are not served.
    Cancelled,
    /// The scan ended without a terminal event (event channel dropped).
    Failed,
}

/// One scan run: root path, worker handle, and lifecycle phase.
pub struct ScanSession {
    root: PathBuf,
    handle: ScanHandle,
    phase: ScanPhase,
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        // Abandoning a session stops its workers; there is nothing to roll
        // back because the whole tree goes with it.
        self.handle.cancel();
    }
}

/// Owner and single entry point for scans and view queries.
#[derive(Default)]
pub struct SessionController {
    session: Option<ScanSession>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `root` and launch a scan, discarding any previous session.
    ///
    /// Fails with [`ScanError::InvalidRoot`] before any session is created
    /// or thread spawned if `root` is not an existing directory.
    pub fn start_scan(
        &mut self,
        root: impl Into<PathBuf>,
        options: ScanOptions,
    ) -> Result<(), ScanError> {
        let root = root.into();
        if !platform::validate_path(&root) {
            return Err(ScanError::InvalidRoot { path: root });
        }

        if let Some(previous) = self.session.take() {
            debug!(root = %previous.root.display(), "discarding previous session");
            // Dropped here; Drop cancels its workers.
        }

        let handle = scanner::start_scan(root.clone(), options)?;
        self.session = Some(ScanSession {
            root,
            handle,
            phase: ScanPhase::Running,
        });
        Ok(())
    }

    /// Drain pending scan events, advancing the phase on terminal ones.
    ///
    /// Returns the drained events in arrival order so a frontend can render
    /// the latest progress snapshot. Safe to call at any cadence — the
    /// channel coalesces, and a duplicate terminal event is harmless.
    pub fn poll(&mut self) -> Vec<ScanEvent> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        loop {
            match session.handle.events.try_recv() {
                Ok(event) => {
                    match &event {
                        ScanEvent::Complete { .. } => session.phase = ScanPhase::Complete,
                        ScanEvent::Cancelled => session.phase = ScanPhase::Cancelled,
                        ScanEvent::Progress { .. } => {}
                    }
                    events.push(event);
                }
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    if session.phase == ScanPhase::Running {
                        session.phase = ScanPhase::Failed;
                    }
                    break;
                }
            }
        }
        events
    }

    /// Current phase, or `None` when no scan has been started.
    pub fn phase(&self) -> Option<ScanPhase> {
        self.session.as_ref().map(|s| s.phase)
    }

    /// Root path of the current session, if any.
    pub fn root(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.root.as_path())
    }

    /// Request cooperative cancellation of the running scan.
    pub fn cancel(&self) {
        if let Some(session) = self.session.as_ref() {
            session.handle.cancel();
        }
    }

    /// Materialize a sorted view of one directory in the completed tree.
    ///
    /// Served only after completion: a running scan answers
    /// [`ViewError::ScanActive`], and a cancelled or failed session (whose
    /// partial tree is deliberately not exposed) answers
    /// [`ViewError::NoSession`], exactly like a controller that never
    /// scanned.
    pub fn directory_view(
        &self,
        nav_path: &[usize],
        mode: SortMode,
    ) -> Result<DirectoryView, ViewError> {
        let session = self.session.as_ref().ok_or(ViewError::NoSession)?;
        match session.phase {
            ScanPhase::Running => Err(ViewError::ScanActive),
            ScanPhase::Cancelled | ScanPhase::Failed => Err(ViewError::NoSession),
            ScanPhase::Complete => {
                let tree = session.handle.tree.read();
                view::directory_view(&tree, nav_path, mode)
            }
        }
    }
}
