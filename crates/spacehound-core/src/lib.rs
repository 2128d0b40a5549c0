/// Spacehound Core — the scanning engine, with zero UI dependencies.
///
/// This crate contains the whole disk-usage engine and is reusable across
/// frontends (CLI, GUI, TUI).
///
/// # Modules
///
/// - [`model`] — Arena-allocated scan tree with concurrent size aggregation.
/// - [`scanner`] — Worker-pool filesystem scanning with progress reporting.
/// - [`view`] — Read-only navigation/sorting of the completed tree.
/// - [`session`] — One-scan-at-a-time lifecycle controller.
/// - [`platform`] — Drive enumeration and path validation at the OS boundary.
/// - [`error`] — Error taxonomy (`ScanError`, `ViewError`).
pub mod error;
pub mod model;
pub mod platform;
pub mod scanner;
pub mod session;
pub mod view;

pub use error::{ScanError, ViewError};
pub use scanner::{start_scan, ScanHandle, ScanOptions};
pub use session::{ScanPhase, SessionController};
pub use view::{DirectoryEntry, DirectoryView, SortMode};
