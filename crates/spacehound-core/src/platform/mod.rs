/// Platform boundary — drive/volume enumeration and path validation.
///
/// Thin OS queries only; nothing here participates in the scan itself.
pub mod drives;

pub use drives::{enumerate_drives, DriveInfo};

use std::path::Path;

/// Whether `path` exists and is a directory, i.e. is scannable.
pub fn validate_path(path: &Path) -> bool {
    path.is_dir()
}
