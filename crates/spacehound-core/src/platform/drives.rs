/// Drive/volume enumeration — capacity figures straight from the OS.
///
/// Windows walks the logical drive strings and asks `GetDiskFreeSpaceExW`
/// per root; Unix variants run `statvfs` over the mounted volume roots. A
/// volume whose capacity query fails is skipped with a warning rather than
/// reported with made-up numbers.
use serde::Serialize;

/// Capacity figures for one mounted volume.
#[derive(Debug, Clone, Serialize)]
pub struct DriveInfo {
    /// Mount point, e.g. `C:\` or `/`.
    pub path: String,
    /// Total capacity in bytes.
    pub total_bytes: u64,
    /// Free space in bytes (available to the calling user).
    pub free_bytes: u64,
}

#[cfg(windows)]
pub fn enumerate_drives() -> Vec<DriveInfo> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use windows::Win32::Storage::FileSystem::{GetDiskFreeSpaceExW, GetLogicalDriveStringsW};

    let mut drives = Vec::new();

    // GetLogicalDriveStringsW returns null-separated drive root strings.
    let mut buffer = [0u16; 256];
    let len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) };
    if len == 0 {
        tracing::warn!("GetLogicalDriveStringsW returned 0");
        return drives;
    }

    let full = OsString::from_wide(&buffer[..len as usize]);
    let full_str = full.to_string_lossy();

    for root in full_str.split('\0').filter(|s| !s.is_empty()) {
        let root_wide: Vec<u16> = root.encode_utf16().chain(std::iter::once(0)).collect();
        let root_pcwstr = windows::core::PCWSTR(root_wide.as_ptr());

        let mut free_caller: u64 = 0;
        let mut total: u64 = 0;
        let mut free_total: u64 = 0;
        let has_space = unsafe {
            GetDiskFreeSpaceExW(
                root_pcwstr,
                Some(&mut free_caller as *mut u64),
                Some(&mut total as *mut u64),
                Some(&mut free_total as *mut u64),
            )
            .is_ok()
        };
        if !has_space {
            tracing::warn!(drive = root, "GetDiskFreeSpaceExW failed, skipping");
            continue;
        }

        drives.push(DriveInfo {
            path: root.to_string(),
            total_bytes: total,
            free_bytes: free_caller,
        });
    }

    drives
}

#[cfg(unix)]
pub fn enumerate_drives() -> Vec<DriveInfo> {
    let mut drives = Vec::new();
    for root in mount_roots() {
        match statvfs_capacity(&root) {
            Some((total_bytes, free_bytes)) => drives.push(DriveInfo {
                path: root,
                total_bytes,
                free_bytes,
            }),
            None => tracing::warn!(volume = %root, "statvfs failed, skipping"),
        }
    }
    drives
}

/// Total and user-available bytes for the filesystem holding `path`.
#[cfg(unix)]
fn statvfs_capacity(path: &str) -> Option<(u64, u64)> {
    let c_path = std::ffi::CString::new(path).ok()?;
    let mut vfs: libc::statvfs = unsafe { std::mem::zeroed() };
    if unsafe { libc::statvfs(c_path.as_ptr(), &mut vfs) } != 0 {
        return None;
    }
    // f_frsize is the fragment size the block counts are denominated in;
    // some filesystems report it as 0, in which case f_bsize applies.
    let frsize = if vfs.f_frsize > 0 {
        vfs.f_frsize as u64
    } else {
        vfs.f_bsize as u64
    };
    Some((vfs.f_blocks as u64 * frsize, vfs.f_bavail as u64 * frsize))
}

/// Mounted volume roots worth showing to a user.
#[cfg(target_os = "linux")]
fn mount_roots() -> Vec<String> {
    // /proc/mounts lines are "device mountpoint fstype options ...";
    // real volumes are the ones backed by a /dev device.
    let Ok(mounts) = std::fs::read_to_string("/proc/mounts") else {
        return vec!["/".to_string()];
    };
    let mut roots: Vec<String> = mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mountpoint = fields.next()?;
            if device.starts_with("/dev/") {
                // Octal escapes (e.g. \040 for space) are rare enough in
                // mount points to leave unescaped here.
                Some(mountpoint.to_string())
            } else {
                None
            }
        })
        .collect();
    if roots.is_empty() {
        roots.push("/".to_string());
    }
    roots.sort();
    roots.dedup();
    roots
}

#[cfg(target_os = "macos")]
fn mount_roots() -> Vec<String> {
    let mut roots = vec!["/".to_string()];
    if let Ok(volumes) = std::fs::read_dir("/Volumes") {
        for entry in volumes.flatten() {
            if entry.path().is_dir() {
                roots.push(entry.path().to_string_lossy().to_string());
            }
        }
    }
    roots
}

#[cfg(all(unix, not(target_os = "linux"), not(target_os = "macos")))]
fn mount_roots() -> Vec<String> {
    vec!["/".to_string()]
}
