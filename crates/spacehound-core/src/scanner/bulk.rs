/// Bulk directory enumeration on macOS via `getattrlistbulk(2)`.
///
/// One syscall returns name, object type, per-entry error, and file size
/// for dozens of entries at a time, amortising syscall overhead across the
/// directory. A 256 KiB attribute buffer holds far more entries than any
/// realistic directory produces per call; benchmarking showed buffer size
/// stops mattering well below this, so it is a fixed constant rather than a
/// tuning knob.
///
/// If the syscall fails for one directory mid-scan (some network and FUSE
/// filesystems reject it), that directory falls back to the portable
/// `read_dir` listing. The scan-wide choice of enumerator is still made
/// once, by the probe in [`super::enumerate::detect_enumerator`].
use super::enumerate::{Entry, EntryKind, Enumerator, ReadDirEnumerator};
use compact_str::CompactString;
use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

const ATTR_BIT_MAP_COUNT: u16 = 5;
const ATTR_CMN_RETURNED_ATTRS: u32 = 0x8000_0000;
const ATTR_CMN_NAME: u32 = 0x0000_0001;
const ATTR_CMN_OBJTYPE: u32 = 0x0000_0008;
const ATTR_CMN_ERROR: u32 = 0x2000_0000;
const ATTR_FILE_DATALENGTH: u32 = 0x0000_0200;

// fsobj_type_t values we care about.
const VREG: u32 = 1;
const VDIR: u32 = 2;
const VLNK: u32 = 5;

/// Attribute buffer per getattrlistbulk call. Holds hundreds of entries;
/// a non-factor for throughput at realistic directory sizes.
const BULK_BUF_SIZE: usize = 256 * 1024;

/// `struct attrlist` as expected by the syscall.
#[repr(C, packed(4))]
struct AttrList {
    bitmapcount: u16,
    reserved: u16,
    commonattr: u32,
    volattr: u32,
    dirattr: u32,
    fileattr: u32,
    forkattr: u32,
}

/// RAII wrapper for a raw file descriptor that closes on drop.
struct OwnedFd(libc::c_int);

impl Drop for OwnedFd {
    fn drop(&mut self) {
        unsafe { libc::close(self.0) };
    }
}

extern "C" {
    fn getattrlistbulk(
        dirfd: libc::c_int,
        alist: *const AttrList,
        attribute_buffer: *mut libc::c_void,
        buffer_size: libc::size_t,
        options: u64,
    ) -> libc::c_int;
}

fn request_attrs() -> AttrList {
    AttrList {
        bitmapcount: ATTR_BIT_MAP_COUNT,
        reserved: 0,
        commonattr: ATTR_CMN_RETURNED_ATTRS | ATTR_CMN_NAME | ATTR_CMN_OBJTYPE | ATTR_CMN_ERROR,
        volattr: 0,
        dirattr: 0,
        fileattr: ATTR_FILE_DATALENGTH,
        forkattr: 0,
    }
}

fn open_dir(dir: &Path) -> io::Result<OwnedFd> {
    let c_path = CString::new(dir.as_os_str().as_bytes())
        .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDONLY | libc::O_DIRECTORY) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(OwnedFd(fd))
}

/// Batched-metadata enumerator, selected by [`BulkEnumerator::probe`].
pub struct BulkEnumerator;

impl BulkEnumerator {
    /// One trial bulk call against the scan root. `false` means this
    /// filesystem rejects the syscall and the whole scan should use the
    /// portable enumerator.
    pub fn probe(root: &Path) -> bool {
        let Ok(fd) = open_dir(root) else {
            return false;
        };
        let alist = request_attrs();
        let mut buf = vec![0u8; BULK_BUF_SIZE];
        let count = unsafe {
            getattrlistbulk(
                fd.0,
                &alist,
                buf.as_mut_ptr() as *mut libc::c_void,
                BULK_BUF_SIZE,
                0,
            )
        };
        count >= 0
    }
}

impl Enumerator for BulkEnumerator {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        let fd = open_dir(dir)?;
        let alist = request_attrs();
        let mut buf = vec![0u8; BULK_BUF_SIZE];
        let mut entries = Vec::with_capacity(64);

        loop {
            let count = unsafe {
                getattrlistbulk(
                    fd.0,
                    &alist,
                    buf.as_mut_ptr() as *mut libc::c_void,
                    BULK_BUF_SIZE,
                    0,
                )
            };

            if count < 0 {
                // Mid-scan refusal on this one directory: re-list it the
                // portable way rather than failing the directory outright.
                return ReadDirEnumerator.read_dir(dir);
            }
            if count == 0 {
                break;
            }

            let mut offset = 0usize;
            for _ in 0..count {
                if offset + 4 > BULK_BUF_SIZE {
                    break;
                }
                let Ok(len_bytes) = buf[offset..offset + 4].try_into() else {
                    break;
                };
                let entry_length = u32::from_ne_bytes(len_bytes) as usize;
                if entry_length == 0 || offset + entry_length > BULK_BUF_SIZE {
                    break;
                }
                if let Some(entry) = parse_entry(&buf[offset..offset + entry_length]) {
                    entries.push(entry);
                }
                offset += entry_length;
            }
        }

        Ok(entries)
    }
}

/// Parse one variable-length record from the attribute buffer.
///
/// Layout after the leading 4-byte record length:
///
/// ```text
/// attribute_set_t  returned  (5 × u32)
/// u32              error     — only if ATTR_CMN_ERROR is in returned.commonattr
/// attrreference_t  name      { offset: i32, length: u32 }
/// u32              objtype
/// u64              file size — files only, if ATTR_FILE_DATALENGTH returned
/// ```
///
/// The name reference's offset is relative to the reference's own position.
fn parse_entry(data: &[u8]) -> Option<Entry> {
    const ATTR_SET_SIZE: usize = 20;
    if data.len() < 4 + ATTR_SET_SIZE {
        return None;
    }

    // The record length is kernel-reported; never trust it to cover the
    // attributes the returned bitmap claims. Every read below bounds-checks
    // via `get` so a short record parses to `None` instead of panicking.
    let read_u32 = |pos: usize| -> Option<u32> {
        Some(u32::from_ne_bytes(data.get(pos..pos + 4)?.try_into().ok()?))
    };
    let read_u64 = |pos: usize| -> Option<u64> {
        Some(u64::from_ne_bytes(data.get(pos..pos + 8)?.try_into().ok()?))
    };

    let mut pos = 4;
    let ret_common = read_u32(pos)?;
    let ret_file = read_u32(pos + 12)?;
    pos += ATTR_SET_SIZE;

    let mut metadata_error = false;
    if ret_common & ATTR_CMN_ERROR != 0 {
        let err = read_u32(pos)?;
        pos += 4;
        if err != 0 {
            // Keep the entry so the error is countable; size stays 0.
            metadata_error = true;
        }
    }

    if ret_common & ATTR_CMN_NAME == 0 {
        return None;
    }
    let name_offset = i32::from_ne_bytes(data.get(pos..pos + 4)?.try_into().ok()?);
    let name_start = usize::try_from((pos as i64).checked_add(name_offset as i64)?).ok()?;
    pos += 8;

    if name_start >= data.len() {
        return None;
    }
    let name_slice = &data[name_start..];
    let name = match CStr::from_bytes_until_nul(name_slice) {
        Ok(cs) => CompactString::new(cs.to_string_lossy()),
        Err(_) => {
            let end = name_slice
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(name_slice.len());
            CompactString::new(String::from_utf8_lossy(&name_slice[..end]))
        }
    };

    if name == "." || name == ".." {
        return None;
    }

    if ret_common & ATTR_CMN_OBJTYPE == 0 {
        return None;
    }
    let obj_type = read_u32(pos)?;
    pos += 4;

    let kind = match obj_type {
        VDIR => EntryKind::Directory,
        VREG => EntryKind::File,
        VLNK => EntryKind::Symlink,
        _ => EntryKind::Other,
    };

    let size = if kind == EntryKind::File && !metadata_error && ret_file & ATTR_FILE_DATALENGTH != 0
    {
        read_u64(pos)?
    } else {
        0
    };

    Some(Entry {
        name,
        size,
        kind,
        metadata_error,
    })
}
