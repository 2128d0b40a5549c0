/// Directory entry enumeration — the single seam between the scan workers
/// and the operating system.
///
/// Two implementations exist behind the [`Enumerator`] trait:
///
/// - [`ReadDirEnumerator`] (all platforms): `std::fs::read_dir` plus one
///   metadata call per entry.
/// - `BulkEnumerator` (macOS, in [`super::bulk`]): `getattrlistbulk(2)`,
///   returning many entries' metadata per syscall.
///
/// The implementation is chosen once per scan by [`detect_enumerator`],
/// never per call. Symbolic links are never followed — a symlink is
/// reported as an entry of kind [`EntryKind::Symlink`] with its own (lstat)
/// size, which prevents cycles and double counting through links.
use compact_str::CompactString;
use std::io;
use std::path::Path;

/// What kind of filesystem object an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, device nodes — counted like files, never descended.
    Other,
}

/// One immediate entry of an enumerated directory.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Entry name (never a full path).
    pub name: CompactString,

    /// Size in bytes. Directories are always 0 here — their aggregate is
    /// filled in by the tree as descendants are discovered.
    pub size: u64,

    pub kind: EntryKind,

    /// The entry was listed but its metadata could not be read (permission
    /// denied, vanished mid-scan, ...). The entry stays in the listing with
    /// size 0 so users can see where the gap is; the scan counts one error
    /// and keeps going.
    pub metadata_error: bool,
}

/// Lists the immediate entries of one directory.
///
/// `Err` means the directory itself could not be read (one error, the
/// directory stays empty in the tree). Per-entry failures never abort the
/// listing of siblings — they come back as entries with
/// [`Entry::metadata_error`] set.
pub trait Enumerator: Send + Sync {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<Entry>>;
}

/// Portable enumerator: `read_dir` + one metadata call per entry.
///
/// Functionally equivalent to the bulk path, just more syscalls.
pub struct ReadDirEnumerator;

impl Enumerator for ReadDirEnumerator {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        let iter = std::fs::read_dir(dir)?;
        let mut entries = Vec::new();

        for dent in iter {
            let dent = match dent {
                Ok(d) => d,
                Err(_) => {
                    // The directory stream itself hiccuped on one slot; we
                    // have no name to attach, but the error must be visible.
                    entries.push(Entry {
                        name: CompactString::new("<unreadable>"),
                        size: 0,
                        kind: EntryKind::Other,
                        metadata_error: true,
                    });
                    continue;
                }
            };

            let name = CompactString::new(dent.file_name().to_string_lossy());

            // DirEntry::file_type does not traverse symlinks and is free on
            // platforms whose readdir reports the type.
            let file_type = match dent.file_type() {
                Ok(ft) => ft,
                Err(_) => {
                    entries.push(Entry {
                        name,
                        size: 0,
                        kind: EntryKind::Other,
                        metadata_error: true,
                    });
                    continue;
                }
            };

            if file_type.is_dir() {
                entries.push(Entry {
                    name,
                    size: 0,
                    kind: EntryKind::Directory,
                    metadata_error: false,
                });
                continue;
            }

            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            // DirEntry::metadata has lstat semantics: a symlink's own size,
            // never its target's.
            match dent.metadata() {
                Ok(meta) => entries.push(Entry {
                    name,
                    size: meta.len(),
                    kind,
                    metadata_error: false,
                }),
                Err(_) => entries.push(Entry {
                    name,
                    size: 0,
                    kind,
                    metadata_error: true,
                }),
            }
        }

        Ok(entries)
    }
}

/// Pick the enumerator for a scan — once, up front, never per call.
///
/// On macOS, one `getattrlistbulk` probe against the scan root decides
/// whether the whole scan uses the bulk path; some filesystems (certain
/// network mounts) reject the call, in which case the portable enumerator
/// serves the entire scan. Everywhere else the choice is a compile-time
/// constant.
pub fn detect_enumerator(root: &Path) -> Box<dyn Enumerator> {
    #[cfg(target_os = "macos")]
    {
        if super::bulk::BulkEnumerator::probe(root) {
            tracing::debug!("using getattrlistbulk enumerator");
            return Box::new(super::bulk::BulkEnumerator);
        }
        tracing::debug!("getattrlistbulk probe failed, using read_dir enumerator");
    }
    #[cfg(not(target_os = "macos"))]
    let _ = root;

    Box::new(ReadDirEnumerator)
}
