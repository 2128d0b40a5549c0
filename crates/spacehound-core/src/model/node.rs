/// A single node in the arena-allocated scan tree.
///
/// Nodes are stored in a flat `Vec<Node>` for cache-friendly traversal.
/// Parent-child relationships use indices rather than pointers, and the
/// size field is atomic so worker threads can accumulate directory totals
/// without taking the tree's write lock.
use compact_str::CompactString;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight index into the arena `Vec<Node>`.
///
/// Uses `u32` to keep nodes small — supports up to ~4 billion nodes,
/// which is more than enough for any real filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new `NodeId` from a `usize`, panicking in debug builds if
    /// it exceeds `u32::MAX`.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeId overflow");
        Self(index as u32)
    }

    /// Return the index as a `usize` for Vec indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A single file or directory in the tree.
///
/// Children are linked via a `first_child` / `next_sibling` list so that no
/// separate `Vec<NodeId>` allocation is needed per node. Sibling order is
/// insertion order reversed (new children are prepended in O(1)); callers
/// that present children to a user sort them per request anyway.
#[derive(Debug)]
pub struct Node {
    /// File or directory name only (NOT the full path), except for the scan
    /// root whose name is the full root path string. Full paths are
    /// reconstructed on demand by walking up via `parent`.
    pub name: CompactString,

    /// Logical size in bytes.
    ///
    /// Files: fixed at insertion. Directories: accumulated concurrently by
    /// worker threads as descendants are discovered; exact once the scan
    /// completes, transiently behind while it runs.
    pub size: AtomicU64,

    /// `true` if this node represents a directory.
    pub is_dir: bool,

    /// Index of the parent node. `None` only for the scan root.
    pub parent: Option<NodeId>,

    /// First child (directories only). Children form a singly-linked list
    /// via `next_sibling`.
    pub first_child: Option<NodeId>,

    /// Next sibling under the same parent.
    pub next_sibling: Option<NodeId>,
}

impl Node {
    /// Create a new non-directory node (file, symlink, device, ...) with a
    /// known size.
    pub fn new_file(name: CompactString, size: u64, parent: Option<NodeId>) -> Self {
        Self {
            name,
            size: AtomicU64::new(size),
            is_dir: false,
            parent,
            first_child: None,
            next_sibling: None,
        }
    }

    /// Create a new directory node. Its size starts at zero and grows as
    /// descendants are discovered.
    pub fn new_dir(name: CompactString, parent: Option<NodeId>) -> Self {
        Self {
            name,
            size: AtomicU64::new(0),
            is_dir: true,
            parent,
            first_child: None,
            next_sibling: None,
        }
    }

    /// Current size in bytes. For directories mid-scan this is a snapshot
    /// that may lag the true total.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Whether this node has at least one child linked.
    ///
    /// Becomes `true` the moment the first child is inserted, which can be
    /// before that child's own contents have been enumerated.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}
