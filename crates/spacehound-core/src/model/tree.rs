/// Arena-backed scan tree with concurrent bottom-up size accumulation.
///
/// All nodes live in a single `Vec<Node>`. Relationships between nodes use
/// `NodeId` (a thin `u32` wrapper) rather than heap pointers, giving
/// cache-friendly traversal and cheap parent walks.
///
/// # Concurrency protocol
///
/// The shared form of the tree is [`SharedTree`] (`Arc<RwLock<ScanTree>>`).
/// Scan workers mutate it in exactly two ways:
///
/// - **Child insertion** (`add_node` + `add_child`) requires the write lock.
///   Workers insert one directory's whole entry batch inside a single short
///   `write()` scope, then release. Each directory is expanded by exactly one
///   worker (it is enqueued exactly once), so double insertion cannot occur.
/// - **Size accumulation** (`bubble_size`) requires only the read lock: the
///   per-node size is an `AtomicU64`, so many workers can add their
///   discovered bytes along overlapping ancestor chains (they all share the
///   root) without exclusive access.
///
/// No lock is ever held across a whole-subtree operation, so contention does
/// not scale with tree depth. Mid-scan readers may observe a directory whose
/// size lags its children; totals are exact once the scan completes and the
/// tree is frozen.
use super::node::{Node, NodeId};
use compact_str::CompactString;
use parking_lot::RwLock;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A shared, concurrently-readable scan tree.
///
/// Workers hold the write lock briefly when inserting batches of nodes and
/// the read lock while bubbling sizes; view queries hold the read lock for
/// the duration of one request.
pub type SharedTree = Arc<RwLock<ScanTree>>;

/// The complete tree produced by one scan.
#[derive(Debug)]
pub struct ScanTree {
    /// Arena: every node in a flat, cache-friendly vector.
    nodes: Vec<Node>,

    /// The scan root. Always index 0; exists for the whole scan.
    root: NodeId,
}

impl ScanTree {
    /// Create a tree containing only the root directory node.
    ///
    /// The root's `name` is the full root path string (every other node
    /// stores a bare file name). `estimated_nodes` pre-sizes the arena so
    /// typical scans don't re-allocate mid-flight; the arena still grows if
    /// the estimate is exceeded.
    pub fn new(root_name: impl Into<CompactString>, estimated_nodes: usize) -> Self {
        let mut nodes = Vec::with_capacity(estimated_nodes.max(1));
        nodes.push(Node::new_dir(root_name.into(), None));
        Self {
            nodes,
            root: NodeId(0),
        }
    }

    /// The root node's id.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a new node in the arena and return its id.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Attach `child` under `parent`, prepending to the sibling list.
    ///
    /// O(1) — new children are inserted at the head of the linked list.
    /// Sibling order is therefore reverse insertion order; callers that
    /// present children sort them per request anyway.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let old_first = self.nodes[parent.idx()].first_child;
        self.nodes[child.idx()].next_sibling = old_first;
        self.nodes[child.idx()].parent = Some(parent);
        self.nodes[parent.idx()].first_child = Some(child);
    }

    /// Add `delta` bytes to `from` and every ancestor up to the root.
    ///
    /// Takes `&self`: the additions are atomic, so this runs under the read
    /// lock concurrently with other workers bubbling into the same
    /// ancestors. Relaxed ordering is sufficient — nothing synchronises on
    /// these values until the scan's completion event, which happens after
    /// all worker threads have been joined.
    pub fn bubble_size(&self, from: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        let mut current = Some(from);
        while let Some(id) = current {
            let node = &self.nodes[id.idx()];
            node.size.fetch_add(delta, Ordering::Relaxed);
            current = node.parent;
        }
    }

    /// Get the node at the given id.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.idx()]
    }

    /// Direct children of a node, collected in arena sibling order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        let mut child = self.nodes[parent.idx()].first_child;
        while let Some(id) = child {
            children.push(id);
            child = self.nodes[id.idx()].next_sibling;
        }
        children
    }

    /// Aggregate size of the whole tree (the root's size).
    #[inline]
    pub fn total_size(&self) -> u64 {
        self.nodes[self.root.idx()].size()
    }

    /// Total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree contains no nodes.
    ///
    /// Never true for a tree built through [`ScanTree::new`], which always
    /// holds the root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubble_reaches_root() {
        let mut tree = ScanTree::new("/scan", 8);
        let root = tree.root();

        let users = tree.add_node(Node::new_dir(CompactString::new("users"), Some(root)));
        tree.add_child(root, users);
        let docs = tree.add_node(Node::new_dir(CompactString::new("docs"), Some(users)));
        tree.add_child(users, docs);

        let file = tree.add_node(Node::new_file(
            CompactString::new("report.pdf"),
            300,
            Some(docs),
        ));
        tree.add_child(docs, file);

        // The worker that enumerated `docs` bubbles the batch's file bytes.
        tree.bubble_size(docs, 300);

        assert_eq!(tree.node(docs).size(), 300);
        assert_eq!(tree.node(users).size(), 300);
        assert_eq!(tree.node(root).size(), 300);
        assert_eq!(tree.total_size(), 300);
    }

    #[test]
    fn test_bubble_zero_is_noop() {
        let tree = ScanTree::new("/scan", 1);
        tree.bubble_size(tree.root(), 0);
        assert_eq!(tree.total_size(), 0);
    }

    #[test]
    fn test_concurrent_bubbling_is_exact() {
        let mut tree = ScanTree::new("/scan", 4);
        let root = tree.root();
        let a = tree.add_node(Node::new_dir(CompactString::new("a"), Some(root)));
        tree.add_child(root, a);
        let b = tree.add_node(Node::new_dir(CompactString::new("b"), Some(root)));
        tree.add_child(root, b);

        let shared: SharedTree = Arc::new(RwLock::new(tree));
        let mut handles = Vec::new();
        for id in [a, b] {
            let shared = shared.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..10_000 {
                    shared.read().bubble_size(id, 1);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let tree = shared.read();
        assert_eq!(tree.node(a).size(), 10_000);
        assert_eq!(tree.node(b).size(), 10_000);
        assert_eq!(tree.total_size(), 20_000);
    }

    #[test]
    fn test_has_children_set_on_first_link() {
        let mut tree = ScanTree::new("/scan", 4);
        let root = tree.root();
        assert!(!tree.node(root).has_children());

        let sub = tree.add_node(Node::new_dir(CompactString::new("sub"), Some(root)));
        tree.add_child(root, sub);

        // True even though `sub` itself has not been enumerated yet.
        assert!(tree.node(root).has_children());
        assert!(!tree.node(sub).has_children());
    }

    #[test]
    fn test_children_collects_all_siblings() {
        let mut tree = ScanTree::new("/scan", 8);
        let root = tree.root();
        for name in ["one", "two", "three"] {
            let id = tree.add_node(Node::new_file(CompactString::new(name), 1, Some(root)));
            tree.add_child(root, id);
        }
        let children = tree.children(root);
        assert_eq!(children.len(), 3);
        let names: Vec<&str> = children
            .iter()
            .map(|&id| tree.node(id).name.as_str())
            .collect();
        // Prepend order: last inserted comes first.
        assert_eq!(names, ["three", "two", "one"]);
    }
}
