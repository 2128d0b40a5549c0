/// View materializer — read-only projection of the scan tree into flat,
/// sorted directory listings.
///
/// Performs no I/O and never mutates the tree: sorting happens on a scratch
/// vector of child ids per request, and navigation paths are re-resolved
/// from the root on every call (child indices are only meaningful against
/// the sort mode that produced them, so nothing resolved is ever cached).
use crate::error::ViewError;
use crate::model::{NodeId, ScanTree};
use serde::Serialize;
use std::path::MAIN_SEPARATOR;

/// How children are ordered in a directory view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Descending by aggregate size; ties broken ascending by
    /// case-insensitive name.
    BySize,
    /// Ascending by case-insensitive name.
    ByName,
}

/// One row of a directory view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    /// True as soon as the scan linked a first child under this directory,
    /// even before that child's own contents were enumerated — enough for a
    /// frontend to draw an "expandable" marker.
    pub has_children: bool,
}

/// A flat, sorted listing of one directory in the tree.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DirectoryView {
    /// Full path of the viewed directory (the root node carries the scan
    /// root path; descendants append their names).
    pub path: String,
    /// Aggregate size of the viewed directory.
    pub total_size: u64,
    pub entries: Vec<DirectoryEntry>,
    /// Number of direct children.
    pub item_count: usize,
}

/// Children of `parent` sorted per `mode`, on a scratch vector.
fn sorted_children(tree: &ScanTree, parent: NodeId, mode: SortMode) -> Vec<NodeId> {
    let mut children = tree.children(parent);
    match mode {
        SortMode::BySize => children.sort_by(|&a, &b| {
            let a_node = tree.node(a);
            let b_node = tree.node(b);
            b_node
                .size()
                .cmp(&a_node.size())
                .then_with(|| a_node.name.to_lowercase().cmp(&b_node.name.to_lowercase()))
        }),
        SortMode::ByName => {
            children.sort_by(|&a, &b| {
                tree.node(a)
                    .name
                    .to_lowercase()
                    .cmp(&tree.node(b).name.to_lowercase())
            });
        }
    }
    children
}

/// Resolve a navigation path and materialize the directory view at its end.
///
/// Resolution walks from the root: at each step the current node's children
/// are sorted per `mode` and the child at the path's index is taken. An
/// out-of-range index fails with [`ViewError::InvalidPath`] naming the
/// offending step; nothing is mutated, and a corrected path on the next
/// call resolves normally.
pub fn directory_view(
    tree: &ScanTree,
    nav_path: &[usize],
    mode: SortMode,
) -> Result<DirectoryView, ViewError> {
    let mut current = tree.root();
    let mut path = tree.node(current).name.to_string();

    for (depth, &index) in nav_path.iter().enumerate() {
        let children = sorted_children(tree, current, mode);
        let Some(&child) = children.get(index) else {
            return Err(ViewError::InvalidPath { depth, index });
        };
        current = child;
        if !path.ends_with(MAIN_SEPARATOR) {
            path.push(MAIN_SEPARATOR);
        }
        path.push_str(tree.node(current).name.as_str());
    }

    let children = sorted_children(tree, current, mode);
    let entries: Vec<DirectoryEntry> = children
        .iter()
        .map(|&id| {
            let node = tree.node(id);
            DirectoryEntry {
                name: node.name.to_string(),
                size: node.size(),
                is_dir: node.is_dir,
                has_children: node.has_children(),
            }
        })
        .collect();

    Ok(DirectoryView {
        path,
        total_size: tree.node(current).size(),
        item_count: entries.len(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use compact_str::CompactString;

    /// root/
    ///   b      (20 bytes)
    ///   a      (10 bytes)
    ///   c      (10 bytes)
    ///   empty/ (directory, 0 bytes)
    fn tie_break_tree() -> ScanTree {
        let mut tree = ScanTree::new("/root", 8);
        let root = tree.root();
        for (name, size) in [("b", 20u64), ("a", 10), ("c", 10)] {
            let id = tree.add_node(Node::new_file(CompactString::new(name), size, Some(root)));
            tree.add_child(root, id);
        }
        let empty = tree.add_node(Node::new_dir(CompactString::new("empty"), Some(root)));
        tree.add_child(root, empty);
        tree.bubble_size(root, 40);
        tree
    }

    #[test]
    fn test_by_size_orders_descending_with_name_tiebreak() {
        let tree = tie_break_tree();
        let view = directory_view(&tree, &[], SortMode::BySize).unwrap();

        let names: Vec<&str> = view.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c", "empty"]);
        assert_eq!(view.total_size, 40);
        assert_eq!(view.item_count, 4);
    }

    #[test]
    fn test_by_name_orders_case_insensitively() {
        let mut tree = ScanTree::new("/root", 8);
        let root = tree.root();
        for name in ["Banana", "apple", "Cherry"] {
            let id = tree.add_node(Node::new_file(CompactString::new(name), 1, Some(root)));
            tree.add_child(root, id);
        }
        let view = directory_view(&tree, &[], SortMode::ByName).unwrap();
        let names: Vec<&str> = view.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["apple", "Banana", "Cherry"]);
    }

    #[test]
    fn test_invalid_index_reports_depth() {
        let tree = tie_break_tree();

        // Step 0 resolves ("empty" is index 3 by size), step 1 has nothing.
        let err = directory_view(&tree, &[3, 0], SortMode::BySize).unwrap_err();
        assert_eq!(err, ViewError::InvalidPath { depth: 1, index: 0 });

        let err = directory_view(&tree, &[99], SortMode::BySize).unwrap_err();
        assert_eq!(
            err,
            ViewError::InvalidPath {
                depth: 0,
                index: 99
            }
        );
    }

    #[test]
    fn test_navigation_appends_to_path() {
        let mut tree = ScanTree::new("/root", 8);
        let root = tree.root();
        let sub = tree.add_node(Node::new_dir(CompactString::new("sub"), Some(root)));
        tree.add_child(root, sub);

        let view = directory_view(&tree, &[0], SortMode::ByName).unwrap();
        assert_eq!(view.path, format!("/root{MAIN_SEPARATOR}sub"));
        assert_eq!(view.item_count, 0);
        assert_eq!(view.total_size, 0);
    }

    #[test]
    fn test_entry_flags() {
        let mut tree = ScanTree::new("/root", 8);
        let root = tree.root();
        let sub = tree.add_node(Node::new_dir(CompactString::new("sub"), Some(root)));
        tree.add_child(root, sub);
        let inner = tree.add_node(Node::new_file(CompactString::new("x"), 5, Some(sub)));
        tree.add_child(sub, inner);
        let file = tree.add_node(Node::new_file(CompactString::new("f"), 1, Some(root)));
        tree.add_child(root, file);

        let view = directory_view(&tree, &[], SortMode::ByName).unwrap();
        let f = view.entries.iter().find(|e| e.name == "f").unwrap();
        assert!(!f.is_dir);
        assert!(!f.has_children);
        let sub = view.entries.iter().find(|e| e.name == "sub").unwrap();
        assert!(sub.is_dir);
        assert!(sub.has_children);
    }
}
