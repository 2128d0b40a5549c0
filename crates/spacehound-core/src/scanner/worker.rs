/// Worker thread logic for the scan pool.
///
/// Each worker loops: pop a directory, enumerate it, insert the whole entry
/// batch into the tree under one short write lock, bubble the batch's file
/// bytes up the ancestor chain with atomic adds, enqueue discovered
/// subdirectories, bump the counters, and tick the progress publisher.
///
/// A directory that cannot be listed costs exactly one error and an empty
/// node; an entry whose metadata cannot be read costs one error and a
/// zero-byte placeholder. Neither stops the worker or its siblings.
use super::enumerate::{Enumerator, EntryKind};
use super::progress::{ProgressPublisher, ScanCounters};
use super::queue::{WorkItem, WorkQueue};
use crate::model::{Node, NodeId, SharedTree};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::trace;

/// Everything one worker thread needs, shared across the pool.
pub(crate) struct WorkerContext {
    pub queue: Arc<WorkQueue>,
    pub tree: SharedTree,
    pub enumerator: Arc<dyn Enumerator>,
    pub counters: Arc<ScanCounters>,
    pub publisher: ProgressPublisher,
}

/// Body of one worker thread. Returns when the queue drains or cancellation
/// is requested.
pub(crate) fn worker_loop(ctx: &WorkerContext) {
    while let Some(item) = ctx.queue.pop() {
        expand_directory(ctx, &item);
        ctx.queue.item_done();
    }
}

/// Enumerate one directory and fold its contents into the tree.
fn expand_directory(ctx: &WorkerContext, item: &WorkItem) {
    let entries = match ctx.enumerator.read_dir(&item.path) {
        Ok(entries) => entries,
        Err(err) => {
            trace!(path = %item.path.display(), %err, "directory listing failed");
            ctx.counters.add_error();
            return;
        }
    };

    let entry_count = entries.len() as u64;
    let mut file_bytes: u64 = 0;
    let mut files: u64 = 0;
    let mut dirs: u64 = 0;
    let mut errors: u64 = 0;
    let mut subdirs: Vec<(NodeId, PathBuf)> = Vec::new();

    // One write-lock scope for the whole batch. Each directory is expanded
    // by exactly one worker, so nothing else can insert under this node.
    {
        let mut tree = ctx.tree.write();
        for entry in entries {
            if entry.metadata_error {
                errors += 1;
            }
            match entry.kind {
                EntryKind::Directory => {
                    let child_path = item.path.join(entry.name.as_str());
                    let id = tree.add_node(Node::new_dir(entry.name, Some(item.node)));
                    tree.add_child(item.node, id);
                    subdirs.push((id, child_path));
                    dirs += 1;
                }
                EntryKind::File | EntryKind::Symlink | EntryKind::Other => {
                    let id =
                        tree.add_node(Node::new_file(entry.name, entry.size, Some(item.node)));
                    tree.add_child(item.node, id);
                    file_bytes += entry.size;
                    files += 1;
                }
            }
        }
    }

    // Atomic accumulation under the read lock: concurrent with every other
    // worker bubbling into shared ancestors.
    if file_bytes > 0 {
        ctx.tree.read().bubble_size(item.node, file_bytes);
    }

    for (node, path) in subdirs {
        ctx.queue.push(WorkItem { node, path });
    }

    ctx.counters.add_files(files);
    ctx.counters.add_dirs(dirs);
    ctx.counters.add_errors(errors);

    ctx.publisher
        .tick(&ctx.counters, entry_count, Some(&item.path));
}
