use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use ignore::WalkBuilder;
use tracing::debug;

use crate::config::node_id;
use crate::filters::{is_special_dir, Filters};

/// Depth-first traversal from the root, emitting eligible file paths in
/// directory-entry order. `emit` blocks until the pipeline can take the
/// next file; returning stops early when shutdown was requested.
///
/// Version-control directories and excluded inodes are pruned; unreadable
/// directories are skipped silently. Symlinked files are only reported when
/// follow-symlinks is set (unfollowed symlinks are not regular files).
pub fn walk<F>(root: &Path, filters: &Filters, shutdown: &AtomicBool, mut emit: F)
where
    F: FnMut(&Path),
{
    // A root that is itself a file is scanned directly, bypassing the
    // eligibility lists.
    if root.is_file() {
        emit(root);
        return;
    }

    let prune = {
        let filters = filters.clone();
        move |entry: &ignore::DirEntry| {
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if is_special_dir(&name) {
                return false;
            }
            if let Some(inode) = node_id(entry.path()) {
                if filters.dir_excluded(inode) {
                    debug!(path = %entry.path().display(), "excluded directory");
                    return false;
                }
            }
            true
        }
    };

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(filters.follow_symlinks)
        .filter_entry(prune)
        .build();

    for entry in walker {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(%err, "walk error, skipping");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if filters.file_eligible(entry.path()) {
            emit(entry.path());
        }
    }
}
