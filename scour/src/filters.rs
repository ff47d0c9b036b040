use std::collections::HashSet;
use std::path::Path;

/// File and directory selection rules, immutable after startup.
#[derive(Debug, Default, Clone)]
pub struct Filters {
    /// Name suffixes accepted for scanning, e.g. ".c", ".h".
    pub extensions: Vec<String>,
    /// Exact basenames that bypass the extension check, e.g. "Makefile".
    pub specifics: Vec<String>,
    /// Inodes of directories excluded from traversal.
    pub excluded_dirs: HashSet<u64>,
    /// Scan every regular file regardless of the lists.
    pub raw: bool,
    pub follow_symlinks: bool,
}

impl Filters {
    /// Should this file be scanned?
    pub fn file_eligible(&self, path: &Path) -> bool {
        if self.raw {
            return true;
        }
        if self.is_specific(path) {
            return true;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    fn is_specific(&self, path: &Path) -> bool {
        let base = match path.file_name().and_then(|n| n.to_str()) {
            Some(base) => base,
            None => return false,
        };
        self.specifics.iter().any(|spec| spec == base)
    }

    pub fn dir_excluded(&self, inode: u64) -> bool {
        !self.excluded_dirs.is_empty() && self.excluded_dirs.contains(&inode)
    }
}

/// Version-control internals are never traversed.
pub fn is_special_dir(name: &str) -> bool {
    matches!(name, "." | ".." | ".git" | ".svn")
}
