use regex::bytes::Regex;

use crate::errors::Result;
use crate::store::{shared, Entry, ResultStore, SharedStore};

/// One user-visible search: the pattern, its store, and where the viewport
/// sits. Contexts form a stack; the top is what the UI renders. Dismissing
/// a subsearch pops back to its parent.
pub struct SearchContext {
    pub pattern: String,
    /// Regex contexts skip in-line pattern highlighting.
    pub is_regex: bool,
    pub store: SharedStore,
    /// First visible entry index.
    pub top: usize,
    /// Selection offset within the viewport.
    pub cursor: usize,
}

impl SearchContext {
    pub fn new(pattern: String, is_regex: bool, store: SharedStore) -> Self {
        Self {
            pattern,
            is_regex,
            store,
            top: 0,
            cursor: 0,
        }
    }
}

/// Derive a child store by re-filtering `parent` with `pattern`, compiled
/// as a regex (subsearches always are). The child is complete at birth.
///
/// Headers are buffered and only flushed once a following line matches, so
/// the child keeps the store invariant: no header without lines.
pub fn subsearch(parent: &ResultStore, pattern: &str) -> Result<SharedStore> {
    let regex = Regex::new(pattern)?;
    let mut child = ResultStore::new();
    let mut pending_file: Option<String> = None;

    for entry in parent.entries() {
        match entry {
            Entry::File(path) => pending_file = Some(path.clone()),
            Entry::Line { number, text } => {
                if regex.is_match(text) {
                    if let Some(path) = pending_file.take() {
                        child.push_file(path);
                    }
                    child.push_line(*number, text.clone());
                }
            }
        }
    }

    child.set_done();
    Ok(shared(child))
}
