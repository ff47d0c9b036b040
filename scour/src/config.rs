use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::warn;

use crate::errors::{Error, Result};

/// Content of the ngprc config file: the editor command template for the
/// user's editor plus the default filter lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NgprcConfig {
    /// Positional format string: line number, file path, sanitized pattern,
    /// case-flag suffix.
    pub editor_template: String,
    pub extensions: Vec<String>,
    pub specifics: Vec<String>,
}

/// Basename of `$EDITOR`, or "vim" when unset. Only the basename selects
/// the template line in ngprc.
pub fn editor_basename() -> String {
    match std::env::var("EDITOR") {
        Ok(editor) if !editor.is_empty() => editor
            .rsplit('/')
            .next()
            .unwrap_or(editor.as_str())
            .to_string(),
        _ => "vim".to_string(),
    }
}

/// Load ngprc from /etc/ngprc, falling back to ./ngprc. A missing file is
/// fatal: without an editor template the tool cannot open matches.
pub fn load(editor: &str) -> Result<NgprcConfig> {
    for path in [Path::new("/etc/ngprc"), Path::new("./ngprc")] {
        if let Ok(file) = fs::File::open(path) {
            return parse(BufReader::new(file), editor);
        }
    }
    Err(Error::ConfigMissing)
}

/// Parse the line-oriented ngprc format. Relevant lines carry a semicolon
/// and a double-quoted value; keys are matched by substring, so a line may
/// feed more than one slot. `files` and `extensions` values are
/// space-separated lists.
pub fn parse<R: Read>(reader: BufReader<R>, editor: &str) -> Result<NgprcConfig> {
    let mut editor_template = None;
    let mut extensions = Vec::new();
    let mut specifics = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if !line.contains(';') {
            continue;
        }
        let quoted = match quoted_value(&line) {
            Some(quoted) => quoted,
            None => continue,
        };

        if line.contains(editor) {
            editor_template = Some(quoted.to_string());
        }
        if line.contains("files") {
            specifics = split_list(quoted);
        }
        if line.contains("extensions") {
            extensions = split_list(quoted);
        }
    }

    match editor_template {
        Some(editor_template) => Ok(NgprcConfig {
            editor_template,
            extensions,
            specifics,
        }),
        None => Err(Error::EditorNotConfigured(editor.to_string())),
    }
}

fn quoted_value(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let end = start + line[start..].find('"')?;
    Some(&line[start..end])
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|token| token.to_string())
        .collect()
}

/// Resolve user-supplied exclude paths to directory inodes once, before the
/// walk starts. Paths that cannot be resolved are skipped.
pub fn resolve_excluded_dirs(paths: &[String]) -> HashSet<u64> {
    let mut inodes = HashSet::new();
    for path in paths {
        match node_id(Path::new(path)) {
            Some(inode) => {
                inodes.insert(inode);
            }
            None => warn!(%path, "cannot resolve excluded directory, ignoring"),
        }
    }
    inodes
}

#[cfg(unix)]
pub fn node_id(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).ok().map(|meta| meta.ino())
}

#[cfg(not(unix))]
pub fn node_id(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn parse_str(content: &str, editor: &str) -> Result<NgprcConfig> {
        parse(BufReader::new(content.as_bytes()), editor)
    }

    const NGPRC: &str = r#"# ngp configuration
vim;"vim '+silent /%3$s%4$s' +%1$d %2$s"
files;"Makefile Kconfig"
extensions;".c .h .S"
"#;

    #[test]
    fn parses_editor_template_and_lists() {
        let config = parse_str(NGPRC, "vim").unwrap();
        assert_eq!(
            config.editor_template,
            "vim '+silent /%3$s%4$s' +%1$d %2$s"
        );
        assert_eq!(config.specifics, vec!["Makefile", "Kconfig"]);
        assert_eq!(config.extensions, vec![".c", ".h", ".S"]);
    }

    #[test]
    fn simple_template_is_taken_verbatim() {
        let config = parse_str(
            "emacs;\"emacsclient +%1$d %2$s\"\nextensions;\".c\"\n",
            "emacs",
        )
        .unwrap();
        assert_eq!(config.editor_template, "emacsclient +%1$d %2$s");
        assert_eq!(config.extensions, vec![".c"]);
        assert!(config.specifics.is_empty());
    }

    #[test]
    fn missing_editor_line_is_fatal() {
        let err = parse_str("extensions;\".c\"\n", "nano").unwrap_err();
        assert!(matches!(err, Error::EditorNotConfigured(name) if name == "nano"));
    }

    #[test]
    fn lines_without_semicolon_are_comments() {
        let config = parse_str(
            "just a note mentioning vim and files\nvim;\"vim +%1$d %2$s\"\n",
            "vim",
        )
        .unwrap();
        assert_eq!(config.editor_template, "vim +%1$d %2$s");
        assert!(config.specifics.is_empty());
    }

    #[test]
    fn editor_basename_strips_directories() {
        std::env::set_var("EDITOR", "/usr/local/bin/nvim");
        assert_eq!(editor_basename(), "nvim");
        std::env::set_var("EDITOR", "vi");
        assert_eq!(editor_basename(), "vi");
        std::env::remove_var("EDITOR");
        assert_eq!(editor_basename(), "vim");
    }

    #[test]
    fn unresolvable_exclude_paths_are_skipped() {
        let inodes = resolve_excluded_dirs(&["/definitely/not/here".to_string()]);
        assert!(inodes.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn exclude_paths_resolve_to_inodes() {
        let dir = tempfile::tempdir().unwrap();
        let inodes =
            resolve_excluded_dirs(&[dir.path().to_string_lossy().into_owned()]);
        assert_eq!(inodes.len(), 1);
    }
}
