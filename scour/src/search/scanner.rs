use std::fs::File;
use std::path::{Path, PathBuf};

use memchr::memchr;
use memmap2::Mmap;
use tracing::debug;

use super::matcher::Matcher;

/// Stored match-line text is capped at this many bytes. Truncation is
/// silent and may split a multibyte sequence.
pub const LINE_MAX: usize = 255;

/// One mapped file staged for the worker pair. The split divides the map at
/// the first newline at or after the midpoint; each worker scans one half.
#[derive(Debug)]
pub struct ScanJob {
    pub path: PathBuf,
    map: Mmap,
    split: usize,
}

impl ScanJob {
    /// Open and map a candidate file. Empty files and any open/stat/map
    /// failure yield `None`; the file is skipped without aborting the scan.
    pub fn open(path: &Path) -> Option<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                debug!(path = %path.display(), %err, "open failed, skipping");
                return None;
            }
        };
        let len = match file.metadata() {
            Ok(meta) if meta.len() > 0 => meta.len(),
            Ok(_) => return None,
            Err(err) => {
                debug!(path = %path.display(), %err, "stat failed, skipping");
                return None;
            }
        };
        if usize::try_from(len).is_err() {
            return None;
        }
        let map = match unsafe { Mmap::map(&file) } {
            Ok(map) => map,
            Err(err) => {
                debug!(path = %path.display(), %err, "mmap failed, skipping");
                return None;
            }
        };
        let split = split_point(&map);
        Some(Self {
            path: path.to_path_buf(),
            map,
            split,
        })
    }

    /// Bytes for worker 0: everything up to and including the split newline.
    pub fn first_half(&self) -> &[u8] {
        &self.map[..self.split]
    }

    /// Bytes for worker 1: empty when no newline followed the midpoint.
    pub fn second_half(&self) -> &[u8] {
        &self.map[self.split..]
    }
}

/// Index one past the first newline at or after the midpoint, or the full
/// length when the tail has no newline (a single worker takes the file).
fn split_point(bytes: &[u8]) -> usize {
    let mid = bytes.len() / 2;
    match memchr(b'\n', &bytes[mid..]) {
        Some(offset) => mid + offset + 1,
        None => bytes.len(),
    }
}

/// A matching line found by one worker: line number local to its half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    pub number: usize,
    pub text: Box<[u8]>,
}

/// Output of scanning one half: the matches plus the number of lines seen,
/// which becomes the line-number offset of the following half.
#[derive(Debug, Default)]
pub struct HalfScan {
    pub matches: Vec<LineMatch>,
    pub lines: usize,
}

/// Scan a byte range line by line. Line numbers are 1-based within the
/// range. A trailing segment without a final newline is still scanned.
pub fn scan_range(matcher: &Matcher, bytes: &[u8]) -> HalfScan {
    let mut scan = HalfScan::default();
    let mut rest = bytes;

    while !rest.is_empty() {
        let (line, next) = match memchr(b'\n', rest) {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        scan.lines += 1;
        if matcher.matches(line) {
            let end = line.len().min(LINE_MAX);
            scan.matches.push(LineMatch {
                number: scan.lines,
                text: line[..end].to_vec().into_boxed_slice(),
            });
        }
        rest = next;
    }

    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::matcher::MatchMode;
    use std::io::Write;
    use tempfile::tempdir;

    fn matcher(pattern: &str) -> Matcher {
        Matcher::new(pattern, MatchMode::Literal).unwrap()
    }

    #[test]
    fn split_lands_after_first_newline_past_midpoint() {
        let bytes = b"aaaa\nbbbb\ncccc\n";
        // midpoint 7 falls inside "bbbb"; its newline is at 9
        assert_eq!(split_point(bytes), 10);
    }

    #[test]
    fn split_without_tail_newline_keeps_one_half() {
        let bytes = b"aaaa\nbbbbbbbbbb";
        assert_eq!(split_point(bytes), bytes.len());
    }

    #[test]
    fn scan_numbers_lines_from_one() {
        let scan = scan_range(&matcher("hello"), b"hello\nworld\nhello world\n");
        assert_eq!(scan.lines, 3);
        let numbers: Vec<_> = scan.matches.iter().map(|m| m.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(&*scan.matches[0].text, b"hello");
        assert_eq!(&*scan.matches[1].text, b"hello world");
    }

    #[test]
    fn scan_counts_trailing_line_without_newline() {
        let scan = scan_range(&matcher("tail"), b"head\ntail");
        assert_eq!(scan.lines, 2);
        assert_eq!(scan.matches.len(), 1);
        assert_eq!(scan.matches[0].number, 2);
    }

    #[test]
    fn scan_ignores_empty_segment_after_final_newline() {
        let scan = scan_range(&matcher("x"), b"x\n");
        assert_eq!(scan.lines, 1);
        assert_eq!(scan.matches.len(), 1);
    }

    #[test]
    fn long_lines_are_truncated() {
        let long = "m".repeat(400);
        let data = format!("{long}\n");
        let scan = scan_range(&matcher("mmm"), data.as_bytes());
        assert_eq!(scan.matches.len(), 1);
        assert_eq!(scan.matches[0].text.len(), LINE_MAX);
    }

    #[test]
    fn halves_merge_like_a_single_scan() {
        let mut data = String::new();
        for i in 1..=100 {
            data.push_str(&format!("line number {i} with needle\n"));
        }
        let bytes = data.as_bytes();
        let m = matcher("needle");

        let whole = scan_range(&m, bytes);
        let split = split_point(bytes);
        let first = scan_range(&m, &bytes[..split]);
        let second = scan_range(&m, &bytes[split..]);

        let merged: Vec<usize> = first
            .matches
            .iter()
            .map(|mm| mm.number)
            .chain(second.matches.iter().map(|mm| mm.number + first.lines))
            .collect();
        let reference: Vec<usize> = whole.matches.iter().map(|mm| mm.number).collect();
        assert_eq!(merged, reference);
        assert_eq!(first.lines + second.lines, whole.lines);
    }

    #[test]
    fn open_skips_empty_and_missing_files() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty");
        std::fs::File::create(&empty).unwrap();
        assert!(ScanJob::open(&empty).is_none());
        assert!(ScanJob::open(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn open_maps_and_splits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"one\ntwo\nthree\n").unwrap();
        drop(file);

        let job = ScanJob::open(&path).unwrap();
        assert_eq!(
            job.first_half().len() + job.second_half().len(),
            b"one\ntwo\nthree\n".len()
        );
        assert!(job.first_half().ends_with(b"\n") || job.second_half().is_empty());
    }
}
