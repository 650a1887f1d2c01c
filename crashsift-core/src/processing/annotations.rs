//! Accident-frame annotation loader.
//!
//! Each line of the label file starts with a six-character video id followed
//! somewhere by a bracketed, comma-separated list of per-frame 0/1 flags:
//!
//! ```text
//! 000001,[0, 0, 0, 1, 1, 1],...
//! ```
//!
//! The accident frame is the index of the first `1`. Lines that do not fit
//! this shape are skipped one by one and counted.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Width of the id prefix on each annotation line.
const VIDEO_ID_WIDTH: usize = 6;

/// Mapping from video key (`<id>.mp4`) to accident frame index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationIndex {
    entries: BTreeMap<String, usize>,
    /// Lines that could not be parsed.
    pub skipped_lines: usize,
}

impl AnnotationIndex {
    #[must_use]
    pub fn accident_frame(&self, video_name: &str) -> Option<usize> {
        self.entries.get(video_name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Parses annotation text. Later duplicates of an id overwrite earlier
    /// ones.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut index = AnnotationIndex::default();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((key, frame)) => {
                    index.entries.insert(key, frame);
                }
                None => {
                    log::debug!("Skipping malformed annotation line {}", line_no + 1);
                    index.skipped_lines += 1;
                }
            }
        }
        index
    }
}

fn parse_line(line: &str) -> Option<(String, usize)> {
    let id = line.get(..VIDEO_ID_WIDTH)?;
    let start = line.find('[')?;
    let end = line.find(']')?;
    if end <= start {
        return None;
    }
    let mut first_positive = None;
    for (i, token) in line[start + 1..end].split(',').enumerate() {
        let flag: i64 = token.trim().parse().ok()?;
        if flag == 1 && first_positive.is_none() {
            first_positive = Some(i);
        }
    }
    first_positive.map(|frame| (format!("{id}.mp4"), frame))
}

/// Loads the annotation file.
///
/// A missing file is reported as [`CoreError::DataNotFound`].
pub fn load_annotations(path: &Path) -> CoreResult<AnnotationIndex> {
    if !path.is_file() {
        return Err(CoreError::not_found("annotation file", path));
    }
    let text = std::fs::read_to_string(path)?;
    let index = AnnotationIndex::parse(&text);
    log::info!(
        "Loaded {} annotations from {} ({} malformed lines skipped)",
        index.len(),
        path.display(),
        index.skipped_lines
    );
    Ok(index)
}

/// Like [`load_annotations`], but a missing file yields an empty index.
pub fn load_annotations_or_empty(path: &Path) -> CoreResult<AnnotationIndex> {
    match load_annotations(path) {
        Err(e) if e.is_data_not_found() => {
            log::warn!("{e}; continuing with no annotated videos");
            Ok(AnnotationIndex::default())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_positive_frame() {
        let index = AnnotationIndex::parse("000001,[0, 0, 1, 1, 0],x\n000002,[1,0]\n");
        assert_eq!(index.len(), 2);
        assert_eq!(index.accident_frame("000001.mp4"), Some(2));
        assert_eq!(index.accident_frame("000002.mp4"), Some(0));
        assert_eq!(index.skipped_lines, 0);
    }

    #[test]
    fn skips_malformed_lines_individually() {
        let text = "\
00001\n\
000003,no brackets\n\
000004,[0, x, 1]\n\
000005,[0, 0, 0]\n\
000006,]0,1[\n\
000007,[0,1]\n";
        let index = AnnotationIndex::parse(text);
        assert_eq!(index.len(), 1);
        assert_eq!(index.skipped_lines, 5);
        assert_eq!(index.accident_frame("000007.mp4"), Some(1));
    }

    #[test]
    fn missing_file_is_data_not_found() {
        let err = load_annotations(Path::new("/nonexistent/Crash-1500.txt")).unwrap_err();
        assert!(err.is_data_not_found());
        let empty = load_annotations_or_empty(Path::new("/nonexistent/Crash-1500.txt")).unwrap();
        assert!(empty.is_empty());
    }
}
