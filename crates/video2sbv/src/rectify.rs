//! Merges the timing of one SBV file with the text of another.
//!
//! The reader is deliberately loose: lines are trimmed, blank lines are
//! skipped, a line starting with `0:` opens a new entry and every other line
//! is appended to the text of the current entry. Timing lines of cues past
//! the first hour therefore read as text.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::sbv::write_atomic;

const TIMING_PREFIX: &str = "0:";

#[derive(Debug, Error)]
pub enum RectifyError {
    #[error("cue count mismatch: source has {source_count}, reference has {reference_count}")]
    CountMismatch {
        source_count: usize,
        reference_count: usize,
    },
    #[error("line {line} holds text before any timing line")]
    TextBeforeTiming { line: usize },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbvEntry {
    pub timing: String,
    pub text: String,
}

pub fn parse_entries(contents: &str) -> Result<Vec<SbvEntry>, RectifyError> {
    let mut entries: Vec<SbvEntry> = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(TIMING_PREFIX) {
            entries.push(SbvEntry {
                timing: line.to_string(),
                text: String::new(),
            });
            continue;
        }
        match entries.last_mut() {
            Some(entry) => entry.text.push_str(line),
            None => return Err(RectifyError::TextBeforeTiming { line: index + 1 }),
        }
    }
    Ok(entries)
}

/// Pairs source timings with reference texts by position.
pub fn merge_entries(
    source: Vec<SbvEntry>,
    reference: Vec<SbvEntry>,
) -> Result<Vec<SbvEntry>, RectifyError> {
    if source.len() != reference.len() {
        return Err(RectifyError::CountMismatch {
            source_count: source.len(),
            reference_count: reference.len(),
        });
    }
    Ok(source
        .into_iter()
        .zip(reference)
        .map(|(timed, texted)| SbvEntry {
            timing: timed.timing,
            text: texted.text,
        })
        .collect())
}

pub fn render_entries(entries: &[SbvEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        let _ = write!(output, "{}\n{}\n\n", entry.timing, entry.text);
    }
    output
}

pub fn rectify(source: &str, reference: &str) -> Result<String, RectifyError> {
    let merged = merge_entries(parse_entries(source)?, parse_entries(reference)?)?;
    Ok(render_entries(&merged))
}

/// Rectifies `source` against `reference` and writes the result to
/// `destination`. Returns the number of entries written.
pub async fn rectify_files(
    source: &Path,
    reference: &Path,
    destination: &Path,
) -> Result<usize, RectifyError> {
    let source_entries = parse_entries(&read(source).await?)?;
    let reference_entries = parse_entries(&read(reference).await?)?;
    let merged = merge_entries(source_entries, reference_entries)?;
    write_atomic(destination, render_entries(&merged).as_bytes())
        .await
        .map_err(|source| RectifyError::Write {
            path: destination.to_path_buf(),
            source,
        })?;
    Ok(merged.len())
}

async fn read(path: &Path) -> Result<String, RectifyError> {
    fs::read_to_string(path)
        .await
        .map_err(|source| RectifyError::Read {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "0:00:00.000,0:00:01.000\nhello\n\n0:00:01.000,0:00:02.500\nworld\n\n";
    const REFERENCE: &str = "0:00:00.100,0:00:00.900\n你好\n\n0:00:01.200,0:00:02.000\n世界\n\n";

    #[test]
    fn uses_source_timing_and_reference_text() {
        let merged = rectify(SOURCE, REFERENCE).unwrap();
        assert_eq!(
            merged,
            "0:00:00.000,0:00:01.000\n你好\n\n0:00:01.000,0:00:02.500\n世界\n\n"
        );
    }

    #[test]
    fn timing_lines_round_trip() {
        assert_eq!(rectify(SOURCE, SOURCE).unwrap(), SOURCE);
    }

    #[test]
    fn rejects_count_mismatch() {
        let short = "0:00:00.000,0:00:01.000\nonly\n\n";
        let err = rectify(SOURCE, short).unwrap_err();
        assert!(matches!(
            err,
            RectifyError::CountMismatch {
                source_count: 2,
                reference_count: 1
            }
        ));
        assert!(err.to_string().contains('2') && err.to_string().contains('1'));
    }

    #[test]
    fn continuation_lines_join_without_separator() {
        let entries = parse_entries("  0:00:00.000,0:00:01.000 \nfirst\n  second  \n\n\n").unwrap();
        assert_eq!(
            entries,
            vec![SbvEntry {
                timing: "0:00:00.000,0:00:01.000".into(),
                text: "firstsecond".into(),
            }]
        );
    }

    #[test]
    fn hour_long_timings_read_as_text() {
        let entries =
            parse_entries("0:59:59.000,1:00:01.000\nA\n\n1:00:01.000,1:00:02.000\nB\n\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "A1:00:01.000,1:00:02.000B");
    }

    #[test]
    fn text_before_timing_is_an_error() {
        let err = parse_entries("\nstray\n0:00:00.000,0:00:01.000\n").unwrap_err();
        assert!(matches!(err, RectifyError::TextBeforeTiming { line: 2 }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rectifies_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.sbv");
        let reference = dir.path().join("ref.sbv");
        let dst = dir.path().join("out/dst.sbv");
        std::fs::write(&src, SOURCE).unwrap();
        std::fs::write(&reference, REFERENCE).unwrap();
        let count = rectify_files(&src, &reference, &dst).await.unwrap();
        assert_eq!(count, 2);
        assert!(std::fs::read_to_string(&dst).unwrap().contains("你好"));
    }
}
