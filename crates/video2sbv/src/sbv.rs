//! SBV serialization.
//!
//! Each cue becomes `<start>,<end>\n<text>\n\n` with `H:MM:SS.mmm`
//! timestamps.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use video2sbv_types::Cue;

/// Formats `time` as `H:MM:SS.mmm`. Hours are not padded; sub-millisecond
/// precision is truncated.
pub fn format_timestamp(time: Duration) -> String {
    let total_ms = time.as_millis();
    let total_seconds = total_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    let millis = total_ms % 1000;
    format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
}

pub fn timing_line(cue: &Cue) -> String {
    format!("{},{}", format_timestamp(cue.start), format_timestamp(cue.end))
}

pub fn build_sbv(cues: &[Cue]) -> String {
    let mut output = String::new();
    for cue in cues {
        let _ = write!(output, "{}\n{}\n\n", timing_line(cue), cue.text);
    }
    output
}

/// Writes `contents` to a sibling temporary file and renames it over `path`,
/// creating missing parent directories first.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_sibling(path);
    if let Err(err) = fs::write(&temp_path, contents).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(err);
    }
    if let Err(err) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(err);
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_lives_next_to_target() {
        let temp = temp_sibling(Path::new("/tmp/out/movie.sbv"));
        assert_eq!(temp.parent(), Some(Path::new("/tmp/out")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".movie.sbv."));
        assert!(name.ends_with(".tmp"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn atomic_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.sbv");
        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn timestamp_uses_modulo_minutes_and_seconds() {
        assert_eq!(format_timestamp(Duration::from_millis(3_723_456)), "1:02:03.456");
        assert_eq!(format_timestamp(Duration::ZERO), "0:00:00.000");
        assert_eq!(format_timestamp(Duration::from_secs(59 * 60 + 59)), "0:59:59.000");
        assert_eq!(format_timestamp(Duration::from_secs(36_000)), "10:00:00.000");
    }

    #[test]
    fn timestamp_truncates_microseconds() {
        assert_eq!(format_timestamp(Duration::from_micros(1_033_366)), "0:00:01.033");
        assert_eq!(format_timestamp(Duration::from_micros(999)), "0:00:00.000");
    }

    #[test]
    fn cues_are_written_as_blocks() {
        let cues = vec![
            Cue::new(Duration::ZERO, Duration::from_secs(1), "A".into(), 0),
            Cue::new(
                Duration::from_secs(1),
                Duration::from_millis(2_040),
                "B".into(),
                25,
            ),
        ];
        assert_eq!(
            build_sbv(&cues),
            "0:00:00.000,0:00:01.000\nA\n\n0:00:01.000,0:00:02.040\nB\n\n"
        );
        assert_eq!(build_sbv(&[]), "");
    }
}
