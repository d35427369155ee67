use std::path::{Path, PathBuf};

use futures_util::{StreamExt, stream::unfold};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use super::StreamBundle;
use super::tracker::{TrackStats, TrackerError, TrackerEvent, TrackerResult};
use crate::sbv::{build_sbv, write_atomic};
use video2sbv_types::Cue;

const WRITER_CHANNEL_CAPACITY: usize = 4;

pub type WriterResult = Result<WriterEvent, SubtitleWriterError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterStatus {
    Pending,
    Completed { path: PathBuf, cues: usize },
}

#[derive(Debug, Clone)]
pub struct WriterEvent {
    pub frame_index: Option<u64>,
    pub status: WriterStatus,
    pub stats: Option<TrackStats>,
}

#[derive(Debug, Error)]
pub enum SubtitleWriterError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize cue dump: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame stream ended without a final tracker event")]
    Incomplete,
}

/// Collects the final cue list and writes it as SBV.
pub struct SubtitleWriter {
    output_path: PathBuf,
    json_dump: Option<PathBuf>,
}

impl SubtitleWriter {
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            json_dump: None,
        }
    }

    pub fn with_json_dump(mut self, path: Option<PathBuf>) -> Self {
        self.json_dump = path;
        self
    }

    pub fn attach(self, input: StreamBundle<TrackerResult>) -> StreamBundle<WriterResult> {
        let StreamBundle {
            stream,
            total_frames,
        } = input;

        let (tx, rx) = mpsc::channel::<WriterResult>(WRITER_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut upstream = stream;

            while let Some(event) = upstream.next().await {
                match event {
                    Ok(TrackerEvent::Frame { frame_index, .. }) => {
                        let pending = WriterEvent {
                            frame_index: Some(frame_index),
                            status: WriterStatus::Pending,
                            stats: None,
                        };
                        if tx.send(Ok(pending)).await.is_err() {
                            return;
                        }
                    }
                    Ok(TrackerEvent::Finished { cues, stats }) => {
                        let result = self.finish(&cues, stats).await;
                        let _ = tx.send(result).await;
                        return;
                    }
                    Err(err) => {
                        let _ = tx.send(Err(SubtitleWriterError::Tracker(err))).await;
                        return;
                    }
                }
            }

            let _ = tx.send(Err(SubtitleWriterError::Incomplete)).await;
        });

        let stream = Box::pin(unfold(rx, |mut receiver| async {
            receiver.recv().await.map(|item| (item, receiver))
        }));

        StreamBundle::new(stream, total_frames)
    }

    async fn finish(&self, cues: &[Cue], stats: TrackStats) -> WriterResult {
        write_file(&self.output_path, build_sbv(cues).as_bytes()).await?;
        if let Some(path) = &self.json_dump {
            let dump = CueDump { cues, stats };
            let contents = serde_json::to_vec_pretty(&dump)?;
            write_file(path, &contents).await?;
        }
        Ok(WriterEvent {
            frame_index: None,
            status: WriterStatus::Completed {
                path: self.output_path.clone(),
                cues: cues.len(),
            },
            stats: Some(stats),
        })
    }
}

#[derive(Serialize)]
struct CueDump<'a> {
    cues: &'a [Cue],
    stats: TrackStats,
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), SubtitleWriterError> {
    write_atomic(path, contents)
        .await
        .map_err(|source| SubtitleWriterError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn finish_writes_sbv_and_json_dump() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.sbv");
        let dump = dir.path().join("cues.json");
        let writer = SubtitleWriter::new(output.clone()).with_json_dump(Some(dump.clone()));
        let cues = vec![Cue::new(
            Duration::ZERO,
            Duration::from_secs(1),
            "A".into(),
            0,
        )];
        let event = writer.finish(&cues, TrackStats::default()).await.unwrap();
        assert_eq!(
            event.status,
            WriterStatus::Completed {
                path: output.clone(),
                cues: 1
            }
        );
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "0:00:00.000,0:00:01.000\nA\n\n"
        );
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
        assert_eq!(json["cues"][0]["text"], "A");
        assert_eq!(json["cues"][0]["end_ms"], 1000);
    }
}
