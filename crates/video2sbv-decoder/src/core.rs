use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;
use futures_util::stream::unfold;
use tokio::sync::mpsc::{self, Sender};

pub use video2sbv_types::{FrameError, FrameResult, VideoFrame};

pub type FrameStream = Pin<Box<dyn Stream<Item = FrameResult<VideoFrame>> + Send>>;

pub type DynFrameProvider = Box<dyn FrameStreamProvider>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoMetadata {
    pub duration: Option<Duration>,
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub total_frames: Option<u64>,
}

impl VideoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration_and_fps(duration: Duration, fps: f64) -> Self {
        Self {
            duration: Some(duration),
            fps: Some(fps),
            ..Default::default()
        }
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64() * 1000.0)
    }

    pub fn calculate_total_frames(&self) -> Option<u64> {
        if let Some(total) = self.total_frames {
            return Some(total);
        }

        if let (Some(duration), Some(fps)) = (self.duration, self.fps) {
            let seconds = duration.as_secs_f64();
            let total = (seconds * fps).round();
            if total.is_finite() && total >= 0.0 {
                return Some(total as u64);
            }
        }

        None
    }
}

/// Source of decoded frames in presentation order.
///
/// Frames are tagged with their zero-based index. Timestamps are derived from
/// the index and the reported frame rate, not from container PTS values.
pub trait FrameStreamProvider: Send + 'static {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::default()
    }

    fn into_stream(self: Box<Self>) -> FrameStream;
}

pub fn spawn_stream_from_channel(
    capacity: usize,
    task: impl FnOnce(Sender<FrameResult<VideoFrame>>) + Send + 'static,
) -> FrameStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || task(tx));
    let stream = unfold(rx, |mut receiver| async {
        receiver.recv().await.map(|item| (item, receiver))
    });
    Box::pin(stream)
}
