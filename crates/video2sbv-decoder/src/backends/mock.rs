use tokio::sync::mpsc::Sender;

use crate::core::{
    DynFrameProvider, FrameResult, FrameStream, FrameStreamProvider, VideoFrame, VideoMetadata,
    spawn_stream_from_channel,
};
use video2sbv_types::{RGB_CHANNELS, frame_time};

const BACKGROUND: [u8; 3] = [255, 255, 255];
const INK: [u8; 3] = [0, 0, 0];

/// Replays an in-memory frame list as if it had been decoded from a file.
pub struct MockProvider {
    frames: Vec<VideoFrame>,
    fps: f64,
    channel_capacity: usize,
}

impl MockProvider {
    const DEFAULT_CHANNEL_CAPACITY: usize = 8;

    pub fn from_frames(frames: Vec<VideoFrame>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Four seconds of 640x360 video at 25 fps: caption A for two seconds,
    /// one second without captions, then caption B.
    pub fn synthetic() -> Self {
        let (width, height) = (640, 360);
        let caption_a = caption_frame(width, height, &[(200, 318, 440, 354)]);
        let caption_b = caption_frame(
            width,
            height,
            &[(150, 316, 300, 355), (320, 316, 490, 355)],
        );
        let blank = caption_frame(width, height, &[]);
        let mut frames = Vec::with_capacity(100);
        frames.extend(std::iter::repeat_n(caption_a, 50));
        frames.extend(std::iter::repeat_n(blank, 25));
        frames.extend(std::iter::repeat_n(caption_b, 25));
        Self::from_frames(frames, 25.0)
    }

    fn emit_frames(self, tx: Sender<FrameResult<VideoFrame>>) {
        let fps = self.fps;
        for (index, frame) in self.frames.into_iter().enumerate() {
            if tx.is_closed() {
                break;
            }
            let index = index as u64;
            let frame = frame
                .with_frame_index(Some(index))
                .with_timestamp(Some(frame_time(index, fps)));
            if tx.blocking_send(Ok(frame)).is_err() {
                break;
            }
        }
    }
}

impl FrameStreamProvider for MockProvider {
    fn metadata(&self) -> VideoMetadata {
        let total = self.frames.len() as u64;
        let first = self.frames.first();
        VideoMetadata {
            duration: Some(frame_time(total, self.fps)).filter(|_| self.fps > 0.0),
            fps: Some(self.fps),
            width: first.map(VideoFrame::width),
            height: first.map(VideoFrame::height),
            total_frames: Some(total),
        }
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = provider.channel_capacity;
        spawn_stream_from_channel(capacity, move |tx| provider.emit_frames(tx))
    }
}

/// White frame with solid black boxes, each given as `(x0, y0, x1, y1)`
/// with exclusive right and bottom edges.
pub fn caption_frame(width: u32, height: u32, boxes: &[(u32, u32, u32, u32)]) -> VideoFrame {
    let stride = width as usize * RGB_CHANNELS;
    let mut data = BACKGROUND.repeat(width as usize * height as usize);
    for &(x0, y0, x1, y1) in boxes {
        for y in y0.min(height)..y1.min(height) {
            let row = y as usize * stride;
            for x in x0.min(width)..x1.min(width) {
                let offset = row + x as usize * RGB_CHANNELS;
                data[offset..offset + RGB_CHANNELS].copy_from_slice(&INK);
            }
        }
    }
    VideoFrame::from_rgb_owned(width, height, stride, None, data)
        .unwrap_or_else(|_| VideoFrame::filled(width, height, BACKGROUND))
}

pub fn boxed_mock(channel_capacity: Option<usize>) -> DynFrameProvider {
    let provider = MockProvider::synthetic();
    match channel_capacity {
        Some(capacity) => Box::new(provider.with_channel_capacity(capacity)),
        None => Box::new(provider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[tokio::test(flavor = "multi_thread")]
    async fn mock_backend_emits_indexed_frames() {
        let frames = vec![caption_frame(4, 4, &[]), caption_frame(4, 4, &[(0, 0, 1, 1)])];
        let provider = Box::new(MockProvider::from_frames(frames, 25.0)) as DynFrameProvider;
        let metadata = provider.metadata();
        assert_eq!(metadata.total_frames, Some(2));
        assert_eq!(metadata.width, Some(4));

        let mut stream = provider.into_stream();
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert!(stream.next().await.is_none());
        assert_eq!(first.frame_index(), Some(0));
        assert_eq!(second.frame_index(), Some(1));
        assert_eq!(second.timestamp(), Some(Duration::from_millis(40)));
        assert_eq!(&second.row(0)[..3], &INK);
        assert_eq!(&second.row(0)[3..6], &BACKGROUND);
    }

    #[test]
    fn synthetic_video_spans_four_seconds() {
        let metadata = MockProvider::synthetic().metadata();
        assert_eq!(metadata.total_frames, Some(100));
        assert_eq!(metadata.duration, Some(Duration::from_secs(4)));
    }
}
