#![cfg(feature = "backend-ffmpeg")]

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg::util::error::{EAGAIN, EWOULDBLOCK};
use ffmpeg_next as ffmpeg;
use tokio::sync::mpsc;

use crate::core::{
    DynFrameProvider, FrameError, FrameResult, FrameStream, FrameStreamProvider, VideoFrame,
    VideoMetadata, spawn_stream_from_channel,
};
use video2sbv_types::{RGB_CHANNELS, frame_time};

const BACKEND_NAME: &str = "ffmpeg";
const DEFAULT_CHANNEL_CAPACITY: usize = 8;

pub struct FfmpegProvider {
    input: PathBuf,
    metadata: VideoMetadata,
    channel_capacity: usize,
}

impl FfmpegProvider {
    pub fn open<P: AsRef<Path>>(path: P, channel_capacity: Option<usize>) -> FrameResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file {} does not exist", path.display()),
            )));
        }
        ffmpeg::init().map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        let metadata = read_metadata(path)?;
        Ok(Self {
            input: path.to_path_buf(),
            metadata,
            channel_capacity: channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY).max(1),
        })
    }

    fn decode_loop(&self, tx: mpsc::Sender<FrameResult<VideoFrame>>) -> FrameResult<()> {
        let mut ictx = ffmpeg::format::input(&self.input)
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        let input_stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| FrameError::backend_failure(BACKEND_NAME, "no video stream found"))?;
        let stream_index = input_stream.index();

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        let mut decoder = context
            .decoder()
            .video()
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;

        let mut scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;

        let fps = self.metadata.fps.unwrap_or_default();
        let mut next_index = 0u64;
        let mut decoded = ffmpeg::util::frame::Video::empty();
        let mut converted = ffmpeg::util::frame::Video::empty();

        // Returns Ok(false) once the receiving side has gone away.
        let mut drain = |decoder: &mut ffmpeg::decoder::Video| -> FrameResult<bool> {
            loop {
                match decoder.receive_frame(&mut decoded) {
                    Ok(_) => {
                        scaler.run(&decoded, &mut converted).map_err(|err| {
                            FrameError::backend_failure(BACKEND_NAME, err.to_string())
                        })?;
                        let frame = frame_from_converted(&converted)?
                            .with_frame_index(Some(next_index))
                            .with_timestamp(Some(frame_time(next_index, fps)));
                        next_index += 1;
                        if tx.blocking_send(Ok(frame)).is_err() {
                            return Ok(false);
                        }
                    }
                    Err(err) => {
                        if is_retryable_error(&err) || matches!(err, ffmpeg::Error::Eof) {
                            return Ok(true);
                        }
                        return Err(FrameError::backend_failure(BACKEND_NAME, err.to_string()));
                    }
                }
            }
        };

        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            if let Err(err) = decoder.send_packet(&packet) {
                if !is_retryable_error(&err) {
                    return Err(FrameError::backend_failure(BACKEND_NAME, err.to_string()));
                }
            }
            if !drain(&mut decoder)? {
                return Ok(());
            }
        }

        decoder
            .send_eof()
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        drain(&mut decoder)?;
        Ok(())
    }
}

impl FrameStreamProvider for FfmpegProvider {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = provider.channel_capacity;
        spawn_stream_from_channel(capacity, move |tx| {
            let result = provider.decode_loop(tx.clone());
            if let Err(err) = result {
                let _ = tx.blocking_send(Err(err));
            }
        })
    }
}

fn read_metadata(path: &Path) -> FrameResult<VideoMetadata> {
    let ictx = ffmpeg::format::input(&path)
        .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| FrameError::backend_failure(BACKEND_NAME, "no video stream found"))?;

    let rate = stream.avg_frame_rate();
    let rate = if rate.numerator() > 0 && rate.denominator() > 0 {
        rate
    } else {
        stream.rate()
    };
    let fps = (rate.numerator() > 0 && rate.denominator() > 0).then(|| f64::from(rate));

    let duration = (ictx.duration() > 0).then(|| {
        Duration::from_secs_f64(ictx.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE))
    });
    let total_frames = u64::try_from(stream.frames()).ok().filter(|&n| n > 0);

    let params = stream.parameters();
    let (width, height) = match ffmpeg::codec::context::Context::from_parameters(params)
        .and_then(|ctx| ctx.decoder().video())
    {
        Ok(decoder) => (Some(decoder.width()), Some(decoder.height())),
        Err(_) => (None, None),
    };

    let metadata = VideoMetadata {
        duration,
        fps,
        width,
        height,
        total_frames,
    };
    Ok(VideoMetadata {
        total_frames: metadata.calculate_total_frames(),
        ..metadata
    })
}

fn frame_from_converted(frame: &ffmpeg::util::frame::Video) -> FrameResult<VideoFrame> {
    let plane = frame.data(0);
    let stride = frame.stride(0);
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * RGB_CHANNELS;
    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let offset = row * stride;
        buffer.extend_from_slice(&plane[offset..offset + row_bytes]);
    }
    VideoFrame::from_rgb_owned(width, height, row_bytes, None, buffer)
}

fn is_retryable_error(error: &ffmpeg::Error) -> bool {
    matches!(
        error,
        ffmpeg::Error::Other { errno }
            if *errno == EAGAIN || *errno == EWOULDBLOCK
    )
}

pub fn boxed_ffmpeg<P: AsRef<Path>>(
    path: P,
    channel_capacity: Option<usize>,
) -> FrameResult<DynFrameProvider> {
    Ok(Box::new(FfmpegProvider::open(path, channel_capacity)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_returns_error() {
        let result = FfmpegProvider::open("/tmp/video2sbv-nonexistent-file.mp4", None);
        assert!(matches!(result, Err(FrameError::Io(_))));
    }
}
