pub mod backends;
pub mod config;
pub mod core;

pub use config::{Backend, Configuration};
pub use core::{
    DynFrameProvider, FrameError, FrameResult, FrameStream, FrameStreamProvider, VideoFrame,
    VideoMetadata, spawn_stream_from_channel,
};
