//! Extracts hardcoded subtitles from a video into an SBV file.
//!
//! Frames flow through three stages: [`stage::tracker`] locates the
//! subtitle strip, dedups it against the previous frame and runs OCR on
//! changes; [`stage::progress`] renders progress; [`stage::writer`] writes
//! the final cue list.

use thiserror::Error;

pub mod backend;
pub mod cli;
pub mod logging;
pub mod pipeline;
pub mod rectify;
pub mod sbv;
pub mod settings;
pub mod stage;
pub mod text;

use stage::writer::SubtitleWriterError;
use video2sbv_decoder::FrameError;
use video2sbv_locator::LocatorError;
use video2sbv_ocr::OcrError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] settings::ConfigError),
    #[error(transparent)]
    Decoder(#[from] FrameError),
    #[error("video reports no usable frame rate")]
    UnknownFrameRate,
    #[error("invalid region settings: {0}")]
    Locator(#[from] LocatorError),
    #[error("OCR engine unavailable: {0}")]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Writer(#[from] SubtitleWriterError),
}
