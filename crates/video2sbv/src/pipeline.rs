use std::path::PathBuf;
use std::sync::Arc;

use tokio_stream::StreamExt;

use crate::PipelineError;
use crate::cli::OcrBackend;
use crate::settings::EffectiveSettings;
use crate::stage::StreamBundle;
use crate::stage::progress::Progress;
use crate::stage::tracker::{SubtitleTracker, TrackStats, TrackerError};
use crate::stage::writer::{SubtitleWriter, SubtitleWriterError, WriterStatus};
use video2sbv_comparator::{ComparatorSettings, SimilarityComparator};
use video2sbv_decoder::DynFrameProvider;
use video2sbv_locator::{LocatorConfig, RegionLocalizer};
use video2sbv_ocr::{NoopOcrEngine, OcrEngine, OcrError};
#[cfg(feature = "ocr-tesseract")]
use video2sbv_ocr::TesseractOcrEngine;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub output: PathBuf,
    pub json_dump: Option<PathBuf>,
    pub locator: LocatorConfig,
    pub comparator: ComparatorSettings,
    pub ocr: OcrPipelineConfig,
    pub progress: bool,
}

#[derive(Clone, Debug)]
pub struct OcrPipelineConfig {
    pub backend: OcrBackend,
    pub language: String,
    pub tesseract: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        Self {
            output: settings.output.clone(),
            json_dump: settings.json_dump.clone(),
            locator: settings.locator,
            comparator: settings.comparator,
            ocr: OcrPipelineConfig {
                backend: settings.ocr.backend,
                language: settings.ocr.lang.clone(),
                tesseract: settings.ocr.tesseract.clone(),
            },
            progress: settings.progress,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub cues: usize,
    pub stats: TrackStats,
}

/// Runs the full extraction over `provider` with the configured OCR engine.
///
/// On failure the error is paired with the number of frames that were
/// decoded before it happened.
pub async fn run_pipeline(
    provider: DynFrameProvider,
    pipeline: &PipelineConfig,
) -> Result<RunSummary, (PipelineError, u64)> {
    let engine = build_ocr_engine(&pipeline.ocr).map_err(|err| (PipelineError::Ocr(err), 0u64))?;
    run_pipeline_with_engine(provider, pipeline, engine).await
}

/// Same as [`run_pipeline`] with a caller supplied OCR engine. The engine is
/// warmed up before any frame is decoded.
pub async fn run_pipeline_with_engine(
    provider: DynFrameProvider,
    pipeline: &PipelineConfig,
    engine: Arc<dyn OcrEngine>,
) -> Result<RunSummary, (PipelineError, u64)> {
    engine
        .warm_up()
        .map_err(|err| (PipelineError::Ocr(err), 0u64))?;

    let metadata = provider.metadata();
    let fps = metadata
        .fps
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .ok_or((PipelineError::UnknownFrameRate, 0u64))?;
    let localizer =
        RegionLocalizer::new(pipeline.locator).map_err(|err| (PipelineError::Locator(err), 0u64))?;
    let comparator = Arc::new(SimilarityComparator::new(pipeline.comparator));

    tracing::info!(
        fps,
        width = metadata.width,
        height = metadata.height,
        total_frames = metadata.total_frames,
        ocr = engine.name(),
        "starting extraction"
    );

    let total_frames = metadata.calculate_total_frames();
    let frames = StreamBundle::new(provider.into_stream(), total_frames);

    let tracked = SubtitleTracker::new(
        localizer,
        comparator,
        engine,
        pipeline.ocr.language.clone(),
        fps,
    )
    .attach(frames);
    let monitored = Progress::new("video2sbv", pipeline.progress).attach(tracked);
    let written = SubtitleWriter::new(pipeline.output.clone())
        .with_json_dump(pipeline.json_dump.clone())
        .attach(monitored);

    let StreamBundle { stream, .. } = written;
    let mut events = stream;
    let mut processed = 0u64;

    while let Some(event) = events.next().await {
        match event {
            Ok(event) => match event.status {
                WriterStatus::Pending => processed += 1,
                WriterStatus::Completed { path, cues } => {
                    let stats = event.stats.unwrap_or_default();
                    log_stats(&stats);
                    tracing::info!(path = %path.display(), cues, "subtitle output written");
                    return Ok(RunSummary {
                        output: path,
                        cues,
                        stats,
                    });
                }
            },
            Err(err) => {
                let processed = match &err {
                    SubtitleWriterError::Tracker(TrackerError::Decoder { processed, .. }) => {
                        *processed
                    }
                    _ => processed,
                };
                return Err((PipelineError::Writer(err), processed));
            }
        }
    }

    Err((PipelineError::Writer(SubtitleWriterError::Incomplete), processed))
}

fn log_stats(stats: &TrackStats) {
    tracing::info!(
        frames = stats.frames,
        frames_with_region = stats.frames_with_region,
        ocr_calls = stats.ocr_calls,
        pixel_gate_hits = stats.pixel_gate_hits,
        text_gate_hits = stats.text_gate_hits,
        cues = stats.cues,
        "extraction finished"
    );
}

fn build_ocr_engine(config: &OcrPipelineConfig) -> Result<Arc<dyn OcrEngine>, OcrError> {
    match config.backend {
        OcrBackend::Tesseract => build_tesseract_engine(config),
        OcrBackend::Noop => Ok(Arc::new(NoopOcrEngine)),
    }
}

#[cfg(feature = "ocr-tesseract")]
fn build_tesseract_engine(config: &OcrPipelineConfig) -> Result<Arc<dyn OcrEngine>, OcrError> {
    let mut engine = TesseractOcrEngine::new(config.language.clone());
    if let Some(binary) = &config.tesseract {
        engine = engine.with_binary(binary.clone());
    }
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "ocr-tesseract"))]
fn build_tesseract_engine(_config: &OcrPipelineConfig) -> Result<Arc<dyn OcrEngine>, OcrError> {
    Err(OcrError::configuration(
        "tesseract OCR backend is not available in this build",
    ))
}
