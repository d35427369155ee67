use std::sync::Arc;
use std::time::Duration;

use futures_util::{StreamExt, stream::unfold};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use super::StreamBundle;
use crate::sbv::format_timestamp;
use crate::text::normalize_ocr_text;
use video2sbv_comparator::SubtitleComparator;
use video2sbv_locator::RegionLocalizer;
use video2sbv_ocr::{OcrEngine, OcrError, OcrRequest};
use video2sbv_types::{Cue, FrameError, FrameResult, Region, VideoFrame, frame_time};

const TRACKER_CHANNEL_CAPACITY: usize = 16;

pub type TrackerResult = Result<TrackerEvent, TrackerError>;

/// Which dedup gate merged a frame into the running cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeGate {
    /// The region matched the previous one pixel-wise; OCR was skipped.
    Pixel,
    /// OCR ran and produced the same text as the running cue.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    NoRegion,
    Extended { gate: MergeGate, end: Duration },
    Opened(Cue),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackStats {
    pub frames: u64,
    pub frames_with_region: u64,
    pub ocr_calls: u64,
    pub pixel_gate_hits: u64,
    pub text_gate_hits: u64,
    pub cues: u64,
}

/// Memory carried from one frame to the next.
///
/// The last emitted cue is the tail of `cues`.
#[derive(Debug, Default)]
pub struct TrackState {
    last_region: Option<Region>,
    cues: Vec<Cue>,
    stats: TrackStats,
}

impl TrackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_region(&self) -> Option<&Region> {
        self.last_region.as_ref()
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn stats(&self) -> TrackStats {
        self.stats
    }

    pub fn into_parts(self) -> (Vec<Cue>, TrackStats) {
        (self.cues, self.stats)
    }

    /// Advances the state by one frame.
    ///
    /// `recognize` is only invoked when the region is not a pixel match for
    /// the previous one. It must return post-processed text.
    pub fn step<F>(
        &mut self,
        frame_index: u64,
        fps: f64,
        region: Option<Region>,
        comparator: &dyn SubtitleComparator,
        recognize: F,
    ) -> Result<StepOutcome, OcrError>
    where
        F: FnOnce(&Region) -> Result<String, OcrError>,
    {
        self.stats.frames += 1;
        let Some(region) = region else {
            self.last_region = None;
            return Ok(StepOutcome::NoRegion);
        };
        self.stats.frames_with_region += 1;

        let start = frame_time(frame_index, fps);
        let end = frame_time(frame_index + 1, fps);

        let same_region = match &self.last_region {
            Some(previous) => {
                let report = comparator.compare(previous, &region);
                tracing::debug!(
                    frame = frame_index,
                    same = report.same_segment,
                    details = ?report.details,
                    "compared with previous region"
                );
                report.same_segment
            }
            None => false,
        };

        if same_region && let Some(cue) = self.cues.last_mut() {
            cue.end = end;
            self.stats.pixel_gate_hits += 1;
            self.last_region = Some(region);
            return Ok(StepOutcome::Extended {
                gate: MergeGate::Pixel,
                end,
            });
        }

        let text = recognize(&region)?;
        self.stats.ocr_calls += 1;
        self.last_region = Some(region);

        if let Some(cue) = self.cues.last_mut()
            && cue.text == text
        {
            cue.end = end;
            self.stats.text_gate_hits += 1;
            return Ok(StepOutcome::Extended {
                gate: MergeGate::Text,
                end,
            });
        }

        let cue = Cue::new(start, end, text, frame_index);
        self.cues.push(cue.clone());
        self.stats.cues += 1;
        Ok(StepOutcome::Opened(cue))
    }
}

pub enum TrackerEvent {
    Frame {
        frame_index: u64,
        timestamp: Option<Duration>,
        outcome: StepOutcome,
    },
    Finished {
        cues: Vec<Cue>,
        stats: TrackStats,
    },
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("decoder failed after {processed} frames: {error}")]
    Decoder { error: FrameError, processed: u64 },
    #[error("OCR failed on frame {frame_index}: {source}")]
    Ocr {
        frame_index: u64,
        #[source]
        source: OcrError,
    },
    #[error("tracker worker failed: {0}")]
    Join(String),
}

/// Runs localization, comparison and recognition over the frame stream, in
/// frame order.
pub struct SubtitleTracker {
    localizer: RegionLocalizer,
    comparator: Arc<dyn SubtitleComparator>,
    engine: Arc<dyn OcrEngine>,
    language: String,
    fps: f64,
}

impl SubtitleTracker {
    pub fn new(
        localizer: RegionLocalizer,
        comparator: Arc<dyn SubtitleComparator>,
        engine: Arc<dyn OcrEngine>,
        language: String,
        fps: f64,
    ) -> Self {
        Self {
            localizer,
            comparator,
            engine,
            language,
            fps,
        }
    }

    pub fn attach(
        self,
        input: StreamBundle<FrameResult<VideoFrame>>,
    ) -> StreamBundle<TrackerResult> {
        let StreamBundle {
            stream,
            total_frames,
        } = input;

        let (tx, rx) = mpsc::channel::<TrackerResult>(TRACKER_CHANNEL_CAPACITY);

        let tracker = Arc::new(self);

        tokio::spawn(async move {
            let mut upstream = stream;
            let mut state = TrackState::new();
            let mut processed = 0u64;

            while let Some(frame) = upstream.next().await {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(error) => {
                        let _ = tx.send(Err(TrackerError::Decoder { error, processed })).await;
                        return;
                    }
                };
                let frame_index = frame.frame_index().unwrap_or(processed);
                processed += 1;

                let timestamp = frame.timestamp();

                // Localization and OCR block, so each frame runs off the runtime.
                let worker = Arc::clone(&tracker);
                let joined = tokio::task::spawn_blocking(move || {
                    let result = worker.process(&mut state, frame_index, &frame);
                    (state, result)
                })
                .await;
                let result = match joined {
                    Ok((returned, result)) => {
                        state = returned;
                        result
                    }
                    Err(err) => {
                        let _ = tx.send(Err(TrackerError::Join(err.to_string()))).await;
                        return;
                    }
                };

                let event = match result {
                    Ok(outcome) => Ok(TrackerEvent::Frame {
                        frame_index,
                        timestamp,
                        outcome,
                    }),
                    Err(source) => Err(TrackerError::Ocr {
                        frame_index,
                        source,
                    }),
                };
                let is_err = event.is_err();
                if tx.send(event).await.is_err() || is_err {
                    return;
                }
            }

            let (cues, stats) = state.into_parts();
            let _ = tx.send(Ok(TrackerEvent::Finished { cues, stats })).await;
        });

        let stream = Box::pin(unfold(rx, |mut receiver| async {
            receiver.recv().await.map(|item| (item, receiver))
        }));

        StreamBundle::new(stream, total_frames)
    }

    fn process(
        &self,
        state: &mut TrackState,
        frame_index: u64,
        frame: &VideoFrame,
    ) -> Result<StepOutcome, OcrError> {
        let region = self.localizer.locate(frame);
        let outcome = state.step(
            frame_index,
            self.fps,
            region,
            self.comparator.as_ref(),
            |region| {
                let request = OcrRequest::for_region(region, &self.language);
                let response = self.engine.recognize(&request)?;
                Ok(normalize_ocr_text(&response.text))
            },
        )?;
        if let StepOutcome::Opened(cue) = &outcome {
            tracing::info!(
                frame = frame_index,
                start = %format_timestamp(cue.start),
                text = %cue.text,
                "new cue"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use video2sbv_comparator::SimilarityComparator;
    use video2sbv_types::RegionBounds;

    fn region(fill: u8, width: u32) -> Region {
        Region::from_owned(
            RegionBounds::new(10, 300, width, 34),
            vec![fill; (width * 34) as usize],
        )
        .unwrap()
    }

    fn run(frames: &[(Option<Region>, &str)]) -> (TrackState, Vec<StepOutcome>, usize) {
        let comparator = SimilarityComparator::default();
        let mut state = TrackState::new();
        let mut outcomes = Vec::new();
        let mut ocr_calls = 0;
        for (index, (region, text)) in frames.iter().enumerate() {
            let outcome = state
                .step(index as u64, 25.0, region.clone(), &comparator, |_| {
                    ocr_calls += 1;
                    Ok(text.to_string())
                })
                .unwrap();
            outcomes.push(outcome);
        }
        (state, outcomes, ocr_calls)
    }

    #[test]
    fn identical_regions_skip_ocr() {
        let a = region(200, 120);
        let frames: Vec<_> = (0..5).map(|_| (Some(a.clone()), "A")).collect();
        let (state, outcomes, ocr_calls) = run(&frames);
        assert_eq!(ocr_calls, 1);
        assert_eq!(state.cues().len(), 1);
        assert_eq!(state.cues()[0].end, Duration::from_millis(200));
        assert!(matches!(
            outcomes[4],
            StepOutcome::Extended {
                gate: MergeGate::Pixel,
                ..
            }
        ));
        assert_eq!(state.stats().pixel_gate_hits, 4);
    }

    #[test]
    fn same_text_after_gap_extends_previous_cue() {
        let a = region(200, 120);
        let (state, outcomes, ocr_calls) =
            run(&[(Some(a.clone()), "A"), (None, ""), (Some(a), "A")]);
        assert_eq!(ocr_calls, 2);
        assert_eq!(outcomes[1], StepOutcome::NoRegion);
        assert_eq!(state.cues().len(), 1);
        assert_eq!(state.cues()[0].start, Duration::ZERO);
        assert_eq!(state.cues()[0].end, Duration::from_millis(120));
        assert_eq!(state.stats().text_gate_hits, 1);
    }

    #[test]
    fn changed_region_with_new_text_opens_cue() {
        let (state, outcomes, _) =
            run(&[(Some(region(200, 120)), "A"), (Some(region(200, 200)), "B")]);
        assert_eq!(state.cues().len(), 2);
        assert_eq!(
            outcomes[1],
            StepOutcome::Opened(Cue::new(
                Duration::from_millis(40),
                Duration::from_millis(80),
                "B".into(),
                1
            ))
        );
    }

    #[test]
    fn missing_region_resets_last_region() {
        let (state, _, _) = run(&[(Some(region(200, 120)), "A"), (None, "")]);
        assert!(state.last_region().is_none());
        assert_eq!(state.stats().frames, 2);
        assert_eq!(state.stats().frames_with_region, 1);
    }

    #[test]
    fn empty_text_still_opens_a_cue() {
        let (state, _, _) = run(&[(Some(region(200, 120)), "")]);
        assert_eq!(state.cues().len(), 1);
        assert_eq!(state.cues()[0].text, "");
    }

    #[test]
    fn ocr_errors_propagate() {
        let comparator = SimilarityComparator::default();
        let mut state = TrackState::new();
        let result = state.step(0, 25.0, Some(region(1, 64)), &comparator, |_| {
            Err(OcrError::backend("boom"))
        });
        assert!(result.is_err());
        assert!(state.cues().is_empty());
    }

    #[test]
    fn adjacent_cues_never_share_text() {
        let frames = [
            (Some(region(200, 120)), "A"),
            (Some(region(200, 200)), "A"),
            (Some(region(200, 120)), "B"),
            (None, ""),
            (Some(region(200, 200)), "B"),
            (Some(region(200, 120)), "C"),
        ];
        let (state, _, _) = run(&frames);
        let texts: Vec<_> = state.cues().iter().map(|cue| cue.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
        for pair in state.cues().windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert!(pair[0].start <= pair[0].end);
        }
    }
}
