use std::time::Instant;

use futures_util::{StreamExt, stream::unfold};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;

use super::StreamBundle;
use super::tracker::{StepOutcome, TrackerEvent, TrackerResult};

const PROGRESS_CHANNEL_CAPACITY: usize = 4;

/// Pass-through stage that renders a progress bar for tracker events.
pub struct Progress {
    label: &'static str,
    enabled: bool,
}

impl Progress {
    pub fn new(label: &'static str, enabled: bool) -> Self {
        Self { label, enabled }
    }

    pub fn attach(self, input: StreamBundle<TrackerResult>) -> StreamBundle<TrackerResult> {
        let StreamBundle {
            stream,
            total_frames,
        } = input;

        let (tx, rx) = mpsc::channel::<TrackerResult>(PROGRESS_CHANNEL_CAPACITY);
        let label = self.label;
        let enabled = self.enabled;

        tokio::spawn(async move {
            let mut upstream = stream;
            let mut monitor = ProgressMonitor::new(label, total_frames, enabled);

            while let Some(event) = upstream.next().await {
                monitor.observe(&event);
                if tx.send(event).await.is_err() {
                    monitor.finish_if_needed();
                    return;
                }
            }

            monitor.finish_if_needed();
        });

        let stream = Box::pin(unfold(rx, |mut receiver| async {
            receiver.recv().await.map(|item| (item, receiver))
        }));

        StreamBundle::new(stream, total_frames)
    }
}

struct ProgressMonitor {
    bar: ProgressBar,
    total_frames: Option<u64>,
    frames_seen: u64,
    cues: u64,
    started: Instant,
    finished: bool,
}

impl ProgressMonitor {
    fn new(label: &'static str, total_frames: Option<u64>, enabled: bool) -> Self {
        let bar = match total_frames {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(bar_style());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(spinner_style());
                bar
            }
        };
        if !enabled {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_prefix(label);

        Self {
            bar,
            total_frames,
            frames_seen: 0,
            cues: 0,
            started: Instant::now(),
            finished: false,
        }
    }

    fn observe(&mut self, event: &TrackerResult) {
        match event {
            Ok(TrackerEvent::Frame {
                frame_index,
                outcome,
                ..
            }) => {
                self.frames_seen = self.frames_seen.saturating_add(1);
                if matches!(outcome, StepOutcome::Opened(_)) {
                    self.cues = self.cues.saturating_add(1);
                }
                match self.total_frames {
                    Some(total) => {
                        let next = frame_index.saturating_add(1);
                        if next > total {
                            self.bar.set_length(next);
                        }
                        self.bar.set_position(next);
                    }
                    None => self.bar.inc(1),
                }
                self.update_speed();
            }
            Ok(TrackerEvent::Finished { .. }) => self.finish_if_needed(),
            Err(err) => self.fail_with_reason(&err.to_string()),
        }
    }

    fn fail_with_reason(&mut self, reason: &str) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.bar.abandon_with_message(format!(
            "failed after {} frames: {reason}",
            self.frames_seen
        ));
    }

    fn finish_if_needed(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.bar.set_length(self.frames_seen);
        self.bar.set_position(self.frames_seen);
        self.bar.finish_with_message(format!(
            "processed {} frames, {} cues",
            self.frames_seen, self.cues
        ));
    }

    fn update_speed(&self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = self.frames_seen as f64 / elapsed;
            self.bar
                .set_message(format!("{rate:.1} fps • {} cues", self.cues));
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold} {bar:40.cyan/blue} {percent:>3.bold}% {pos:>5}/{len:<5} [{elapsed_precise:.dim}<{eta_precise:.dim}] {msg:.yellow}",
    )
    .expect("invalid progress bar template")
    .progress_chars("█▉▊▋▌▍▎▏ ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold} {spinner:.cyan.bold} [{elapsed_precise:.dim}] {pos:>5}f {msg:.yellow}",
    )
    .expect("invalid progress spinner template")
    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}
