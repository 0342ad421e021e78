//! Playback clock: a stopped/running state machine advanced by frame callbacks.
//!
//! The clock never sleeps or spawns. It asks a [`FrameScheduler`] for one
//! callback at a time and advances `current_time` when the host reports that
//! the callback fired. At most one request is pending, and it is cancelled on
//! every transition into `Stopped`.

use serde::{Deserialize, Serialize};

use crate::core::{FrameRequest, FrameScheduler};
use crate::utils::format_time;

/// Observable playback values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Playhead in seconds, within `[0, duration]`
    pub current_time: f64,
    /// Timeline length in seconds, always positive
    pub duration: f64,
}

impl PlaybackState {
    pub fn new(duration: f64) -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.current_time >= self.duration
    }

    /// Transport readout, e.g. `01:05 / 02:00`.
    pub fn time_label(&self) -> String {
        format!("{} / {}", format_time(self.current_time), format_time(self.duration))
    }
}

/// Bookkeeping for one running stretch between play and stop.
#[derive(Debug, Clone, Copy)]
struct PlaybackRun {
    pending: FrameRequest,
    /// Timestamp of the first tick; `None` until it arrives
    origin: Option<f64>,
    /// Playhead when the run began
    start_time: f64,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: PlaybackState,
    run: Option<PlaybackRun>,
    looping: bool,
}

impl PlaybackClock {
    pub fn new(duration: f64, looping: bool) -> Self {
        Self {
            state: PlaybackState::new(sanitize_duration(duration, 1.0)),
            run: None,
            looping,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.state.current_time
    }

    pub fn duration(&self) -> f64 {
        self.state.duration
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.run.map(|run| run.pending)
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Start playback, or pause when already running.
    pub fn toggle(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.state.is_playing {
            self.pause(scheduler);
        } else {
            self.play(scheduler);
        }
    }

    /// Start playback from the current time. Restarts from 0 when at the end.
    /// Does nothing while already running.
    pub fn play(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.state.is_playing {
            return;
        }
        if self.state.is_at_end() {
            self.state.current_time = 0.0;
        }
        self.run = Some(PlaybackRun {
            pending: scheduler.request_frame(),
            origin: None,
            start_time: self.state.current_time,
        });
        self.state.is_playing = true;
        tracing::debug!(time = self.state.current_time, "Playback started");
    }

    /// Freeze the playhead where it is.
    pub fn pause(&mut self, scheduler: &mut dyn FrameScheduler) {
        if !self.state.is_playing {
            return;
        }
        self.stop_run(scheduler);
        tracing::debug!(time = self.state.current_time, "Playback paused");
    }

    /// Move the playhead, clamped to `[0, duration]`. A running clock keeps
    /// running from the new position.
    pub fn seek(&mut self, time: f64) -> bool {
        if !time.is_finite() {
            return false;
        }
        self.state.current_time = time.clamp(0.0, self.state.duration);
        if let Some(run) = self.run.as_mut() {
            run.start_time = self.state.current_time;
            run.origin = None;
        }
        tracing::debug!(time = self.state.current_time, "Seeked");
        true
    }

    /// Stop and rewind to 0. Duration is kept.
    pub fn reset(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.stop_run(scheduler);
        self.state.current_time = 0.0;
        tracing::debug!("Playback reset");
    }

    /// Replace the duration, pulling the playhead back inside it.
    pub fn set_duration(&mut self, duration: f64) -> bool {
        if !duration.is_finite() || duration <= 0.0 {
            return false;
        }
        self.state.duration = duration;
        self.state.current_time = self.state.current_time.min(duration);
        tracing::debug!(duration, "Timeline duration set");
        true
    }

    /// Advance on a fired frame callback. Returns false for stale or foreign
    /// requests, which leave the clock untouched.
    pub fn on_frame(
        &mut self,
        request: FrameRequest,
        timestamp: f64,
        scheduler: &mut dyn FrameScheduler,
    ) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        if run.pending != request || !self.state.is_playing || !timestamp.is_finite() {
            return false;
        }

        let origin = *run.origin.get_or_insert(timestamp);
        let elapsed = (timestamp - origin).max(0.0) + run.start_time;
        let current_time = elapsed.min(self.state.duration);
        self.state.current_time = current_time;

        if current_time < self.state.duration {
            run.pending = scheduler.request_frame();
        } else if self.looping {
            self.state.current_time = 0.0;
            run.start_time = 0.0;
            run.origin = None;
            run.pending = scheduler.request_frame();
            tracing::debug!("Playback looped");
        } else {
            self.run = None;
            self.state.is_playing = false;
            tracing::debug!(time = current_time, "Playback reached end");
        }
        true
    }

    /// Cancel the pending callback and enter `Stopped`.
    pub fn stop_run(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(run) = self.run.take() {
            scheduler.cancel_frame(run.pending);
        }
        self.state.is_playing = false;
    }
}

fn sanitize_duration(duration: f64, fallback: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        fallback
    }
}
