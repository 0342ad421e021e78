use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::constants::*;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Editor-wide settings. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Logical canvas width in pixels
    pub canvas_width: f64,
    /// Logical canvas height in pixels
    pub canvas_height: f64,
    /// Largest width an ingested element is scaled down to
    pub max_media_width: f64,
    /// Largest height an ingested element is scaled down to
    pub max_media_height: f64,
    /// Size used when natural dimensions are not discovered in time
    pub default_media_width: f64,
    pub default_media_height: f64,
    /// Size applied by "reset dimensions" on video elements
    pub video_reset_width: f64,
    pub video_reset_height: f64,
    /// Floor applied to width/height on every resize commit
    pub min_resize_dimension: f64,
    /// Minimum gap enforced between timing start and end
    pub min_timing_span_seconds: f64,
    /// Timeline duration before any video reports its own
    pub default_duration_seconds: f64,
    /// Visibility window length given to new images
    pub image_display_seconds: f64,
    /// Bounded wait for metadata discovery during ingestion
    pub metadata_timeout_ms: u64,
    /// Frame interval for the real-time scheduler
    pub frame_interval_ms: u64,
    /// Restart at 0 instead of stopping when playback reaches the end
    pub loop_playback: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            max_media_width: MAX_MEDIA_WIDTH,
            max_media_height: MAX_MEDIA_HEIGHT,
            default_media_width: DEFAULT_MEDIA_WIDTH,
            default_media_height: DEFAULT_MEDIA_HEIGHT,
            video_reset_width: VIDEO_RESET_WIDTH,
            video_reset_height: VIDEO_RESET_HEIGHT,
            min_resize_dimension: MIN_RESIZE_DIMENSION,
            min_timing_span_seconds: MIN_TIMING_SPAN_SECONDS,
            default_duration_seconds: DEFAULT_TIMELINE_DURATION_SECONDS,
            image_display_seconds: IMAGE_DISPLAY_SECONDS,
            metadata_timeout_ms: METADATA_TIMEOUT_MS,
            frame_interval_ms: FRAME_INTERVAL_MS,
            loop_playback: false,
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Replace values that would break engine invariants with their defaults.
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let positive = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };

        Self {
            canvas_width: positive(self.canvas_width, defaults.canvas_width),
            canvas_height: positive(self.canvas_height, defaults.canvas_height),
            max_media_width: positive(self.max_media_width, defaults.max_media_width),
            max_media_height: positive(self.max_media_height, defaults.max_media_height),
            default_media_width: positive(self.default_media_width, defaults.default_media_width),
            default_media_height: positive(self.default_media_height, defaults.default_media_height),
            video_reset_width: positive(self.video_reset_width, defaults.video_reset_width),
            video_reset_height: positive(self.video_reset_height, defaults.video_reset_height),
            min_resize_dimension: positive(self.min_resize_dimension, defaults.min_resize_dimension),
            min_timing_span_seconds: positive(
                self.min_timing_span_seconds,
                defaults.min_timing_span_seconds,
            ),
            default_duration_seconds: positive(
                self.default_duration_seconds,
                defaults.default_duration_seconds,
            ),
            image_display_seconds: positive(self.image_display_seconds, defaults.image_display_seconds),
            metadata_timeout_ms: if self.metadata_timeout_ms == 0 {
                defaults.metadata_timeout_ms
            } else {
                self.metadata_timeout_ms
            },
            frame_interval_ms: if self.frame_interval_ms == 0 {
                defaults.frame_interval_ms
            } else {
                self.frame_interval_ms
            },
            loop_playback: self.loop_playback,
        }
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Drop point used when the caller gives none: the canvas center.
    pub fn default_drop_point(&self) -> (f64, f64) {
        (self.canvas_width / 2.0, self.canvas_height / 2.0)
    }
}
