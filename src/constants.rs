//! Shared editor constants: canvas extent, media sizing, and timing defaults.
//! `EditorConfig` starts from these values; hosts may override them.

pub const CANVAS_WIDTH: f64 = 1280.0;
pub const CANVAS_HEIGHT: f64 = 720.0;

pub const MAX_MEDIA_WIDTH: f64 = 640.0;
pub const MAX_MEDIA_HEIGHT: f64 = 480.0;
pub const DEFAULT_MEDIA_WIDTH: f64 = 320.0;
pub const DEFAULT_MEDIA_HEIGHT: f64 = 180.0;
pub const VIDEO_RESET_WIDTH: f64 = 640.0;
pub const VIDEO_RESET_HEIGHT: f64 = 360.0;

pub const MIN_RESIZE_DIMENSION: f64 = 50.0;
/// Floor applied by the plain dimension setter (strict positivity).
pub const MIN_SET_DIMENSION: f64 = 1.0;

pub const DEFAULT_TIMELINE_DURATION_SECONDS: f64 = 60.0;
pub const IMAGE_DISPLAY_SECONDS: f64 = 5.0;
pub const MIN_TIMING_SPAN_SECONDS: f64 = 0.1;

pub const METADATA_TIMEOUT_MS: u64 = 1000;
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Seek offset used when grabbing a still frame from a video.
pub const PREVIEW_FRAME_SECONDS: f64 = 0.1;

pub const PLACEHOLDER_FRAME_SVG: &str = r##"<svg width="320" height="180" xmlns="http://www.w3.org/2000/svg"><rect width="320" height="180" fill="#333"/><text x="50%" y="50%" font-family="sans-serif" font-size="16px" text-anchor="middle" fill="#fff" dy=".3em">Video</text></svg>"##;
