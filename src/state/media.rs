//! Media element model
//!
//! Geometry and timing records for one placed image or video, plus the
//! invariant-preserving mutators the registry routes updates through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{OwnedResource, ResourceHandle};

pub type MediaId = Uuid;

/// The kind of a placed element. Fixed at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type; anything other than `image/*` or `video/*` is unsupported.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

/// Top-left offset in canvas pixels. May sit outside the canvas mid-drag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pixel size; both axes strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Floor both axes at `min`. Returns `None` for non-finite input.
    pub fn floored(width: f64, height: f64, min: f64) -> Option<Self> {
        if !width.is_finite() || !height.is_finite() {
            return None;
        }
        Some(Self {
            width: width.max(min),
            height: height.max(min),
        })
    }
}

/// Visibility window on the shared timeline, in seconds. `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub start: f64,
    pub end: f64,
}

impl Timing {
    /// Build a window whose end is pushed to at least `start + min_span`.
    pub fn normalized(start: f64, end: f64, min_span: f64) -> Option<Self> {
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        Some(Self {
            start,
            end: end.max(start + min_span),
        })
    }

    /// True when `time` falls inside the window, bounds included.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

/// One placed image or video.
///
/// The element owns its resource handles; dropping or releasing it revokes them.
#[derive(Debug)]
pub struct MediaElement {
    /// Unique identifier
    pub id: MediaId,
    /// Display name (usually the file name)
    pub name: String,
    pub kind: MediaKind,
    source: OwnedResource,
    /// Separately owned still frame. `None` for images, which display their source.
    preview: Option<OwnedResource>,
    pub position: Position,
    pub dimensions: Dimensions,
    /// 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f64,
    pub timing: Timing,
    pub imported_at: DateTime<Utc>,
}

impl MediaElement {
    pub fn new(
        kind: MediaKind,
        name: impl Into<String>,
        source: OwnedResource,
        preview: Option<OwnedResource>,
        position: Position,
        dimensions: Dimensions,
        timing: Timing,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            source,
            preview,
            position,
            dimensions,
            opacity: 1.0,
            timing,
            imported_at: Utc::now(),
        }
    }

    pub fn source_handle(&self) -> &ResourceHandle {
        self.source.handle()
    }

    /// Handle used for static display: the extracted frame for videos, the source for images.
    pub fn preview_handle(&self) -> &ResourceHandle {
        self.preview
            .as_ref()
            .map(OwnedResource::handle)
            .unwrap_or_else(|| self.source.handle())
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    /// Whether the element is on the timeline at `time`.
    pub fn is_visible_at(&self, time: f64) -> bool {
        self.timing.contains(time)
    }

    /// Whether a canvas point falls inside the element's box.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.position.x
            && x <= self.position.x + self.dimensions.width
            && y >= self.position.y
            && y <= self.position.y + self.dimensions.height
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    pub fn set_position(&mut self, position: Position) -> bool {
        if !position.is_finite() {
            return false;
        }
        self.position = position;
        true
    }

    /// Replace the size, flooring each axis at `min`.
    pub fn set_dimensions(&mut self, width: f64, height: f64, min: f64) -> bool {
        match Dimensions::floored(width, height, min) {
            Some(dimensions) => {
                self.dimensions = dimensions;
                true
            }
            None => false,
        }
    }

    /// Replace position and size together.
    pub fn set_bounds(&mut self, position: Position, width: f64, height: f64, min: f64) -> bool {
        if !position.is_finite() {
            return false;
        }
        let Some(dimensions) = Dimensions::floored(width, height, min) else {
            return false;
        };
        self.position = position;
        self.dimensions = dimensions;
        true
    }

    pub fn set_opacity(&mut self, opacity: f64) -> bool {
        if !opacity.is_finite() {
            return false;
        }
        self.opacity = opacity.clamp(0.0, 1.0);
        true
    }

    pub fn set_timing(&mut self, start: f64, end: f64, min_span: f64) -> bool {
        match Timing::normalized(start, end, min_span) {
            Some(timing) => {
                self.timing = timing;
                true
            }
            None => false,
        }
    }

    /// Revoke both owned handles.
    pub fn release(self) {
        let MediaElement { source, preview, .. } = self;
        if let Some(preview) = preview {
            preview.release();
        }
        source.release();
    }

    pub fn view(&self) -> MediaView {
        MediaView {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            source: self.source_handle().clone(),
            preview: self.preview_handle().clone(),
            position: self.position,
            dimensions: self.dimensions,
            opacity: self.opacity,
            timing: self.timing,
            imported_at: self.imported_at,
        }
    }
}

/// Owned, serializable copy of an element for renderers and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaView {
    pub id: MediaId,
    pub name: String,
    pub kind: MediaKind,
    pub source: ResourceHandle,
    pub preview: ResourceHandle,
    pub position: Position,
    pub dimensions: Dimensions,
    pub opacity: f64,
    pub timing: Timing,
    pub imported_at: DateTime<Utc>,
}
