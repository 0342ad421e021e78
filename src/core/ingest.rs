//! Media ingestion: classify an incoming file, acquire its handles, discover
//! its natural size (and duration for video) within a bounded wait.
//!
//! Ingestion is split in two. [`MediaIngestor::prepare`] does all the
//! awaiting and touches no editor state. The store then commits the
//! [`PendingMedia`] synchronously against whatever state is current at that
//! point, so nothing captured before an await is ever written back.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::core::{FrameExtractor, FramePayload, MediaMetadata, MediaSource, OwnedResource, ResourceLoader};
use crate::state::{Dimensions, EditorConfig, MediaElement, MediaId, MediaKind, Position, Timing};
use crate::utils::clamp_into;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported media type '{mime}' for {name}")]
    UnsupportedType { name: String, mime: String },
    #[error("media id {id} is already placed")]
    DuplicateId { id: MediaId },
}

/// A classified, loaded resource waiting to be placed on the canvas.
///
/// Dropping it without committing revokes its handles.
#[derive(Debug)]
pub struct PendingMedia {
    id: MediaId,
    pub kind: MediaKind,
    pub name: String,
    source: OwnedResource,
    preview: Option<OwnedResource>,
    /// Size after scaling to the media cap
    pub dimensions: Dimensions,
    /// Native video duration, rounded up to whole seconds
    pub discovered_duration: Option<f64>,
}

impl PendingMedia {
    /// Id the element will carry once committed.
    pub fn id(&self) -> MediaId {
        self.id
    }

    #[cfg(test)]
    pub(crate) fn set_id(&mut self, id: MediaId) {
        self.id = id;
    }

    /// Build the element at its final position and timing.
    pub fn into_element(self, position: Position, timing: Timing) -> MediaElement {
        let mut media = MediaElement::new(
            self.kind,
            self.name,
            self.source,
            self.preview,
            position,
            self.dimensions,
            timing,
        );
        media.id = self.id;
        media
    }
}

/// Cloneable front end for ingestion; holds the collaborators and config.
#[derive(Clone)]
pub struct MediaIngestor {
    loader: Arc<dyn ResourceLoader>,
    extractor: Arc<dyn FrameExtractor>,
    config: EditorConfig,
}

impl MediaIngestor {
    pub fn new(
        loader: Arc<dyn ResourceLoader>,
        extractor: Arc<dyn FrameExtractor>,
        config: EditorConfig,
    ) -> Self {
        Self {
            loader,
            extractor,
            config,
        }
    }

    pub fn loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.loader
    }

    /// Classify and load `source`. Fails only for non-image, non-video input,
    /// in which case no handle is acquired.
    pub async fn prepare(&self, source: MediaSource) -> Result<PendingMedia, IngestError> {
        let mime = source.effective_mime();
        let Some(kind) = MediaKind::from_mime(&mime) else {
            tracing::warn!(name = %source.name, mime = %mime, "Unsupported media type");
            return Err(IngestError::UnsupportedType {
                name: source.name.clone(),
                mime,
            });
        };

        let loaded = self.loader.open(&source);
        let source_resource = OwnedResource::new(loaded.handle, self.loader.clone());

        let preview = match kind {
            MediaKind::Video => {
                let frame = match self.extractor.extract_frame(&source).await {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!(name = %source.name, error = %err, "Frame extraction failed, using placeholder");
                        FramePayload::placeholder()
                    }
                };
                let handle = self.loader.register_frame(&frame);
                Some(OwnedResource::new(handle, self.loader.clone()))
            }
            MediaKind::Image => None,
        };

        let metadata = await_metadata(loaded.metadata, self.config.metadata_timeout(), &source.name).await;

        let (natural_width, natural_height) = metadata
            .as_ref()
            .and_then(MediaMetadata::natural_size)
            .unwrap_or((self.config.default_media_width, self.config.default_media_height));
        let dimensions = scale_to_fit(
            natural_width,
            natural_height,
            self.config.max_media_width,
            self.config.max_media_height,
        );

        let discovered_duration = match kind {
            MediaKind::Video => metadata
                .as_ref()
                .and_then(MediaMetadata::usable_duration)
                .map(f64::ceil),
            MediaKind::Image => None,
        };

        tracing::debug!(
            name = %source.name,
            ?kind,
            width = dimensions.width,
            height = dimensions.height,
            duration = ?discovered_duration,
            "Media prepared"
        );

        Ok(PendingMedia {
            id: MediaId::new_v4(),
            kind,
            name: source.name,
            source: source_resource,
            preview,
            dimensions,
            discovered_duration,
        })
    }
}

/// Wait for metadata up to `timeout`. Late metadata is discarded: the
/// receiver is dropped when the wait ends.
async fn await_metadata(
    metadata: oneshot::Receiver<MediaMetadata>,
    timeout: Duration,
    name: &str,
) -> Option<MediaMetadata> {
    match tokio::time::timeout(timeout, metadata).await {
        Ok(Ok(metadata)) => Some(metadata),
        Ok(Err(_)) => {
            tracing::warn!(name, "Metadata unavailable, using defaults");
            None
        }
        Err(_) => {
            tracing::warn!(name, timeout_ms = timeout.as_millis() as u64, "Metadata timed out, using defaults");
            None
        }
    }
}

/// Scale oversize media down, preserving aspect ratio, so the larger axis hits its cap.
///
/// Only the larger axis is checked against its cap. A wide frame whose height
/// also overflows (1000×900 against 640×480) keeps the overflowing height.
pub fn scale_to_fit(width: f64, height: f64, max_width: f64, max_height: f64) -> Dimensions {
    if width <= max_width && height <= max_height {
        return Dimensions::new(width, height);
    }
    let aspect = width / height;
    if width > height {
        Dimensions::new(max_width, max_width / aspect)
    } else {
        Dimensions::new(max_height * aspect, max_height)
    }
}

/// Center an element on the drop point (or the canvas default), then clamp it
/// so its whole box stays on the canvas, per axis.
pub fn place_centered(dimensions: Dimensions, drop_point: Option<Position>, config: &EditorConfig) -> Position {
    let (default_x, default_y) = config.default_drop_point();
    let center = drop_point.unwrap_or(Position::new(default_x, default_y));
    let x = center.x - dimensions.width / 2.0;
    let y = center.y - dimensions.height / 2.0;
    Position::new(
        clamp_into(x, dimensions.width, config.canvas_width),
        clamp_into(y, dimensions.height, config.canvas_height),
    )
}

/// Initial visibility window: the whole timeline for video, a fixed span for images.
pub fn default_timing(kind: MediaKind, timeline_duration: f64, config: &EditorConfig) -> Timing {
    let end = match kind {
        MediaKind::Video => timeline_duration.ceil().min(timeline_duration),
        MediaKind::Image => config.image_display_seconds,
    };
    Timing::normalized(0.0, end, config.min_timing_span_seconds).unwrap_or(Timing {
        start: 0.0,
        end: config.min_timing_span_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_config, image_source, video_source, FakeExtractor, FakeLoader, MetadataPlan};

    fn ingestor(loader: Arc<FakeLoader>, extractor: FakeExtractor) -> MediaIngestor {
        MediaIngestor::new(loader, Arc::new(extractor), fast_config())
    }

    #[test]
    fn test_scale_to_fit() {
        assert_eq!(scale_to_fit(320.0, 180.0, 640.0, 480.0), Dimensions::new(320.0, 180.0));
        assert_eq!(scale_to_fit(1920.0, 1080.0, 640.0, 480.0), Dimensions::new(640.0, 360.0));
        assert_eq!(scale_to_fit(1080.0, 1920.0, 640.0, 480.0), Dimensions::new(270.0, 480.0));
        assert_eq!(scale_to_fit(960.0, 960.0, 640.0, 480.0), Dimensions::new(480.0, 480.0));
    }

    #[test]
    fn test_scale_to_fit_caps_only_the_larger_axis() {
        let scaled = scale_to_fit(1000.0, 900.0, 640.0, 480.0);
        assert_eq!(scaled, Dimensions::new(640.0, 576.0));
        assert!(scaled.height > 480.0);
    }

    #[tokio::test]
    async fn test_pending_id_carries_into_element() {
        let loader = Arc::new(FakeLoader::default());
        let ingestor = ingestor(loader, FakeExtractor::ok());

        let pending = ingestor.prepare(image_source("a.png")).await.unwrap();
        let id = pending.id();
        let media = pending.into_element(Position::default(), Timing { start: 0.0, end: 5.0 });
        assert_eq!(media.id, id);
    }

    #[test]
    fn test_place_centered_clamps_per_axis() {
        let config = EditorConfig::default();
        let dims = Dimensions::new(200.0, 100.0);

        assert_eq!(place_centered(dims, None, &config), Position::new(540.0, 310.0));
        assert_eq!(
            place_centered(dims, Some(Position::new(10.0, 700.0)), &config),
            Position::new(0.0, 620.0)
        );
        assert_eq!(
            place_centered(dims, Some(Position::new(1275.0, 5.0)), &config),
            Position::new(1080.0, 0.0)
        );
    }

    #[test]
    fn test_default_timing() {
        let config = EditorConfig::default();
        assert_eq!(default_timing(MediaKind::Image, 60.0, &config), Timing { start: 0.0, end: 5.0 });
        assert_eq!(default_timing(MediaKind::Video, 12.4, &config), Timing { start: 0.0, end: 12.4 });
    }

    #[tokio::test]
    async fn test_unsupported_type_acquires_nothing() {
        let loader = Arc::new(FakeLoader::default());
        let ingestor = ingestor(loader.clone(), FakeExtractor::ok());
        let source = MediaSource::from_bytes("notes.txt", "text/plain", b"hello".to_vec());

        let err = ingestor.prepare(source).await.unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedType { ref mime, .. } if mime == "text/plain"));
        assert_eq!(loader.live_count(), 0);
    }

    #[tokio::test]
    async fn test_image_uses_metadata_and_scales() {
        let loader = Arc::new(FakeLoader::default().with_metadata("big.png", 1600, 1200, None));
        let ingestor = ingestor(loader.clone(), FakeExtractor::ok());

        let pending = ingestor.prepare(image_source("big.png")).await.unwrap();
        assert_eq!(pending.kind, MediaKind::Image);
        assert_eq!(pending.dimensions, Dimensions::new(640.0, 480.0));
        assert_eq!(pending.discovered_duration, None);
        assert_eq!(loader.live_count(), 1);
    }

    #[tokio::test]
    async fn test_metadata_timeout_falls_back_and_discards_late_signal() {
        let loader = Arc::new(FakeLoader::default().with_plan("slow.mp4", MetadataPlan::Never));
        let ingestor = ingestor(loader.clone(), FakeExtractor::ok());

        let pending = ingestor.prepare(video_source("slow.mp4")).await.unwrap();
        assert_eq!(pending.dimensions, Dimensions::new(320.0, 180.0));
        assert_eq!(pending.discovered_duration, None);

        let late = MediaMetadata {
            width: Some(1920),
            height: Some(1080),
            duration_seconds: Some(30.0),
        };
        assert!(!loader.deliver_late("slow.mp4", late));
    }

    #[tokio::test]
    async fn test_video_duration_rounds_up() {
        let loader = Arc::new(FakeLoader::default().with_metadata("clip.mp4", 1280, 720, Some(12.3)));
        let ingestor = ingestor(loader.clone(), FakeExtractor::ok());

        let pending = ingestor.prepare(video_source("clip.mp4")).await.unwrap();
        assert_eq!(pending.discovered_duration, Some(13.0));
        assert_eq!(pending.dimensions, Dimensions::new(640.0, 360.0));
        assert_eq!(loader.live_count(), 2);
    }

    #[tokio::test]
    async fn test_decode_failure_uses_placeholder() {
        let loader = Arc::new(FakeLoader::default());
        let ingestor = ingestor(loader.clone(), FakeExtractor::failing());

        let pending = ingestor.prepare(video_source("broken.mp4")).await.unwrap();
        assert_eq!(pending.kind, MediaKind::Video);
        let frames = loader.registered_frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_placeholder());
    }

    #[tokio::test]
    async fn test_dropped_pending_media_revokes_handles() {
        let loader = Arc::new(FakeLoader::default());
        let ingestor = ingestor(loader.clone(), FakeExtractor::ok());

        let pending = ingestor.prepare(video_source("clip.mp4")).await.unwrap();
        assert_eq!(loader.live_count(), 2);
        drop(pending);
        assert_eq!(loader.live_count(), 0);
    }
}
