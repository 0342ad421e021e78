//! Editor store
//!
//! The composition root. Owns the registry, selection, gesture state, and the
//! playback clock, and exposes the command surface the rendering and input
//! layers call. Every command takes `&mut self` and completes synchronously,
//! so readers only ever observe whole updates.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::constants::MIN_SET_DIMENSION;
use crate::core::{
    ingest, FfmpegFrameExtractor, FrameExtractor, FrameRequest, FrameScheduler, FrameTick,
    IngestError, ManualScheduler, MediaIngestor, MediaSource, NativeLoader, PendingMedia,
    ResourceLoader, TokioFrameScheduler,
};
use crate::state::{
    DragState, EditorConfig, MediaElement, MediaId, MediaKind, MediaRegistry, MediaView,
    PlaybackClock, PlaybackState, Position, ResizeBox, ResizeHandle, ResizeState, Selection,
};
use crate::utils::parse_f64_input;

/// A numeric field of the properties panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyField {
    Width,
    Height,
    X,
    Y,
}

/// What the media-playback collaborator should do with one video this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackDirective {
    pub id: MediaId,
    /// Inside its timing window at the current time
    pub visible: bool,
    /// Visible and the clock is running
    pub should_play: bool,
    /// Current time relative to the element's window start
    pub media_time: f64,
}

/// Owned copy of the complete editor state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub elements: Vec<MediaView>,
    pub active_media_id: Option<MediaId>,
    pub drag: DragState,
    pub resize: ResizeState,
    pub playback: PlaybackState,
}

pub struct EditorStoreBuilder {
    config: EditorConfig,
    loader: Option<Arc<dyn ResourceLoader>>,
    extractor: Option<Arc<dyn FrameExtractor>>,
    scheduler: Option<Box<dyn FrameScheduler>>,
}

impl EditorStoreBuilder {
    pub fn loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn FrameExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn scheduler(mut self, scheduler: impl FrameScheduler + 'static) -> Self {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    pub fn build(self) -> EditorStore {
        let config = self.config.validated();
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(NativeLoader::new()));
        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(FfmpegFrameExtractor));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Box::new(ManualScheduler::new()));

        EditorStore {
            ingestor: MediaIngestor::new(loader, extractor, config.clone()),
            registry: MediaRegistry::new(),
            selection: Selection::default(),
            drag: DragState::default(),
            resize: ResizeState::default(),
            clock: PlaybackClock::new(config.default_duration_seconds, config.loop_playback),
            scheduler,
            config,
        }
    }
}

pub struct EditorStore {
    config: EditorConfig,
    ingestor: MediaIngestor,
    registry: MediaRegistry,
    selection: Selection,
    drag: DragState,
    resize: ResizeState,
    clock: PlaybackClock,
    scheduler: Box<dyn FrameScheduler>,
}

impl EditorStore {
    /// Store with native collaborators and a manual frame scheduler.
    pub fn new(config: EditorConfig) -> Self {
        Self::builder(config).build()
    }

    /// Store with native collaborators, ticked by a tokio timer at the
    /// configured frame interval. Forward every received tick to
    /// [`EditorStore::on_frame`]. Must be called inside a tokio runtime.
    pub fn with_frame_timer(config: EditorConfig) -> (Self, mpsc::UnboundedReceiver<FrameTick>) {
        let config = config.validated();
        let (scheduler, ticks) = TokioFrameScheduler::new(config.frame_interval());
        (Self::builder(config).scheduler(scheduler).build(), ticks)
    }

    pub fn builder(config: EditorConfig) -> EditorStoreBuilder {
        EditorStoreBuilder {
            config,
            loader: None,
            extractor: None,
            scheduler: None,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// All elements, bottom to top.
    pub fn media_elements(&self) -> &[MediaElement] {
        self.registry.elements()
    }

    pub fn media(&self, id: MediaId) -> Option<&MediaElement> {
        self.registry.get(id)
    }

    pub fn active_media_id(&self) -> Option<MediaId> {
        self.selection.active()
    }

    pub fn active_media(&self) -> Option<&MediaElement> {
        self.selection.active().and_then(|id| self.registry.get(id))
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn resize_state(&self) -> &ResizeState {
        &self.resize
    }

    pub fn playback(&self) -> PlaybackState {
        self.clock.state()
    }

    /// The single outstanding frame request, if the clock is running.
    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.clock.pending_frame()
    }

    /// Elements on the timeline at the current time, bottom to top.
    pub fn visible_elements(&self) -> Vec<&MediaElement> {
        let time = self.clock.current_time();
        self.registry
            .iter()
            .filter(|media| media.is_visible_at(time))
            .collect()
    }

    /// Play/pause instructions for every video element.
    pub fn playback_directives(&self) -> Vec<PlaybackDirective> {
        let time = self.clock.current_time();
        let playing = self.clock.is_playing();
        self.registry
            .iter()
            .filter(|media| media.kind == MediaKind::Video)
            .map(|media| {
                let visible = media.is_visible_at(time);
                PlaybackDirective {
                    id: media.id,
                    visible,
                    should_play: visible && playing,
                    media_time: (time - media.timing.start).max(0.0),
                }
            })
            .collect()
    }

    /// Topmost element under a canvas point.
    pub fn element_at(&self, x: f64, y: f64) -> Option<MediaId> {
        self.registry.element_at(x, y).map(|media| media.id)
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            elements: self.registry.iter().map(MediaElement::view).collect(),
            active_media_id: self.selection.active(),
            drag: self.drag,
            resize: self.resize,
            playback: self.clock.state(),
        }
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// A handle for preparing media without borrowing the store across awaits.
    pub fn ingestor(&self) -> MediaIngestor {
        self.ingestor.clone()
    }

    /// Ingest a file and place it, centered on `drop_point` when given.
    pub async fn ingest(
        &mut self,
        source: MediaSource,
        drop_point: Option<Position>,
    ) -> Result<MediaId, IngestError> {
        let ingestor = self.ingestor.clone();
        let pending = ingestor.prepare(source).await?;
        self.commit_ingest(pending, drop_point)
    }

    /// Place prepared media using the state current at this call.
    ///
    /// A discovered video duration replaces the timeline duration, so the
    /// most recently ingested video wins. An id already in the registry is
    /// rejected and the pending handles are revoked.
    pub fn commit_ingest(
        &mut self,
        pending: PendingMedia,
        drop_point: Option<Position>,
    ) -> Result<MediaId, IngestError> {
        if self.registry.contains(pending.id()) {
            return Err(IngestError::DuplicateId { id: pending.id() });
        }
        if let Some(duration) = pending.discovered_duration {
            self.clock.set_duration(duration);
        }

        let timing = ingest::default_timing(pending.kind, self.clock.duration(), &self.config);
        let position = ingest::place_centered(pending.dimensions, drop_point, &self.config);
        let media = pending.into_element(position, timing);
        let id = media.id;
        let kind = media.kind;

        if !self.registry.push(media) {
            return Err(IngestError::DuplicateId { id });
        }
        self.selection.select(id);
        tracing::debug!(
            %id,
            ?kind,
            x = position.x,
            y = position.y,
            start = timing.start,
            end = timing.end,
            "Media added"
        );
        Ok(id)
    }

    /// Remove an element and revoke its handles. Unknown ids are a no-op.
    pub fn remove(&mut self, id: MediaId) -> bool {
        if !self.registry.remove(id) {
            return false;
        }
        if self.selection.forget(id) {
            self.drag.end();
            self.resize.end();
        }
        tracing::debug!(%id, "Media removed");
        true
    }

    // =========================================================================
    // Selection and element updates
    // =========================================================================

    /// Select an element, or clear the selection with `None`. A gesture in
    /// progress ends when its element stops being the active one.
    pub fn set_active(&mut self, id: Option<MediaId>) -> bool {
        if let Some(id) = id {
            if !self.registry.contains(id) {
                return false;
            }
        }
        if self.selection.active() != id {
            self.drag.end();
            self.resize.end();
        }
        match id {
            Some(id) => self.selection.select(id),
            None => self.selection.clear(),
        }
        true
    }

    pub fn update_position(&mut self, id: MediaId, x: f64, y: f64) -> bool {
        self.registry.set_position(id, x, y)
    }

    pub fn update_dimensions(&mut self, id: MediaId, width: f64, height: f64) -> bool {
        self.registry.set_dimensions(id, width, height, MIN_SET_DIMENSION)
    }

    pub fn update_opacity(&mut self, id: MediaId, opacity: f64) -> bool {
        self.registry.set_opacity(id, opacity)
    }

    pub fn update_timing(&mut self, id: MediaId, start: f64, end: f64) -> bool {
        self.registry
            .set_timing(id, start, end, self.config.min_timing_span_seconds)
    }

    /// Reset a video to the standard 16:9 size. Images are left unchanged.
    pub fn reset_dimensions(&mut self, id: MediaId) -> bool {
        let width = self.config.video_reset_width;
        let height = self.config.video_reset_height;
        self.registry.update(id, |media| {
            media.kind == MediaKind::Video && media.set_dimensions(width, height, MIN_SET_DIMENSION)
        })
    }

    /// Apply a text entry from the properties panel to the active element.
    /// Blank or malformed input is ignored; the untouched axis keeps its value.
    pub fn apply_property_input(&mut self, field: PropertyField, raw: &str) -> bool {
        let Some(value) = parse_f64_input(raw) else {
            return false;
        };
        let Some(media) = self.active_media() else {
            return false;
        };
        let id = media.id;
        let position = media.position;
        let dimensions = media.dimensions;

        match field {
            PropertyField::Width => {
                if value <= 0.0 {
                    return false;
                }
                self.update_dimensions(id, value, dimensions.height)
            }
            PropertyField::Height => {
                if value <= 0.0 {
                    return false;
                }
                self.update_dimensions(id, dimensions.width, value)
            }
            PropertyField::X => self.update_position(id, value, position.y),
            PropertyField::Y => self.update_position(id, position.x, value),
        }
    }

    /// Move an element to `index` in z-order.
    pub fn reorder(&mut self, id: MediaId, index: usize) -> bool {
        self.registry.reorder(id, index)
    }

    pub fn bring_to_front(&mut self, id: MediaId) -> bool {
        let top = self.registry.len();
        self.registry.reorder(id, top)
    }

    // =========================================================================
    // Drag
    // =========================================================================

    /// Begin dragging `id`; `offset` is the pointer position inside the element.
    pub fn start_drag(&mut self, id: MediaId, initial: Position, offset: Position) -> bool {
        if !self.registry.contains(id) {
            return false;
        }
        self.resize.end();
        self.selection.select(id);
        self.drag.begin(initial, offset);
        true
    }

    /// Commit the position for a pointer move. No-op while idle.
    pub fn update_drag(&mut self, pointer_x: f64, pointer_y: f64) -> bool {
        let Some(id) = self.selection.active() else {
            return false;
        };
        let Some(target) = self.drag.target(pointer_x, pointer_y) else {
            return false;
        };
        self.registry.set_position(id, target.x, target.y)
    }

    pub fn end_drag(&mut self) {
        self.drag.end();
    }

    // =========================================================================
    // Resize
    // =========================================================================

    /// Begin resizing `id` from `handle`, capturing the pre-gesture box.
    pub fn start_resize(&mut self, id: MediaId, handle: ResizeHandle, initial: ResizeBox) -> bool {
        if !self.registry.contains(id) {
            return false;
        }
        self.drag.end();
        self.selection.select(id);
        self.resize.begin(handle, initial);
        true
    }

    /// Commit position and size together for a pointer move. No-op while idle.
    pub fn update_resize(&mut self, pointer_x: f64, pointer_y: f64) -> bool {
        let Some(id) = self.selection.active() else {
            return false;
        };
        let min = self.config.min_resize_dimension;
        let Some(next) = self.resize.target(pointer_x, pointer_y, min) else {
            return false;
        };
        self.registry
            .set_bounds(id, next.position(), next.width, next.height, min)
    }

    pub fn end_resize(&mut self) {
        self.resize.end();
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Play when stopped, pause when running.
    pub fn toggle_playback(&mut self) {
        self.clock.toggle(self.scheduler.as_mut());
    }

    /// Transport play button: starts a stopped clock and pauses a running one.
    pub fn play(&mut self) {
        self.clock.toggle(self.scheduler.as_mut());
    }

    /// Start playback, leaving a running clock untouched.
    pub fn resume(&mut self) {
        self.clock.play(self.scheduler.as_mut());
    }

    pub fn pause(&mut self) {
        self.clock.pause(self.scheduler.as_mut());
    }

    pub fn seek(&mut self, time: f64) -> bool {
        self.clock.seek(time)
    }

    pub fn reset_playback(&mut self) {
        self.clock.reset(self.scheduler.as_mut());
    }

    pub fn set_duration(&mut self, duration: f64) -> bool {
        self.clock.set_duration(duration)
    }

    /// Restart from 0 at the end of the timeline instead of stopping.
    pub fn set_looping(&mut self, looping: bool) {
        self.config.loop_playback = looping;
        self.clock.set_looping(looping);
    }

    /// Deliver a fired frame callback. Stale requests are ignored.
    pub fn on_frame(&mut self, request: FrameRequest, timestamp: f64) -> bool {
        self.clock.on_frame(request, timestamp, self.scheduler.as_mut())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Cancel any pending frame and revoke every handle still owned.
    pub fn teardown(&mut self) {
        self.clock.stop_run(self.scheduler.as_mut());
        self.drag.end();
        self.resize.end();
        self.selection.clear();
        let released = self.registry.clear();
        if released > 0 {
            tracing::debug!(released, "Editor torn down");
        }
    }
}

impl Drop for EditorStore {
    fn drop(&mut self) {
        self.teardown();
    }
}
