//! Canvas Editor
//!
//! State and timeline engine for a media canvas editor: images and videos
//! placed on a fixed canvas, moved and resized with pointer gestures, and
//! shown or hidden by a shared playback clock.

pub mod constants;
pub mod core;
pub mod state;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use crate::core::{
    FfmpegFrameExtractor, FrameExtractor, FrameRequest, FrameScheduler, IngestError,
    ManualScheduler, MediaSource, NativeLoader, ResourceHandle, ResourceLoader,
    TokioFrameScheduler,
};
pub use state::{EditorConfig, MediaElement, MediaId, MediaKind, PlaybackState, ResizeHandle};
pub use store::*;
