//! State management module
//!
//! Pure data structures for the editor:
//! - MediaElement: one placed image or video with its geometry and timing
//! - MediaRegistry: ordered collection of elements
//! - Selection: the active element
//! - DragState / ResizeState: pointer gestures
//! - PlaybackClock: the shared timeline clock
//! - EditorConfig: editor-wide settings

mod config;
mod interaction;
mod media;
mod playback;
mod registry;
mod selection;

pub use config::*;
pub use interaction::*;
pub use media::*;
pub use playback::*;
pub use registry::*;
pub use selection::*;
