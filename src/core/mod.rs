pub mod ingest;
pub mod loader;
pub mod native;
pub mod scheduler;

pub use ingest::{IngestError, MediaIngestor, PendingMedia};
pub use loader::*;
pub use native::{FfmpegFrameExtractor, NativeLoader, NativeResource};
pub use scheduler::*;
