//! Collaborator seams for resource loading and still-frame extraction.
//!
//! The engine never touches files, blobs, or decoders directly. A
//! [`ResourceLoader`] hands out revocable [`ResourceHandle`]s and reports
//! metadata asynchronously; a [`FrameExtractor`] produces a single still
//! frame for video previews. Hosts plug in the native implementations from
//! [`crate::core::native`] or their own.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::constants::PLACEHOLDER_FRAME_SVG;

/// Revocable, URL-like reference to a loadable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the bytes of an incoming file live.
#[derive(Debug, Clone)]
pub enum SourceData {
    /// A file on disk.
    Path(PathBuf),
    /// An in-memory blob (drag-and-drop payloads, tests).
    Bytes(Arc<[u8]>),
}

/// A file-like resource offered for ingestion.
#[derive(Debug, Clone)]
pub struct MediaSource {
    /// Display name, usually the file name.
    pub name: String,
    /// MIME type as reported by the picker; may be empty.
    pub mime_type: String,
    pub data: SourceData,
}

impl MediaSource {
    /// Build a source for a file on disk, guessing the MIME type from its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(&path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();
        Self {
            name,
            mime_type,
            data: SourceData::Path(path),
        }
    }

    /// Build a source for an in-memory blob with an explicit MIME type.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: SourceData::Bytes(bytes.into()),
        }
    }

    /// The MIME type to classify by: the declared one, else a guess from the name.
    pub fn effective_mime(&self) -> String {
        let declared = self.mime_type.trim();
        if !declared.is_empty() {
            return declared.to_ascii_lowercase();
        }
        mime_guess::from_path(&self.name)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default()
    }
}

/// Intrinsic properties reported once a resource is ready.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Native duration in seconds (video only).
    pub duration_seconds: Option<f64>,
}

impl MediaMetadata {
    /// Natural size when both axes are known and non-zero.
    pub fn natural_size(&self) -> Option<(f64, f64)> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some((f64::from(width), f64::from(height)))
            }
            _ => None,
        }
    }

    /// Duration when it is a usable positive number.
    pub fn usable_duration(&self) -> Option<f64> {
        self.duration_seconds
            .filter(|duration| duration.is_finite() && *duration > 0.0)
    }
}

/// Result of opening a resource: its handle now, its metadata later.
///
/// The metadata channel is best-effort. A dropped sender means the
/// collaborator failed to decode the resource.
#[derive(Debug)]
pub struct LoadedResource {
    pub handle: ResourceHandle,
    pub metadata: oneshot::Receiver<MediaMetadata>,
}

/// Encoded still image used as a preview.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FramePayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Neutral "Video" card substituted when frame extraction fails.
    pub fn placeholder() -> Self {
        Self::new("image/svg+xml", PLACEHOLDER_FRAME_SVG.as_bytes().to_vec())
    }

    pub fn is_placeholder(&self) -> bool {
        self.mime_type == "image/svg+xml" && self.bytes == PLACEHOLDER_FRAME_SVG.as_bytes()
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("source is not readable: {0}")]
    Unreadable(String),
    #[error("decoder failed: {0}")]
    Decoder(String),
}

/// Turns file-like sources into revocable handles.
pub trait ResourceLoader: Send + Sync {
    /// Acquire a handle for `source` and start metadata discovery.
    fn open(&self, source: &MediaSource) -> LoadedResource;

    /// Acquire a handle for an extracted frame.
    fn register_frame(&self, frame: &FramePayload) -> ResourceHandle;

    /// Release a handle. Revoking an unknown handle is a no-op.
    fn revoke(&self, handle: &ResourceHandle);
}

/// Produces one still frame from a video source.
pub trait FrameExtractor: Send + Sync {
    fn extract_frame(&self, source: &MediaSource) -> BoxFuture<'static, Result<FramePayload, DecodeError>>;
}

/// Exclusive ownership of a handle. Revoked exactly once, either through
/// [`OwnedResource::release`] or when dropped.
pub struct OwnedResource {
    handle: ResourceHandle,
    loader: Arc<dyn ResourceLoader>,
    released: bool,
}

impl OwnedResource {
    pub fn new(handle: ResourceHandle, loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            handle,
            loader,
            released: false,
        }
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Revoke the handle now.
    pub fn release(mut self) {
        self.revoke_once();
    }

    fn revoke_once(&mut self) {
        if !self.released {
            self.released = true;
            self.loader.revoke(&self.handle);
            tracing::debug!(handle = %self.handle, "Resource revoked");
        }
    }
}

impl Drop for OwnedResource {
    fn drop(&mut self) {
        self.revoke_once();
    }
}

impl fmt::Debug for OwnedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedResource")
            .field("handle", &self.handle)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLoader;

    #[test]
    fn test_effective_mime_prefers_declared_type() {
        let source = MediaSource::from_bytes("clip.png", "Video/MP4", Vec::new());
        assert_eq!(source.effective_mime(), "video/mp4");

        let guessed = MediaSource::from_bytes("clip.png", "", Vec::new());
        assert_eq!(guessed.effective_mime(), "image/png");

        let unknown = MediaSource::from_bytes("notes", "", Vec::new());
        assert_eq!(unknown.effective_mime(), "");
    }

    #[test]
    fn test_from_path_guesses_mime() {
        let source = MediaSource::from_path("/tmp/holiday.webm");
        assert_eq!(source.name, "holiday.webm");
        assert_eq!(source.mime_type, "video/webm");
    }

    #[test]
    fn test_metadata_natural_size_requires_both_axes() {
        let meta = MediaMetadata {
            width: Some(800),
            height: None,
            duration_seconds: Some(f64::NAN),
        };
        assert_eq!(meta.natural_size(), None);
        assert_eq!(meta.usable_duration(), None);

        let meta = MediaMetadata {
            width: Some(800),
            height: Some(600),
            duration_seconds: Some(12.5),
        };
        assert_eq!(meta.natural_size(), Some((800.0, 600.0)));
        assert_eq!(meta.usable_duration(), Some(12.5));
    }

    #[test]
    fn test_owned_resource_revokes_once() {
        let loader = Arc::new(FakeLoader::default());
        let handle = loader.register_frame(&FramePayload::placeholder());
        let owned = OwnedResource::new(handle.clone(), loader.clone());
        assert!(loader.is_live(&handle));

        owned.release();
        assert!(!loader.is_live(&handle));
        assert_eq!(loader.revoke_count(&handle), 1);
    }

    #[test]
    fn test_owned_resource_revokes_on_drop() {
        let loader = Arc::new(FakeLoader::default());
        let handle = loader.register_frame(&FramePayload::placeholder());
        {
            let _owned = OwnedResource::new(handle.clone(), loader.clone());
        }
        assert_eq!(loader.revoke_count(&handle), 1);
    }

    #[test]
    fn test_placeholder_payload() {
        let payload = FramePayload::placeholder();
        assert!(payload.is_placeholder());
        assert!(!FramePayload::new("image/jpeg", vec![1, 2, 3]).is_placeholder());
    }
}
