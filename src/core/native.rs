//! Native collaborators: a file/blob loader and an ffmpeg-backed frame grabber.
//!
//! Metadata probing runs on tokio's blocking pool. Image sizes come from the
//! `image` crate; video size and duration come from `ffprobe`, and still
//! frames from `ffmpeg`, both expected on `PATH`.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use image::ImageReader;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::constants::PREVIEW_FRAME_SECONDS;
use crate::core::{
    DecodeError, FrameExtractor, FramePayload, LoadedResource, MediaMetadata, MediaSource,
    ResourceHandle, ResourceLoader, SourceData,
};
use crate::state::MediaKind;

/// What a live handle points at.
#[derive(Debug, Clone)]
pub enum NativeResource {
    File(PathBuf),
    Bytes(Arc<[u8]>),
    Frame(FramePayload),
}

/// Loader for files on disk and in-memory blobs. Handles are `media://<uuid>`.
#[derive(Debug, Default)]
pub struct NativeLoader {
    entries: Mutex<HashMap<ResourceHandle, NativeResource>>,
}

impl NativeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up what a handle refers to, if it is still live.
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<NativeResource> {
        self.entries.lock().ok()?.get(handle).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn insert(&self, resource: NativeResource) -> ResourceHandle {
        let handle = ResourceHandle::new(format!("media://{}", Uuid::new_v4()));
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(handle.clone(), resource);
        }
        handle
    }
}

impl ResourceLoader for NativeLoader {
    fn open(&self, source: &MediaSource) -> LoadedResource {
        let resource = match &source.data {
            SourceData::Path(path) => NativeResource::File(path.clone()),
            SourceData::Bytes(bytes) => NativeResource::Bytes(bytes.clone()),
        };
        let handle = self.insert(resource);
        let (sender, metadata) = oneshot::channel();

        let kind = MediaKind::from_mime(&source.effective_mime());
        let data = source.data.clone();
        match (kind, tokio::runtime::Handle::try_current()) {
            (Some(kind), Ok(runtime)) => {
                runtime.spawn_blocking(move || {
                    if let Some(meta) = probe_metadata(kind, &data) {
                        let _ = sender.send(meta);
                    }
                });
            }
            _ => {
                tracing::warn!(name = %source.name, "Metadata probe skipped");
            }
        }

        LoadedResource { handle, metadata }
    }

    fn register_frame(&self, frame: &FramePayload) -> ResourceHandle {
        self.insert(NativeResource::Frame(frame.clone()))
    }

    fn revoke(&self, handle: &ResourceHandle) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(handle);
        }
    }
}

fn probe_metadata(kind: MediaKind, data: &SourceData) -> Option<MediaMetadata> {
    match (kind, data) {
        (MediaKind::Image, SourceData::Path(path)) => {
            let (width, height) = image::image_dimensions(path).ok()?;
            Some(MediaMetadata {
                width: Some(width),
                height: Some(height),
                duration_seconds: None,
            })
        }
        (MediaKind::Image, SourceData::Bytes(bytes)) => {
            let (width, height) = ImageReader::new(Cursor::new(bytes.as_ref()))
                .with_guessed_format()
                .ok()?
                .into_dimensions()
                .ok()?;
            Some(MediaMetadata {
                width: Some(width),
                height: Some(height),
                duration_seconds: None,
            })
        }
        (MediaKind::Video, SourceData::Path(path)) => probe_video(path),
        (MediaKind::Video, SourceData::Bytes(_)) => None,
    }
}

/// Probe video size and duration using ffprobe.
fn probe_video(path: &Path) -> Option<MediaMetadata> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height:format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1")
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(parse_ffprobe_output(&stdout))
}

/// Parse `key=value` lines from ffprobe. Unknown keys and `N/A` values are skipped.
pub fn parse_ffprobe_output(output: &str) -> MediaMetadata {
    let mut metadata = MediaMetadata::default();
    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => metadata.width = value.parse().ok(),
            "height" => metadata.height = value.parse().ok(),
            "duration" => metadata.duration_seconds = value.parse().ok(),
            _ => {}
        }
    }
    metadata
}

/// Grabs a single JPEG frame shortly after the start of a video file.
#[derive(Debug, Default, Clone)]
pub struct FfmpegFrameExtractor;

impl FrameExtractor for FfmpegFrameExtractor {
    fn extract_frame(&self, source: &MediaSource) -> BoxFuture<'static, Result<FramePayload, DecodeError>> {
        let data = source.data.clone();
        async move {
            let SourceData::Path(path) = data else {
                return Err(DecodeError::Unreadable("in-memory video".to_string()));
            };
            tokio::task::spawn_blocking(move || grab_frame(&path))
                .await
                .map_err(|err| DecodeError::Decoder(err.to_string()))?
        }
        .boxed()
    }
}

fn grab_frame(path: &Path) -> Result<FramePayload, DecodeError> {
    if !path.exists() {
        return Err(DecodeError::Unreadable(path.display().to_string()));
    }

    let output = Command::new("ffmpeg")
        .arg("-v")
        .arg("error")
        .arg("-ss")
        .arg(format!("{}", PREVIEW_FRAME_SECONDS))
        .arg("-i")
        .arg(path)
        .arg("-frames:v")
        .arg("1")
        .arg("-f")
        .arg("image2pipe")
        .arg("-vcodec")
        .arg("mjpeg")
        .arg("-")
        .output()
        .map_err(|err| DecodeError::Decoder(err.to_string()))?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(DecodeError::Decoder(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    image::load_from_memory(&output.stdout).map_err(|err| DecodeError::Decoder(err.to_string()))?;
    Ok(FramePayload::new("image/jpeg", output.stdout))
}
