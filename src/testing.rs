//! Fake collaborators shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::core::{
    DecodeError, FrameExtractor, FramePayload, LoadedResource, MediaMetadata, MediaSource,
    ResourceHandle, ResourceLoader,
};
use crate::state::EditorConfig;
use crate::store::EditorStore;

/// How the fake loader answers metadata for a given source name.
#[derive(Debug, Clone)]
pub enum MetadataPlan {
    /// Send metadata immediately.
    Ready(MediaMetadata),
    /// Hold the sender so the receiver waits until timeout.
    Never,
    /// Drop the sender (decode failure).
    Fail,
}

#[derive(Default)]
struct FakeLoaderState {
    next_id: u64,
    live: HashSet<ResourceHandle>,
    revocations: HashMap<ResourceHandle, usize>,
    plans: HashMap<String, MetadataPlan>,
    held: HashMap<String, oneshot::Sender<MediaMetadata>>,
    frames: Vec<FramePayload>,
}

#[derive(Default)]
pub struct FakeLoader {
    state: Mutex<FakeLoaderState>,
}

impl FakeLoader {
    pub fn with_plan(self, name: &str, plan: MetadataPlan) -> Self {
        self.state.lock().unwrap().plans.insert(name.to_string(), plan);
        self
    }

    pub fn with_metadata(self, name: &str, width: u32, height: u32, duration: Option<f64>) -> Self {
        self.with_plan(
            name,
            MetadataPlan::Ready(MediaMetadata {
                width: Some(width),
                height: Some(height),
                duration_seconds: duration,
            }),
        )
    }

    /// Deliver metadata for a held source. Returns false when nobody listens anymore.
    pub fn deliver_late(&self, name: &str, metadata: MediaMetadata) -> bool {
        let sender = self.state.lock().unwrap().held.remove(name);
        match sender {
            Some(sender) => sender.send(metadata).is_ok(),
            None => false,
        }
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.state.lock().unwrap().live.contains(handle)
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    pub fn revoke_count(&self, handle: &ResourceHandle) -> usize {
        self.state
            .lock()
            .unwrap()
            .revocations
            .get(handle)
            .copied()
            .unwrap_or(0)
    }

    pub fn registered_frames(&self) -> Vec<FramePayload> {
        self.state.lock().unwrap().frames.clone()
    }

    fn next_handle(state: &mut FakeLoaderState) -> ResourceHandle {
        state.next_id += 1;
        let handle = ResourceHandle::new(format!("fake://{}", state.next_id));
        state.live.insert(handle.clone());
        handle
    }
}

impl ResourceLoader for FakeLoader {
    fn open(&self, source: &MediaSource) -> LoadedResource {
        let mut state = self.state.lock().unwrap();
        let handle = Self::next_handle(&mut state);
        let (sender, metadata) = oneshot::channel();
        let plan = state
            .plans
            .get(&source.name)
            .cloned()
            .unwrap_or(MetadataPlan::Fail);
        match plan {
            MetadataPlan::Ready(meta) => {
                let _ = sender.send(meta);
            }
            MetadataPlan::Never => {
                state.held.insert(source.name.clone(), sender);
            }
            MetadataPlan::Fail => drop(sender),
        }
        LoadedResource { handle, metadata }
    }

    fn register_frame(&self, frame: &FramePayload) -> ResourceHandle {
        let mut state = self.state.lock().unwrap();
        state.frames.push(frame.clone());
        Self::next_handle(&mut state)
    }

    fn revoke(&self, handle: &ResourceHandle) {
        let mut state = self.state.lock().unwrap();
        state.live.remove(handle);
        *state.revocations.entry(handle.clone()).or_insert(0) += 1;
    }
}

pub struct FakeExtractor {
    fail: bool,
}

impl FakeExtractor {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl FrameExtractor for FakeExtractor {
    fn extract_frame(&self, source: &MediaSource) -> BoxFuture<'static, Result<FramePayload, DecodeError>> {
        let fail = self.fail;
        let name = source.name.clone();
        async move {
            if fail {
                Err(DecodeError::Decoder(format!("cannot decode {}", name)))
            } else {
                Ok(FramePayload::new("image/jpeg", vec![0xFF, 0xD8, 0xFF]))
            }
        }
        .boxed()
    }
}

/// Config with a short metadata timeout so timeout paths stay fast.
pub fn fast_config() -> EditorConfig {
    EditorConfig {
        metadata_timeout_ms: 20,
        ..EditorConfig::default()
    }
}

pub fn store_with(loader: Arc<FakeLoader>) -> EditorStore {
    EditorStore::builder(fast_config())
        .loader(loader)
        .extractor(Arc::new(FakeExtractor::ok()))
        .build()
}

pub fn image_source(name: &str) -> MediaSource {
    MediaSource::from_bytes(name, "image/png", vec![0u8; 4])
}

pub fn video_source(name: &str) -> MediaSource {
    MediaSource::from_bytes(name, "video/mp4", vec![0u8; 4])
}
