//! Ordered collection of placed media.
//!
//! Insertion order is z-order: later elements draw on top. Every lookup by id
//! tolerates unknown ids, returning `false`/`None` instead of failing.

use super::{MediaElement, MediaId, Position};

#[derive(Debug, Default)]
pub struct MediaRegistry {
    elements: Vec<MediaElement>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements, bottom to top.
    pub fn elements(&self) -> &[MediaElement] {
        &self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaElement> {
        self.elements.iter()
    }

    pub fn get(&self, id: MediaId) -> Option<&MediaElement> {
        self.elements.iter().find(|media| media.id == id)
    }

    pub fn contains(&self, id: MediaId) -> bool {
        self.get(id).is_some()
    }

    pub fn index_of(&self, id: MediaId) -> Option<usize> {
        self.elements.iter().position(|media| media.id == id)
    }

    /// Append on top. An element whose id is already present is released and
    /// rejected, keeping ids unique.
    pub fn push(&mut self, media: MediaElement) -> bool {
        if self.contains(media.id) {
            tracing::warn!(id = %media.id, "Duplicate media id rejected");
            media.release();
            return false;
        }
        self.elements.push(media);
        true
    }

    /// Detach an element without releasing it.
    pub fn take(&mut self, id: MediaId) -> Option<MediaElement> {
        let index = self.index_of(id)?;
        Some(self.elements.remove(index))
    }

    /// Remove an element and revoke its handles. Unknown ids are a no-op.
    pub fn remove(&mut self, id: MediaId) -> bool {
        match self.take(id) {
            Some(media) => {
                media.release();
                true
            }
            None => false,
        }
    }

    /// Apply `update` to the element with `id`; `false` when unknown.
    pub fn update(&mut self, id: MediaId, update: impl FnOnce(&mut MediaElement) -> bool) -> bool {
        match self.elements.iter_mut().find(|media| media.id == id) {
            Some(media) => update(media),
            None => false,
        }
    }

    pub fn set_position(&mut self, id: MediaId, x: f64, y: f64) -> bool {
        self.update(id, |media| media.set_position(Position::new(x, y)))
    }

    pub fn set_dimensions(&mut self, id: MediaId, width: f64, height: f64, min: f64) -> bool {
        self.update(id, |media| media.set_dimensions(width, height, min))
    }

    pub fn set_bounds(
        &mut self,
        id: MediaId,
        position: Position,
        width: f64,
        height: f64,
        min: f64,
    ) -> bool {
        self.update(id, |media| media.set_bounds(position, width, height, min))
    }

    pub fn set_opacity(&mut self, id: MediaId, opacity: f64) -> bool {
        self.update(id, |media| media.set_opacity(opacity))
    }

    pub fn set_timing(&mut self, id: MediaId, start: f64, end: f64, min_span: f64) -> bool {
        self.update(id, |media| media.set_timing(start, end, min_span))
    }

    /// Move an element to `index` in z-order (clamped to the valid range).
    pub fn reorder(&mut self, id: MediaId, index: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let media = self.elements.remove(from);
        let to = index.min(self.elements.len());
        self.elements.insert(to, media);
        true
    }

    /// Topmost element containing the canvas point.
    pub fn element_at(&self, x: f64, y: f64) -> Option<&MediaElement> {
        self.elements
            .iter()
            .rev()
            .find(|media| media.contains_point(x, y))
    }

    /// Remove and release every element.
    pub fn clear(&mut self) -> usize {
        let count = self.elements.len();
        for media in self.elements.drain(..) {
            media.release();
        }
        count
    }
}

impl Drop for MediaRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FramePayload, OwnedResource, ResourceLoader};
    use crate::state::{Dimensions, MediaKind, Timing};
    use crate::testing::FakeLoader;
    use std::sync::Arc;

    fn push_image(registry: &mut MediaRegistry, loader: &Arc<FakeLoader>, x: f64) -> MediaId {
        let handle = loader.register_frame(&FramePayload::placeholder());
        let media = MediaElement::new(
            MediaKind::Image,
            "img",
            OwnedResource::new(handle, loader.clone()),
            None,
            Position::new(x, 0.0),
            Dimensions::new(100.0, 100.0),
            Timing { start: 0.0, end: 5.0 },
        );
        let id = media.id;
        assert!(registry.push(media));
        id
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let loader = Arc::new(FakeLoader::default());
        let mut registry = MediaRegistry::new();
        let a = push_image(&mut registry, &loader, 0.0);
        let b = push_image(&mut registry, &loader, 10.0);
        let c = push_image(&mut registry, &loader, 20.0);
        let ids: Vec<MediaId> = registry.iter().map(|media| media.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let loader = Arc::new(FakeLoader::default());
        let mut registry = MediaRegistry::new();
        let a = push_image(&mut registry, &loader, 0.0);
        let handle = registry.get(a).unwrap().source_handle().clone();

        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert!(registry.is_empty());
        assert_eq!(loader.revoke_count(&handle), 1);
    }

    #[test]
    fn test_unknown_id_updates_are_noops() {
        let loader = Arc::new(FakeLoader::default());
        let mut registry = MediaRegistry::new();
        let a = push_image(&mut registry, &loader, 0.0);
        let before = registry.get(a).unwrap().view();
        let ghost = uuid::Uuid::new_v4();

        assert!(!registry.set_position(ghost, 1.0, 1.0));
        assert!(!registry.set_dimensions(ghost, 10.0, 10.0, 1.0));
        assert!(!registry.set_opacity(ghost, 0.5));
        assert!(!registry.set_timing(ghost, 0.0, 1.0, 0.1));
        assert!(!registry.reorder(ghost, 0));
        assert_eq!(registry.get(a).unwrap().view(), before);
    }

    #[test]
    fn test_reorder_and_hit_test() {
        let loader = Arc::new(FakeLoader::default());
        let mut registry = MediaRegistry::new();
        let a = push_image(&mut registry, &loader, 0.0);
        let b = push_image(&mut registry, &loader, 50.0);

        assert_eq!(registry.element_at(60.0, 10.0).map(|m| m.id), Some(b));
        assert!(registry.reorder(b, 0));
        assert_eq!(registry.element_at(60.0, 10.0).map(|m| m.id), Some(a));
        assert_eq!(registry.element_at(140.0, 10.0).map(|m| m.id), Some(b));
        assert!(registry.element_at(500.0, 500.0).is_none());

        assert!(registry.reorder(b, 99));
        assert_eq!(registry.index_of(b), Some(1));
    }

    #[test]
    fn test_drop_releases_everything() {
        let loader = Arc::new(FakeLoader::default());
        {
            let mut registry = MediaRegistry::new();
            push_image(&mut registry, &loader, 0.0);
            push_image(&mut registry, &loader, 10.0);
            assert_eq!(loader.live_count(), 2);
        }
        assert_eq!(loader.live_count(), 0);
    }
}
