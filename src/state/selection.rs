//! Selection state shared across views.

use serde::{Deserialize, Serialize};

use super::MediaId;

/// The active element, if any. A weak reference: it never keeps an element alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    active: Option<MediaId>,
}

impl Selection {
    /// Return the active element id.
    pub fn active(&self) -> Option<MediaId> {
        self.active
    }

    /// Replace the selection with a single element.
    pub fn select(&mut self, id: MediaId) {
        self.active = Some(id);
    }

    /// Clear the selection.
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Clear the selection if it points at `id`. Returns true when it did.
    pub fn forget(&mut self, id: MediaId) -> bool {
        if self.active == Some(id) {
            self.active = None;
            return true;
        }
        false
    }

    pub fn is_active(&self, id: MediaId) -> bool {
        self.active == Some(id)
    }
}
