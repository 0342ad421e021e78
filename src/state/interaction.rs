//! Drag and resize gesture state.
//!
//! Each gesture is a two-state machine (idle/active). The math lives in pure
//! helpers so it can be checked without a store; the store commits results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Dimensions, Position};

// =============================================================================
// Drag
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DragState {
    pub active: bool,
    /// Element position when the gesture began
    pub initial: Position,
    /// Pointer position relative to the element's top-left corner
    pub offset: Position,
}

impl DragState {
    pub fn begin(&mut self, initial: Position, offset: Position) {
        *self = Self {
            active: true,
            initial,
            offset,
        };
    }

    /// Position the element should take for a pointer at `(x, y)`.
    /// `None` while idle.
    pub fn target(&self, pointer_x: f64, pointer_y: f64) -> Option<Position> {
        if !self.active {
            return None;
        }
        Some(Position::new(pointer_x - self.offset.x, pointer_y - self.offset.y))
    }

    pub fn end(&mut self) {
        self.active = false;
    }
}

// =============================================================================
// Resize
// =============================================================================

/// Corner grip being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 4] = [
        ResizeHandle::Nw,
        ResizeHandle::Ne,
        ResizeHandle::Sw,
        ResizeHandle::Se,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResizeHandle::Nw => "nw",
            ResizeHandle::Ne => "ne",
            ResizeHandle::Sw => "sw",
            ResizeHandle::Se => "se",
        }
    }
}

impl fmt::Display for ResizeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeHandle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nw" => Ok(ResizeHandle::Nw),
            "ne" => Ok(ResizeHandle::Ne),
            "sw" => Ok(ResizeHandle::Sw),
            "se" => Ok(ResizeHandle::Se),
            other => Err(format!("unknown resize handle: {}", other)),
        }
    }
}

/// An element box: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ResizeBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.left, self.top)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Compute the box produced by dragging `handle` to the pointer.
///
/// The corner opposite the handle keeps the pre-gesture coordinates; width and
/// height are floored at `min_size` afterwards.
pub fn resize_box(
    handle: ResizeHandle,
    initial: ResizeBox,
    pointer_x: f64,
    pointer_y: f64,
    min_size: f64,
) -> ResizeBox {
    let mut next = initial;
    match handle {
        ResizeHandle::Se => {
            next.width = pointer_x - initial.left;
            next.height = pointer_y - initial.top;
        }
        ResizeHandle::Sw => {
            next.width = initial.left + initial.width - pointer_x;
            next.height = pointer_y - initial.top;
            next.left = pointer_x;
        }
        ResizeHandle::Ne => {
            next.width = pointer_x - initial.left;
            next.height = initial.top + initial.height - pointer_y;
            next.top = pointer_y;
        }
        ResizeHandle::Nw => {
            next.width = initial.left + initial.width - pointer_x;
            next.height = initial.top + initial.height - pointer_y;
            next.left = pointer_x;
            next.top = pointer_y;
        }
    }
    next.width = next.width.max(min_size);
    next.height = next.height.max(min_size);
    next
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResizeState {
    pub active: bool,
    pub handle: Option<ResizeHandle>,
    /// Element box when the gesture began
    pub initial: Option<ResizeBox>,
}

impl ResizeState {
    pub fn begin(&mut self, handle: ResizeHandle, initial: ResizeBox) {
        *self = Self {
            active: true,
            handle: Some(handle),
            initial: Some(initial),
        };
    }

    /// Box for a pointer at `(x, y)`; `None` while idle.
    pub fn target(&self, pointer_x: f64, pointer_y: f64, min_size: f64) -> Option<ResizeBox> {
        if !self.active {
            return None;
        }
        let handle = self.handle?;
        let initial = self.initial?;
        Some(resize_box(handle, initial, pointer_x, pointer_y, min_size))
    }

    pub fn end(&mut self) {
        self.active = false;
    }
}
