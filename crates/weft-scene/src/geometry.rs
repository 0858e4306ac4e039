//! Rectangle geometry
//!
//! Node bounds in device pixels.

/// Axis-aligned rectangle in device pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    /// Create with position and size
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Check if a point (in the same coordinate space) is inside
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Check if a point in this rect's local space hits `[0, w] x [0, h]`
    pub fn contains_local(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && x <= self.w && y >= 0.0 && y <= self.h
    }
}
