//! Viewport module for pan/zoom transforms.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed scale.
pub const MIN_SCALE: f64 = 0.5;
/// Largest allowed scale.
pub const MAX_SCALE: f64 = 3.0;

/// Clamp a requested scale into `[MIN_SCALE, MAX_SCALE]`.
pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// The on-screen rectangle of the host element the canvas is mounted in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Top-left of the host element in screen pixels.
    pub origin: Point,
    /// Visible size of the host element in screen pixels.
    pub size: Size,
}

impl Surface {
    /// Create a surface from its origin and visible size.
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }
}

/// Viewport holds the pan/zoom transform mapping canvas space to screen space.
///
/// `x`/`y` are pan offsets in screen pixels and are never divided by the
/// scale. The translation is realized by the host as a transform on the layer
/// element, so converting a pointer position only has to undo the layer's
/// own on-screen offset and the scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan offset in screen pixels.
    pub x: f64,
    /// Vertical pan offset in screen pixels.
    pub y: f64,
    /// Canvas units to screen pixels.
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport at the origin with scale 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current translation as a vector.
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Set the scale, clamped to the allowed range.
    pub fn zoom(&mut self, new_scale: f64) {
        self.scale = clamp_scale(new_scale);
    }

    /// Zoom by `factor`, keeping the canvas point under `anchor` fixed.
    ///
    /// `anchor` is relative to the surface origin.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        let new_scale = clamp_scale(self.scale * factor);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let canvas_point = self.view_to_canvas(anchor);
        self.scale = new_scale;
        self.x = anchor.x - canvas_point.x * new_scale;
        self.y = anchor.y - canvas_point.y * new_scale;
    }

    /// Reset to the origin at scale 1.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// On-screen top-left of the transformed layer.
    pub fn layer_origin(&self, surface_origin: Point) -> Point {
        surface_origin + self.offset()
    }

    /// Convert a screen point to canvas coordinates.
    pub fn to_canvas(&self, screen: Point, surface_origin: Point) -> Point {
        crate::geometry::to_canvas(screen, self, self.layer_origin(surface_origin))
    }

    /// Convert a canvas point to screen coordinates.
    pub fn to_screen(&self, canvas: Point, surface_origin: Point) -> Point {
        crate::geometry::to_screen(canvas, self, self.layer_origin(surface_origin))
    }

    /// Convert a canvas point into coordinates relative to the surface.
    pub fn canvas_to_view(&self, canvas: Point) -> Point {
        Point::new(canvas.x * self.scale + self.x, canvas.y * self.scale + self.y)
    }

    /// Convert a point relative to the surface into canvas coordinates.
    pub fn view_to_canvas(&self, view: Point) -> Point {
        Point::new((view.x - self.x) / self.scale, (view.y - self.y) / self.scale)
    }

    /// Check that every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.scale.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let viewport = Viewport::new();
        assert_eq!(viewport.offset(), Vec2::ZERO);
        assert!((viewport.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_is_additive() {
        let mut viewport = Viewport::new();
        viewport.zoom(2.5);
        let deltas = [(10.0, -4.0), (3.5, 7.25), (-20.0, 1.0)];
        for (dx, dy) in deltas {
            viewport.pan(dx, dy);
        }
        assert!((viewport.x - -6.5).abs() < 1e-10);
        assert!((viewport.y - 4.25).abs() < 1e-10);
    }

    #[test]
    fn test_pan_ignores_scale() {
        let mut a = Viewport::new();
        let mut b = Viewport::new();
        b.zoom(0.5);
        a.pan(40.0, 40.0);
        b.pan(40.0, 40.0);
        assert_eq!(a.offset(), b.offset());
    }

    #[test]
    fn test_zoom_clamp() {
        let mut viewport = Viewport::new();
        viewport.zoom(0.001);
        assert!((viewport.scale - MIN_SCALE).abs() < f64::EPSILON);

        viewport.zoom(1000.0);
        assert!((viewport.scale - MAX_SCALE).abs() < f64::EPSILON);

        viewport.zoom(1.75);
        assert!((viewport.scale - 1.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_at_keeps_anchor_fixed() {
        let mut viewport = Viewport::new();
        viewport.pan(30.0, -20.0);
        let anchor = Point::new(400.0, 300.0);
        let before = viewport.view_to_canvas(anchor);

        viewport.zoom_at(anchor, 1.5);
        let after = viewport.view_to_canvas(anchor);

        assert!((viewport.scale - 1.5).abs() < f64::EPSILON);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_at_clamps() {
        let mut viewport = Viewport::new();
        viewport.zoom_at(Point::ZERO, 100.0);
        assert!((viewport.scale - MAX_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut viewport = Viewport::new();
        viewport.pan(30.0, -20.0);
        viewport.zoom(1.5);
        let origin = Point::new(12.0, 64.0);

        let original = Point::new(123.0, 456.0);
        let canvas = viewport.to_canvas(original, origin);
        let back = viewport.to_screen(canvas, origin);

        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_reset() {
        let mut viewport = Viewport::new();
        viewport.pan(5.0, 5.0);
        viewport.zoom(2.0);
        viewport.reset();
        assert_eq!(viewport, Viewport::default());
    }
}
