//! Ink data model: sampled points, committed strokes and text boxes.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pressure assumed when the device reports none.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// Normalize a device pressure reading into `(0, 1]`.
///
/// Mice report 0 for hover moves and some platforms report NaN; both fall
/// back to [`DEFAULT_PRESSURE`].
pub fn normalize_pressure(pressure: f64) -> f64 {
    if pressure.is_finite() && pressure > 0.0 {
        pressure.min(1.0)
    } else {
        DEFAULT_PRESSURE
    }
}

/// A sampled ink point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkPoint {
    pub x: f64,
    pub y: f64,
    /// Pen pressure in `(0, 1]`.
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    /// Capture time in milliseconds.
    pub timestamp: u64,
}

fn default_pressure() -> f64 {
    DEFAULT_PRESSURE
}

impl InkPoint {
    /// Create a point, normalizing the pressure.
    pub fn new(position: Point, pressure: f64, timestamp: u64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            pressure: normalize_pressure(pressure),
            timestamp,
        }
    }

    /// Position as a kurbo point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.pressure.is_finite()
    }
}

/// Tool that produced a committed stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeTool {
    Pen,
    Highlighter,
}

/// Unique identifier for strokes and text boxes.
pub type StrokeId = String;

/// Generate a fresh identifier.
pub fn new_id() -> StrokeId {
    Uuid::new_v4().to_string()
}

/// A committed ink mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: StrokeId,
    /// Closed SVG path data of the stroke outline.
    pub path: String,
    /// CSS color string.
    pub color: String,
    /// Pen size in screen pixels at capture time.
    pub size: f64,
    pub tool: StrokeTool,
    /// Every sample captured for the stroke, in order.
    pub raw_points: Vec<InkPoint>,
    /// Author or role tag.
    pub author: String,
    /// Commit time in milliseconds.
    pub timestamp: u64,
}

impl Stroke {
    /// Bounding box of the raw points.
    pub fn bounds(&self) -> Rect {
        crate::geometry::bounds_of(self.raw_points.iter().map(InkPoint::position))
            .unwrap_or(Rect::ZERO)
    }

    /// Check whether any raw point lies within `radius` of `point`.
    pub fn has_point_within(&self, point: Point, radius: f64) -> bool {
        let radius_sq = radius * radius;
        self.raw_points
            .iter()
            .any(|p| crate::geometry::distance_squared(p.position(), point) <= radius_sq)
    }
}

/// A text object spawned by the text tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub id: StrokeId,
    /// Top-left anchor in canvas space.
    pub position: Point,
    pub content: String,
    pub author: String,
    pub timestamp: u64,
}

impl TextBox {
    /// Create an empty text box at `position`.
    pub fn new(position: Point, author: impl Into<String>, timestamp: u64) -> Self {
        Self {
            id: new_id(),
            position,
            content: String::new(),
            author: author.into(),
            timestamp,
        }
    }
}
