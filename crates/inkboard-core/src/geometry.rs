//! Pure geometry helpers shared by the tools.

use crate::viewport::{Surface, Viewport};
use kurbo::{Point, Rect};

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (a - b).hypot()
}

/// Squared distance, for comparisons that don't need the root.
pub fn distance_squared(a: Point, b: Point) -> f64 {
    (a - b).hypot2()
}

/// Map a screen point into canvas space.
///
/// `layer_origin` is the on-screen top-left of the transformed layer, which
/// already includes the viewport translation.
pub fn to_canvas(screen: Point, viewport: &Viewport, layer_origin: Point) -> Point {
    Point::new(
        (screen.x - layer_origin.x) / viewport.scale,
        (screen.y - layer_origin.y) / viewport.scale,
    )
}

/// Inverse of [`to_canvas`].
pub fn to_screen(canvas: Point, viewport: &Viewport, layer_origin: Point) -> Point {
    Point::new(
        canvas.x * viewport.scale + layer_origin.x,
        canvas.y * viewport.scale + layer_origin.y,
    )
}

/// Map a screen point into canvas space for a possibly unmounted surface.
///
/// Returns the zero point when the surface is not mounted yet.
pub fn surface_to_canvas(screen: Point, viewport: &Viewport, surface: Option<&Surface>) -> Point {
    match surface {
        Some(surface) => viewport.to_canvas(screen, surface.origin),
        None => Point::ZERO,
    }
}

/// Axis-aligned rectangle spanned by two corners in any order.
pub fn rect_from_corners(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

/// Bounding box of a set of points, `None` when empty.
pub fn bounds_of<I>(points: I) -> Option<Rect>
where
    I: IntoIterator<Item = Point>,
{
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let mut rect = Rect::from_points(first, first);
    for point in iter {
        rect = rect.union_pt(point);
    }
    Some(rect)
}
