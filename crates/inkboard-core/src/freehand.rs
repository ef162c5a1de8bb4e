//! Freehand ink: turns sampled points into a smoothed, variable-width outline
//! and serializes the outline as a closed SVG path.

use crate::config::HighlighterOptions;
use crate::stroke::{InkPoint, StrokeTool};
use kurbo::{BezPath, Point, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Slightly more than PI so cap arcs close without a seam.
const FIXED_PI: f64 = PI + 0.0001;
/// How quickly simulated pressure follows speed changes.
const RATE_OF_PRESSURE_CHANGE: f64 = 0.275;
/// Points closer than this to the stroke end are skipped.
const END_NOISE_THRESHOLD: f64 = 3.0;
const CORNER_STEPS: usize = 13;
const END_CAP_STEPS: usize = 29;

/// Shape options for the outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreehandOptions {
    /// How much pressure affects the width, in `[-1, 1]`.
    pub thinning: f64,
    /// How far outline points must be apart before they are kept, in `[0, 1]`.
    pub smoothing: f64,
    /// How much the input is pulled towards the previous point, in `[0, 1]`.
    pub streamline: f64,
    /// Derive pressure from drawing speed instead of the device.
    pub simulate_pressure: bool,
}

impl Default for FreehandOptions {
    fn default() -> Self {
        Self {
            thinning: 0.5,
            smoothing: 0.5,
            streamline: 0.5,
            simulate_pressure: true,
        }
    }
}

/// An input point after streamlining.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokePoint {
    pub point: Point,
    pub pressure: f64,
    /// Unit vector pointing back towards the previous point.
    pub vector: Vec2,
    /// Distance from the previous point.
    pub distance: f64,
    /// Length of the stroke up to this point.
    pub running_length: f64,
}

fn unit(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len < f64::EPSILON {
        Vec2::ZERO
    } else {
        v / len
    }
}

fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

fn rotate_around(point: Point, center: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let px = point.x - center.x;
    let py = point.y - center.y;
    Point::new(px * cos - py * sin + center.x, px * sin + py * cos + center.y)
}

fn stroke_radius(size: f64, thinning: f64, pressure: f64) -> f64 {
    size * (0.5 - thinning * (0.5 - pressure))
}

/// Streamline raw input into evenly spaced stroke points.
///
/// `size` is the stroke diameter in canvas units. When `complete` is set the
/// last point is kept exactly where it was sampled.
pub fn stroke_points(
    input: &[InkPoint],
    size: f64,
    options: &FreehandOptions,
    complete: bool,
) -> Vec<StrokePoint> {
    if input.is_empty() {
        return Vec::new();
    }

    let t = 0.15 + (1.0 - options.streamline) * 0.85;
    let mut pts: Vec<(Point, f64)> = input.iter().map(|p| (p.position(), p.pressure)).collect();

    if pts.len() == 2 {
        let (first, _) = pts[0];
        let (last, pressure) = pts[1];
        pts.truncate(1);
        for i in 1..5 {
            pts.push((first.lerp(last, i as f64 / 4.0), pressure));
        }
    } else if pts.len() == 1 {
        let (first, pressure) = pts[0];
        pts.push((first + Vec2::new(1.0, 1.0), pressure));
    }

    let mut result = vec![StrokePoint {
        point: pts[0].0,
        pressure: pts[0].1,
        vector: Vec2::new(1.0, 1.0),
        distance: 0.0,
        running_length: 0.0,
    }];

    let max = pts.len() - 1;
    let mut reached_minimum_length = false;
    let mut running_length = 0.0;
    let mut prev = result[0];

    for (i, &(target, pressure)) in pts.iter().enumerate().skip(1) {
        let point = if complete && i == max {
            target
        } else {
            prev.point.lerp(target, t)
        };
        if point == prev.point {
            continue;
        }

        let distance = (point - prev.point).hypot();
        running_length += distance;

        if i < max && !reached_minimum_length {
            if running_length < size {
                continue;
            }
            reached_minimum_length = true;
        }

        prev = StrokePoint {
            point,
            pressure,
            vector: unit(prev.point - point),
            distance,
            running_length,
        };
        result.push(prev);
    }

    result[0].vector = result.get(1).map(|p| p.vector).unwrap_or(Vec2::ZERO);
    result
}

/// Build the outline polygon around streamlined stroke points.
pub fn outline(points: &[StrokePoint], size: f64, options: &FreehandOptions) -> Vec<Point> {
    let Some(last) = points.last() else {
        return Vec::new();
    };

    let total_length = last.running_length;
    let min_distance = (size * options.smoothing).powi(2);

    let mut left: Vec<Point> = Vec::new();
    let mut right: Vec<Point> = Vec::new();

    // Seed the pressure from the first few points so the start isn't blobby.
    let mut prev_pressure = points.iter().take(10).fold(points[0].pressure, |acc, p| {
        let pressure = if options.simulate_pressure {
            let sp = (p.distance / size).min(1.0);
            let rp = (1.0 - sp).min(1.0);
            (acc + (rp - acc) * (sp * RATE_OF_PRESSURE_CHANGE)).min(1.0)
        } else {
            p.pressure
        };
        (acc + pressure) / 2.0
    });

    let mut radius = stroke_radius(size, options.thinning, last.pressure);
    let mut first_radius: Option<f64> = None;
    let mut prev_vector = points[0].vector;
    let mut pl = points[0].point;
    let mut pr = pl;
    let mut tl = pl;
    let mut tr = pr;
    let mut prev_was_sharp = false;

    for (i, sp) in points.iter().enumerate() {
        let is_last = i == points.len() - 1;
        if !is_last && total_length - sp.running_length < END_NOISE_THRESHOLD {
            continue;
        }

        let mut pressure = sp.pressure;
        if options.thinning != 0.0 {
            if options.simulate_pressure {
                let speed = (sp.distance / size).min(1.0);
                let rp = (1.0 - speed).min(1.0);
                pressure =
                    (prev_pressure + (rp - prev_pressure) * (speed * RATE_OF_PRESSURE_CHANGE)).min(1.0);
            }
            radius = stroke_radius(size, options.thinning, pressure);
        } else {
            radius = size / 2.0;
        }
        radius = radius.max(0.01);
        if first_radius.is_none() {
            first_radius = Some(radius);
        }

        let next_vector = if is_last { sp.vector } else { points[i + 1].vector };
        let next_dot = if is_last { 1.0 } else { sp.vector.dot(next_vector) };
        let prev_dot = sp.vector.dot(prev_vector);

        let is_sharp = prev_dot < 0.0 && !prev_was_sharp;
        let next_is_sharp = next_dot < 0.0;

        if is_sharp || next_is_sharp {
            // Round the corner with a half circle.
            let offset = perpendicular(prev_vector) * radius;
            for step in 0..=CORNER_STEPS {
                let t = step as f64 / CORNER_STEPS as f64;
                tl = rotate_around(sp.point - offset, sp.point, FIXED_PI * t);
                left.push(tl);
                tr = rotate_around(sp.point + offset, sp.point, FIXED_PI * -t);
                right.push(tr);
            }
            pl = tl;
            pr = tr;
            if next_is_sharp {
                prev_was_sharp = true;
            }
            continue;
        }

        prev_was_sharp = false;

        if is_last {
            let offset = perpendicular(sp.vector) * radius;
            left.push(sp.point - offset);
            right.push(sp.point + offset);
            continue;
        }

        let offset = perpendicular(next_vector.lerp(sp.vector, next_dot)) * radius;

        tl = sp.point - offset;
        if i <= 1 || (pl - tl).hypot2() > min_distance {
            left.push(tl);
            pl = tl;
        }

        tr = sp.point + offset;
        if i <= 1 || (pr - tr).hypot2() > min_distance {
            right.push(tr);
            pr = tr;
        }

        prev_pressure = pressure;
        prev_vector = sp.vector;
    }

    let first_point = points[0].point;
    let last_point = if points.len() > 1 {
        last.point
    } else {
        first_point + Vec2::new(1.0, 1.0)
    };

    if points.len() == 1 {
        // A dot.
        let r = first_radius.unwrap_or(radius);
        let start = first_point + unit(perpendicular(first_point - last_point)) * -r;
        return (1..=CORNER_STEPS)
            .map(|step| {
                let t = step as f64 / CORNER_STEPS as f64;
                rotate_around(start, first_point, FIXED_PI * 2.0 * t)
            })
            .collect();
    }

    let start_cap: Vec<Point> = match right.first() {
        Some(&first_right) => (1..=CORNER_STEPS)
            .map(|step| {
                let t = step as f64 / CORNER_STEPS as f64;
                rotate_around(first_right, first_point, FIXED_PI * t)
            })
            .collect(),
        None => Vec::new(),
    };

    let direction = perpendicular(-last.vector);
    let end_start = last_point + direction * radius;
    let end_cap = (1..END_CAP_STEPS).map(|step| {
        let t = step as f64 / END_CAP_STEPS as f64;
        rotate_around(end_start, last_point, FIXED_PI * 3.0 * t)
    });

    let mut polygon = left;
    polygon.extend(end_cap);
    polygon.extend(right.into_iter().rev());
    polygon.extend(start_cap);
    polygon
}

/// Connect outline vertices with quadratic midpoints and close the loop.
pub fn outline_to_path(polygon: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = polygon.first() else {
        return path;
    };

    path.move_to(first);
    for (i, &p0) in polygon.iter().enumerate() {
        let p1 = polygon[(i + 1) % polygon.len()];
        path.quad_to(p0, p0.midpoint(p1));
    }
    path.close_path();
    path
}

/// SVG path data for an outline polygon; empty when there is nothing to draw.
pub fn path_data(polygon: &[Point]) -> String {
    if polygon.is_empty() {
        return String::new();
    }
    outline_to_path(polygon).to_svg()
}

/// Collapse a long, nearly horizontal stroke to a straight segment.
///
/// Returns `None` when the stroke does not qualify. The segment sits at the
/// mean y of the samples and keeps the drawing direction.
pub fn flatten_horizontal(points: &[InkPoint], options: &HighlighterOptions) -> Option<Vec<InkPoint>> {
    let first = points.first()?;
    let last = points.last()?;
    let bounds = crate::geometry::bounds_of(points.iter().map(InkPoint::position))?;

    if bounds.width() <= options.flatten_min_width || bounds.height() >= options.flatten_max_spread {
        return None;
    }

    let count = points.len() as f64;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / count;
    let mean_pressure = points.iter().map(|p| p.pressure).sum::<f64>() / count;
    let (start_x, end_x) = if first.x <= last.x {
        (bounds.x0, bounds.x1)
    } else {
        (bounds.x1, bounds.x0)
    };

    Some(vec![
        InkPoint::new(Point::new(start_x, mean_y), mean_pressure, first.timestamp),
        InkPoint::new(Point::new(end_x, mean_y), mean_pressure, last.timestamp),
    ])
}

/// Effective size of a tool in screen pixels.
pub fn effective_size(tool: StrokeTool, pen_size: f64, highlighter: &HighlighterOptions) -> f64 {
    match tool {
        StrokeTool::Pen => pen_size,
        StrokeTool::Highlighter => pen_size.max(highlighter.min_size),
    }
}

/// Parameters for turning captured points into a path.
#[derive(Debug, Clone, Copy)]
pub struct PathParams<'a> {
    pub tool: StrokeTool,
    /// Pen size in screen pixels.
    pub pen_size: f64,
    /// Current viewport scale.
    pub scale: f64,
    pub freehand: &'a FreehandOptions,
    pub highlighter: &'a HighlighterOptions,
    /// Whether the gesture has ended.
    pub complete: bool,
}

/// Run the whole pipeline: optional flattening, streamlining, outline and
/// serialization.
///
/// The size is divided by the scale so the ink keeps the same apparent
/// thickness at every zoom level.
pub fn render_path(points: &[InkPoint], params: &PathParams<'_>) -> String {
    let size = effective_size(params.tool, params.pen_size, params.highlighter) / params.scale;

    let flattened = match params.tool {
        StrokeTool::Highlighter => flatten_horizontal(points, params.highlighter),
        StrokeTool::Pen => None,
    };
    let source = flattened.as_deref().unwrap_or(points);

    let streamlined = stroke_points(source, size, params.freehand, params.complete);
    path_data(&outline(&streamlined, size, params.freehand))
}
