//! Eraser hit-testing against committed strokes.
//!
//! Every raw point of every stroke is compared against each erase sample.
//! Sessions hold at most a few hundred strokes, so the linear scan is enough.

use crate::stroke::{Stroke, StrokeId};
use kurbo::Point;
use std::collections::HashSet;

/// Eraser radius in canvas units for a given screen radius and scale.
///
/// Dividing by the scale keeps the eraser the same size on screen at every
/// zoom level.
pub fn canvas_radius(screen_radius: f64, scale: f64) -> f64 {
    screen_radius / scale
}

/// Ids of strokes with at least one raw point within `radius` of any sample.
pub fn strokes_hit(strokes: &[Stroke], samples: &[Point], radius: f64) -> HashSet<StrokeId> {
    let mut hit = HashSet::new();
    for stroke in strokes {
        if samples.iter().any(|&sample| stroke.has_point_within(sample, radius)) {
            hit.insert(stroke.id.clone());
        }
    }
    hit
}

/// Remove every stroke touched by the samples.
///
/// Returns the surviving strokes in their original order, or `None` when
/// nothing was hit so callers can skip the update entirely.
pub fn erase(strokes: &[Stroke], samples: &[Point], radius: f64) -> Option<Vec<Stroke>> {
    if samples.is_empty() {
        return None;
    }

    let hit = strokes_hit(strokes, samples, radius);
    if hit.is_empty() {
        return None;
    }

    log::debug!("Eraser removed {} stroke(s)", hit.len());
    Some(
        strokes
            .iter()
            .filter(|stroke| !hit.contains(&stroke.id))
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{InkPoint, StrokeTool};

    fn stroke(id: &str, points: &[(f64, f64)]) -> Stroke {
        Stroke {
            id: id.to_string(),
            path: String::new(),
            color: "#222".to_string(),
            size: 4.0,
            tool: StrokeTool::Pen,
            raw_points: points
                .iter()
                .map(|&(x, y)| InkPoint::new(Point::new(x, y), 0.5, 0))
                .collect(),
            author: "student".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_canvas_radius() {
        assert!((canvas_radius(20.0, 1.0) - 20.0).abs() < f64::EPSILON);
        assert!((canvas_radius(20.0, 2.0) - 10.0).abs() < f64::EPSILON);
        assert!((canvas_radius(20.0, 0.5) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_erase_near_stroke_only() {
        let strokes = vec![
            stroke("a", &[(100.0, 100.0), (120.0, 130.0)]),
            stroke("b", &[(500.0, 500.0), (520.0, 510.0)]),
        ];
        let remaining = erase(&strokes, &[Point::new(105.0, 102.0)], canvas_radius(20.0, 1.0)).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b");
    }

    #[test]
    fn test_erase_nothing_hit() {
        let strokes = vec![stroke("a", &[(0.0, 0.0)])];
        assert!(erase(&strokes, &[Point::new(100.0, 100.0)], 20.0).is_none());
        assert!(erase(&strokes, &[], 20.0).is_none());
    }

    #[test]
    fn test_erase_batch_removes_all_hits_in_order() {
        let strokes = vec![
            stroke("a", &[(0.0, 0.0)]),
            stroke("b", &[(200.0, 0.0)]),
            stroke("c", &[(400.0, 0.0)]),
            stroke("d", &[(600.0, 0.0)]),
        ];
        let samples = [Point::new(5.0, 5.0), Point::new(395.0, -3.0)];
        let remaining = erase(&strokes, &samples, 20.0).unwrap();
        let ids: Vec<_> = remaining.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn test_zoomed_in_radius_shrinks() {
        let strokes = vec![stroke("a", &[(100.0, 100.0)])];
        let sample = [Point::new(115.0, 100.0)];
        assert!(erase(&strokes, &sample, canvas_radius(20.0, 1.0)).is_some());
        assert!(erase(&strokes, &sample, canvas_radius(20.0, 2.0)).is_none());
    }
}
