//! Laser pointer trail and its decay schedule.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A transient laser sample in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaserPoint {
    pub x: f64,
    pub y: f64,
    pub timestamp: u64,
}

impl LaserPoint {
    pub fn new(position: Point, timestamp: u64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            timestamp,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Milliseconds since the point was recorded.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }
}

/// Drop points older than `lifetime_ms`.
///
/// Returns `None` when every point is still alive, so the trail is only
/// replaced when something actually expired.
pub fn prune(points: &[LaserPoint], now: u64, lifetime_ms: u64) -> Option<Vec<LaserPoint>> {
    let alive: Vec<LaserPoint> = points
        .iter()
        .filter(|p| p.age(now) <= lifetime_ms)
        .copied()
        .collect();
    if alive.len() == points.len() {
        None
    } else {
        Some(alive)
    }
}

/// One drawable piece of the trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub from: Point,
    pub to: Point,
    pub width: f64,
    pub opacity: f64,
}

/// Split the trail into segments that grow thicker and more opaque toward the
/// newest point.
pub fn trail_segments(points: &[LaserPoint], max_width: f64) -> Vec<TrailSegment> {
    let count = points.len();
    if count < 2 {
        return Vec::new();
    }
    points
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let t = (i + 1) as f64 / (count - 1) as f64;
            TrailSegment {
                from: pair[0].position(),
                to: pair[1].position(),
                width: max_width * (0.2 + 0.8 * t),
                opacity: 0.1 + 0.9 * t,
            }
        })
        .collect()
}

/// Outcome of a decay tick.
#[derive(Debug, Clone, PartialEq)]
pub enum DecayTick {
    /// Not due yet, or nothing expired.
    Unchanged,
    /// Some points expired; this is the surviving trail.
    Pruned(Vec<LaserPoint>),
    /// The trail is empty and the schedule has stopped.
    Stopped,
}

/// Fixed-interval scheduler that runs only while the trail is non-empty.
#[derive(Debug, Clone)]
pub struct LaserDecay {
    lifetime_ms: u64,
    tick_ms: u64,
    next_tick: Option<u64>,
}

impl LaserDecay {
    pub fn new(lifetime_ms: u64, tick_ms: u64) -> Self {
        Self {
            lifetime_ms,
            tick_ms,
            next_tick: None,
        }
    }

    pub fn lifetime_ms(&self) -> u64 {
        self.lifetime_ms
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Time of the next scheduled tick, if running.
    pub fn next_tick(&self) -> Option<u64> {
        self.next_tick
    }

    /// Start the schedule if it isn't running already.
    pub fn ensure_running(&mut self, now: u64) {
        if self.next_tick.is_none() {
            log::trace!("Laser decay started at {now}");
            self.next_tick = Some(now + self.tick_ms);
        }
    }

    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    pub fn is_due(&self, now: u64) -> bool {
        self.next_tick.is_some_and(|at| now >= at)
    }

    /// Advance the schedule. Call whenever the host timer fires.
    pub fn tick(&mut self, points: &[LaserPoint], now: u64) -> DecayTick {
        if !self.is_due(now) {
            return DecayTick::Unchanged;
        }
        if points.is_empty() {
            self.stop();
            return DecayTick::Stopped;
        }

        // Catch up on missed ticks without scheduling in the past.
        let mut next = self.next_tick.unwrap_or(now);
        while next <= now {
            next += self.tick_ms;
        }
        self.next_tick = Some(next);

        match prune(points, now, self.lifetime_ms) {
            Some(alive) if alive.is_empty() => {
                log::trace!("Laser trail fully decayed");
                self.stop();
                DecayTick::Pruned(alive)
            }
            Some(alive) => DecayTick::Pruned(alive),
            None => DecayTick::Unchanged,
        }
    }
}
