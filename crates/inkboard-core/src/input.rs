//! Pointer and keyboard input normalized for the canvas engine.
//!
//! Hosts deliver pointer moves at display rate but may batch several
//! hardware samples into one event. [`CoalescedSource`] exposes those
//! sub-samples and [`PointerInput::from_source`] flattens them into an ordered
//! list, falling back to the dispatched event when none are available.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::stroke::{DEFAULT_PRESSURE, normalize_pressure};

/// Key name for cancelling the current gesture.
pub const KEY_ESCAPE: &str = "Escape";

/// Key names that hold the temporary pan override.
pub const KEY_SPACE: &[&str] = &[" ", "Space", "Spacebar"];

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Map a DOM `button` index (the button that changed state).
    pub fn from_index(index: i16) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Middle),
            2 => Some(Self::Right),
            _ => None,
        }
    }

    /// Bit of this button in a DOM `buttons` mask.
    pub fn mask(self) -> u16 {
        match self {
            Self::Left => 1,
            Self::Right => 2,
            Self::Middle => 4,
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

pub fn is_space_key(key: &str) -> bool {
    KEY_SPACE.contains(&key)
}

/// One hardware sample in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub position: Point,
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    pub timestamp: u64,
}

fn default_pressure() -> f64 {
    DEFAULT_PRESSURE
}

impl PointerSample {
    pub fn new(position: Point, pressure: f64, timestamp: u64) -> Self {
        Self {
            position,
            pressure: normalize_pressure(pressure),
            timestamp,
        }
    }
}

/// Host pointer event that may carry coalesced sub-samples.
pub trait CoalescedSource {
    fn pointer_id(&self) -> i32;

    /// Button whose state changed with this event, for down/up.
    fn changed_button(&self) -> Option<MouseButton>;

    /// Mask of buttons currently held.
    fn buttons(&self) -> u16;

    fn modifiers(&self) -> Modifiers {
        Modifiers::default()
    }

    /// The dispatched sample itself.
    fn sample(&self) -> PointerSample;

    /// Sub-samples batched into this event. Empty when the host has none.
    fn coalesced(&self) -> Vec<PointerSample> {
        Vec::new()
    }
}

/// Flatten a host event into its samples in temporal order.
pub fn expand_coalesced<S: CoalescedSource + ?Sized>(source: &S) -> Vec<PointerSample> {
    let mut samples = source.coalesced();
    if samples.is_empty() {
        return vec![source.sample()];
    }
    // Stable: equal timestamps keep dispatch order.
    samples.sort_by_key(|s| s.timestamp);
    samples
}

/// A pointer event after coalesced expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    #[serde(default)]
    pub pointer_id: i32,
    #[serde(default)]
    pub button: Option<MouseButton>,
    #[serde(default)]
    pub buttons: u16,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Never empty.
    pub samples: Vec<PointerSample>,
}

impl PointerInput {
    pub fn from_source<S: CoalescedSource + ?Sized>(source: &S) -> Self {
        Self {
            pointer_id: source.pointer_id(),
            button: source.changed_button(),
            buttons: source.buttons(),
            modifiers: source.modifiers(),
            samples: expand_coalesced(source),
        }
    }

    /// Latest sample.
    pub fn last(&self) -> PointerSample {
        self.samples
            .last()
            .copied()
            .unwrap_or(PointerSample::new(Point::ZERO, DEFAULT_PRESSURE, 0))
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.buttons & button.mask() != 0
    }

    pub fn primary_held(&self) -> bool {
        self.is_held(MouseButton::Left)
    }
}

/// Serializable pointer event with optional sub-samples, as recorded in
/// input traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPointerEvent {
    #[serde(default)]
    pub pointer_id: i32,
    #[serde(default)]
    pub button: Option<MouseButton>,
    #[serde(default)]
    pub buttons: u16,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub coalesced: Vec<PointerSample>,
}

impl CoalescedSource for RawPointerEvent {
    fn pointer_id(&self) -> i32 {
        self.pointer_id
    }

    fn changed_button(&self) -> Option<MouseButton> {
        self.button
    }

    fn buttons(&self) -> u16 {
        self.buttons
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn sample(&self) -> PointerSample {
        PointerSample::new(Point::new(self.x, self.y), self.pressure, self.timestamp)
    }

    fn coalesced(&self) -> Vec<PointerSample> {
        self.coalesced
            .iter()
            .map(|s| PointerSample::new(s.position, s.pressure, s.timestamp))
            .collect()
    }
}
