//! Inkboard Core Library
//!
//! Platform-agnostic canvas interaction engine for the Inkboard whiteboard:
//! viewport transforms, tools, freehand ink, eraser, selection and laser.

pub mod clock;
pub mod config;
pub mod engine;
pub mod eraser;
pub mod freehand;
pub mod geometry;
pub mod input;
pub mod laser;
pub mod selection;
pub mod store;
pub mod stroke;
pub mod tools;
pub mod viewport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ConfigResult, EngineConfig, HighlighterOptions};
pub use engine::{CanvasEngine, CanvasEvent, Response};
pub use freehand::FreehandOptions;
pub use input::{CoalescedSource, Modifiers, MouseButton, PointerInput, PointerSample, RawPointerEvent};
pub use laser::{LaserPoint, TrailSegment, trail_segments};
pub use selection::{MenuPosition, SelectionBox};
pub use store::{EditorAction, EditorState, StoreError, StoreResult};
pub use stroke::{InkPoint, Stroke, StrokeId, StrokeTool, TextBox};
pub use tools::{Gesture, ToolKind, ToolManager};
pub use viewport::{MAX_SCALE, MIN_SCALE, Surface, Viewport};
