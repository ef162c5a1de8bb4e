//! Tool selection and the in-flight gesture state machine.

use crate::stroke::{InkPoint, StrokeTool};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Cursor,
    Pan,
    Select,
    Pen,
    Highlighter,
    Eraser,
    Laser,
    Text,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Cursor,
        ToolKind::Pan,
        ToolKind::Select,
        ToolKind::Pen,
        ToolKind::Highlighter,
        ToolKind::Eraser,
        ToolKind::Laser,
        ToolKind::Text,
    ];

    /// Stroke kind produced by this tool, for drawing tools.
    pub fn stroke_tool(self) -> Option<StrokeTool> {
        match self {
            ToolKind::Pen => Some(StrokeTool::Pen),
            ToolKind::Highlighter => Some(StrokeTool::Highlighter),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Cursor => "cursor",
            ToolKind::Pan => "pan",
            ToolKind::Select => "select",
            ToolKind::Pen => "pen",
            ToolKind::Highlighter => "highlighter",
            ToolKind::Eraser => "eraser",
            ToolKind::Laser => "laser",
            ToolKind::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }
}

/// What started a pan gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanSource {
    /// The pan tool is selected.
    Tool,
    /// Space is held over another tool.
    SpaceKey,
    /// Middle button drag over another tool.
    MiddleButton,
}

/// Ink collected by an in-progress pen or highlighter gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeCapture {
    pub tool: StrokeTool,
    /// Canvas-space samples, starting with the pointer-down position.
    pub points: Vec<InkPoint>,
    /// Live outline path, refreshed on every move.
    pub preview: String,
    /// Whether any move sample arrived after pointer-down.
    pub moved: bool,
}

impl StrokeCapture {
    pub fn new(tool: StrokeTool, first: InkPoint) -> Self {
        Self {
            tool,
            points: vec![first],
            preview: String::new(),
            moved: false,
        }
    }

    pub fn push(&mut self, point: InkPoint) {
        self.points.push(point);
        self.moved = true;
    }
}

/// The single in-flight gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing(StrokeCapture),
    Panning {
        /// Last pointer position in screen space.
        last: Point,
        source: PanSource,
    },
    Selecting {
        /// Drag anchor in canvas space.
        start: Point,
    },
    Erasing,
    Lasering,
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Drawing(_) => "drawing",
            Gesture::Panning { .. } => "panning",
            Gesture::Selecting { .. } => "selecting",
            Gesture::Erasing => "erasing",
            Gesture::Lasering => "lasering",
        }
    }
}

/// Manages the current tool and its gesture.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    gesture: Gesture,
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool, dropping any gesture of the previous one.
    ///
    /// Returns the cancelled gesture, if there was one.
    pub fn set_tool(&mut self, tool: ToolKind) -> Option<Gesture> {
        let cancelled = self.cancel();
        if self.current_tool != tool {
            log::debug!("Tool {} -> {}", self.current_tool.name(), tool.name());
        }
        self.current_tool = tool;
        cancelled
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Start a gesture, replacing whatever was in flight.
    pub fn begin(&mut self, gesture: Gesture) {
        log::trace!("Gesture {} -> {}", self.gesture.label(), gesture.label());
        self.gesture = gesture;
    }

    /// Take the in-flight gesture, leaving the manager idle.
    pub fn take_gesture(&mut self) -> Gesture {
        std::mem::take(&mut self.gesture)
    }

    /// Cancel the in-flight gesture without committing anything.
    pub fn cancel(&mut self) -> Option<Gesture> {
        match self.take_gesture() {
            Gesture::Idle => None,
            gesture => {
                log::debug!("Cancelled {} gesture", gesture.label());
                Some(gesture)
            }
        }
    }

    /// Check if a gesture is in flight.
    pub fn is_active(&self) -> bool {
        !self.gesture.is_idle()
    }

    /// The capture of an in-progress stroke.
    pub fn capture(&self) -> Option<&StrokeCapture> {
        match &self.gesture {
            Gesture::Drawing(capture) => Some(capture),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_selection() {
        let mut tm = ToolManager::new();
        assert_eq!(tm.current_tool, ToolKind::Cursor);

        tm.set_tool(ToolKind::Pen);
        assert_eq!(tm.current_tool, ToolKind::Pen);
    }

    #[test]
    fn test_set_tool_cancels_gesture() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Pen);
        tm.begin(Gesture::Drawing(StrokeCapture::new(
            StrokeTool::Pen,
            InkPoint::new(Point::ZERO, 0.5, 0),
        )));
        assert!(tm.is_active());
        assert!(tm.capture().is_some());

        let cancelled = tm.set_tool(ToolKind::Eraser);
        assert!(matches!(cancelled, Some(Gesture::Drawing(_))));
        assert!(!tm.is_active());
        assert!(tm.capture().is_none());
    }

    #[test]
    fn test_cancel_idle() {
        let mut tm = ToolManager::new();
        assert!(tm.cancel().is_none());
        assert!(tm.set_tool(ToolKind::Select).is_none());
    }

    #[test]
    fn test_capture_tracks_moves() {
        let mut capture = StrokeCapture::new(StrokeTool::Highlighter, InkPoint::new(Point::ZERO, 0.5, 0));
        assert!(!capture.moved);
        capture.push(InkPoint::new(Point::new(1.0, 1.0), 0.5, 5));
        assert!(capture.moved);
        assert_eq!(capture.points.len(), 2);
    }

    #[test]
    fn test_tool_names() {
        for tool in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(tool.name()), Some(tool));
            let json = serde_json::to_string(&tool).unwrap();
            assert_eq!(json, format!("\"{}\"", tool.name()));
        }
        assert_eq!(ToolKind::Pen.stroke_tool(), Some(StrokeTool::Pen));
        assert_eq!(ToolKind::Laser.stroke_tool(), None);
    }
}
