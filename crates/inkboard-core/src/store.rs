//! Editor state store.
//!
//! All canvas state lives here and changes only through [`EditorAction`]s.
//! Every accepted action bumps [`EditorState::revision`], which renderers use
//! to decide whether to redraw.

use crate::laser::LaserPoint;
use crate::selection::{MenuPosition, SelectionBox};
use crate::stroke::{Stroke, TextBox};
use crate::tools::ToolKind;
use crate::viewport::{Viewport, clamp_scale};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// Default ink color.
pub const DEFAULT_PEN_COLOR: &str = "#1e1e1e";
/// Default pen size in screen pixels.
pub const DEFAULT_PEN_SIZE: f64 = 4.0;
/// Default author tag for new marks.
pub const DEFAULT_AUTHOR: &str = "teacher";

/// Actions accepted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditorAction {
    AddStroke(Stroke),
    SetStrokes(Vec<Stroke>),
    SetViewport(Viewport),
    SetSelectionBox(Option<SelectionBox>),
    SetSelectionMenuPosition(Option<MenuPosition>),
    SetLaserPath(Vec<LaserPoint>),
    SetCurrentTool(ToolKind),
    SetPenColor(String),
    SetPenSize(f64),
    AddTextBox(TextBox),
    ClearStrokes,
    Undo,
    Redo,
}

impl EditorAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddStroke(_) => "ADD_STROKE",
            Self::SetStrokes(_) => "SET_STROKES",
            Self::SetViewport(_) => "SET_VIEWPORT",
            Self::SetSelectionBox(_) => "SET_SELECTION_BOX",
            Self::SetSelectionMenuPosition(_) => "SET_SELECTION_MENU_POSITION",
            Self::SetLaserPath(_) => "SET_LASER_PATH",
            Self::SetCurrentTool(_) => "SET_CURRENT_TOOL",
            Self::SetPenColor(_) => "SET_PEN_COLOR",
            Self::SetPenSize(_) => "SET_PEN_SIZE",
            Self::AddTextBox(_) => "ADD_TEXT_BOX",
            Self::ClearStrokes => "CLEAR_STROKES",
            Self::Undo => "UNDO",
            Self::Redo => "REDO",
        }
    }
}

/// Rejected action payloads.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("{action}: non-finite coordinate")]
    NonFinite { action: &'static str },
    #[error("Stroke {0} has no points")]
    EmptyStroke(String),
    #[error("Duplicate id: {0}")]
    DuplicateId(String),
    #[error("Invalid pen size: {0}")]
    InvalidPenSize(f64),
    #[error("Pen color must not be empty")]
    EmptyColor,
    #[error("Selection box has negative size")]
    NegativeSelection,
}

/// Result type for store dispatches.
pub type StoreResult<T> = Result<T, StoreError>;

/// Undoable part of the state.
#[derive(Debug, Clone)]
struct ContentSnapshot {
    strokes: Vec<Stroke>,
    text_boxes: Vec<TextBox>,
}

/// Complete editor state.
#[derive(Debug, Clone)]
pub struct EditorState {
    current_tool: ToolKind,
    pen_color: String,
    pen_size: f64,
    author: String,
    strokes: Vec<Stroke>,
    text_boxes: Vec<TextBox>,
    viewport: Viewport,
    selection_box: Option<SelectionBox>,
    selection_menu_position: Option<MenuPosition>,
    laser_path: Vec<LaserPoint>,
    undo_stack: Vec<ContentSnapshot>,
    redo_stack: Vec<ContentSnapshot>,
    revision: u64,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHOR)
    }
}

impl EditorState {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            current_tool: ToolKind::default(),
            pen_color: DEFAULT_PEN_COLOR.to_string(),
            pen_size: DEFAULT_PEN_SIZE,
            author: author.into(),
            strokes: Vec::new(),
            text_boxes: Vec::new(),
            viewport: Viewport::default(),
            selection_box: None,
            selection_menu_position: None,
            laser_path: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            revision: 0,
        }
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    pub fn pen_color(&self) -> &str {
        &self.pen_color
    }

    pub fn pen_size(&self) -> f64 {
        self.pen_size
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn text_boxes(&self) -> &[TextBox] {
        &self.text_boxes
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selection_box(&self) -> Option<SelectionBox> {
        self.selection_box
    }

    pub fn selection_menu_position(&self) -> Option<MenuPosition> {
        self.selection_menu_position
    }

    pub fn laser_path(&self) -> &[LaserPoint] {
        &self.laser_path
    }

    /// Incremented on every accepted change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Validate and apply an action.
    pub fn dispatch(&mut self, action: EditorAction) -> StoreResult<()> {
        let name = action.name();
        let changed = match action {
            EditorAction::AddStroke(stroke) => {
                validate_stroke(&stroke)?;
                if self.strokes.iter().any(|s| s.id == stroke.id) {
                    return Err(StoreError::DuplicateId(stroke.id));
                }
                self.push_undo();
                self.strokes.push(stroke);
                true
            }
            EditorAction::SetStrokes(strokes) => {
                for stroke in &strokes {
                    validate_stroke(stroke)?;
                }
                self.push_undo();
                self.strokes = strokes;
                true
            }
            EditorAction::SetViewport(viewport) => {
                if !viewport.is_finite() {
                    return Err(StoreError::NonFinite { action: name });
                }
                self.viewport = Viewport {
                    scale: clamp_scale(viewport.scale),
                    ..viewport
                };
                true
            }
            EditorAction::SetSelectionBox(selection) => {
                if let Some(b) = &selection {
                    if ![b.x, b.y, b.width, b.height].iter().all(|v| v.is_finite()) {
                        return Err(StoreError::NonFinite { action: name });
                    }
                    if b.width < 0.0 || b.height < 0.0 {
                        return Err(StoreError::NegativeSelection);
                    }
                }
                self.selection_box = selection;
                true
            }
            EditorAction::SetSelectionMenuPosition(position) => {
                if position.is_some_and(|p| !(p.top.is_finite() && p.left.is_finite())) {
                    return Err(StoreError::NonFinite { action: name });
                }
                self.selection_menu_position = position;
                true
            }
            EditorAction::SetLaserPath(points) => {
                if points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
                    return Err(StoreError::NonFinite { action: name });
                }
                self.laser_path = points;
                true
            }
            EditorAction::SetCurrentTool(tool) => {
                self.current_tool = tool;
                true
            }
            EditorAction::SetPenColor(color) => {
                if color.trim().is_empty() {
                    return Err(StoreError::EmptyColor);
                }
                self.pen_color = color;
                true
            }
            EditorAction::SetPenSize(size) => {
                if !(size.is_finite() && size > 0.0) {
                    return Err(StoreError::InvalidPenSize(size));
                }
                self.pen_size = size;
                true
            }
            EditorAction::AddTextBox(text_box) => {
                if !(text_box.position.x.is_finite() && text_box.position.y.is_finite()) {
                    return Err(StoreError::NonFinite { action: name });
                }
                if self.text_boxes.iter().any(|t| t.id == text_box.id) {
                    return Err(StoreError::DuplicateId(text_box.id));
                }
                self.push_undo();
                self.text_boxes.push(text_box);
                true
            }
            EditorAction::ClearStrokes => {
                if self.strokes.is_empty() {
                    false
                } else {
                    self.push_undo();
                    self.strokes.clear();
                    true
                }
            }
            EditorAction::Undo => self.undo(),
            EditorAction::Redo => self.redo(),
        };

        if changed {
            self.revision += 1;
            log::trace!("{name} -> revision {}", self.revision);
        }
        Ok(())
    }

    fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            strokes: self.strokes.clone(),
            text_boxes: self.text_boxes.clone(),
        }
    }

    fn restore(&mut self, snapshot: ContentSnapshot) {
        self.strokes = snapshot.strokes;
        self.text_boxes = snapshot.text_boxes;
    }

    /// Push current content to the undo stack (call before making changes).
    fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(snapshot);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(snapshot);
        true
    }
}

fn validate_stroke(stroke: &Stroke) -> StoreResult<()> {
    if stroke.raw_points.is_empty() {
        return Err(StoreError::EmptyStroke(stroke.id.clone()));
    }
    if !stroke.raw_points.iter().all(|p| p.is_finite()) {
        return Err(StoreError::NonFinite { action: "stroke" });
    }
    if !(stroke.size.is_finite() && stroke.size > 0.0) {
        return Err(StoreError::InvalidPenSize(stroke.size));
    }
    Ok(())
}
