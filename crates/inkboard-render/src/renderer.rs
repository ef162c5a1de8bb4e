//! Renderer trait abstraction.

use inkboard_core::{EditorState, StrokeTool};
use kurbo::Size;
use peniko::Color;
use peniko::color::{Srgb, parse_color as parse_css_color};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Parse a CSS color string such as `#1e1e1e` or `rgb(255 0 0)`.
pub fn parse_color(css: &str) -> RenderResult<Color> {
    parse_css_color(css)
        .map(|color| color.to_alpha_color::<Srgb>())
        .map_err(|_| RendererError::InvalidColor(css.to_string()))
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The editor state to render.
    pub state: &'a EditorState,
    /// Outline of the stroke being drawn, in canvas units.
    pub live_path: Option<&'a str>,
    /// Tool of the stroke being drawn.
    pub live_tool: Option<StrokeTool>,
    /// Surface size in pixels.
    pub viewport_size: Size,
    /// Background color.
    pub background_color: Color,
    /// Selection rectangle color.
    pub selection_color: Color,
    /// Laser trail color.
    pub laser_color: Color,
    /// Width of the newest laser segment in screen pixels.
    pub laser_width: f64,
    /// Opacity applied to highlighter strokes.
    pub highlighter_opacity: f32,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(state: &'a EditorState, viewport_size: Size) -> Self {
        Self {
            state,
            live_path: None,
            live_tool: None,
            viewport_size,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            laser_color: Color::from_rgba8(239, 68, 68, 255),      // Red
            laser_width: 6.0,
            highlighter_opacity: 0.4,
        }
    }

    /// Set the in-progress stroke.
    pub fn with_live_path(mut self, path: Option<&'a str>, tool: Option<StrokeTool>) -> Self {
        self.live_path = path;
        self.live_tool = tool;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the highlighter opacity.
    pub fn with_highlighter_opacity(mut self, opacity: f32) -> Self {
        self.highlighter_opacity = opacity;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Build the output for a frame.
    ///
    /// Called once per frame after the state changed.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        let color = parse_color("#ff0000").unwrap();
        let rgba = color.to_rgba8();
        assert_eq!((rgba.r, rgba.g, rgba.b, rgba.a), (255, 0, 0, 255));
        assert!(matches!(parse_color("not a color"), Err(RendererError::InvalidColor(_))));
    }

    #[test]
    fn test_context_builders() {
        let state = EditorState::default();
        let ctx = RenderContext::new(&state, Size::new(800.0, 600.0))
            .with_live_path(Some("M0 0Z"), Some(StrokeTool::Pen))
            .with_highlighter_opacity(0.5);
        assert_eq!(ctx.live_path, Some("M0 0Z"));
        assert!((ctx.highlighter_opacity - 0.5).abs() < f32::EPSILON);
    }
}
