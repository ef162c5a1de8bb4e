//! Inkboard Render Library
//!
//! Renderer abstraction for Inkboard and an SVG implementation that draws
//! committed strokes, the live path, the selection rectangle and the laser
//! trail.

mod renderer;
mod svg;

pub use renderer::{RenderContext, RenderResult, Renderer, RendererError, parse_color};
pub use svg::SvgRenderer;
