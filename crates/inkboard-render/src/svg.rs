//! SVG renderer.

use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError, parse_color};
use inkboard_core::store::DEFAULT_PEN_COLOR;
use inkboard_core::{StrokeTool, Viewport, trail_segments};
use peniko::Color;
use std::fmt::Write;

/// Renders the canvas into a standalone SVG document.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    document: String,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last rendered document.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn into_document(self) -> String {
        self.document
    }
}

impl Renderer for SvgRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let size = ctx.viewport_size;
        if !(size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0) {
            return Err(RendererError::Surface(format!(
                "invalid size {}x{}",
                size.width, size.height
            )));
        }

        let state = ctx.state;
        let viewport = state.viewport();
        let mut out = String::new();
        let _ = write!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            w = fmt_num(size.width),
            h = fmt_num(size.height),
        );
        let (bg, bg_alpha) = color_to_svg(self.background_color(ctx));
        let _ = write!(
            out,
            "<rect width=\"100%\" height=\"100%\" fill=\"{bg}\"{}/>",
            opacity_attr("fill-opacity", bg_alpha)
        );
        let _ = write!(out, "<g transform=\"{}\">", viewport_matrix(&viewport));

        for stroke in state.strokes() {
            let color = parse_color(&stroke.color).unwrap_or_else(|err| {
                log::warn!("Stroke {}: {err}", stroke.id);
                default_pen_color()
            });
            let opacity = match stroke.tool {
                StrokeTool::Highlighter => ctx.highlighter_opacity,
                StrokeTool::Pen => 1.0,
            };
            write_path(&mut out, &stroke.path, color, opacity, Some(&stroke.id));
        }

        for text in state.text_boxes() {
            let _ = write!(
                out,
                "<text x=\"{}\" y=\"{}\" data-id=\"{}\">{}</text>",
                fmt_num(text.position.x),
                fmt_num(text.position.y),
                escape(&text.id),
                escape(&text.content),
            );
        }

        if let Some(path) = ctx.live_path {
            let color = parse_color(state.pen_color()).unwrap_or_else(|_| default_pen_color());
            let opacity = match ctx.live_tool {
                Some(StrokeTool::Highlighter) => ctx.highlighter_opacity,
                _ => 1.0,
            };
            write_path(&mut out, path, color, opacity, None);
        }

        if let Some(selection) = state.selection_box() {
            let (stroke, alpha) = color_to_svg(ctx.selection_color);
            // Keep the outline one screen pixel wide.
            let width = 1.0 / viewport.scale;
            let _ = write!(
                out,
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"none\" stroke=\"{stroke}\"{} stroke-width=\"{}\" stroke-dasharray=\"{} {}\"/>",
                fmt_num(selection.x),
                fmt_num(selection.y),
                fmt_num(selection.width),
                fmt_num(selection.height),
                opacity_attr("stroke-opacity", alpha),
                fmt_num(width),
                fmt_num(4.0 * width),
                fmt_num(4.0 * width),
            );
        }

        let (laser, laser_alpha) = color_to_svg(ctx.laser_color);
        for segment in trail_segments(state.laser_path(), ctx.laser_width / viewport.scale) {
            let _ = write!(
                out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{laser}\" stroke-opacity=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\"/>",
                fmt_num(segment.from.x),
                fmt_num(segment.from.y),
                fmt_num(segment.to.x),
                fmt_num(segment.to.y),
                fmt_num(f64::from(laser_alpha) * segment.opacity),
                fmt_num(segment.width),
            );
        }

        out.push_str("</g></svg>");
        log::debug!(
            "Rendered {} strokes, revision {}",
            state.strokes().len(),
            state.revision()
        );
        self.document = out;
        Ok(())
    }
}

fn default_pen_color() -> Color {
    parse_color(DEFAULT_PEN_COLOR).unwrap_or(Color::BLACK)
}

fn write_path(out: &mut String, d: &str, color: Color, opacity: f32, id: Option<&str>) {
    if d.is_empty() {
        return;
    }
    let (fill, alpha) = color_to_svg(color);
    let _ = write!(out, "<path d=\"{}\" fill=\"{fill}\"", escape(d));
    out.push_str(&opacity_attr("fill-opacity", alpha * opacity));
    if let Some(id) = id {
        let _ = write!(out, " data-id=\"{}\"", escape(id));
    }
    out.push_str("/>");
}

fn viewport_matrix(viewport: &Viewport) -> String {
    format!(
        "matrix({} 0 0 {} {} {})",
        fmt_num(viewport.scale),
        fmt_num(viewport.scale),
        fmt_num(viewport.x),
        fmt_num(viewport.y),
    )
}

fn color_to_svg(color: Color) -> (String, f32) {
    let rgba = color.to_rgba8();
    let a = f32::from(rgba.a) / 255.0;
    (format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b), a)
}

fn opacity_attr(name: &str, alpha: f32) -> String {
    if alpha >= 1.0 {
        String::new()
    } else {
        format!(" {name}=\"{}\"", fmt_num(f64::from(alpha)))
    }
}

/// Up to three decimals, without trailing zeros.
fn fmt_num(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
