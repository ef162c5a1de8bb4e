//! Replay of recorded input traces.
//!
//! A trace is a JSON list of [`CanvasEvent`]s. Replays run on a manual clock
//! so laser decay is deterministic: `wait` events advance the clock and fire
//! every decay tick that falls inside the wait.

use crate::app_config::AppConfig;
use inkboard_core::{CanvasEngine, CanvasEvent, Clock, ConfigError, EditorState, ManualClock};
use inkboard_render::{RenderContext, Renderer, RendererError, SvgRenderer, parse_color};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RendererError),
}

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// A recorded session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Overrides the configured author.
    #[serde(default)]
    pub author: Option<String>,
    pub events: Vec<CanvasEvent>,
}

impl Trace {
    pub fn from_json_str(json: &str) -> ReplayResult<Self> {
        serde_json::from_str(json).map_err(|e| ReplayError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

/// Outcome of a replay.
pub struct Replay {
    pub engine: CanvasEngine,
    /// Final clock time in milliseconds.
    pub elapsed_ms: u64,
}

impl Replay {
    /// Render the final state to SVG.
    pub fn render_svg(&self, config: &AppConfig) -> ReplayResult<String> {
        let size = self
            .engine
            .surface()
            .map(|surface| surface.size)
            .unwrap_or(Size::new(f64::from(config.width), f64::from(config.height)));
        let ctx = RenderContext::new(self.engine.state(), size)
            .with_background(parse_color(&config.background)?)
            .with_live_path(self.engine.live_path(), self.engine.live_tool());

        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&ctx)?;
        Ok(renderer.into_document())
    }
}

/// Run every event of a trace through a fresh engine.
///
/// The surface is mounted at the origin with the configured size unless the
/// trace mounts it itself.
pub fn replay(trace: &Trace, config: &AppConfig) -> ReplayResult<Replay> {
    config.engine.validate()?;
    let author = trace.author.as_deref().unwrap_or(&config.author);
    let clock = ManualClock::new(0);
    let mut engine = CanvasEngine::with_clock(
        config.engine.clone(),
        EditorState::new(author),
        Box::new(clock.clone()),
    );
    engine.mount(
        Point::ZERO,
        Size::new(f64::from(config.width), f64::from(config.height)),
    );

    let mut redraws = 0usize;
    for event in &trace.events {
        if let CanvasEvent::Wait { ms } = event {
            redraws += wait(&mut engine, &clock, *ms);
            continue;
        }
        if engine.handle_event(event.clone()).redraw {
            redraws += 1;
        }
    }

    log::info!(
        "Replayed {} events: {} strokes, {} redraws",
        trace.events.len(),
        engine.state().strokes().len(),
        redraws
    );
    Ok(Replay {
        engine,
        elapsed_ms: clock.now_ms(),
    })
}

/// Advance the clock by `ms`, firing each decay tick on schedule.
fn wait(engine: &mut CanvasEngine, clock: &ManualClock, ms: u64) -> usize {
    let end = clock.now_ms() + ms;
    let mut redraws = 0;
    while let Some(at) = engine.next_tick().filter(|&at| at <= end) {
        clock.set(at);
        if engine.tick().redraw {
            redraws += 1;
        }
    }
    clock.set(end);
    redraws
}
