//! Inkboard Application
//!
//! Application shell around the canvas engine: deterministic replay of
//! recorded input traces to SVG, and the browser binding.

mod app_config;
mod replay;

pub use app_config::AppConfig;
pub use replay::{Replay, ReplayError, ReplayResult, Trace, replay};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebCanvas;
