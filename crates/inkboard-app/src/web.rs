//! WebAssembly entry point and the browser pointer adapter.

use crate::app_config::AppConfig;
use inkboard_core::{
    CanvasEngine, CoalescedSource, EditorAction, EditorState, LaserPoint, MenuPosition, Modifiers,
    MouseButton, PointerSample, Response, SelectionBox, Stroke, SystemClock, TextBox, ToolKind,
    Viewport,
};
use inkboard_render::{RenderContext, Renderer, SvgRenderer, parse_color};
use js_sys::{Array, Function, Reflect};
use kurbo::{Point, Size};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, PointerEvent};

#[wasm_bindgen(start)]
pub fn start() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Starting Inkboard (WASM)");
}

/// Borrowed browser pointer event.
struct WebPointer<'a>(&'a PointerEvent);

fn sample_of(event: &PointerEvent) -> PointerSample {
    PointerSample::new(
        Point::new(f64::from(event.client_x()), f64::from(event.client_y())),
        f64::from(event.pressure()),
        event.time_stamp().max(0.0) as u64,
    )
}

impl CoalescedSource for WebPointer<'_> {
    fn pointer_id(&self) -> i32 {
        self.0.pointer_id()
    }

    fn changed_button(&self) -> Option<MouseButton> {
        MouseButton::from_index(self.0.button())
    }

    fn buttons(&self) -> u16 {
        self.0.buttons()
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers {
            shift: self.0.shift_key(),
            ctrl: self.0.ctrl_key(),
            alt: self.0.alt_key(),
            meta: self.0.meta_key(),
        }
    }

    fn sample(&self) -> PointerSample {
        sample_of(self.0)
    }

    /// `getCoalescedEvents` is missing in some browsers and insecure contexts,
    /// so it is looked up dynamically.
    fn coalesced(&self) -> Vec<PointerSample> {
        let Some(get_coalesced) = Reflect::get(self.0.as_ref(), &JsValue::from_str("getCoalescedEvents"))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
        else {
            return Vec::new();
        };
        let Ok(events) = get_coalesced
            .call0(self.0.as_ref())
            .and_then(|value| value.dyn_into::<Array>())
        else {
            return Vec::new();
        };
        events
            .iter()
            .filter_map(|value| value.dyn_into::<PointerEvent>().ok())
            .map(|event| sample_of(&event))
            .collect()
    }
}

/// Serializable view of the editor state for the host UI.
#[derive(Serialize)]
struct StateView<'a> {
    current_tool: ToolKind,
    pen_color: &'a str,
    pen_size: f64,
    viewport: Viewport,
    strokes: &'a [Stroke],
    text_boxes: &'a [TextBox],
    selection_box: Option<SelectionBox>,
    selection_menu_position: Option<MenuPosition>,
    laser_path: &'a [LaserPoint],
    revision: u64,
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Canvas engine bound to a DOM surface.
#[wasm_bindgen]
pub struct WebCanvas {
    engine: CanvasEngine,
    config: AppConfig,
}

#[wasm_bindgen]
impl WebCanvas {
    /// Create a canvas from an optional JSON configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebCanvas, JsValue> {
        let config = match config_json {
            Some(json) => AppConfig::from_json_str(&json).map_err(to_js)?,
            None => AppConfig::default(),
        };
        let engine = CanvasEngine::with_clock(
            config.engine.clone(),
            EditorState::new(config.author.clone()),
            Box::new(SystemClock),
        );
        Ok(Self { engine, config })
    }

    /// Report the host element's client rectangle.
    pub fn mount(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.engine.mount(Point::new(x, y), Size::new(width, height));
    }

    pub fn unmount(&mut self) -> bool {
        self.engine.unmount().redraw
    }

    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        let response = self.engine.pointer_down_from(&WebPointer(event));
        apply_capture(event, response)
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        let response = self.engine.pointer_move_from(&WebPointer(event));
        apply_capture(event, response)
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        let response = self.engine.pointer_up_from(&WebPointer(event));
        apply_capture(event, response)
    }

    pub fn pointer_leave(&mut self, event: &PointerEvent) -> bool {
        let response = self.engine.pointer_leave();
        apply_capture(event, response)
    }

    pub fn lost_pointer_capture(&mut self) -> bool {
        self.engine.lost_pointer_capture().redraw
    }

    pub fn key_down(&mut self, key: &str) -> bool {
        self.engine.key_down(key).redraw
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        self.engine.key_up(key).redraw
    }

    pub fn set_tool(&mut self, name: &str) -> Result<bool, JsValue> {
        let tool = ToolKind::from_name(name).ok_or_else(|| to_js(format!("Unknown tool: {name}")))?;
        Ok(self.engine.set_tool(tool).redraw)
    }

    /// Apply a JSON-encoded action, e.g. `{"type":"UNDO"}`.
    pub fn dispatch(&mut self, action_json: &str) -> Result<bool, JsValue> {
        let action: EditorAction = serde_json::from_str(action_json).map_err(to_js)?;
        let before = self.engine.state().revision();
        self.engine.dispatch(action).map_err(to_js)?;
        Ok(self.engine.state().revision() != before)
    }

    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        self.engine.wheel(Point::new(x, y), delta_y).redraw
    }

    pub fn reset_view(&mut self) -> bool {
        self.engine.reset_view().redraw
    }

    pub fn menu_measured(&mut self, width: f64, height: f64) -> bool {
        self.engine.menu_measured(Size::new(width, height)).redraw
    }

    /// Host timer callback for the laser decay.
    pub fn tick(&mut self) -> bool {
        self.engine.tick().redraw
    }

    /// Milliseconds since the epoch of the next decay tick, if one is due.
    pub fn next_tick(&self) -> Option<f64> {
        self.engine.next_tick().map(|at| at as f64)
    }

    pub fn live_path(&self) -> Option<String> {
        self.engine.live_path().map(str::to_string)
    }

    pub fn render_svg(&self) -> Result<String, JsValue> {
        let size = self
            .engine
            .surface()
            .map(|surface| surface.size)
            .unwrap_or(Size::new(f64::from(self.config.width), f64::from(self.config.height)));
        let background = parse_color(&self.config.background).map_err(to_js)?;
        let ctx = RenderContext::new(self.engine.state(), size)
            .with_background(background)
            .with_live_path(self.engine.live_path(), self.engine.live_tool());
        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&ctx).map_err(to_js)?;
        Ok(renderer.into_document())
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        let state = self.engine.state();
        let view = StateView {
            current_tool: state.current_tool(),
            pen_color: state.pen_color(),
            pen_size: state.pen_size(),
            viewport: state.viewport(),
            strokes: state.strokes(),
            text_boxes: state.text_boxes(),
            selection_box: state.selection_box(),
            selection_menu_position: state.selection_menu_position(),
            laser_path: state.laser_path(),
            revision: state.revision(),
        };
        serde_json::to_string(&view).map_err(to_js)
    }
}

/// Apply capture changes to the event target and report whether to redraw.
fn apply_capture(event: &PointerEvent, response: Response) -> bool {
    if response.capture || response.release {
        if let Some(element) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) {
            let result = if response.capture {
                element.set_pointer_capture(event.pointer_id())
            } else {
                element.release_pointer_capture(event.pointer_id())
            };
            // Releasing an already released pointer throws; that's fine.
            if let Err(err) = result {
                log::trace!("Pointer capture change ignored: {err:?}");
            }
        }
    }
    response.redraw
}
