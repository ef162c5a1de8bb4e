//! Canvas engine: routes pointer, keyboard and timer events through the
//! active tool and commits the results to the editor state.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::eraser;
use crate::freehand::{PathParams, render_path};
use crate::geometry::surface_to_canvas;
use crate::input::{CoalescedSource, KEY_ESCAPE, MouseButton, PointerInput, RawPointerEvent, is_space_key};
use crate::laser::{DecayTick, LaserDecay, LaserPoint};
use crate::selection::{MenuPositioner, SelectionBox};
use crate::store::{EditorAction, EditorState, StoreResult};
use crate::stroke::{InkPoint, Stroke, StrokeTool, TextBox, new_id};
use crate::tools::{Gesture, PanSource, StrokeCapture, ToolKind, ToolManager};
use crate::viewport::Surface;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// What the host should do after an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Response {
    /// Capture the pointer so moves keep arriving outside the surface.
    pub capture: bool,
    /// Release pointer capture. Releasing an already released pointer is fine.
    pub release: bool,
    /// State or live path changed.
    pub redraw: bool,
}

impl Response {
    fn captured() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }

    fn released() -> Self {
        Self {
            release: true,
            ..Self::default()
        }
    }
}

/// Recordable engine input, used for replaying traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanvasEvent {
    Mount { origin: Point, size: Size },
    Unmount,
    PointerDown(RawPointerEvent),
    PointerMove(RawPointerEvent),
    PointerUp(RawPointerEvent),
    PointerLeave,
    LostPointerCapture,
    KeyDown { key: String },
    KeyUp { key: String },
    SetTool { tool: ToolKind },
    Zoom { scale: f64 },
    Wheel { x: f64, y: f64, delta_y: f64 },
    ResetView,
    MenuMeasured { width: f64, height: f64 },
    /// Advance the host clock before the next event.
    Wait { ms: u64 },
    Tick,
    Action { action: EditorAction },
}

/// The interactive canvas engine.
pub struct CanvasEngine {
    config: EngineConfig,
    state: EditorState,
    tools: ToolManager,
    /// Pointer that owns the in-flight gesture.
    active_pointer: Option<i32>,
    surface: Option<Surface>,
    space_held: bool,
    laser: LaserDecay,
    menu: MenuPositioner,
    clock: Box<dyn Clock>,
}

impl CanvasEngine {
    /// Create an engine using the wall clock.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, EditorState::default(), Box::new(SystemClock))
    }

    /// Create an engine with an explicit state and clock.
    pub fn with_clock(config: EngineConfig, state: EditorState, clock: Box<dyn Clock>) -> Self {
        let laser = LaserDecay::new(config.laser_lifetime_ms, config.laser_tick_ms);
        let menu = MenuPositioner::new(config.menu_padding, config.menu_gap);
        let mut tools = ToolManager::new();
        tools.current_tool = state.current_tool();
        Self {
            config,
            state,
            tools,
            active_pointer: None,
            surface: None,
            space_held: false,
            laser,
            menu,
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn surface(&self) -> Option<Surface> {
        self.surface
    }

    pub fn gesture(&self) -> &Gesture {
        self.tools.gesture()
    }

    /// Events from a second pointer are ignored while a gesture is in flight.
    fn is_foreign(&self, input: &PointerInput) -> bool {
        self.tools.is_active() && self.active_pointer != Some(input.pointer_id)
    }

    /// Live outline of the stroke being drawn.
    pub fn live_path(&self) -> Option<&str> {
        self.tools
            .capture()
            .map(|capture| capture.preview.as_str())
            .filter(|path| !path.is_empty())
    }

    /// Tool of the stroke being drawn.
    pub fn live_tool(&self) -> Option<StrokeTool> {
        self.tools.capture().map(|capture| capture.tool)
    }

    /// Time of the next laser decay tick, while the trail is alive.
    pub fn next_tick(&self) -> Option<u64> {
        self.laser.next_tick()
    }

    /// Apply an action from outside the pointer pipeline, e.g. toolbar buttons.
    pub fn dispatch(&mut self, action: EditorAction) -> StoreResult<()> {
        match action {
            EditorAction::SetCurrentTool(tool) => {
                self.set_tool(tool);
                Ok(())
            }
            action => self.state.dispatch(action),
        }
    }

    /// Apply an action produced by a gesture. Rejections are logged and dropped.
    fn commit(&mut self, action: EditorAction) {
        let name = action.name();
        if let Err(err) = self.state.dispatch(action) {
            log::warn!("Dropped {name}: {err}");
        }
    }

    fn finish(&self, before: u64, mut response: Response) -> Response {
        response.redraw |= self.state.revision() != before;
        response
    }

    fn to_canvas(&self, screen: Point) -> Point {
        surface_to_canvas(screen, &self.state.viewport(), self.surface.as_ref())
    }

    pub fn mount(&mut self, origin: Point, size: Size) {
        log::debug!("Surface mounted at {origin:?} ({}x{})", size.width, size.height);
        self.surface = Some(Surface::new(origin, size));
    }

    pub fn unmount(&mut self) -> Response {
        log::debug!("Surface unmounted");
        let response = self.cancel_gesture();
        self.surface = None;
        response
    }

    // --- Tools ---

    /// Switch tools. Any gesture of the previous tool ends without a commit.
    pub fn set_tool(&mut self, tool: ToolKind) -> Response {
        let before = self.state.revision();
        let cancelled = self.tools.set_tool(tool);
        let mut response = self.cleanup_cancelled(cancelled);
        if self.state.current_tool() != tool {
            self.commit(EditorAction::SetCurrentTool(tool));
        }
        if tool != ToolKind::Select {
            self.clear_selection();
        }
        response.redraw = true;
        self.finish(before, response)
    }

    fn cancel_gesture(&mut self) -> Response {
        let cancelled = self.tools.cancel();
        self.cleanup_cancelled(cancelled)
    }

    fn cleanup_cancelled(&mut self, cancelled: Option<Gesture>) -> Response {
        match cancelled {
            None => Response::default(),
            Some(gesture) => {
                if matches!(gesture, Gesture::Selecting { .. }) {
                    self.clear_selection();
                }
                Response {
                    release: true,
                    redraw: true,
                    ..Response::default()
                }
            }
        }
    }

    fn clear_selection(&mut self) {
        self.menu.clear();
        if self.state.selection_box().is_some() {
            self.commit(EditorAction::SetSelectionBox(None));
        }
        if self.state.selection_menu_position().is_some() {
            self.commit(EditorAction::SetSelectionMenuPosition(None));
        }
    }

    // --- Pointer ---

    pub fn pointer_down_from<S: CoalescedSource + ?Sized>(&mut self, source: &S) -> Response {
        self.pointer_down(&PointerInput::from_source(source))
    }

    pub fn pointer_move_from<S: CoalescedSource + ?Sized>(&mut self, source: &S) -> Response {
        self.pointer_move(&PointerInput::from_source(source))
    }

    pub fn pointer_up_from<S: CoalescedSource + ?Sized>(&mut self, source: &S) -> Response {
        self.pointer_up(&PointerInput::from_source(source))
    }

    pub fn pointer_down(&mut self, input: &PointerInput) -> Response {
        if self.surface.is_none() {
            log::trace!("Pointer down ignored: surface not mounted");
            return Response::default();
        }
        if self.is_foreign(input) {
            log::trace!("Pointer {} down ignored: gesture in flight", input.pointer_id);
            return Response::default();
        }
        self.active_pointer = Some(input.pointer_id);
        let before = self.state.revision();
        let sample = input.last();
        let button = input.button.unwrap_or(MouseButton::Left);
        let tool = self.tools.current_tool;

        let pan_source = if button == MouseButton::Middle {
            Some(PanSource::MiddleButton)
        } else if self.space_held && button == MouseButton::Left {
            Some(PanSource::SpaceKey)
        } else if tool == ToolKind::Pan && button == MouseButton::Left {
            Some(PanSource::Tool)
        } else {
            None
        };
        if let Some(source) = pan_source {
            let cancelled = self.tools.cancel();
            self.cleanup_cancelled(cancelled);
            self.tools.begin(Gesture::Panning {
                last: sample.position,
                source,
            });
            return self.finish(before, Response::captured());
        }

        if button != MouseButton::Left {
            return Response::default();
        }

        let point = self.to_canvas(sample.position);
        let now = self.clock.now_ms();
        let response = match tool {
            ToolKind::Cursor | ToolKind::Pan => Response::default(),
            ToolKind::Text => {
                let text_box = TextBox::new(point, self.state.author(), now);
                log::debug!("Text box {} at {point:?}", text_box.id);
                self.commit(EditorAction::AddTextBox(text_box));
                self.set_tool(ToolKind::Cursor)
            }
            ToolKind::Pen | ToolKind::Highlighter => {
                let stroke_tool = tool.stroke_tool().unwrap_or(StrokeTool::Pen);
                let first = InkPoint::new(point, sample.pressure, sample.timestamp);
                let mut capture = StrokeCapture::new(stroke_tool, first);
                capture.preview = self.stroke_path(stroke_tool, &capture.points, false);
                self.tools.begin(Gesture::Drawing(capture));
                Response {
                    capture: true,
                    redraw: true,
                    ..Response::default()
                }
            }
            ToolKind::Eraser => {
                self.tools.begin(Gesture::Erasing);
                self.erase_at(&[point]);
                Response::captured()
            }
            ToolKind::Laser => {
                self.tools.begin(Gesture::Lasering);
                self.append_laser(&[point], now);
                Response::captured()
            }
            ToolKind::Select => {
                self.clear_selection();
                self.tools.begin(Gesture::Selecting { start: point });
                self.commit(EditorAction::SetSelectionBox(Some(SelectionBox::at(point))));
                Response::captured()
            }
        };
        self.finish(before, response)
    }

    pub fn pointer_move(&mut self, input: &PointerInput) -> Response {
        if self.surface.is_none() || self.is_foreign(input) {
            return Response::default();
        }
        let before = self.state.revision();
        let mut response = Response::default();

        match self.tools.take_gesture() {
            Gesture::Idle => {}
            Gesture::Panning { last, source } => {
                let position = input.last().position;
                let delta = position - last;
                let mut viewport = self.state.viewport();
                viewport.pan(delta.x, delta.y);
                self.commit(EditorAction::SetViewport(viewport));
                self.tools.begin(Gesture::Panning {
                    last: position,
                    source,
                });
                self.refresh_menu_anchor();
            }
            Gesture::Drawing(mut capture) => {
                for sample in &input.samples {
                    let point = self.to_canvas(sample.position);
                    capture.push(InkPoint::new(point, sample.pressure, sample.timestamp));
                }
                capture.preview = self.stroke_path(capture.tool, &capture.points, false);
                self.tools.begin(Gesture::Drawing(capture));
                response.redraw = true;
            }
            Gesture::Erasing => {
                self.tools.begin(Gesture::Erasing);
                if input.primary_held() {
                    let points: Vec<Point> =
                        input.samples.iter().map(|s| self.to_canvas(s.position)).collect();
                    self.erase_at(&points);
                }
            }
            Gesture::Lasering => {
                self.tools.begin(Gesture::Lasering);
                if input.primary_held() {
                    let points: Vec<Point> =
                        input.samples.iter().map(|s| self.to_canvas(s.position)).collect();
                    let now = self.clock.now_ms();
                    self.append_laser(&points, now);
                }
            }
            Gesture::Selecting { start } => {
                let current = self.to_canvas(input.last().position);
                self.tools.begin(Gesture::Selecting { start });
                self.commit(EditorAction::SetSelectionBox(Some(SelectionBox::from_corners(
                    start, current,
                ))));
            }
        }
        self.finish(before, response)
    }

    pub fn pointer_up(&mut self, input: &PointerInput) -> Response {
        if self.is_foreign(input) {
            return Response::default();
        }
        let before = self.state.revision();
        let gesture = self.tools.take_gesture();
        if gesture.is_idle() {
            return Response::released();
        }
        log::trace!("Pointer up ends {} gesture", gesture.label());

        match gesture {
            Gesture::Drawing(capture) => self.commit_stroke(capture),
            Gesture::Selecting { .. } => self.finish_selection(),
            Gesture::Idle | Gesture::Panning { .. } | Gesture::Erasing | Gesture::Lasering => {}
        }
        self.finish(
            before,
            Response {
                release: true,
                redraw: true,
                ..Response::default()
            },
        )
    }

    /// Pointer left the surface. Only panning ends here; other gestures hold
    /// pointer capture.
    pub fn pointer_leave(&mut self) -> Response {
        if matches!(self.tools.gesture(), Gesture::Panning { .. }) {
            self.tools.take_gesture();
            return Response::released();
        }
        Response::default()
    }

    /// The host revoked capture: drop the gesture with no partial commit.
    pub fn lost_pointer_capture(&mut self) -> Response {
        let before = self.state.revision();
        let response = self.cancel_gesture();
        self.finish(before, response)
    }

    fn commit_stroke(&mut self, capture: StrokeCapture) {
        if !capture.moved {
            log::debug!("Discarded stroke without movement");
            return;
        }
        let stroke = Stroke {
            id: new_id(),
            path: self.stroke_path(capture.tool, &capture.points, true),
            color: self.state.pen_color().to_string(),
            size: self.state.pen_size(),
            tool: capture.tool,
            raw_points: capture.points,
            author: self.state.author().to_string(),
            timestamp: self.clock.now_ms(),
        };
        log::debug!("Committed stroke {} ({} points)", stroke.id, stroke.raw_points.len());
        self.commit(EditorAction::AddStroke(stroke));
    }

    fn finish_selection(&mut self) {
        let Some(selection) = self.state.selection_box() else {
            return;
        };
        if selection.is_too_small(self.config.selection_min_size) {
            log::trace!("Selection too small, discarded");
            self.clear_selection();
            return;
        }
        self.place_menu(selection);
    }

    /// Re-anchor an open menu after the viewport moved.
    fn refresh_menu_anchor(&mut self) {
        let (Some(_), Some(selection)) = (self.menu.anchor(), self.state.selection_box()) else {
            return;
        };
        self.place_menu(selection);
    }

    /// Anchor the menu at the selection's bottom-right corner on screen.
    fn place_menu(&mut self, selection: SelectionBox) {
        let Some(surface) = self.surface else {
            return;
        };
        let anchor = self.state.viewport().canvas_to_view(selection.bottom_right());
        let position = self.menu.place(anchor, surface.size);
        self.commit(EditorAction::SetSelectionMenuPosition(Some(position)));
    }

    fn stroke_path(&self, tool: StrokeTool, points: &[InkPoint], complete: bool) -> String {
        render_path(
            points,
            &PathParams {
                tool,
                pen_size: self.state.pen_size(),
                scale: self.state.viewport().scale,
                freehand: &self.config.freehand,
                highlighter: &self.config.highlighter,
                complete,
            },
        )
    }

    fn erase_at(&mut self, samples: &[Point]) {
        let radius = eraser::canvas_radius(self.config.eraser_radius, self.state.viewport().scale);
        if let Some(remaining) = eraser::erase(self.state.strokes(), samples, radius) {
            self.commit(EditorAction::SetStrokes(remaining));
        }
    }

    fn append_laser(&mut self, points: &[Point], now: u64) {
        if points.is_empty() {
            return;
        }
        let mut path = self.state.laser_path().to_vec();
        path.extend(points.iter().map(|&p| LaserPoint::new(p, now)));
        self.commit(EditorAction::SetLaserPath(path));
        self.laser.ensure_running(now);
    }

    // --- Keyboard ---

    pub fn key_down(&mut self, key: &str) -> Response {
        let before = self.state.revision();
        if key == KEY_ESCAPE {
            let mut response = self.cancel_gesture();
            self.clear_selection();
            response.redraw = true;
            return self.finish(before, response);
        }
        if is_space_key(key) && !self.space_held {
            log::trace!("Pan override on");
            self.space_held = true;
        }
        Response::default()
    }

    pub fn key_up(&mut self, key: &str) -> Response {
        if !is_space_key(key) {
            return Response::default();
        }
        log::trace!("Pan override off");
        self.space_held = false;
        if matches!(
            self.tools.gesture(),
            Gesture::Panning {
                source: PanSource::SpaceKey,
                ..
            }
        ) {
            self.tools.take_gesture();
            return Response::released();
        }
        Response::default()
    }

    // --- Viewport ---

    pub fn zoom(&mut self, scale: f64) -> Response {
        let before = self.state.revision();
        let mut viewport = self.state.viewport();
        viewport.zoom(scale);
        self.commit(EditorAction::SetViewport(viewport));
        self.refresh_menu_anchor();
        self.finish(before, Response::default())
    }

    /// Zoom by `factor` around a screen point.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> Response {
        let before = self.state.revision();
        let origin = self.surface.map(|s| s.origin).unwrap_or(Point::ZERO);
        let anchor = Point::new(screen.x - origin.x, screen.y - origin.y);
        let mut viewport = self.state.viewport();
        viewport.zoom_at(anchor, factor);
        self.commit(EditorAction::SetViewport(viewport));
        self.refresh_menu_anchor();
        self.finish(before, Response::default())
    }

    /// Wheel zoom: scrolling up zooms in by one step.
    pub fn wheel(&mut self, screen: Point, delta_y: f64) -> Response {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return Response::default();
        }
        let step = self.config.wheel_zoom_step;
        let factor = if delta_y < 0.0 { step } else { 1.0 / step };
        self.zoom_at(screen, factor)
    }

    pub fn reset_view(&mut self) -> Response {
        let before = self.state.revision();
        let mut viewport = self.state.viewport();
        viewport.reset();
        self.commit(EditorAction::SetViewport(viewport));
        self.refresh_menu_anchor();
        self.finish(before, Response::default())
    }

    // --- Menu & timer ---

    /// The host measured the rendered menu.
    pub fn menu_measured(&mut self, size: Size) -> Response {
        let Some(surface) = self.surface else {
            return Response::default();
        };
        let before = self.state.revision();
        if let Some(position) = self.menu.measure(size, surface.size) {
            self.commit(EditorAction::SetSelectionMenuPosition(Some(position)));
        }
        self.finish(before, Response::default())
    }

    /// Run the laser decay schedule. Call from the host timer.
    pub fn tick(&mut self) -> Response {
        let before = self.state.revision();
        let now = self.clock.now_ms();
        match self.laser.tick(self.state.laser_path(), now) {
            DecayTick::Pruned(alive) => self.commit(EditorAction::SetLaserPath(alive)),
            DecayTick::Stopped | DecayTick::Unchanged => {}
        }
        self.finish(before, Response::default())
    }

    /// Route a recorded event.
    pub fn handle_event(&mut self, event: CanvasEvent) -> Response {
        match event {
            CanvasEvent::Mount { origin, size } => {
                self.mount(origin, size);
                Response::default()
            }
            CanvasEvent::Unmount => self.unmount(),
            CanvasEvent::PointerDown(raw) => self.pointer_down_from(&raw),
            CanvasEvent::PointerMove(raw) => self.pointer_move_from(&raw),
            CanvasEvent::PointerUp(raw) => self.pointer_up_from(&raw),
            CanvasEvent::PointerLeave => self.pointer_leave(),
            CanvasEvent::LostPointerCapture => self.lost_pointer_capture(),
            CanvasEvent::KeyDown { key } => self.key_down(&key),
            CanvasEvent::KeyUp { key } => self.key_up(&key),
            CanvasEvent::SetTool { tool } => self.set_tool(tool),
            CanvasEvent::Zoom { scale } => self.zoom(scale),
            CanvasEvent::Wheel { x, y, delta_y } => self.wheel(Point::new(x, y), delta_y),
            CanvasEvent::ResetView => self.reset_view(),
            CanvasEvent::MenuMeasured { width, height } => self.menu_measured(Size::new(width, height)),
            // The clock is owned by the caller; waiting is a no-op here.
            CanvasEvent::Wait { .. } => Response::default(),
            CanvasEvent::Tick => self.tick(),
            CanvasEvent::Action { action } => {
                let before = self.state.revision();
                if let Err(err) = self.dispatch(action) {
                    log::warn!("Rejected action: {err}");
                }
                self.finish(before, Response::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::input::{Modifiers, PointerSample};
    use crate::viewport::Viewport;

    const LEFT: u16 = 1;

    fn engine() -> (CanvasEngine, ManualClock) {
        let clock = ManualClock::new(10_000);
        let mut engine = CanvasEngine::with_clock(
            EngineConfig::default(),
            EditorState::default(),
            Box::new(clock.clone()),
        );
        engine.mount(Point::ZERO, Size::new(1280.0, 720.0));
        (engine, clock)
    }

    fn input(button: Option<MouseButton>, buttons: u16, points: &[(f64, f64)]) -> PointerInput {
        PointerInput {
            pointer_id: 1,
            button,
            buttons,
            modifiers: Modifiers::default(),
            samples: points
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| PointerSample::new(Point::new(x, y), 0.5, i as u64))
                .collect(),
        }
    }

    fn down(engine: &mut CanvasEngine, x: f64, y: f64) -> Response {
        engine.pointer_down(&input(Some(MouseButton::Left), LEFT, &[(x, y)]))
    }

    fn drag(engine: &mut CanvasEngine, points: &[(f64, f64)]) -> Response {
        engine.pointer_move(&input(None, LEFT, points))
    }

    fn up(engine: &mut CanvasEngine, x: f64, y: f64) -> Response {
        engine.pointer_up(&input(Some(MouseButton::Left), 0, &[(x, y)]))
    }

    fn draw(engine: &mut CanvasEngine, points: &[(f64, f64)]) {
        let (first, rest) = points.split_first().unwrap();
        down(engine, first.0, first.1);
        for &p in rest {
            drag(engine, &[p]);
        }
        let last = points.last().unwrap();
        up(engine, last.0, last.1);
    }

    #[test]
    fn test_pan_is_additive_and_ignores_scale() {
        let (mut engine, _) = engine();
        engine.zoom(2.0);
        engine.set_tool(ToolKind::Pan);

        let response = down(&mut engine, 10.0, 10.0);
        assert!(response.capture);
        drag(&mut engine, &[(30.0, 25.0)]);
        drag(&mut engine, &[(40.0, 25.0)]);
        assert!(up(&mut engine, 40.0, 25.0).release);

        let viewport = engine.state().viewport();
        assert!((viewport.x - 30.0).abs() < f64::EPSILON);
        assert!((viewport.y - 15.0).abs() < f64::EPSILON);
        assert!((viewport.scale - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let (mut engine, _) = engine();
        engine.zoom(10.0);
        assert!((engine.state().viewport().scale - 3.0).abs() < f64::EPSILON);
        engine.zoom(0.1);
        assert!((engine.state().viewport().scale - 0.5).abs() < f64::EPSILON);
        for _ in 0..50 {
            engine.wheel(Point::new(640.0, 360.0), -1.0);
        }
        assert!((engine.state().viewport().scale - 3.0).abs() < f64::EPSILON);
        engine.reset_view();
        assert_eq!(engine.state().viewport(), Viewport::default());
    }

    #[test]
    fn test_wheel_zoom_keeps_anchor() {
        let (mut engine, _) = engine();
        let anchor = Point::new(400.0, 300.0);
        let before = engine.state().viewport().view_to_canvas(anchor);
        engine.wheel(anchor, -120.0);
        let viewport = engine.state().viewport();
        assert!(viewport.scale > 1.0);
        let after = viewport.view_to_canvas(anchor);
        assert!((before - after).hypot() < 1e-9);
    }

    #[test]
    fn test_pen_commits_all_samples() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);

        down(&mut engine, 10.0, 10.0);
        drag(&mut engine, &[(12.0, 11.0), (15.0, 12.0)]);
        assert!(engine.live_path().is_some());
        drag(&mut engine, &[(20.0, 14.0)]);
        drag(&mut engine, &[(30.0, 20.0)]);
        assert!(engine.state().strokes().is_empty());
        up(&mut engine, 30.0, 20.0);

        let strokes = engine.state().strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].raw_points.len(), 5);
        assert_eq!(strokes[0].tool, StrokeTool::Pen);
        assert!(strokes[0].path.starts_with('M'));
        assert!(strokes[0].path.ends_with('Z'));
        assert!(engine.live_path().is_none());
    }

    #[test]
    fn test_points_mapped_through_viewport() {
        let (mut engine, _) = engine();
        engine.dispatch(EditorAction::SetViewport(Viewport { x: 100.0, y: 50.0, scale: 2.0 }))
            .unwrap();
        engine.set_tool(ToolKind::Pen);
        draw(&mut engine, &[(300.0, 250.0), (320.0, 250.0)]);

        let first = engine.state().strokes()[0].raw_points[0];
        assert!((first.x - 100.0).abs() < f64::EPSILON);
        assert!((first.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tap_commits_nothing() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        down(&mut engine, 10.0, 10.0);
        up(&mut engine, 10.0, 10.0);
        assert!(engine.state().strokes().is_empty());
    }

    #[test]
    fn test_highlighter_commits_translucent_tool() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Highlighter);
        draw(&mut engine, &[(0.0, 100.0), (50.0, 102.0), (100.0, 99.0), (150.0, 101.0)]);
        let stroke = &engine.state().strokes()[0];
        assert_eq!(stroke.tool, StrokeTool::Highlighter);
        // Raw points are kept even though the outline is flattened.
        assert_eq!(stroke.raw_points.len(), 4);
        assert!((stroke.raw_points[1].y - 102.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_eraser_removes_nearby_stroke() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        draw(&mut engine, &[(100.0, 100.0), (110.0, 120.0)]);
        draw(&mut engine, &[(500.0, 500.0), (520.0, 530.0)]);
        assert_eq!(engine.state().strokes().len(), 2);
        let far_id = engine.state().strokes()[1].id.clone();

        engine.set_tool(ToolKind::Eraser);
        down(&mut engine, 105.0, 102.0);
        up(&mut engine, 105.0, 102.0);

        let strokes = engine.state().strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].id, far_id);
    }

    #[test]
    fn test_eraser_batch_is_single_update() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        draw(&mut engine, &[(100.0, 100.0), (101.0, 100.0)]);
        draw(&mut engine, &[(300.0, 100.0), (301.0, 100.0)]);
        draw(&mut engine, &[(900.0, 600.0), (901.0, 600.0)]);

        engine.set_tool(ToolKind::Eraser);
        down(&mut engine, 200.0, 300.0);
        let before = engine.state().revision();
        drag(&mut engine, &[(100.0, 105.0), (200.0, 100.0), (300.0, 105.0)]);
        assert_eq!(engine.state().revision(), before + 1);
        assert_eq!(engine.state().strokes().len(), 1);

        // Nothing in range: no update.
        let before = engine.state().revision();
        drag(&mut engine, &[(600.0, 100.0)]);
        assert_eq!(engine.state().revision(), before);
    }

    #[test]
    fn test_eraser_needs_primary_button() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        draw(&mut engine, &[(100.0, 100.0), (101.0, 100.0)]);
        engine.set_tool(ToolKind::Eraser);
        down(&mut engine, 600.0, 600.0);
        engine.pointer_move(&input(None, 0, &[(100.0, 100.0)]));
        assert_eq!(engine.state().strokes().len(), 1);
    }

    #[test]
    fn test_small_selection_discarded() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        down(&mut engine, 100.0, 100.0);
        drag(&mut engine, &[(103.0, 103.0)]);
        up(&mut engine, 103.0, 103.0);
        assert!(engine.state().selection_box().is_none());
        assert!(engine.state().selection_menu_position().is_none());
    }

    #[test]
    fn test_selection_spawns_menu() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        down(&mut engine, 150.0, 150.0);
        drag(&mut engine, &[(120.0, 120.0)]);
        drag(&mut engine, &[(100.0, 100.0)]);
        up(&mut engine, 100.0, 100.0);

        let selection = engine.state().selection_box().unwrap();
        assert_eq!(selection, SelectionBox { x: 100.0, y: 100.0, width: 50.0, height: 50.0 });
        let position = engine.state().selection_menu_position().unwrap();
        assert!((position.left - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_menu_stays_inside_right_edge() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        down(&mut engine, 1200.0, 300.0);
        drag(&mut engine, &[(1270.0, 360.0)]);
        up(&mut engine, 1270.0, 360.0);

        engine.menu_measured(Size::new(220.0, 120.0));
        let position = engine.state().selection_menu_position().unwrap();
        assert!(position.left + 220.0 <= 1260.0);
        assert!(position.left >= 20.0);
    }

    #[test]
    fn test_escape_clears_selection() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        down(&mut engine, 100.0, 100.0);
        drag(&mut engine, &[(200.0, 200.0)]);
        up(&mut engine, 200.0, 200.0);
        assert!(engine.state().selection_box().is_some());

        engine.key_down(KEY_ESCAPE);
        assert!(engine.state().selection_box().is_none());
        assert!(engine.state().selection_menu_position().is_none());
    }

    #[test]
    fn test_menu_refits_after_pan() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        down(&mut engine, 900.0, 300.0);
        drag(&mut engine, &[(1000.0, 400.0)]);
        up(&mut engine, 1000.0, 400.0);
        engine.menu_measured(Size::new(220.0, 120.0));

        engine.pointer_down(&input(Some(MouseButton::Middle), 4, &[(100.0, 100.0)]));
        engine.pointer_move(&input(None, 4, &[(350.0, 100.0)]));
        engine.pointer_up(&input(Some(MouseButton::Middle), 0, &[(350.0, 100.0)]));

        let position = engine.state().selection_menu_position().unwrap();
        assert!(position.left + 220.0 <= 1280.0 - 20.0);
        assert!((position.top - 408.0).abs() < f64::EPSILON);

        // Measuring the same size again is a no-op.
        let before = engine.state().revision();
        engine.menu_measured(Size::new(220.0, 120.0));
        assert_eq!(engine.state().revision(), before);
    }

    #[test]
    fn test_menu_refits_after_zoom() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        down(&mut engine, 500.0, 300.0);
        drag(&mut engine, &[(600.0, 350.0)]);
        up(&mut engine, 600.0, 350.0);
        engine.menu_measured(Size::new(220.0, 120.0));

        // The anchor moves to (1200, 700), against both edges.
        engine.zoom(2.0);
        let position = engine.state().selection_menu_position().unwrap();
        assert!(position.left + 220.0 <= 1260.0);
        assert!((position.top - (700.0 - 8.0 - 120.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_menu_flips_above_near_bottom() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        down(&mut engine, 300.0, 600.0);
        drag(&mut engine, &[(400.0, 690.0)]);
        up(&mut engine, 400.0, 690.0);
        let first = engine.state().selection_menu_position().unwrap();
        assert!((first.top - 698.0).abs() < f64::EPSILON);

        engine.menu_measured(Size::new(220.0, 120.0));
        let position = engine.state().selection_menu_position().unwrap();
        assert!((position.top - (690.0 - 8.0 - 120.0)).abs() < f64::EPSILON);
        assert!((position.left - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_laser_needs_primary_button() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Laser);
        down(&mut engine, 10.0, 10.0);
        assert_eq!(engine.state().laser_path().len(), 1);
        engine.pointer_move(&input(None, 0, &[(20.0, 20.0), (30.0, 30.0)]));
        assert_eq!(engine.state().laser_path().len(), 1);
        drag(&mut engine, &[(40.0, 40.0)]);
        assert_eq!(engine.state().laser_path().len(), 2);
    }

    #[test]
    fn test_escape_mid_stroke_commits_nothing() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        down(&mut engine, 100.0, 100.0);
        drag(&mut engine, &[(120.0, 110.0), (140.0, 130.0)]);
        assert!(engine.live_path().is_some());

        assert!(engine.key_down(KEY_ESCAPE).release);
        assert!(engine.live_path().is_none());
        up(&mut engine, 140.0, 130.0);
        assert!(engine.state().strokes().is_empty());
        assert_eq!(engine.state().current_tool(), ToolKind::Pen);
    }

    #[test]
    fn test_second_pointer_ignored_while_drawing() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        down(&mut engine, 100.0, 100.0);

        let mut touch = input(Some(MouseButton::Left), LEFT, &[(600.0, 600.0)]);
        touch.pointer_id = 2;
        assert_eq!(engine.pointer_down(&touch), Response::default());
        touch.button = None;
        engine.pointer_move(&touch);
        drag(&mut engine, &[(120.0, 110.0)]);
        touch.button = Some(MouseButton::Left);
        touch.buttons = 0;
        assert_eq!(engine.pointer_up(&touch), Response::default());
        assert!(engine.live_path().is_some());

        up(&mut engine, 120.0, 110.0);
        let strokes = engine.state().strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].raw_points.len(), 2);
        assert!(strokes[0].raw_points.iter().all(|p| p.x < 200.0));

        // Once idle, any pointer may start a gesture.
        let mut touch = input(Some(MouseButton::Left), LEFT, &[(600.0, 600.0)]);
        touch.pointer_id = 2;
        assert!(engine.pointer_down(&touch).capture);
    }

    #[test]
    fn test_laser_decays() {
        let (mut engine, clock) = engine();
        engine.set_tool(ToolKind::Laser);
        down(&mut engine, 10.0, 10.0);
        clock.advance(400);
        drag(&mut engine, &[(20.0, 20.0), (30.0, 30.0)]);
        up(&mut engine, 30.0, 30.0);
        assert_eq!(engine.state().laser_path().len(), 3);
        assert!(engine.next_tick().is_some());

        // First point is now 750 ms old, the others 350 ms.
        clock.advance(350);
        assert!(engine.tick().redraw);
        let remaining: Vec<Point> = engine.state().laser_path().iter().map(LaserPoint::position).collect();
        assert_eq!(remaining, vec![Point::new(20.0, 20.0), Point::new(30.0, 30.0)]);

        clock.advance(1_000);
        engine.tick();
        assert!(engine.state().laser_path().is_empty());
        assert!(engine.next_tick().is_none());
    }

    #[test]
    fn test_tool_switch_mid_gesture_commits_nothing() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        draw(&mut engine, &[(0.0, 0.0), (10.0, 10.0)]);

        down(&mut engine, 100.0, 100.0);
        drag(&mut engine, &[(120.0, 120.0), (140.0, 150.0)]);
        let response = engine.set_tool(ToolKind::Eraser);
        assert!(response.release);
        up(&mut engine, 140.0, 150.0);

        assert_eq!(engine.state().strokes().len(), 1);
        assert!(engine.live_path().is_none());
        assert_eq!(engine.state().current_tool(), ToolKind::Eraser);
    }

    #[test]
    fn test_store_tool_change_cancels_gesture() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        down(&mut engine, 100.0, 100.0);
        drag(&mut engine, &[(120.0, 120.0)]);
        engine.dispatch(EditorAction::SetCurrentTool(ToolKind::Cursor)).unwrap();
        up(&mut engine, 120.0, 120.0);
        assert!(engine.state().strokes().is_empty());
    }

    #[test]
    fn test_lost_capture_commits_nothing() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        down(&mut engine, 100.0, 100.0);
        drag(&mut engine, &[(120.0, 120.0)]);
        assert!(engine.lost_pointer_capture().release);
        up(&mut engine, 120.0, 120.0);
        assert!(engine.state().strokes().is_empty());
    }

    #[test]
    fn test_space_overrides_tool_with_pan() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        engine.key_down(" ");
        down(&mut engine, 0.0, 0.0);
        drag(&mut engine, &[(25.0, -5.0)]);
        assert!(engine.key_up(" ").release);
        drag(&mut engine, &[(100.0, 100.0)]);

        let viewport = engine.state().viewport();
        assert!((viewport.x - 25.0).abs() < f64::EPSILON);
        assert!((viewport.y + 5.0).abs() < f64::EPSILON);
        assert!(engine.state().strokes().is_empty());
        assert_eq!(engine.state().current_tool(), ToolKind::Pen);
    }

    #[test]
    fn test_middle_button_pans() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Select);
        engine.pointer_down(&input(Some(MouseButton::Middle), 4, &[(50.0, 50.0)]));
        engine.pointer_move(&input(None, 4, &[(60.0, 70.0)]));
        assert!(engine.pointer_leave().release);

        let viewport = engine.state().viewport();
        assert!((viewport.x - 10.0).abs() < f64::EPSILON);
        assert!((viewport.y - 20.0).abs() < f64::EPSILON);
        assert!(engine.state().selection_box().is_none());
    }

    #[test]
    fn test_text_tool_spawns_box_and_reverts() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Text);
        down(&mut engine, 40.0, 60.0);
        assert_eq!(engine.state().text_boxes().len(), 1);
        assert_eq!(engine.state().text_boxes()[0].position, Point::new(40.0, 60.0));
        assert_eq!(engine.state().current_tool(), ToolKind::Cursor);
    }

    #[test]
    fn test_cursor_does_not_mutate() {
        let (mut engine, _) = engine();
        let before = engine.state().revision();
        down(&mut engine, 40.0, 60.0);
        drag(&mut engine, &[(80.0, 90.0)]);
        up(&mut engine, 80.0, 90.0);
        assert_eq!(engine.state().revision(), before);
    }

    #[test]
    fn test_unmounted_surface_is_ignored() {
        let (mut engine, _) = engine();
        engine.set_tool(ToolKind::Pen);
        engine.unmount();
        let response = down(&mut engine, 10.0, 10.0);
        assert_eq!(response, Response::default());
        drag(&mut engine, &[(20.0, 20.0)]);
        up(&mut engine, 20.0, 20.0);
        assert!(engine.state().strokes().is_empty());
    }

    #[test]
    fn test_replay_events_from_json() {
        let (mut engine, _) = engine();
        let events: Vec<CanvasEvent> = serde_json::from_str(
            r#"[
                { "kind": "set_tool", "tool": "pen" },
                { "kind": "pointer_down", "x": 10.0, "y": 10.0, "button": "Left", "buttons": 1 },
                { "kind": "pointer_move", "x": 30.0, "y": 20.0, "buttons": 1,
                  "coalesced": [
                    { "position": { "x": 20.0, "y": 15.0 }, "timestamp": 4 },
                    { "position": { "x": 30.0, "y": 20.0 }, "pressure": 0.8, "timestamp": 8 }
                  ] },
                { "kind": "pointer_up", "x": 30.0, "y": 20.0, "button": "Left" },
                { "kind": "action", "action": { "type": "SET_PEN_SIZE", "payload": 6.0 } }
            ]"#,
        )
        .unwrap();
        for event in events {
            engine.handle_event(event);
        }
        assert_eq!(engine.state().strokes().len(), 1);
        assert_eq!(engine.state().strokes()[0].raw_points.len(), 3);
        assert!((engine.state().pen_size() - 6.0).abs() < f64::EPSILON);
    }
}
