use std::collections::BTreeSet;

use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::booth::{Dataset, Label, MachineFilter, Row};
use crate::camera::{CanvasSize, Point, Rect, ViewMode, ViewState};
use crate::consts::{
    DEFAULT_COLS, DOUBLE_CLICK_ZOOM, FIT_MARGIN_PX, KEY_MACHINES, KEY_OFFSETS, KEY_ROTATIONS, KEY_SELECTION,
    KEY_SNAPSHOTS, KEY_VIEW, MOVE_MODE_RESTORE_MS, RIGHT_DRAG_SLOP_PX,
};
use crate::guides::{GuideLine, GuideTolerance, compute_guides};
use crate::hit::{HitRect, labels_in_rect, resolve_hit};
use crate::input::{Button, Gesture, InputEvent, Key, Modifiers, Pinch, PointerTool, WheelDelta, axis_lock};
use crate::layout::{Bounds, choose_columns};
use crate::options::ViewOptions;
use crate::persist::{
    LocalStore, OffsetMap, Persistence, RotationMap, SavedSelection, SnapshotBook, Store,
};
use crate::render;
use crate::scene::{Background, Frame, SceneInput, build_frame};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    SetCursor(String),
    ActiveLabelChanged(Option<Label>),
    SelectionChanged(Vec<Label>),
    ModeChanged(ViewMode),
    ToolChanged(PointerTool),
    /// The booth under the pointer changed; `None` when it left every booth.
    Hover(Option<HitRect>),
}

/// Rectangle-select corners in content space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectRect {
    pub start: Point,
    pub end: Point,
}

impl SelectRect {
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corners(self.start, self.end)
    }
}

/// Everything the interaction controller owns between events.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct EngineState {
    pub view: ViewState,
    pub canvas: CanvasSize,
    /// Canvas offset within the page, subtracted from client coordinates.
    pub origin: Point,
    pub dataset: Dataset,
    pub background: Option<Background>,
    pub cols: usize,
    pub options: ViewOptions,
    pub selected_machines: Vec<String>,
    pub filter: MachineFilter,
    pub offsets: OffsetMap,
    pub rotations: RotationMap,
    pub active_label: Option<Label>,
    pub selected_labels: BTreeSet<Label>,
    pub select_rect: Option<SelectRect>,
    pub guides: Vec<GuideLine>,
    pub move_mode: bool,
    pub tool: PointerTool,
    pub gesture: Gesture,
    pub pinch: Pinch,
    pub space_held: bool,
    pub right_dragging: bool,
    pub right_drag_moved: bool,
    /// The last double-click zoomed in; the next one returns to fit.
    pub dbl_zoomed: bool,
    /// When set, move mode comes back on at the first tick at or after this time.
    pub restore_move_mode_at: Option<f64>,
    /// `(label, booth id)` of the hovered booth.
    pub hovered: Option<(Label, String)>,
    pub now_ms: f64,
    pub frame: Frame,
    redraw_requested: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            canvas: CanvasSize::default(),
            origin: Point::default(),
            dataset: Dataset::default(),
            background: None,
            cols: DEFAULT_COLS,
            options: ViewOptions::default(),
            selected_machines: Vec::new(),
            filter: MachineFilter::default(),
            offsets: OffsetMap::new(),
            rotations: RotationMap::default(),
            active_label: None,
            selected_labels: BTreeSet::new(),
            select_rect: None,
            guides: Vec::new(),
            move_mode: false,
            tool: PointerTool::default(),
            gesture: Gesture::default(),
            pinch: Pinch::default(),
            space_held: false,
            right_dragging: false,
            right_drag_moved: false,
            dbl_zoomed: false,
            restore_move_mode_at: None,
            hovered: None,
            now_ms: 0.0,
            frame: Frame::default(),
            redraw_requested: false,
        }
    }
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore<S: Store> {
    pub state: EngineState,
    persistence: Persistence<S>,
}

impl<S: Store> EngineCore<S> {
    /// Create an engine and restore options, offsets, rotations, selection
    /// and the machine filter from `store`.
    pub fn new(store: S) -> Self {
        let persistence = Persistence::new(store);
        let saved: SavedSelection = persistence.load(KEY_SELECTION);
        let state = EngineState {
            options: persistence.load(KEY_VIEW),
            offsets: persistence.load(KEY_OFFSETS),
            rotations: persistence.load(KEY_ROTATIONS),
            selected_machines: persistence.load(KEY_MACHINES),
            active_label: saved.active_label,
            selected_labels: saved.selected_labels.into_iter().collect(),
            ..EngineState::default()
        };
        Self { state, persistence }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn into_store(self) -> S {
        self.persistence.into_store()
    }

    // --- Data inputs ---

    /// Replace the dataset and background, then fit.
    pub fn load_dataset(&mut self, dataset: Dataset, background: Option<Background>) -> Vec<Action> {
        self.state.dataset = dataset;
        self.state.background = background;
        self.state.filter = MachineFilter::new(&self.state.selected_machines, &self.state.dataset);
        self.update_columns();
        self.relayout();
        self.refit()
    }

    pub fn set_background(&mut self, background: Option<Background>) -> Vec<Action> {
        self.state.background = background;
        self.relayout();
        self.refit()
    }

    /// Resize the canvas. In move mode the content point at the center
    /// stays put; otherwise the view is refitted.
    pub fn set_viewport(&mut self, size: CanvasSize, origin: Point) -> Vec<Action> {
        let prev = self.state.canvas;
        self.state.canvas = size;
        self.state.origin = origin;
        self.update_columns();
        self.relayout();

        if self.state.move_mode {
            if prev.width > 0.0 && prev.height > 0.0 {
                let view = &mut self.state.view;
                let center = view.screen_to_content(prev.center(), Point::default());
                view.tx = size.width * 0.5 - center.x * view.scale;
                view.ty = size.height * 0.5 - center.y * view.scale;
                view.clamp_pan(size, self.state.frame.world_rect, FIT_MARGIN_PX);
            }
            self.request_redraw();
            return vec![Action::RenderNeeded];
        }
        self.refit()
    }

    fn update_columns(&mut self) {
        self.state.cols = if self.state.canvas.width > 0.0 {
            choose_columns(&self.state.dataset, self.state.canvas.width)
        } else {
            DEFAULT_COLS
        };
    }

    // --- View API ---

    #[must_use]
    pub fn mode(&self) -> ViewMode {
        self.state.view.mode
    }

    /// `x3` zooms to 3x; anything else fits the world.
    pub fn set_mode(&mut self, mode: ViewMode) -> Vec<Action> {
        let mode = if mode == ViewMode::X3 { ViewMode::X3 } else { ViewMode::Fit };
        let world = self.state.frame.world_rect;
        self.apply_mode(world, mode)
    }

    pub fn reset(&mut self) -> Vec<Action> {
        self.set_mode(ViewMode::Fit)
    }

    /// Load and resize fit: `x3` targets the world rect, anything else
    /// fits the content rect.
    fn refit(&mut self) -> Vec<Action> {
        let frame = &self.state.frame;
        if self.state.view.mode == ViewMode::X3 {
            let world = frame.world_rect;
            self.apply_mode(world, ViewMode::X3)
        } else {
            let content = frame.content_rect;
            self.apply_mode(content, ViewMode::Fit)
        }
    }

    fn apply_mode(&mut self, target: Rect, mode: ViewMode) -> Vec<Action> {
        let before = self.state.view.mode;
        let out = self.state.view.apply_view_mode(target, self.state.canvas, mode, self.state.move_mode);
        if out.blocked {
            tracing::debug!(?mode, "refit blocked by move mode");
        }
        self.request_redraw();
        let mut actions = vec![Action::RenderNeeded];
        if self.state.view.mode != before {
            tracing::debug!(from = ?before, to = ?self.state.view.mode, "view mode changed");
            actions.push(Action::ModeChanged(self.state.view.mode));
        }
        actions
    }

    // --- Settings ---

    pub fn set_move_mode(&mut self, on: bool) -> Vec<Action> {
        self.state.move_mode = on;
        self.state.restore_move_mode_at = None;
        let mut actions = Vec::new();
        if !on {
            self.state.select_rect = None;
            self.state.gesture = Gesture::Idle;
            self.state.guides.clear();
            if !self.state.selected_labels.is_empty() {
                self.state.selected_labels.clear();
                self.persist_selection();
                actions.push(Action::SelectionChanged(Vec::new()));
            }
        }
        self.relayout();
        self.request_redraw();
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn set_tool(&mut self, tool: PointerTool) -> Vec<Action> {
        if self.state.tool == tool {
            return Vec::new();
        }
        self.state.tool = tool;
        vec![Action::ToolChanged(tool), Action::SetCursor(tool.cursor().to_owned())]
    }

    pub fn set_options(&mut self, options: ViewOptions) -> Vec<Action> {
        self.state.options = options.normalized();
        save_or_warn(&mut self.persistence, KEY_VIEW, &self.state.options);
        self.relayout();
        self.request_redraw();
        vec![Action::RenderNeeded]
    }

    pub fn set_selected_machines(&mut self, names: Vec<String>) -> Vec<Action> {
        self.state.selected_machines = names;
        save_or_warn(&mut self.persistence, KEY_MACHINES, &self.state.selected_machines);
        self.state.filter = MachineFilter::new(&self.state.selected_machines, &self.state.dataset);
        self.relayout();
        self.request_redraw();
        vec![Action::RenderNeeded]
    }

    // --- Rotation ---

    /// Rotate the active group by `delta` degrees. Only in move mode.
    pub fn rotate_active(&mut self, delta: f64) -> bool {
        let Some(label) = self.movable_active_label() else {
            return false;
        };
        let deg = self.state.rotations.get(&label) + delta;
        self.state.rotations.set(&label, deg);
        self.after_rotation()
    }

    pub fn reset_active_rotation(&mut self) -> bool {
        let Some(label) = self.movable_active_label() else {
            return false;
        };
        self.state.rotations.remove(&label);
        self.after_rotation()
    }

    fn movable_active_label(&self) -> Option<Label> {
        if !self.state.move_mode {
            return None;
        }
        self.state.active_label.clone()
    }

    fn after_rotation(&mut self) -> bool {
        save_or_warn(&mut self.persistence, KEY_ROTATIONS, &self.state.rotations);
        self.relayout();
        self.request_redraw();
        true
    }

    // --- Offsets and snapshots ---

    /// Save the current offsets under `name`. Blank names are refused.
    pub fn save_snapshot(&mut self, name: &str, now_ms: f64) -> bool {
        let mut book: SnapshotBook = self.persistence.load(KEY_SNAPSHOTS);
        if !book.insert(name, now_ms, self.state.offsets.clone()) {
            return false;
        }
        save_or_warn(&mut self.persistence, KEY_SNAPSHOTS, &book);
        tracing::debug!(name = name.trim(), groups = self.state.offsets.len(), "snapshot saved");
        true
    }

    /// Replace the offsets with a saved snapshot.
    pub fn restore_snapshot(&mut self, name: &str) -> bool {
        let book: SnapshotBook = self.persistence.load(KEY_SNAPSHOTS);
        let Some(snapshot) = book.get(name) else {
            tracing::warn!(name, "unknown snapshot");
            return false;
        };
        self.state.offsets = snapshot.offsets.clone();
        save_or_warn(&mut self.persistence, KEY_OFFSETS, &self.state.offsets);
        tracing::debug!(name, "snapshot restored");
        self.relayout();
        self.request_redraw();
        true
    }

    #[must_use]
    pub fn snapshot_names(&self) -> Vec<String> {
        self.persistence.load::<SnapshotBook>(KEY_SNAPSHOTS).names_newest_first()
    }

    #[must_use]
    pub fn snapshots(&self) -> SnapshotBook {
        self.persistence.load(KEY_SNAPSHOTS)
    }

    /// Drop every offset and the multi-selection.
    pub fn clear_offsets(&mut self) -> Vec<Action> {
        self.state.offsets.clear();
        if let Err(e) = self.persistence.remove(KEY_OFFSETS) {
            tracing::warn!(key = KEY_OFFSETS, error = %e, "persist failed");
        }
        self.state.selected_labels.clear();
        self.persist_selection();
        self.relayout();
        self.request_redraw();
        vec![Action::SelectionChanged(Vec::new()), Action::RenderNeeded]
    }

    // --- Redraw ---

    /// Idempotent; any number of requests collapse into one redraw.
    pub fn request_redraw(&mut self) {
        self.state.redraw_requested = true;
    }

    /// Whether a redraw was requested since the last call.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.state.redraw_requested)
    }

    /// Blinking needs a redraw every animation frame.
    #[must_use]
    pub fn blink_ticker_active(&self) -> bool {
        self.state.options.highlight.blink.enabled
    }

    /// Run the layout pass at `now_ms` and return the frame.
    pub fn redraw(&mut self, now_ms: f64) -> &Frame {
        self.state.now_ms = now_ms;
        self.state.redraw_requested = false;
        self.relayout();
        &self.state.frame
    }

    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.state.frame
    }

    /// The host should suppress the context menu after a right-drag pan,
    /// and always under the pan tool.
    #[must_use]
    pub fn context_menu_allowed(&self) -> bool {
        self.state.tool != PointerTool::Pan && !self.state.right_drag_moved
    }

    fn relayout(&mut self) {
        let s = &self.state;
        let input = SceneInput {
            dataset: &s.dataset,
            options: &s.options,
            offsets: &s.offsets,
            rotations: &s.rotations,
            filter: &s.filter,
            background: s.background,
            cols: s.cols,
            move_mode: s.move_mode,
            active_label: s.active_label.as_deref(),
            selected: &s.selected_labels,
        };
        let frame = build_frame(&input, s.now_ms);
        self.state.frame = frame;
    }

    // --- Queries ---

    /// Content point under a client point.
    #[must_use]
    pub fn to_content(&self, client: Point) -> Point {
        self.state.view.screen_to_content(client, self.state.origin)
    }

    /// Booth under a client point, rotation-aware.
    #[must_use]
    pub fn hit_at(&self, client: Point) -> Option<&HitRect> {
        let content = self.to_content(client);
        let frame = &self.state.frame;
        resolve_hit(&frame.hit_rects, &frame.group_bounds, |l| self.state.rotations.get(l), content)
    }

    // --- Input events ---

    pub fn dispatch(&mut self, event: InputEvent) -> Vec<Action> {
        match event {
            InputEvent::PointerDown { at, button } => self.on_pointer_down(at, button),
            InputEvent::PointerMove { at, modifiers } => self.on_pointer_move(at, modifiers),
            InputEvent::PointerUp { at, button } => self.on_pointer_up(at, button),
            InputEvent::PointerLeave => self.on_pointer_leave(),
            InputEvent::Click { at } => self.on_click(at),
            InputEvent::DoubleClick { at, now_ms } => self.on_double_click(at, now_ms),
            InputEvent::Wheel { at, delta } => self.on_wheel(at, delta),
            InputEvent::TouchStart { touches } | InputEvent::TouchEnd { touches } => self.on_touch_change(&touches),
            InputEvent::TouchMove { touches } => self.on_touch_move(&touches),
            InputEvent::TouchCancel => {
                self.state.pinch = Pinch::None;
                Vec::new()
            }
            InputEvent::KeyDown { key, repeat } => self.on_key_down(&key, repeat),
            InputEvent::KeyUp { key } => self.on_key_up(&key),
            InputEvent::Tick { now_ms } => self.on_tick(now_ms),
        }
    }

    fn on_pointer_down(&mut self, at: Point, button: Button) -> Vec<Action> {
        let mut actions = Vec::new();
        let hit_label = self.hit_at(at).map(|h| h.label.clone());
        let forced = button == Button::Secondary || self.state.space_held;
        if button == Button::Secondary {
            self.state.right_dragging = true;
            self.state.right_drag_moved = false;
        }
        self.state.guides.clear();

        if self.state.move_mode && !forced {
            if let Some(label) = hit_label {
                self.set_active_label(Some(label.clone()), &mut actions);
                self.state.gesture = if self.state.selected_labels.contains(&label) {
                    let labels = self.state.selected_labels.iter().cloned().collect();
                    Gesture::DraggingGroup { labels, last: at }
                } else {
                    Gesture::DraggingSingle { label, last: at }
                };
            } else if self.state.tool == PointerTool::Rect {
                let c = self.to_content(at);
                self.state.select_rect = Some(SelectRect { start: c, end: c });
                if !self.state.selected_labels.is_empty() {
                    self.state.selected_labels.clear();
                    actions.push(Action::SelectionChanged(Vec::new()));
                }
                self.state.gesture = Gesture::RectSelecting { last: at };
            } else {
                self.state.gesture = Gesture::Panning { last: at, forced: false };
            }
        } else {
            if let Some(label) = hit_label {
                self.set_active_label(Some(label), &mut actions);
            }
            self.state.gesture = Gesture::Panning { last: at, forced };
        }

        if let Some(cursor) = self.state.gesture.cursor() {
            actions.push(Action::SetCursor(cursor.to_owned()));
        }
        self.request_redraw();
        actions.push(Action::RenderNeeded);
        actions
    }

    fn on_pointer_move(&mut self, at: Point, modifiers: Modifiers) -> Vec<Action> {
        if self.state.gesture.is_idle() {
            return self.on_hover(at);
        }
        let gesture = self.state.gesture.clone();
        self.state.gesture.set_last(at);
        match gesture {
            Gesture::Idle => Vec::new(),
            Gesture::Panning { last, forced } => {
                let (dx, dy) = (at.x - last.x, at.y - last.y);
                if self.state.right_dragging && dx.abs() + dy.abs() > RIGHT_DRAG_SLOP_PX {
                    self.state.right_drag_moved = true;
                }
                self.state.guides.clear();
                if !forced && self.state.tool == PointerTool::Rect {
                    return Vec::new();
                }
                self.pan_by(dx, dy)
            }
            Gesture::RectSelecting { .. } => {
                let c = self.to_content(at);
                if let Some(rect) = self.state.select_rect.as_mut() {
                    rect.end = c;
                }
                self.request_redraw();
                vec![Action::RenderNeeded]
            }
            Gesture::DraggingSingle { last, .. } | Gesture::DraggingGroup { last, .. } => {
                self.drag(&gesture.moving_labels(), at.x - last.x, at.y - last.y, modifiers.shift)
            }
        }
    }

    fn on_hover(&mut self, at: Point) -> Vec<Action> {
        let hit = self.hit_at(at).cloned();
        let key = hit.as_ref().map(|h| (h.label.clone(), h.booth_id.clone()));
        let cursor = match (&hit, self.state.move_mode) {
            (Some(_), true) => "move",
            (Some(_), false) => "pointer",
            (None, _) => self.state.tool.cursor(),
        };
        let mut actions = vec![Action::SetCursor(cursor.to_owned())];
        if key != self.state.hovered {
            self.state.hovered = key;
            actions.push(Action::Hover(hit));
        }
        actions
    }

    fn pan_by(&mut self, dx: f64, dy: f64) -> Vec<Action> {
        let view = &mut self.state.view;
        view.tx += dx;
        view.ty += dy;
        view.clamp_pan(self.state.canvas, self.state.frame.world_rect, FIT_MARGIN_PX);
        self.request_redraw();
        vec![Action::RenderNeeded]
    }

    /// Add a screen delta to every label's offset, persist, and refresh the guides.
    fn drag(&mut self, labels: &[Label], dx: f64, dy: f64, axis_locked: bool) -> Vec<Action> {
        let scale = self.state.view.scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Vec::new();
        }
        let (mut ddx, mut ddy) = (dx / scale, dy / scale);
        if axis_locked {
            (ddx, ddy) = axis_lock(ddx, ddy);
        }
        for label in labels {
            let offset = self.state.offsets.entry(label.clone()).or_default();
            offset.dx += ddx;
            offset.dy += ddy;
        }
        save_or_warn(&mut self.persistence, KEY_OFFSETS, &self.state.offsets);
        self.relayout();

        let frame = &self.state.frame;
        let moving: Vec<(Label, Bounds)> =
            labels.iter().filter_map(|l| frame.group_bounds.get(l).map(|b| (l.clone(), *b))).collect();
        let viewport = self.state.view.visible_content(self.state.canvas);
        self.state.guides =
            compute_guides(&moving, &frame.group_bounds, viewport, GuideTolerance::for_scale(scale));
        self.request_redraw();
        vec![Action::RenderNeeded]
    }

    fn on_pointer_up(&mut self, _at: Point, _button: Button) -> Vec<Action> {
        let mut actions = Vec::new();
        self.state.gesture = Gesture::Idle;
        self.state.guides.clear();
        self.state.right_dragging = false;
        self.state.space_held = false;

        if let Some(rect) = self.state.select_rect.take() {
            let picked = labels_in_rect(&self.state.frame.group_bounds, rect.bounds());
            tracing::debug!(count = picked.len(), "rectangle selection committed");
            self.state.selected_labels = picked.iter().cloned().collect();
            self.persist_selection();
            actions.push(Action::SelectionChanged(picked));
        }
        if !self.state.move_mode && !self.state.selected_labels.is_empty() {
            self.state.selected_labels.clear();
            self.persist_selection();
            actions.push(Action::SelectionChanged(Vec::new()));
        }

        actions.push(Action::SetCursor(self.state.tool.cursor().to_owned()));
        self.relayout();
        self.request_redraw();
        actions.push(Action::RenderNeeded);
        actions
    }

    fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.state.gesture = Gesture::Idle;
        self.state.select_rect = None;
        self.state.guides.clear();
        self.state.right_dragging = false;
        let mut actions = vec![Action::SetCursor(self.state.tool.cursor().to_owned())];
        if self.state.hovered.take().is_some() {
            actions.push(Action::Hover(None));
        }
        self.request_redraw();
        actions.push(Action::RenderNeeded);
        actions
    }

    fn on_click(&mut self, at: Point) -> Vec<Action> {
        let label = self.hit_at(at).map(|h| h.label.clone());
        let mut actions = Vec::new();
        self.set_active_label(label, &mut actions);
        if !actions.is_empty() {
            self.relayout();
            self.request_redraw();
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    fn on_double_click(&mut self, at: Point, now_ms: f64) -> Vec<Action> {
        if self.state.dbl_zoomed {
            let suspended = self.state.move_mode;
            self.state.move_mode = false;
            let actions = self.set_mode(ViewMode::Fit);
            self.state.dbl_zoomed = false;
            if suspended {
                self.state.restore_move_mode_at = Some(now_ms + MOVE_MODE_RESTORE_MS);
            }
            return actions;
        }
        let focus = Point::new(at.x - self.state.origin.x, at.y - self.state.origin.y);
        let mut actions = self.zoom_at(focus, DOUBLE_CLICK_ZOOM);
        self.state.dbl_zoomed = true;
        actions.push(Action::RenderNeeded);
        actions
    }

    fn on_wheel(&mut self, at: Point, delta: WheelDelta) -> Vec<Action> {
        let focus = Point::new(at.x - self.state.origin.x, at.y - self.state.origin.y);
        let mut actions = self.zoom_at(focus, delta.zoom_factor());
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Focus-preserving zoom around a canvas-relative point.
    fn zoom_at(&mut self, focus: Point, factor: f64) -> Vec<Action> {
        let world = self.state.frame.world_rect;
        let changed = self.state.view.zoom_at_screen(self.state.canvas, focus, factor, world);
        self.request_redraw();
        match changed {
            Some(mode) => {
                tracing::debug!(?mode, "view mode changed");
                vec![Action::ModeChanged(mode)]
            }
            None => Vec::new(),
        }
    }

    /// Touches were added or lifted: re-seed the tracker from what remains.
    fn on_touch_change(&mut self, touches: &[Point]) -> Vec<Action> {
        self.state.pinch = match touches {
            [a, b, ..] => Pinch::Zooming { last_dist: a.distance(*b) },
            [a] => Pinch::Panning { last: *a },
            [] => Pinch::None,
        };
        Vec::new()
    }

    fn on_touch_move(&mut self, touches: &[Point]) -> Vec<Action> {
        self.state.guides.clear();
        match (touches, self.state.pinch) {
            ([a, b, ..], pinch) => {
                let dist = a.distance(*b);
                let last_dist = match pinch {
                    Pinch::Zooming { last_dist } if last_dist > 0.0 => last_dist,
                    _ => dist,
                };
                self.state.pinch = Pinch::Zooming { last_dist: dist };
                let mid = a.midpoint(*b);
                let focus = Point::new(mid.x - self.state.origin.x, mid.y - self.state.origin.y);
                let mut actions = self.zoom_at(focus, dist / last_dist);
                actions.push(Action::RenderNeeded);
                actions
            }
            ([a], Pinch::Panning { last }) => {
                self.state.pinch = Pinch::Panning { last: *a };
                self.pan_by(a.x - last.x, a.y - last.y)
            }
            ([a], _) => {
                self.state.pinch = Pinch::Panning { last: *a };
                Vec::new()
            }
            ([], _) => Vec::new(),
        }
    }

    fn on_key_down(&mut self, key: &Key, repeat: bool) -> Vec<Action> {
        if key.is_space() {
            self.state.space_held = true;
        }
        if repeat {
            return Vec::new();
        }
        match PointerTool::from_key(key) {
            Some(tool) => self.set_tool(tool),
            None => Vec::new(),
        }
    }

    fn on_key_up(&mut self, key: &Key) -> Vec<Action> {
        if key.is_space() {
            self.state.space_held = false;
        }
        Vec::new()
    }

    fn on_tick(&mut self, now_ms: f64) -> Vec<Action> {
        self.state.now_ms = now_ms;
        let mut actions = Vec::new();
        if let Some(at) = self.state.restore_move_mode_at {
            if now_ms >= at {
                self.state.restore_move_mode_at = None;
                self.state.move_mode = true;
                self.relayout();
                self.request_redraw();
                actions.push(Action::RenderNeeded);
            }
        }
        if self.blink_ticker_active() && actions.is_empty() {
            self.request_redraw();
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    // --- Selection ---

    fn set_active_label(&mut self, label: Option<Label>, actions: &mut Vec<Action>) {
        if self.state.active_label == label {
            return;
        }
        self.state.active_label.clone_from(&label);
        self.persist_selection();
        actions.push(Action::ActiveLabelChanged(label));
    }

    fn persist_selection(&mut self) {
        let saved = SavedSelection {
            active_label: self.state.active_label.clone(),
            selected_labels: self.state.selected_labels.iter().cloned().collect(),
        };
        save_or_warn(&mut self.persistence, KEY_SELECTION, &saved);
    }

    /// The world rectangle the view fits to.
    #[must_use]
    pub fn world_rect(&self) -> Rect {
        self.state.frame.world_rect
    }
}

/// Persistence failures are logged; the next mutation writes again.
fn save_or_warn<S: Store, T: Serialize>(persistence: &mut Persistence<S>, key: &str, value: &T) {
    if let Err(e) = persistence.save(key, value) {
        tracing::warn!(key, error = %e, "persist failed");
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: Option<CanvasRenderingContext2d>,
    background: Option<HtmlImageElement>,
    dpr: f64,
    pub core: EngineCore<LocalStore>,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        let ctx = context_2d(&canvas);
        Self { canvas, ctx, background: None, dpr: 1.0, core: EngineCore::new(LocalStore::new()) }
    }

    /// Load spreadsheet rows and fit.
    pub fn load_rows(&mut self, rows: &[Row]) -> Vec<Action> {
        let background = self.background.as_ref().map(background_size);
        self.core.load_dataset(Dataset::from_rows(rows), background)
    }

    /// Use a loaded image as the map background.
    pub fn set_background_image(&mut self, image: Option<HtmlImageElement>) -> Vec<Action> {
        let size = image.as_ref().map(background_size);
        self.background = image;
        self.core.set_background(size)
    }

    /// Update viewport dimensions, device pixel ratio, and page offset.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64, origin: Point) -> Vec<Action> {
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        self.canvas.set_width((width_css * self.dpr).round().max(0.0) as u32);
        self.canvas.set_height((height_css * self.dpr).round().max(0.0) as u32);
        self.core.set_viewport(CanvasSize::new(width_css, height_css), origin)
    }

    pub fn dispatch(&mut self, event: InputEvent) -> Vec<Action> {
        self.core.dispatch(event)
    }

    // --- Render ---

    /// Run the layout pass and draw it.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn render(&mut self, now_ms: f64) -> Result<(), JsValue> {
        self.core.redraw(now_ms);
        let Some(ctx) = &self.ctx else {
            return Ok(());
        };
        let s = &self.core.state;
        let scene = render::Scene {
            frame: &s.frame,
            view: &s.view,
            canvas: s.canvas,
            options: &s.options,
            guides: &s.guides,
            select_rect: s.select_rect.map(|r| r.bounds()),
            background: self.background.as_ref(),
            dpr: self.dpr,
        };
        render::draw(ctx, &scene)
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    match canvas.get_context("2d") {
        Ok(Some(obj)) => match obj.dyn_into::<CanvasRenderingContext2d>() {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(error = ?e, "2d context has unexpected type");
                None
            }
        },
        Ok(None) => {
            tracing::warn!("canvas has no 2d context");
            None
        }
        Err(e) => {
            tracing::warn!(error = ?e, "2d context request failed");
            None
        }
    }
}

fn background_size(image: &HtmlImageElement) -> Background {
    Background { width: f64::from(image.natural_width()), height: f64::from(image.natural_height()) }
}
