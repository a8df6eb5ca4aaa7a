/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canvas interaction.
//!
//! `CanvasController` owns the camera (zoom and pan), the drag session and
//! the keyboard neighbor graph, and turns pointer and key input into
//! validated `StateStore` mutations. It never edits nodes directly.
//!
//! Recompute work is debounced and driven by `tick`:
//! - zoom settles -> connection complexity and visibility recompute
//! - pan settles -> visibility recompute
//! - node list changes -> relayout and neighbor graph rebuild

use std::rc::Rc;

use euclid::default::{Point2D, Size2D, Vector2D};
use log::{debug, warn};

use crate::app::{CanvasState, StatePatch, StateStore};
use crate::config::{CanvasConfig, EditorConfig, Spacing};
use crate::graph::NodeChanges;
use crate::render::{Connection, PerformanceMetrics, ViewportInfo, VirtualNode, Virtualizer};
use crate::services::{Debouncer, EventBus, SharedClock};

pub mod drag;
pub mod navigation;

pub use drag::{DragPreview, DragSession, DropOutcome, DropZone};
pub use navigation::{Direction, NavKey, NeighborGraph, Neighbors};

const SOURCE: &str = "canvas";
const DEFAULT_ZOOM_MIN: f32 = 0.1;
const DEFAULT_ZOOM_MAX: f32 = 3.0;

/// Zoom bounds and current zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub current_zoom: f32,
    /// Canvas point at the top-left corner of the screen.
    pub pan: Point2D<f32>,
}

impl Camera {
    /// Bounds are reordered when inverted; unusable bounds fall back to the
    /// default range.
    pub fn new(zoom_min: f32, zoom_max: f32) -> Self {
        let (mut zoom_min, mut zoom_max) = (zoom_min.min(zoom_max), zoom_min.max(zoom_max));
        if !zoom_min.is_finite() || !zoom_max.is_finite() || zoom_min <= 0.0 {
            warn!("Ignoring unusable zoom range [{zoom_min}, {zoom_max}]");
            (zoom_min, zoom_max) = (DEFAULT_ZOOM_MIN, DEFAULT_ZOOM_MAX);
        }
        Self {
            zoom_min,
            zoom_max,
            current_zoom: 1.0_f32.clamp(zoom_min, zoom_max),
            pan: Point2D::origin(),
        }
    }

    /// Clamp a zoom value to the allowed range
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }

    pub fn screen_to_canvas(&self, point: Point2D<f32>) -> Point2D<f32> {
        self.pan + point.to_vector() / self.current_zoom
    }

    pub fn canvas_to_screen(&self, point: Point2D<f32>) -> Point2D<f32> {
        ((point - self.pan) * self.current_zoom).to_point()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_ZOOM_MIN, DEFAULT_ZOOM_MAX)
    }
}

/// Sent to the confirmation dialog when a tier change needs approval. The
/// dialog answers with `CanvasController::confirm(index)` or `reject(index)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub index: usize,
    pub node_id: String,
    pub from_tier: u32,
    pub to_tier: u32,
    pub description: String,
}

/// Work done by one `tick`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub relayout: bool,
    pub complexity_recomputed: bool,
    pub visibility_recomputed: bool,
    pub metrics: Option<PerformanceMetrics>,
}

pub struct CanvasController {
    config: CanvasConfig,
    spacing: Spacing,
    clock: SharedClock,
    camera: Camera,
    screen_size: Size2D<f32>,
    virtualizer: Virtualizer,
    neighbors: NeighborGraph,
    drag: Option<DragSession>,
    zoom_settle: Debouncer,
    pan_settle: Debouncer,
    node_list_settle: Debouncer,
    seen_nodes_revision: Option<u64>,
    confirmations: Rc<EventBus<ConfirmationRequest>>,
}

impl CanvasController {
    pub fn new(config: &EditorConfig, clock: SharedClock) -> Self {
        let canvas = config.canvas.clone();
        let virtualizer = Virtualizer::new(
            config.virtualizer.clone(),
            config.connections.clone(),
            Rc::clone(&clock),
        );
        let screen_size = Size2D::new(1000.0, 800.0);
        let mut controller = Self {
            camera: Camera::new(canvas.zoom_min, canvas.zoom_max),
            zoom_settle: Debouncer::new(canvas.zoom_debounce()),
            pan_settle: Debouncer::new(canvas.pan_debounce()),
            node_list_settle: Debouncer::new(canvas.node_list_debounce()),
            config: canvas,
            spacing: config.virtualizer.spacing,
            clock,
            screen_size,
            virtualizer,
            neighbors: NeighborGraph::default(),
            drag: None,
            seen_nodes_revision: None,
            confirmations: Rc::new(EventBus::new()),
        };
        let viewport = controller.viewport_info();
        controller.virtualizer.set_viewport(viewport);
        controller
    }

    /// Adopt the store's camera and node list immediately, without debounce.
    pub fn sync(&mut self, store: &StateStore) {
        let canvas = &store.current_state().canvas;
        self.camera.current_zoom = self.camera.clamp(canvas.zoom);
        self.camera.pan = Point2D::new(canvas.pan_x, canvas.pan_y);
        self.zoom_settle.cancel();
        self.pan_settle.cancel();
        self.node_list_settle.cancel();
        self.relayout(store);
        let viewport = self.viewport_info();
        self.virtualizer.set_viewport(viewport);
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn zoom(&self) -> f32 {
        self.camera.current_zoom
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn neighbors(&self) -> &NeighborGraph {
        &self.neighbors
    }

    pub fn confirmation_requests(&self) -> Rc<EventBus<ConfirmationRequest>> {
        Rc::clone(&self.confirmations)
    }

    /// Visible extent in canvas units.
    pub fn viewport_info(&self) -> ViewportInfo {
        let zoom = self.camera.current_zoom;
        ViewportInfo {
            width: self.screen_size.width / zoom,
            height: self.screen_size.height / zoom,
            scroll_x: self.camera.pan.x,
            scroll_y: self.camera.pan.y,
            zoom_level: zoom,
        }
    }

    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        self.screen_size = Size2D::new(width.max(0.0), height.max(0.0));
        self.pan_settle.schedule(self.clock.now());
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = self.camera.clamp(zoom);
        if zoom == self.camera.current_zoom {
            return;
        }
        self.camera.current_zoom = zoom;
        self.zoom_settle.schedule(self.clock.now());
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.camera.current_zoom + self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.camera.current_zoom - self.config.zoom_step);
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    /// Pan by a screen-space delta; dragging the canvas right reveals content
    /// to the left.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        let delta = Vector2D::new(dx, dy) / self.camera.current_zoom;
        self.camera.pan -= delta;
        self.pan_settle.schedule(self.clock.now());
    }

    pub fn pan_to(&mut self, x: f32, y: f32) {
        self.camera.pan = Point2D::new(x, y);
        self.pan_settle.schedule(self.clock.now());
    }

    /// Centre the viewport on `point` (canvas units).
    pub fn center_on(&mut self, point: Point2D<f32>) {
        let viewport = self.viewport_info();
        self.pan_to(point.x - viewport.width / 2.0, point.y - viewport.height / 2.0);
    }

    /// Drive deferred work: the store's own timers, then relayout, zoom and
    /// pan settles, then performance sampling.
    pub fn tick(&mut self, store: &mut StateStore) -> TickReport {
        store.tick();
        let now = self.clock.now();
        let mut report = TickReport::default();

        let revision = store.nodes_revision();
        if self.seen_nodes_revision != Some(revision) {
            self.seen_nodes_revision = Some(revision);
            self.node_list_settle.schedule(now);
        }
        if self.node_list_settle.poll(now) {
            debug!("node list settled at revision {revision}; relayout");
            self.relayout(store);
            report.relayout = true;
        }

        let zoom_settled = self.zoom_settle.poll(now);
        let pan_settled = self.pan_settle.poll(now);
        if zoom_settled || pan_settled {
            let viewport = self.viewport_info();
            self.virtualizer.set_viewport(viewport);
            report.complexity_recomputed = zoom_settled;
            report.visibility_recomputed = true;
            self.commit_camera(store);
        }

        report.metrics = self.virtualizer.tick();
        report
    }

    fn relayout(&mut self, store: &StateStore) {
        self.seen_nodes_revision = Some(store.nodes_revision());
        let laid_out = self.virtualizer.layout(store.nodes(), self.spacing);
        self.neighbors = NeighborGraph::build(laid_out);
    }

    fn commit_camera(&self, store: &mut StateStore) {
        let current = &store.current_state().canvas;
        let canvas = CanvasState {
            zoom: self.camera.current_zoom,
            pan_x: self.camera.pan.x,
            pan_y: self.camera.pan.y,
            highlighted_node_id: current.highlighted_node_id.clone(),
        };
        if &canvas != current {
            store.patch(StatePatch::new().canvas(canvas), SOURCE);
        }
    }

    pub fn record_frame(&mut self) {
        self.virtualizer.record_frame();
    }

    pub fn visible_nodes(&self) -> Vec<&VirtualNode> {
        self.virtualizer.visible_nodes()
    }

    pub fn nodes_to_process(&self) -> Vec<&VirtualNode> {
        self.virtualizer.nodes_to_process()
    }

    pub fn visible_connections(&mut self, store: &StateStore) -> Vec<Connection> {
        let highlighted = store.current_state().canvas.highlighted_node_id.as_deref();
        self.virtualizer.visible_connections(highlighted)
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.virtualizer.performance_metrics()
    }

    /// Topmost node under a screen point.
    pub fn hit_test(&self, screen: Point2D<f32>) -> Option<&VirtualNode> {
        let canvas = self.camera.screen_to_canvas(screen);
        self.virtualizer.nodes_at_point(canvas).into_iter().next()
    }

    /// Select the node under the pointer, or clear the selection on empty canvas.
    pub fn click(&mut self, screen: Point2D<f32>, store: &mut StateStore) -> Option<String> {
        let hit = self.hit_test(screen).map(|v| v.node.id.clone());
        store.select_node(hit.as_deref(), SOURCE);
        if hit.is_some() {
            store.focus_node(hit.as_deref(), SOURCE);
        }
        hit
    }

    pub fn hover(&mut self, screen: Point2D<f32>, store: &mut StateStore) {
        let hit = self.hit_test(screen).map(|v| v.node.id.clone());
        store.set_highlight(hit.as_deref(), SOURCE);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Start dragging `node_id` from screen `pointer`. The node's tier and
    /// position become the baseline the gesture is measured against.
    pub fn begin_drag(&mut self, node_id: &str, pointer: Point2D<f32>, store: &StateStore) -> bool {
        if !store.current_state().contains(node_id) {
            return false;
        }
        let Some(virtual_node) = self.virtualizer.virtual_node(node_id) else {
            return false;
        };
        let mut session = DragSession::new(virtual_node, pointer);
        if let Some(node) = store.current_state().node(node_id) {
            session.origin_tier = node.tier;
            session.origin_position = node.position;
        }
        self.drag = Some(session);
        true
    }

    /// Snapped landing preview for the pointer at `pointer`.
    pub fn drag_move(&mut self, pointer: Point2D<f32>) -> Option<DragPreview> {
        let session = self.drag.as_ref()?;
        let preview = self.preview_for(session, pointer);
        if let Some(session) = self.drag.as_mut() {
            session.last_preview = Some(preview);
        }
        Some(preview)
    }

    fn preview_for(&self, session: &DragSession, pointer: Point2D<f32>) -> DragPreview {
        let candidate = session.candidate(pointer, self.camera.current_zoom);
        let (position, snapped_tier) = drag::snap_position(candidate, &self.config, self.spacing);
        let zones = drag::drop_zones(
            self.virtualizer.nodes(),
            &session.node_id,
            snapped_tier,
            self.spacing,
        );
        let nearest = drag::nearest_zone(&zones, position, snapped_tier);
        DragPreview {
            position,
            target_tier: snapped_tier.unwrap_or(session.origin_tier),
            zone: nearest.map(|(zone, _)| zone),
            is_valid: nearest.is_some_and(|(_, distance)| distance <= self.config.drop_snap_threshold),
        }
    }

    /// Abandon the drag; nothing was committed, so the baseline stands.
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Release the drag at `pointer`. The drop always resolves to the nearest
    /// drop zone. Same-tier drops commit the new position; tier changes are
    /// applied directly when small, unconflicted and allowed by configuration,
    /// and queued for confirmation otherwise.
    pub fn end_drag(&mut self, pointer: Point2D<f32>, store: &mut StateStore) -> DropOutcome {
        let Some(session) = self.drag.take() else {
            return DropOutcome::Ignored;
        };
        let Some(node) = store.current_state().node(&session.node_id) else {
            return DropOutcome::Ignored;
        };
        let from_tier = node.tier;

        let preview = self.preview_for(&session, pointer);
        let (position, to_tier) = match preview.zone {
            Some(zone) => (zone.position, zone.tier),
            None => (preview.position, preview.target_tier),
        };
        if !preview.is_valid {
            debug!("drop of {} outside snap range; resolved to nearest zone", session.node_id);
        }

        if to_tier == from_tier {
            store.update_node(&session.node_id, &NodeChanges::position(position), SOURCE);
            return DropOutcome::Moved {
                node_id: session.node_id,
                position,
            };
        }

        let changes = NodeChanges::tier(to_tier).with_position(position);
        let conflicts = store
            .validator()
            .tier_conflicts(&session.node_id, to_tier, store.nodes());
        let delta = from_tier.abs_diff(to_tier);
        let auto_apply = self.config.structural_editing
            && delta <= self.config.max_auto_tier_delta
            && !self.config.require_structural_confirmation
            && conflicts.is_empty();

        if auto_apply {
            store.update_node(&session.node_id, &changes, SOURCE);
            return DropOutcome::Retiered {
                node_id: session.node_id,
                from_tier,
                to_tier,
            };
        }

        let mut description = format!(
            "Move '{}' from tier {from_tier} to tier {to_tier}",
            session.node_id
        );
        if !conflicts.is_empty() {
            let ids: Vec<&str> = conflicts
                .iter()
                .map(|c| {
                    if c.dependent_id == session.node_id {
                        c.prerequisite_id.as_str()
                    } else {
                        c.dependent_id.as_str()
                    }
                })
                .collect();
            description.push_str(&format!("; breaks tier order with {}", ids.join(", ")));
        }

        let Some(index) =
            store.queue_structural_change(&session.node_id, changes, description.clone(), SOURCE)
        else {
            return DropOutcome::Ignored;
        };
        self.confirmations.publish(&ConfirmationRequest {
            index,
            node_id: session.node_id,
            from_tier,
            to_tier,
            description,
        });
        DropOutcome::PendingConfirmation { index }
    }

    /// Confirmation dialog accepted the queued change.
    pub fn confirm(&mut self, index: usize, store: &mut StateStore) -> bool {
        store.confirm_pending_change(index, "confirmation-dialog")
    }

    /// Confirmation dialog declined; the queued change is dropped.
    pub fn reject(&mut self, index: usize, store: &mut StateStore) -> bool {
        store.reject_pending_change(index, "confirmation-dialog")
    }

    /// Apply a navigation key. Returns whether the key did anything.
    pub fn handle_key(&mut self, key: NavKey, store: &mut StateStore) -> bool {
        let focused = store.current_state().focused_node_id.clone();
        match key {
            NavKey::Up | NavKey::Down | NavKey::Left | NavKey::Right => {
                let target = match (focused.as_deref(), key.direction()) {
                    (Some(from), Some(direction)) => self.neighbors.step(from, direction).cloned(),
                    _ => self
                        .neighbors
                        .tab(None, self.config.navigation_mode, false)
                        .cloned(),
                };
                self.move_focus(target, store)
            },
            NavKey::Tab | NavKey::ShiftTab => {
                let target = self
                    .neighbors
                    .tab(
                        focused.as_deref(),
                        self.config.navigation_mode,
                        key == NavKey::ShiftTab,
                    )
                    .cloned();
                self.move_focus(target, store)
            },
            NavKey::Enter => match focused {
                Some(id) => store.select_node(Some(&id), SOURCE),
                None => false,
            },
            NavKey::Escape => {
                if self.cancel_drag() {
                    return true;
                }
                if store.current_state().selected_node_id.is_none() {
                    return false;
                }
                store.select_node(None, SOURCE)
            },
            NavKey::ZoomIn => {
                self.zoom_in();
                true
            },
            NavKey::ZoomOut => {
                self.zoom_out();
                true
            },
            NavKey::ZoomReset => {
                self.reset_zoom();
                true
            },
        }
    }

    fn move_focus(&mut self, target: Option<String>, store: &mut StateStore) -> bool {
        let Some(target) = target else {
            return false;
        };
        if !store.focus_node(Some(&target), SOURCE) {
            return false;
        }
        if let Some(virtual_node) = self.virtualizer.virtual_node(&target)
            && !virtual_node.is_visible
        {
            let center = virtual_node.center();
            self.center_on(center);
        }
        true
    }
}

impl std::fmt::Debug for CanvasController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasController")
            .field("camera", &self.camera)
            .field("screen_size", &self.screen_size)
            .field("dragging", &self.drag.as_ref().map(|d| &d.node_id))
            .field("virtualizer", &self.virtualizer)
            .finish()
    }
}
