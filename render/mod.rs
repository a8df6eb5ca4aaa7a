/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Viewport virtualization.
//!
//! The `Virtualizer` lays nodes out on a tier grid, keeps an R*-tree over the
//! laid-out bounds, and answers which nodes and connections are worth
//! processing for the current viewport. Connection geometry is cached with a
//! time-based expiry and a rolling performance sample is published once per
//! sampling period.
//!
//! Coordinates are canvas units throughout. `ViewportInfo` width and height
//! are the visible extent in canvas units (screen size divided by zoom).

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Instant;

use euclid::default::{Box2D, Point2D};
use serde::Serialize;

use crate::config::{ConnectionConfig, Spacing, VirtualizerConfig};
use crate::graph::{Node, NodeId};
use crate::services::{EventBus, SharedClock};

pub mod connections;
pub mod metrics;
mod spatial_index;

pub use connections::{
    ComplexityTier, Connection, ConnectionCache, PathGeometry, build_path, connection_id,
    prioritize_connections,
};
pub use metrics::{PerformanceMetrics, PerformanceSampler};
use spatial_index::NodeSpatialIndex;

/// A node decorated with its layout box and visibility flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualNode {
    pub node: Node,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Intersects the viewport itself.
    pub is_visible: bool,
    /// Intersects the viewport expanded by the buffer margin.
    pub is_in_render_bounds: bool,
}

impl VirtualNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn bounds(&self) -> Box2D<f32> {
        Box2D::new(
            Point2D::new(self.x, self.y),
            Point2D::new(self.x + self.width, self.y + self.height),
        )
    }

    pub fn center(&self) -> Point2D<f32> {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_center(&self) -> Point2D<f32> {
        Point2D::new(self.x + self.width / 2.0, self.y)
    }

    pub fn bottom_center(&self) -> Point2D<f32> {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height)
    }
}

/// Visible window into the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportInfo {
    pub width: f32,
    pub height: f32,
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub zoom_level: f32,
}

impl ViewportInfo {
    pub fn rect(&self) -> Box2D<f32> {
        Box2D::new(
            Point2D::new(self.scroll_x, self.scroll_y),
            Point2D::new(self.scroll_x + self.width, self.scroll_y + self.height),
        )
    }

    pub fn expanded(&self, margin: f32) -> Box2D<f32> {
        self.rect().inflate(margin, margin)
    }
}

impl Default for ViewportInfo {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            zoom_level: 1.0,
        }
    }
}

/// Closed-interval overlap; touching edges count.
pub(crate) fn touches(a: &Box2D<f32>, b: &Box2D<f32>) -> bool {
    a.min.x <= b.max.x && b.min.x <= a.max.x && a.min.y <= b.max.y && b.min.y <= a.max.y
}

/// Tier-grid layout: tiers become rows, members are ordered by name (then id)
/// and spread along the row. Identical input always yields identical output.
pub fn layout_nodes(
    nodes: &[Node],
    spacing: Spacing,
    node_width: f32,
    node_height: f32,
) -> Vec<VirtualNode> {
    let mut tiers: BTreeMap<u32, Vec<&Node>> = BTreeMap::new();
    for node in nodes {
        tiers.entry(node.tier).or_default().push(node);
    }

    let mut laid_out = Vec::with_capacity(nodes.len());
    for (tier, mut members) in tiers {
        members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let y = tier.saturating_sub(1) as f32 * spacing.y;
        for (index, node) in members.into_iter().enumerate() {
            laid_out.push(VirtualNode {
                node: node.clone(),
                x: index as f32 * spacing.x,
                y,
                width: node_width,
                height: node_height,
                is_visible: false,
                is_in_render_bounds: false,
            });
        }
    }
    laid_out
}

pub struct Virtualizer {
    config: VirtualizerConfig,
    connection_config: ConnectionConfig,
    clock: SharedClock,
    nodes: Vec<VirtualNode>,
    slots: HashMap<NodeId, usize>,
    index: NodeSpatialIndex,
    viewport: ViewportInfo,
    render_slots: Vec<usize>,
    complexity: ComplexityTier,
    cache: ConnectionCache,
    sampler: PerformanceSampler,
}

impl Virtualizer {
    pub fn new(
        config: VirtualizerConfig,
        connection_config: ConnectionConfig,
        clock: SharedClock,
    ) -> Self {
        let viewport = ViewportInfo::default();
        let cache = ConnectionCache::new(
            config.cache_ttl(),
            config.cache_prune_age(),
            config.cache_high_water_mark,
        );
        let sampler = PerformanceSampler::new(config.sample_interval());
        let complexity = ComplexityTier::for_zoom(viewport.zoom_level, &connection_config.thresholds);
        Self {
            config,
            connection_config,
            clock,
            nodes: Vec::new(),
            slots: HashMap::new(),
            index: NodeSpatialIndex::empty(),
            viewport,
            render_slots: Vec::new(),
            complexity,
            cache,
            sampler,
        }
    }

    pub fn config(&self) -> &VirtualizerConfig {
        &self.config
    }

    /// Lay `nodes` out and recompute visibility against the current viewport.
    /// Cached connection geometry is dropped since endpoints may have moved.
    pub fn layout(&mut self, nodes: &[Node], spacing: Spacing) -> &[VirtualNode] {
        let started = Instant::now();

        self.nodes = layout_nodes(nodes, spacing, self.config.node_width, self.config.node_height);
        self.slots = HashMap::with_capacity(self.nodes.len());
        for (slot, virtual_node) in self.nodes.iter().enumerate() {
            // First occurrence wins for duplicate ids.
            self.slots.entry(virtual_node.node.id.clone()).or_insert(slot);
        }
        self.index = NodeSpatialIndex::build(
            self.nodes
                .iter()
                .enumerate()
                .map(|(slot, virtual_node)| (slot, virtual_node.bounds())),
        );
        self.cache.clear();
        self.refresh_visibility();

        self.sampler.record_pass(started.elapsed());
        &self.nodes
    }

    /// Relayout with the configured spacing.
    pub fn relayout(&mut self, nodes: &[Node]) -> &[VirtualNode] {
        let spacing = self.config.spacing;
        self.layout(nodes, spacing)
    }

    pub fn set_viewport(&mut self, viewport: ViewportInfo) {
        let started = Instant::now();
        let previous_zoom = self.viewport.zoom_level;
        self.viewport = viewport;

        let complexity =
            ComplexityTier::for_zoom(viewport.zoom_level, &self.connection_config.thresholds);
        if complexity != self.complexity {
            log::debug!("connection complexity {:?} -> {:?}", self.complexity, complexity);
            self.complexity = complexity;
            self.cache.clear();
        } else if complexity == ComplexityTier::Full && viewport.zoom_level != previous_zoom {
            // Full-fidelity lane offsets scale with zoom.
            self.cache.clear();
        }
        self.refresh_visibility();

        self.sampler.record_pass(started.elapsed());
    }

    pub fn viewport(&self) -> ViewportInfo {
        self.viewport
    }

    fn refresh_visibility(&mut self) {
        for slot in self.render_slots.drain(..) {
            if let Some(virtual_node) = self.nodes.get_mut(slot) {
                virtual_node.is_visible = false;
                virtual_node.is_in_render_bounds = false;
            }
        }

        let view = self.viewport.rect();
        let render_bounds = self.viewport.expanded(self.config.buffer);
        let slots = self.index.slots_in_rect(&render_bounds);
        for &slot in &slots {
            if let Some(virtual_node) = self.nodes.get_mut(slot) {
                virtual_node.is_in_render_bounds = true;
                virtual_node.is_visible = touches(&virtual_node.bounds(), &view);
            }
        }
        self.render_slots = slots;
    }

    /// Every laid-out node, in layout order.
    pub fn nodes(&self) -> &[VirtualNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes whose bounds intersect the viewport expanded by the buffer.
    pub fn visible_nodes(&self) -> Vec<&VirtualNode> {
        self.render_slots
            .iter()
            .filter_map(|&slot| self.nodes.get(slot))
            .collect()
    }

    pub fn should_virtualize(&self, count: usize) -> bool {
        count > self.config.virtualize_threshold
    }

    /// The working set for this frame: the culled set once the graph is large
    /// enough to be worth culling, otherwise everything.
    pub fn nodes_to_process(&self) -> Vec<&VirtualNode> {
        if self.should_virtualize(self.nodes.len()) {
            self.visible_nodes()
        } else {
            self.nodes.iter().collect()
        }
    }

    pub fn virtual_node(&self, id: &str) -> Option<&VirtualNode> {
        self.slots.get(id).and_then(|&slot| self.nodes.get(slot))
    }

    /// Processable nodes whose bounds contain `point`, topmost (last laid out) first.
    pub fn nodes_at_point(&self, point: Point2D<f32>) -> Vec<&VirtualNode> {
        let virtualized = self.should_virtualize(self.nodes.len());
        let mut hits: Vec<&VirtualNode> = self
            .index
            .slots_at_point(point)
            .into_iter()
            .filter_map(|slot| self.nodes.get(slot))
            .filter(|virtual_node| !virtualized || virtual_node.is_in_render_bounds)
            .collect();
        hits.reverse();
        hits
    }

    pub fn complexity(&self) -> ComplexityTier {
        self.complexity
    }

    pub fn get_cached_connection(&self, id: &str) -> Option<PathGeometry> {
        self.cache.get(id, self.clock.now())
    }

    pub fn cache_connection(&mut self, id: impl Into<String>, path: PathGeometry) {
        self.cache.insert(id, path, self.clock.now());
    }

    pub fn cached_connection_count(&self) -> usize {
        self.cache.len()
    }

    /// Connections touching the processed node set, capped and prioritized.
    pub fn visible_connections(&mut self, highlighted: Option<&str>) -> Vec<Connection> {
        let mut processed = vec![!self.should_virtualize(self.nodes.len()); self.nodes.len()];
        for &slot in &self.render_slots {
            if let Some(flag) = processed.get_mut(slot) {
                *flag = true;
            }
        }

        let now = self.clock.now();
        let zoom = self.viewport.zoom_level;
        let mut connections = Vec::new();
        for (to_slot, dependent) in self.nodes.iter().enumerate() {
            for prerequisite_id in &dependent.node.prerequisites {
                let Some(&from_slot) = self.slots.get(prerequisite_id) else {
                    continue;
                };
                if !processed[to_slot] && !processed[from_slot] {
                    continue;
                }
                let prerequisite = &self.nodes[from_slot];
                let id = connection_id(prerequisite_id, &dependent.node.id);
                let path = match self.cache.get(&id, now) {
                    Some(path) => path,
                    None => {
                        let path = build_path(
                            prerequisite,
                            dependent,
                            self.complexity,
                            zoom,
                            &self.connection_config,
                        );
                        self.cache.insert(id.clone(), path, now);
                        path
                    },
                };
                let is_highlighted = highlighted
                    .is_some_and(|h| h == prerequisite.node.id || h == dependent.node.id);
                connections.push(Connection {
                    id,
                    from_id: prerequisite.node.id.clone(),
                    to_id: dependent.node.id.clone(),
                    path,
                    is_active: dependent.node.status.researching,
                    is_satisfied: prerequisite.node.status.researched,
                    is_highlighted,
                    complexity: self.complexity,
                });
            }
        }

        prioritize_connections(connections, self.connection_config.max_rendered)
    }

    pub fn record_frame(&mut self) {
        self.sampler.record_frame();
    }

    /// Emit a performance sample if the sampling period has elapsed.
    pub fn tick(&mut self) -> Option<PerformanceMetrics> {
        let now = self.clock.now();
        let node_count = self.nodes.len();
        let visible = self.render_slots.len();
        self.sampler.tick(now, node_count, visible)
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.sampler.latest()
    }

    pub fn metrics_events(&self) -> Rc<EventBus<PerformanceMetrics>> {
        self.sampler.events()
    }
}

impl std::fmt::Debug for Virtualizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Virtualizer")
            .field("nodes", &self.nodes.len())
            .field("render_slots", &self.render_slots.len())
            .field("viewport", &self.viewport)
            .field("complexity", &self.complexity)
            .field("cached_connections", &self.cache.len())
            .finish()
    }
}
