/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Keyboard navigation over the laid-out tree.
//!
//! The neighbor graph is derived from the layout: left/right move within a
//! tier, up/down jump to the horizontally nearest node of the adjacent
//! populated tier. It is rebuilt whenever the node list changes.

use std::collections::{BTreeMap, HashMap};

use crate::config::NavigationMode;
use crate::graph::NodeId;
use crate::render::VirtualNode;

/// Keys the canvas responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Tab,
    ShiftTab,
    /// Select the focused node.
    Enter,
    /// Clear the selection, or cancel a drag in progress.
    Escape,
    ZoomIn,
    ZoomOut,
    ZoomReset,
}

impl NavKey {
    pub fn direction(self) -> Option<Direction> {
        match self {
            NavKey::Up => Some(Direction::Up),
            NavKey::Down => Some(Direction::Down),
            NavKey::Left => Some(Direction::Left),
            NavKey::Right => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub up: Option<NodeId>,
    pub down: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl Neighbors {
    pub fn get(&self, direction: Direction) -> Option<&NodeId> {
        match direction {
            Direction::Up => self.up.as_ref(),
            Direction::Down => self.down.as_ref(),
            Direction::Left => self.left.as_ref(),
            Direction::Right => self.right.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NeighborGraph {
    neighbors: HashMap<NodeId, Neighbors>,
    /// Layout order: tier, then name.
    linear: Vec<NodeId>,
    /// Stored canvas positions, top to bottom then left to right.
    spatial: Vec<NodeId>,
}

impl NeighborGraph {
    pub fn build(nodes: &[VirtualNode]) -> Self {
        let mut rows: BTreeMap<u32, Vec<&VirtualNode>> = BTreeMap::new();
        for virtual_node in nodes {
            rows.entry(virtual_node.node.tier).or_default().push(virtual_node);
        }
        for row in rows.values_mut() {
            row.sort_by(|a, b| a.x.total_cmp(&b.x));
        }
        let tiers: Vec<u32> = rows.keys().copied().collect();

        let mut neighbors = HashMap::with_capacity(nodes.len());
        for (position, tier) in tiers.iter().enumerate() {
            let Some(row) = rows.get(tier) else {
                continue;
            };
            let above = position
                .checked_sub(1)
                .and_then(|i| tiers.get(i))
                .and_then(|t| rows.get(t));
            let below = tiers.get(position + 1).and_then(|t| rows.get(t));

            for (i, virtual_node) in row.iter().enumerate() {
                let center_x = virtual_node.center().x;
                let entry = Neighbors {
                    up: above.and_then(|row| nearest_by_x(row, center_x)),
                    down: below.and_then(|row| nearest_by_x(row, center_x)),
                    left: i.checked_sub(1).and_then(|j| row.get(j)).map(|v| v.node.id.clone()),
                    right: row.get(i + 1).map(|v| v.node.id.clone()),
                };
                neighbors.entry(virtual_node.node.id.clone()).or_insert(entry);
            }
        }

        let linear: Vec<NodeId> = nodes.iter().map(|v| v.node.id.clone()).collect();
        let mut by_position: Vec<&VirtualNode> = nodes.iter().collect();
        by_position.sort_by(|a, b| {
            a.node
                .position
                .y
                .total_cmp(&b.node.position.y)
                .then_with(|| a.node.position.x.total_cmp(&b.node.position.x))
                .then_with(|| a.node.id.cmp(&b.node.id))
        });
        let spatial = by_position.into_iter().map(|v| v.node.id.clone()).collect();

        Self {
            neighbors,
            linear,
            spatial,
        }
    }

    pub fn neighbors(&self, id: &str) -> Option<&Neighbors> {
        self.neighbors.get(id)
    }

    pub fn step(&self, from: &str, direction: Direction) -> Option<&NodeId> {
        self.neighbors.get(from).and_then(|n| n.get(direction))
    }

    pub fn order(&self, mode: NavigationMode) -> &[NodeId] {
        match mode {
            NavigationMode::Linear => &self.linear,
            NavigationMode::Spatial => &self.spatial,
        }
    }

    /// Next (or previous) node in tab order, wrapping around. With nothing
    /// focused, starts at the first (or last) node.
    pub fn tab(&self, from: Option<&str>, mode: NavigationMode, backwards: bool) -> Option<&NodeId> {
        let order = self.order(mode);
        if order.is_empty() {
            return None;
        }
        let current = from.and_then(|id| order.iter().position(|candidate| candidate == id));
        let next = match (current, backwards) {
            (None, false) => 0,
            (None, true) => order.len() - 1,
            (Some(i), false) => (i + 1) % order.len(),
            (Some(i), true) => (i + order.len() - 1) % order.len(),
        };
        order.get(next)
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty()
    }
}

fn nearest_by_x(row: &[&VirtualNode], x: f32) -> Option<NodeId> {
    row.iter()
        .min_by(|a, b| (a.center().x - x).abs().total_cmp(&(b.center().x - x).abs()))
        .map(|v| v.node.id.clone())
}
