/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Drag gestures: snapping, drop zones and the drag session baseline.

use std::collections::BTreeMap;

use euclid::default::{Point2D, Vector2D};

use crate::config::{CanvasConfig, Spacing};
use crate::graph::NodeId;
use crate::render::VirtualNode;

/// A slot a dragged node can land in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropZone {
    pub tier: u32,
    pub slot: usize,
    pub position: Point2D<f32>,
}

/// Tier whose row is nearest to canvas `y`. Tiers start at 1.
pub fn tier_for_y(y: f32, spacing_y: f32) -> u32 {
    if spacing_y <= 0.0 {
        return 1;
    }
    let row = (y / spacing_y).round();
    if row <= 0.0 { 1 } else { (row as u32).saturating_add(1) }
}

pub fn tier_row_y(tier: u32, spacing_y: f32) -> f32 {
    tier.saturating_sub(1) as f32 * spacing_y
}

pub fn snap_to_grid(position: Point2D<f32>, grid_size: f32) -> Point2D<f32> {
    if grid_size <= 0.0 {
        return position;
    }
    Point2D::new(
        (position.x / grid_size).round() * grid_size,
        (position.y / grid_size).round() * grid_size,
    )
}

/// Grid snap first, then tier snap, which overrides the grid-snapped `y`.
/// Returns the snapped position and, when tier snapping is on, the tier the
/// position falls in.
pub fn snap_position(
    candidate: Point2D<f32>,
    config: &CanvasConfig,
    spacing: Spacing,
) -> (Point2D<f32>, Option<u32>) {
    let mut position = candidate;
    if config.snap_to_grid {
        position = snap_to_grid(position, config.grid_size);
    }
    if config.snap_to_tier {
        let tier = tier_for_y(candidate.y, spacing.y);
        position.y = tier_row_y(tier, spacing.y);
        return (position, Some(tier));
    }
    (position, None)
}

/// Landing slots for `dragged`: one per remaining member of each populated
/// tier plus a trailing slot, an empty tier below the last one, and the
/// `target_tier` row when it has no slots of its own.
pub fn drop_zones(
    nodes: &[VirtualNode],
    dragged: &str,
    target_tier: Option<u32>,
    spacing: Spacing,
) -> Vec<DropZone> {
    let mut members: BTreeMap<u32, usize> = BTreeMap::new();
    for virtual_node in nodes {
        let count = members.entry(virtual_node.node.tier).or_default();
        if virtual_node.id() != dragged {
            *count += 1;
        }
    }
    let next_tier = members.keys().next_back().map_or(1, |&tier| tier.saturating_add(1));
    members.entry(next_tier).or_default();
    if let Some(tier) = target_tier {
        members.entry(tier.max(1)).or_default();
    }

    let mut zones = Vec::new();
    for (&tier, &count) in &members {
        let y = tier_row_y(tier, spacing.y);
        for slot in 0..=count {
            zones.push(DropZone {
                tier,
                slot,
                position: Point2D::new(slot as f32 * spacing.x, y),
            });
        }
    }
    zones
}

/// Closest zone to `position` and its distance, searching `preferred_tier`
/// first when it has any zones. Ties go to the earlier zone.
pub fn nearest_zone(
    zones: &[DropZone],
    position: Point2D<f32>,
    preferred_tier: Option<u32>,
) -> Option<(DropZone, f32)> {
    let in_tier = |zone: &&DropZone| preferred_tier.is_none_or(|tier| zone.tier == tier);
    let restrict = zones.iter().any(|zone| in_tier(&zone));

    let mut best: Option<(DropZone, f32)> = None;
    for zone in zones.iter().filter(|zone| !restrict || in_tier(zone)) {
        let distance = (zone.position - position).length();
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((*zone, distance));
        }
    }
    best
}

/// State captured at drag start; the undo baseline for the gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub node_id: NodeId,
    pub origin_tier: u32,
    pub origin_position: Point2D<f32>,
    /// Layout box origin of the node when the drag started.
    pub start_canvas: Point2D<f32>,
    /// Pointer position when the drag started, in screen units.
    pub start_pointer: Point2D<f32>,
    pub last_preview: Option<DragPreview>,
}

impl DragSession {
    pub fn new(
        node: &VirtualNode,
        start_pointer: Point2D<f32>,
    ) -> Self {
        Self {
            node_id: node.node.id.clone(),
            origin_tier: node.node.tier,
            origin_position: node.node.position,
            start_canvas: Point2D::new(node.x, node.y),
            start_pointer,
            last_preview: None,
        }
    }

    /// Unsnapped canvas position for `pointer`, at `zoom`.
    pub fn candidate(&self, pointer: Point2D<f32>, zoom: f32) -> Point2D<f32> {
        let delta: Vector2D<f32> = (pointer - self.start_pointer) / zoom.max(f32::EPSILON);
        self.start_canvas + delta
    }
}

/// Where a drag would land if released now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPreview {
    pub position: Point2D<f32>,
    pub target_tier: u32,
    pub zone: Option<DropZone>,
    /// Within the snap threshold of `zone`. Invalid drops still resolve to
    /// `zone` on release.
    pub is_valid: bool,
}

/// Result of releasing a drag.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Same tier; position committed.
    Moved {
        node_id: NodeId,
        position: Point2D<f32>,
    },
    /// Tier change applied without confirmation.
    Retiered {
        node_id: NodeId,
        from_tier: u32,
        to_tier: u32,
    },
    /// Tier change queued until confirmed or rejected.
    PendingConfirmation { index: usize },
    /// No drag in progress, or the dragged node no longer exists.
    Ignored,
}
