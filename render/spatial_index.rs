/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Spatial index over laid-out node bounds.
//!
//! Visibility culling and pointer hit-testing use R*-tree envelope queries
//! instead of a full O(n) scan of the layout. Entries are keyed by their
//! slot in the virtualizer's layout vector.

use euclid::default::{Box2D, Point2D};
use rstar::{AABB, RTree, RTreeObject};

struct IndexedBounds {
    envelope: AABB<[f32; 2]>,
    slot: usize,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn aabb(rect: &Box2D<f32>) -> AABB<[f32; 2]> {
    AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y])
}

pub(crate) struct NodeSpatialIndex {
    tree: RTree<IndexedBounds>,
}

impl NodeSpatialIndex {
    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build the index from `(slot, bounds)` pairs.
    pub fn build(entries: impl Iterator<Item = (usize, Box2D<f32>)>) -> Self {
        let entries: Vec<_> = entries
            .map(|(slot, bounds)| IndexedBounds {
                envelope: aabb(&bounds),
                slot,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Slots whose bounds touch or overlap `rect`, in ascending slot order.
    pub fn slots_in_rect(&self, rect: &Box2D<f32>) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&aabb(rect))
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Slots whose bounds contain `point`.
    pub fn slots_at_point(&self, point: Point2D<f32>) -> Vec<usize> {
        self.slots_in_rect(&Box2D::new(point, point))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }
}
