/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Connection geometry, zoom-driven complexity and the path cache.
//!
//! Connections are derived from prerequisite lists and never persisted.
//! Path fidelity is picked from the current zoom: straight lines when zoomed
//! far out, a single quadratic curve in the middle range, and cubic curves
//! with lane separation when zoomed in enough to read crossing edges.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use euclid::default::{Point2D, Vector2D};
use serde::{Deserialize, Serialize};

use super::VirtualNode;
use crate::config::{ComplexityThresholds, ConnectionConfig};
use crate::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    /// Straight line.
    Simple,
    /// One quadratic curve through an offset midpoint.
    Routed,
    /// Cubic curve with separated control points.
    Full,
}

impl ComplexityTier {
    pub fn for_zoom(zoom: f32, thresholds: &ComplexityThresholds) -> Self {
        if zoom < thresholds.simple {
            ComplexityTier::Simple
        } else if zoom < thresholds.routed {
            ComplexityTier::Routed
        } else {
            ComplexityTier::Full
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathGeometry {
    Line {
        from: Point2D<f32>,
        to: Point2D<f32>,
    },
    Quadratic {
        from: Point2D<f32>,
        control: Point2D<f32>,
        to: Point2D<f32>,
    },
    Cubic {
        from: Point2D<f32>,
        control1: Point2D<f32>,
        control2: Point2D<f32>,
        to: Point2D<f32>,
    },
}

impl PathGeometry {
    pub fn start(&self) -> Point2D<f32> {
        match *self {
            PathGeometry::Line { from, .. }
            | PathGeometry::Quadratic { from, .. }
            | PathGeometry::Cubic { from, .. } => from,
        }
    }

    pub fn end(&self) -> Point2D<f32> {
        match *self {
            PathGeometry::Line { to, .. }
            | PathGeometry::Quadratic { to, .. }
            | PathGeometry::Cubic { to, .. } => to,
        }
    }

    /// SVG path data (`d` attribute) for this geometry.
    pub fn to_svg_path(&self) -> String {
        let mut d = String::new();
        let start = self.start();
        let _ = write!(d, "M {} {}", start.x, start.y);
        let _ = match *self {
            PathGeometry::Line { to, .. } => write!(d, " L {} {}", to.x, to.y),
            PathGeometry::Quadratic { control, to, .. } => {
                write!(d, " Q {} {} {} {}", control.x, control.y, to.x, to.y)
            },
            PathGeometry::Cubic {
                control1,
                control2,
                to,
                ..
            } => write!(
                d,
                " C {} {} {} {} {} {}",
                control1.x, control1.y, control2.x, control2.y, to.x, to.y
            ),
        };
        d
    }
}

/// A rendered prerequisite edge, from prerequisite to dependent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub path: PathGeometry,
    /// The dependent is being researched.
    pub is_active: bool,
    /// The prerequisite has been researched.
    pub is_satisfied: bool,
    /// One endpoint is the highlighted node.
    pub is_highlighted: bool,
    pub complexity: ComplexityTier,
}

pub fn connection_id(from_id: &str, to_id: &str) -> String {
    format!("{from_id}->{to_id}")
}

/// Geometry from the bottom of `from` to the top of `to`.
pub fn build_path(
    from: &VirtualNode,
    to: &VirtualNode,
    complexity: ComplexityTier,
    zoom: f32,
    config: &ConnectionConfig,
) -> PathGeometry {
    let start = from.bottom_center();
    let end = to.top_center();
    match complexity {
        ComplexityTier::Simple => PathGeometry::Line {
            from: start,
            to: end,
        },
        ComplexityTier::Routed => {
            let delta = end - start;
            let normal = perpendicular(delta);
            let control = start.lerp(end, 0.5) + normal * (delta.length() * config.curve_offset_ratio);
            PathGeometry::Quadratic {
                from: start,
                control,
                to: end,
            }
        },
        ComplexityTier::Full => {
            let fidelity = (zoom / config.thresholds.full.max(f32::EPSILON)).min(1.0);
            let lane = lane_for(&from.node.id, &to.node.id) * config.lane_separation * fidelity;
            let bend = (end.y - start.y).abs().max(1.0) * 0.5;
            PathGeometry::Cubic {
                from: start,
                control1: Point2D::new(start.x + lane, start.y + bend),
                control2: Point2D::new(end.x + lane, end.y - bend),
                to: end,
            }
        },
    }
}

fn perpendicular(v: Vector2D<f32>) -> Vector2D<f32> {
    let length = v.length();
    if length <= f32::EPSILON {
        return Vector2D::zero();
    }
    Vector2D::new(-v.y / length, v.x / length)
}

/// Deterministic lateral lane in {-1, 0, 1} so parallel edges fan out.
fn lane_for(from_id: &str, to_id: &str) -> f32 {
    // FNV-1a; stable across runs unlike the std hasher.
    let mut hash: u32 = 0x811c_9dc5;
    for byte in from_id.bytes().chain([0u8]).chain(to_id.bytes()) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    (hash % 3) as f32 - 1.0
}

/// Keep at most `cap` connections, preferring highlighted, then active, then
/// satisfied edges. Everything else is dropped once the cap is exceeded.
pub fn prioritize_connections(connections: Vec<Connection>, cap: usize) -> Vec<Connection> {
    if connections.len() <= cap {
        return connections;
    }

    let total = connections.len();
    let mut highlighted = Vec::new();
    let mut active = Vec::new();
    let mut satisfied = Vec::new();
    for connection in connections {
        if connection.is_highlighted {
            highlighted.push(connection);
        } else if connection.is_active {
            active.push(connection);
        } else if connection.is_satisfied {
            satisfied.push(connection);
        }
    }

    let mut kept = highlighted;
    kept.append(&mut active);
    kept.append(&mut satisfied);
    kept.truncate(cap);
    log::debug!(
        "connection cap {cap} exceeded: keeping {} of {total}",
        kept.len()
    );
    kept
}

#[derive(Debug, Clone)]
struct CachedPath {
    path: PathGeometry,
    cached_at: Instant,
}

/// Time-bounded cache of generated connection geometry.
#[derive(Debug, Clone)]
pub struct ConnectionCache {
    entries: HashMap<String, CachedPath>,
    ttl: Duration,
    prune_age: Duration,
    high_water_mark: usize,
}

impl ConnectionCache {
    pub fn new(ttl: Duration, prune_age: Duration, high_water_mark: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            prune_age,
            high_water_mark,
        }
    }

    /// Cached geometry younger than the TTL; older entries read as a miss.
    pub fn get(&self, id: &str, now: Instant) -> Option<PathGeometry> {
        self.entries
            .get(id)
            .filter(|entry| now.saturating_duration_since(entry.cached_at) < self.ttl)
            .map(|entry| entry.path)
    }

    pub fn insert(&mut self, id: impl Into<String>, path: PathGeometry, now: Instant) {
        self.entries.insert(
            id.into(),
            CachedPath {
                path,
                cached_at: now,
            },
        );
        if self.entries.len() > self.high_water_mark {
            self.prune(now);
        }
    }

    /// Drop entries older than the prune age.
    pub fn prune(&mut self, now: Instant) {
        let prune_age = self.prune_age;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.cached_at) < prune_age);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use rstest::rstest;

    fn virtual_node(id: &str, x: f32, y: f32) -> VirtualNode {
        VirtualNode {
            node: Node::new(id, id, 1),
            x,
            y,
            width: 120.0,
            height: 80.0,
            is_visible: true,
            is_in_render_bounds: true,
        }
    }

    fn connection(id: &str, highlighted: bool, active: bool, satisfied: bool) -> Connection {
        let point = Point2D::new(0.0, 0.0);
        Connection {
            id: id.to_string(),
            from_id: "from".to_string(),
            to_id: id.to_string(),
            path: PathGeometry::Line {
                from: point,
                to: point,
            },
            is_active: active,
            is_satisfied: satisfied,
            is_highlighted: highlighted,
            complexity: ComplexityTier::Simple,
        }
    }

    fn line() -> PathGeometry {
        PathGeometry::Line {
            from: Point2D::new(0.0, 0.0),
            to: Point2D::new(1.0, 1.0),
        }
    }

    #[rstest]
    #[case(0.2, ComplexityTier::Simple)]
    #[case(0.5, ComplexityTier::Routed)]
    #[case(0.99, ComplexityTier::Routed)]
    #[case(1.0, ComplexityTier::Full)]
    #[case(2.5, ComplexityTier::Full)]
    fn test_complexity_follows_zoom_thresholds(#[case] zoom: f32, #[case] expected: ComplexityTier) {
        assert_eq!(
            ComplexityTier::for_zoom(zoom, &ComplexityThresholds::default()),
            expected
        );
    }

    #[test]
    fn test_build_path_anchors_bottom_of_prereq_to_top_of_dependent() {
        let from = virtual_node("a", 0.0, 0.0);
        let to = virtual_node("b", 200.0, 150.0);
        let config = ConnectionConfig::default();

        for tier in [
            ComplexityTier::Simple,
            ComplexityTier::Routed,
            ComplexityTier::Full,
        ] {
            let path = build_path(&from, &to, tier, 1.0, &config);
            assert_eq!(path.start(), Point2D::new(60.0, 80.0));
            assert_eq!(path.end(), Point2D::new(260.0, 150.0));
        }
    }

    #[test]
    fn test_build_path_shape_matches_tier() {
        let from = virtual_node("a", 0.0, 0.0);
        let to = virtual_node("b", 0.0, 300.0);
        let config = ConnectionConfig::default();

        assert!(matches!(
            build_path(&from, &to, ComplexityTier::Simple, 0.1, &config),
            PathGeometry::Line { .. }
        ));
        let PathGeometry::Quadratic { control, .. } =
            build_path(&from, &to, ComplexityTier::Routed, 0.7, &config)
        else {
            panic!("expected quadratic");
        };
        // Vertical edge: the control point is pushed sideways.
        assert_ne!(control.x, 60.0);
        assert!(matches!(
            build_path(&from, &to, ComplexityTier::Full, 2.0, &config),
            PathGeometry::Cubic { .. }
        ));
    }

    #[test]
    fn test_svg_path_serialization() {
        let path = PathGeometry::Quadratic {
            from: Point2D::new(0.0, 0.0),
            control: Point2D::new(5.0, 10.0),
            to: Point2D::new(10.0, 20.0),
        };
        assert_eq!(path.to_svg_path(), "M 0 0 Q 5 10 10 20");
    }

    #[test]
    fn test_lane_is_deterministic() {
        assert_eq!(lane_for("a", "b"), lane_for("a", "b"));
        assert!((-1.0..=1.0).contains(&lane_for("x", "y")));
    }

    #[test]
    fn test_prioritize_keeps_everything_under_cap() {
        let connections = vec![connection("1", false, false, false); 3];
        assert_eq!(prioritize_connections(connections, 3).len(), 3);
    }

    #[test]
    fn test_prioritize_orders_highlight_active_satisfied_and_drops_rest() {
        let connections = vec![
            connection("plain", false, false, false),
            connection("sat", false, false, true),
            connection("act", false, true, false),
            connection("hl", true, false, false),
            connection("sat2", false, false, true),
        ];

        let kept = prioritize_connections(connections, 4);
        let ids: Vec<&str> = kept.iter().map(|c| c.id.as_str()).collect();

        assert_eq!(ids, vec!["hl", "act", "sat", "sat2"]);
    }

    #[test]
    fn test_prioritize_truncates_to_cap() {
        let connections = vec![
            connection("hl", true, false, false),
            connection("act", false, true, false),
            connection("sat", false, false, true),
        ];
        let kept = prioritize_connections(connections, 2);
        let ids: Vec<&str> = kept.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["hl", "act"]);
    }

    #[test]
    fn test_cache_hit_then_miss_after_ttl() {
        let start = Instant::now();
        let mut cache = ConnectionCache::new(
            Duration::from_millis(5_000),
            Duration::from_millis(10_000),
            1_000,
        );
        cache.insert("a->b", line(), start);

        assert_eq!(cache.get("a->b", start), Some(line()));
        assert_eq!(
            cache.get("a->b", start + Duration::from_millis(4_999)),
            Some(line())
        );
        assert_eq!(cache.get("a->b", start + Duration::from_millis(5_001)), None);
    }

    #[test]
    fn test_cache_prunes_old_entries_past_high_water_mark() {
        let start = Instant::now();
        let mut cache = ConnectionCache::new(
            Duration::from_millis(5_000),
            Duration::from_millis(10_000),
            2,
        );
        cache.insert("old-1", line(), start);
        cache.insert("old-2", line(), start);
        assert_eq!(cache.len(), 2);

        let later = start + Duration::from_millis(11_000);
        cache.insert("fresh", line(), later);

        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh", later).is_some());
    }
}
