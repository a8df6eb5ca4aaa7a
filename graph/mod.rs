/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tech-tree data model.
//!
//! Core structures:
//! - `Node`: a tree entry with tier, canvas position and ordered prerequisites
//! - `NodeStatus`: research progress flags
//! - `NodeChanges`: partial update applied through the state store
//!
//! Edges are never stored; they are derived from `Node::prerequisites`.

use std::collections::HashMap;

use euclid::default::Point2D;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod validator;

/// Stable node identity.
pub type NodeId = String;

/// Research progress flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    pub unlocked: bool,
    pub discovered: bool,
    pub researching: bool,
    pub researched: bool,
}

/// A node in the tech tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// Display name; also the secondary layout key inside a tier.
    #[serde(default)]
    pub name: String,

    /// Horizontal band, starting at 1.
    pub tier: u32,

    /// Position in canvas space.
    #[serde(default = "origin")]
    pub position: Point2D<f32>,

    /// Ids of the nodes this one depends on, in authoring order.
    #[serde(default)]
    pub prerequisites: Vec<NodeId>,

    #[serde(default)]
    pub status: NodeStatus,

    /// Marked for replacement; references to it draw an advisory warning.
    #[serde(default)]
    pub deprecated: bool,
}

fn origin() -> Point2D<f32> {
    Point2D::origin()
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, tier: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier,
            position: origin(),
            prerequisites: Vec::new(),
            status: NodeStatus::default(),
            deprecated: false,
        }
    }

    /// New node with a freshly generated id.
    pub fn with_generated_id(name: impl Into<String>, tier: u32) -> Self {
        Self::new(Uuid::new_v4().to_string(), name, tier)
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Point2D::new(x, y);
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn requires(&self, id: &str) -> bool {
        self.prerequisites.iter().any(|p| p == id)
    }
}

/// Partial node update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChanges {
    pub name: Option<String>,
    pub tier: Option<u32>,
    pub position: Option<Point2D<f32>>,
    pub prerequisites: Option<Vec<NodeId>>,
    pub status: Option<NodeStatus>,
    pub deprecated: Option<bool>,
}

impl NodeChanges {
    pub fn tier(tier: u32) -> Self {
        Self {
            tier: Some(tier),
            ..Self::default()
        }
    }

    pub fn position(position: Point2D<f32>) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Point2D<f32>) -> Self {
        self.position = Some(position);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when the change moves the node to a different tier.
    pub fn is_structural_for(&self, node: &Node) -> bool {
        self.tier.is_some_and(|tier| tier != node.tier)
    }

    pub fn apply_to(&self, node: &mut Node) {
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        if let Some(tier) = self.tier {
            node.tier = tier;
        }
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(prerequisites) = &self.prerequisites {
            node.prerequisites = prerequisites.clone();
        }
        if let Some(status) = self.status {
            node.status = status;
        }
        if let Some(deprecated) = self.deprecated {
            node.deprecated = deprecated;
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeListDocument {
    List(Vec<Node>),
    Wrapped { nodes: Vec<Node> },
}

/// Parse a JSON node list, either a bare array or an object with a `nodes`
/// array (which covers editor snapshots).
pub fn parse_node_list(json: &str) -> Result<Vec<Node>, serde_json::Error> {
    match serde_json::from_str(json)? {
        NodeListDocument::List(nodes) | NodeListDocument::Wrapped { nodes } => Ok(nodes),
    }
}

pub fn find_node<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    nodes.iter().find(|node| node.id == id)
}

/// Id lookup over a node list. The first occurrence of a duplicated id wins.
pub(crate) fn index_by_id(nodes: &[Node]) -> HashMap<&str, &Node> {
    let mut index = HashMap::with_capacity(nodes.len());
    for node in nodes {
        index.entry(node.id.as_str()).or_insert(node);
    }
    index
}

/// Nodes listing `id` among their prerequisites.
pub fn dependents_of<'a>(nodes: &'a [Node], id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
    nodes.iter().filter(move |node| node.requires(id))
}
