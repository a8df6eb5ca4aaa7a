/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Prerequisite-graph validation.
//!
//! All checks are pure functions of the node list passed in. Traversals use
//! an explicit stack and a visited set, so already-cyclic input terminates
//! and deep chains do not consume call-stack depth.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use super::{Node, NodeId, index_by_id};
use crate::config::ValidationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Valid,
    Missing,
    SelfReference,
    Circular,
    ChainWarning,
    Deprecated,
    InvalidTier,
}

impl ReasonKind {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            ReasonKind::Missing
                | ReasonKind::SelfReference
                | ReasonKind::Circular
                | ReasonKind::InvalidTier
        )
    }

    pub fn is_warning(self) -> bool {
        matches!(self, ReasonKind::ChainWarning | ReasonKind::Deprecated)
    }
}

/// Outcome of checking one candidate prerequisite edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrerequisiteCheck {
    pub is_valid: bool,
    pub reason: ReasonKind,
    pub message: String,
}

impl PrerequisiteCheck {
    fn valid() -> Self {
        Self {
            is_valid: true,
            reason: ReasonKind::Valid,
            message: String::new(),
        }
    }

    pub(crate) fn invalid(reason: ReasonKind, message: String) -> Self {
        Self {
            is_valid: false,
            reason,
            message,
        }
    }

    fn warning(reason: ReasonKind, message: String) -> Self {
        Self {
            is_valid: true,
            reason,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub node_id: NodeId,
    pub prerequisite_id: Option<NodeId>,
    pub reason: ReasonKind,
    pub message: String,
}

/// Aggregated result of [`GraphValidator::validate_all`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub checked_pairs: usize,
    pub missing: usize,
    pub self_references: usize,
    pub circular: usize,
    pub chain_warnings: usize,
    pub deprecated_warnings: usize,
    pub invalid_tiers: usize,
    pub issues: Vec<ValidationIssue>,
    /// Sets of node ids that depend on each other in a loop, sorted.
    pub cycle_groups: Vec<Vec<NodeId>>,
}

impl ValidationSummary {
    pub fn error_count(&self) -> usize {
        self.missing + self.self_references + self.circular + self.invalid_tiers
    }

    pub fn warning_count(&self) -> usize {
        self.chain_warnings + self.deprecated_warnings
    }

    pub fn is_clean(&self) -> bool {
        self.error_count() == 0 && self.warning_count() == 0
    }

    fn record(&mut self, issue: ValidationIssue) {
        match issue.reason {
            ReasonKind::Valid => return,
            ReasonKind::Missing => self.missing += 1,
            ReasonKind::SelfReference => self.self_references += 1,
            ReasonKind::Circular => self.circular += 1,
            ReasonKind::ChainWarning => self.chain_warnings += 1,
            ReasonKind::Deprecated => self.deprecated_warnings += 1,
            ReasonKind::InvalidTier => self.invalid_tiers += 1,
        }
        self.issues.push(issue);
    }
}

/// A prerequisite that would sit in a higher tier than its dependent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConflict {
    pub prerequisite_id: NodeId,
    pub prerequisite_tier: u32,
    pub dependent_id: NodeId,
    pub dependent_tier: u32,
}

/// Read-only table of deprecated node ids and their replacements.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    deprecated: HashMap<NodeId, Option<NodeId>>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deprecated(mut self, id: impl Into<NodeId>, replacement: Option<&str>) -> Self {
        self.deprecated
            .insert(id.into(), replacement.map(str::to_string));
        self
    }

    /// `Some(replacement)` when `id` is deprecated.
    pub fn deprecation(&self, id: &str) -> Option<Option<&str>> {
        self.deprecated.get(id).map(|r| r.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphValidator {
    config: ValidationConfig,
    references: ReferenceTable,
}

impl GraphValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            references: ReferenceTable::default(),
        }
    }

    pub fn with_references(mut self, references: ReferenceTable) -> Self {
        self.references = references;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Would adding `candidate_prereq_id` as a prerequisite of `node_id`
    /// close a loop? True when the candidate already depends on `node_id`,
    /// directly or transitively, or when both ids are the same.
    pub fn has_cycle(&self, node_id: &str, candidate_prereq_id: &str, nodes: &[Node]) -> bool {
        let index = index_by_id(nodes);
        let mut visited = HashSet::new();
        reaches(&index, candidate_prereq_id, node_id, &mut visited)
    }

    pub fn validate_single_prerequisite(
        &self,
        node_id: &str,
        prereq_id: &str,
        nodes: &[Node],
    ) -> PrerequisiteCheck {
        let index = index_by_id(nodes);
        self.check_pair(&index, node_id, prereq_id)
    }

    /// Longest prerequisite chain below `node_id`, counted in edges.
    ///
    /// An edge back to a node already on the current path adds no depth, so
    /// cyclic input yields a finite length.
    pub fn chain_length(&self, node_id: &str, nodes: &[Node]) -> usize {
        let index = index_by_id(nodes);
        chain_length_indexed(&index, node_id)
    }

    pub fn validate_all(&self, nodes: &[Node]) -> ValidationSummary {
        let index = index_by_id(nodes);
        let mut summary = ValidationSummary::default();
        let mut seen = HashSet::new();

        for node in nodes {
            if !seen.insert(node.id.as_str()) {
                continue;
            }
            if node.tier == 0 {
                summary.record(ValidationIssue {
                    node_id: node.id.clone(),
                    prerequisite_id: None,
                    reason: ReasonKind::InvalidTier,
                    message: format!("'{}' has tier 0; tiers start at 1", node.id),
                });
            }
            for prereq_id in &node.prerequisites {
                summary.checked_pairs += 1;
                let check = self.check_pair(&index, &node.id, prereq_id);
                summary.record(ValidationIssue {
                    node_id: node.id.clone(),
                    prerequisite_id: Some(prereq_id.clone()),
                    reason: check.reason,
                    message: check.message,
                });
            }
        }

        summary.cycle_groups = cycle_groups(&index);
        summary
    }

    /// Nodes that could be added as prerequisites of `node_id`, nearest tier first.
    pub fn suggest_prerequisites(
        &self,
        node_id: &str,
        nodes: &[Node],
        max_results: usize,
    ) -> Vec<Node> {
        let index = index_by_id(nodes);
        let Some(target) = index.get(node_id) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut candidates: Vec<&Node> = nodes
            .iter()
            .filter(|candidate| seen.insert(candidate.id.as_str()))
            .filter(|candidate| candidate.id != node_id && !target.requires(&candidate.id))
            .filter(|candidate| self.check_pair(&index, node_id, &candidate.id).is_valid)
            .collect();

        candidates.sort_by(|a, b| {
            a.tier
                .abs_diff(target.tier)
                .cmp(&b.tier.abs_diff(target.tier))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates
            .into_iter()
            .take(max_results)
            .cloned()
            .collect()
    }

    /// Tier-order conflicts introduced by moving `node_id` to `new_tier`.
    pub fn tier_conflicts(&self, node_id: &str, new_tier: u32, nodes: &[Node]) -> Vec<TierConflict> {
        let index = index_by_id(nodes);
        let Some(node) = index.get(node_id) else {
            return Vec::new();
        };

        let mut conflicts = Vec::new();
        for prereq_id in &node.prerequisites {
            if let Some(prereq) = index.get(prereq_id.as_str())
                && prereq.id != node.id
                && prereq.tier > new_tier
            {
                conflicts.push(TierConflict {
                    prerequisite_id: prereq.id.clone(),
                    prerequisite_tier: prereq.tier,
                    dependent_id: node.id.clone(),
                    dependent_tier: new_tier,
                });
            }
        }
        for dependent in super::dependents_of(nodes, node_id) {
            if dependent.id != node.id && dependent.tier < new_tier {
                conflicts.push(TierConflict {
                    prerequisite_id: node.id.clone(),
                    prerequisite_tier: new_tier,
                    dependent_id: dependent.id.clone(),
                    dependent_tier: dependent.tier,
                });
            }
        }
        conflicts
    }

    fn check_pair(
        &self,
        index: &HashMap<&str, &Node>,
        node_id: &str,
        prereq_id: &str,
    ) -> PrerequisiteCheck {
        let Some(prereq) = index.get(prereq_id) else {
            return PrerequisiteCheck::invalid(
                ReasonKind::Missing,
                format!("prerequisite '{prereq_id}' of '{node_id}' does not exist"),
            );
        };

        if node_id == prereq_id {
            return PrerequisiteCheck::invalid(
                ReasonKind::SelfReference,
                format!("'{node_id}' cannot be its own prerequisite"),
            );
        }

        let mut visited = HashSet::new();
        if reaches(index, prereq_id, node_id, &mut visited) {
            return PrerequisiteCheck::invalid(
                ReasonKind::Circular,
                format!("'{prereq_id}' already depends on '{node_id}'"),
            );
        }

        let deprecation = match self.references.deprecation(prereq_id) {
            Some(replacement) => {
                let hint = replacement
                    .map(|r| format!("; use '{r}' instead"))
                    .unwrap_or_default();
                Some(format!("prerequisite '{prereq_id}' is deprecated{hint}"))
            },
            None if prereq.deprecated => Some(format!("prerequisite '{prereq_id}' is deprecated")),
            None => None,
        };

        // The chain advisory outranks deprecation; its message carries both.
        let depth = chain_length_indexed(index, prereq_id) + 1;
        if depth > self.config.max_chain_depth {
            let mut message = format!(
                "chain through '{prereq_id}' reaches depth {depth} (limit {})",
                self.config.max_chain_depth
            );
            if let Some(deprecation) = &deprecation {
                message.push_str("; ");
                message.push_str(deprecation);
            }
            return PrerequisiteCheck::warning(ReasonKind::ChainWarning, message);
        }

        if let Some(message) = deprecation {
            return PrerequisiteCheck::warning(ReasonKind::Deprecated, message);
        }

        PrerequisiteCheck::valid()
    }
}

/// Depth-first search along prerequisite edges from `from`, looking for `target`.
fn reaches<'a>(
    index: &HashMap<&'a str, &'a Node>,
    from: &'a str,
    target: &str,
    visited: &mut HashSet<&'a str>,
) -> bool {
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(node) = index.get(current) {
            stack.extend(
                node.prerequisites
                    .iter()
                    .map(String::as_str)
                    .filter(|p| !visited.contains(p)),
            );
        }
    }
    false
}

fn chain_length_indexed(index: &HashMap<&str, &Node>, start: &str) -> usize {
    let Some((&start, _)) = index.get_key_value(start) else {
        return 0;
    };

    // Finished nodes keep their depth; nodes on the current path are skipped.
    let mut depth: HashMap<&str, usize> = HashMap::new();
    let mut on_path: HashSet<&str> = HashSet::from([start]);
    let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

    while let Some(frame) = stack.last_mut() {
        let (id, next) = *frame;
        let prerequisites = &index[id].prerequisites;
        if next < prerequisites.len() {
            frame.1 += 1;
            let Some((&prereq, _)) = index.get_key_value(prerequisites[next].as_str()) else {
                continue;
            };
            if on_path.contains(prereq) || depth.contains_key(prereq) {
                continue;
            }
            on_path.insert(prereq);
            stack.push((prereq, 0));
        } else {
            let longest = prerequisites
                .iter()
                .filter_map(|p| depth.get(p.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(id, longest);
            on_path.remove(id);
            stack.pop();
        }
    }

    depth.get(start).copied().unwrap_or(0)
}

fn cycle_groups(index: &HashMap<&str, &Node>) -> Vec<Vec<NodeId>> {
    let mut ids: Vec<&str> = index.keys().copied().collect();
    ids.sort_unstable();

    let mut graph = DiGraph::<&str, ()>::with_capacity(ids.len(), 0);
    let positions: HashMap<&str, _> = ids.iter().map(|id| (*id, graph.add_node(*id))).collect();
    for id in &ids {
        for prereq in &index[id].prerequisites {
            if let Some(&to) = positions.get(prereq.as_str()) {
                graph.add_edge(positions[id], to, ());
            }
        }
    }

    let mut groups: Vec<Vec<NodeId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut group: Vec<NodeId> = component
                .into_iter()
                .map(|ix| graph[ix].to_string())
                .collect();
            group.sort();
            group
        })
        .collect();
    groups.sort();
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn chain_abc() -> Vec<Node> {
        vec![
            Node::new("A", "Alpha", 1),
            Node::new("B", "Beta", 2).with_prerequisites(["A"]),
            Node::new("C", "Gamma", 3).with_prerequisites(["B"]),
        ]
    }

    fn linear_chain(len: usize) -> Vec<Node> {
        (0..len)
            .map(|i| {
                let node = Node::new(format!("n{i}"), format!("Node {i}"), i as u32 + 1);
                if i == 0 {
                    node
                } else {
                    node.with_prerequisites([format!("n{}", i - 1)])
                }
            })
            .collect()
    }

    #[test]
    fn test_has_cycle_detects_transitive_dependency() {
        let validator = GraphValidator::default();
        let nodes = chain_abc();
        assert!(validator.has_cycle("A", "C", &nodes));
        assert!(!validator.has_cycle("C", "A", &nodes));
    }

    #[test]
    fn test_validate_reports_circular_when_prereq_depends_on_node() {
        let validator = GraphValidator::default();
        let check = validator.validate_single_prerequisite("A", "C", &chain_abc());
        assert!(!check.is_valid);
        assert_eq!(check.reason, ReasonKind::Circular);
    }

    #[test]
    fn test_validate_reports_self_reference() {
        let validator = GraphValidator::default();
        let nodes = vec![Node::new("X", "X-ray", 1)];
        let check = validator.validate_single_prerequisite("X", "X", &nodes);
        assert!(!check.is_valid);
        assert_eq!(check.reason, ReasonKind::SelfReference);
    }

    #[test]
    fn test_validate_reports_missing_before_other_checks() {
        let validator = GraphValidator::default();
        let check = validator.validate_single_prerequisite("A", "ghost", &chain_abc());
        assert!(!check.is_valid);
        assert_eq!(check.reason, ReasonKind::Missing);
    }

    #[test]
    fn test_has_cycle_terminates_on_already_cyclic_input() {
        let validator = GraphValidator::default();
        let nodes = vec![
            Node::new("A", "A", 1).with_prerequisites(["B"]),
            Node::new("B", "B", 1).with_prerequisites(["A"]),
            Node::new("C", "C", 1),
        ];
        assert!(!validator.has_cycle("C", "A", &nodes));
        assert!(validator.has_cycle("A", "B", &nodes));
    }

    #[rstest]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(4, 3)]
    fn test_chain_length_counts_edges(#[case] len: usize, #[case] expected: usize) {
        let validator = GraphValidator::default();
        let nodes = linear_chain(len);
        let last = format!("n{}", len - 1);
        assert_eq!(validator.chain_length(&last, &nodes), expected);
    }

    #[test]
    fn test_chain_length_takes_longest_branch_in_diamond() {
        let validator = GraphValidator::default();
        let nodes = vec![
            Node::new("root", "root", 1),
            Node::new("left", "left", 2).with_prerequisites(["root"]),
            Node::new("mid", "mid", 2).with_prerequisites(["root"]),
            Node::new("right", "right", 3).with_prerequisites(["mid"]),
            Node::new("top", "top", 4).with_prerequisites(["left", "right"]),
        ];
        assert_eq!(validator.chain_length("top", &nodes), 3);
    }

    #[test]
    fn test_chain_length_is_finite_on_cycle() {
        let validator = GraphValidator::default();
        let nodes = vec![
            Node::new("A", "A", 1).with_prerequisites(["B"]),
            Node::new("B", "B", 1).with_prerequisites(["C"]),
            Node::new("C", "C", 1).with_prerequisites(["A"]),
        ];
        assert_eq!(validator.chain_length("A", &nodes), 2);
    }

    #[test]
    fn test_chain_length_of_unknown_node_is_zero() {
        let validator = GraphValidator::default();
        assert_eq!(validator.chain_length("nope", &chain_abc()), 0);
    }

    #[test]
    fn test_long_chain_is_valid_with_warning() {
        let validator = GraphValidator::new(ValidationConfig { max_chain_depth: 5 });
        let mut nodes = linear_chain(6);
        nodes.push(Node::new("tip", "Tip", 7));

        let check = validator.validate_single_prerequisite("tip", "n5", &nodes);

        assert!(check.is_valid);
        assert_eq!(check.reason, ReasonKind::ChainWarning);
        assert!(check.message.contains("depth 6"));
    }

    #[test]
    fn test_deprecated_reference_is_advisory() {
        let validator = GraphValidator::default()
            .with_references(ReferenceTable::new().with_deprecated("A", Some("A2")));
        let mut nodes = chain_abc();
        nodes.push(Node::new("D", "Delta", 2));

        let check = validator.validate_single_prerequisite("D", "A", &nodes);

        assert!(check.is_valid);
        assert_eq!(check.reason, ReasonKind::Deprecated);
        assert!(check.message.contains("'A2'"));
    }

    #[test]
    fn test_long_chain_through_deprecated_prerequisite_warns_about_chain() {
        let mut nodes = linear_chain(6);
        nodes[5].deprecated = true;
        nodes.push(Node::new("tail", "Tail", 7));
        let validator = GraphValidator::default();

        let check = validator.validate_single_prerequisite("tail", "n5", &nodes);

        assert!(check.is_valid);
        assert_eq!(check.reason, ReasonKind::ChainWarning);
        assert!(check.message.contains("is deprecated"));
    }

    #[test]
    fn test_validate_all_aggregates_by_reason() {
        let validator = GraphValidator::default();
        let nodes = vec![
            Node::new("A", "A", 1).with_prerequisites(["B"]),
            Node::new("B", "B", 2).with_prerequisites(["A"]),
            Node::new("S", "S", 1).with_prerequisites(["S"]),
            Node::new("M", "M", 0).with_prerequisites(["ghost"]),
            Node::new("ok", "ok", 2).with_prerequisites(["M"]),
        ];

        let summary = validator.validate_all(&nodes);

        assert_eq!(summary.checked_pairs, 5);
        assert_eq!(summary.circular, 2);
        assert_eq!(summary.self_references, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.invalid_tiers, 1);
        assert_eq!(summary.error_count(), 5);
        assert_eq!(
            summary.cycle_groups,
            vec![vec!["A".to_string(), "B".to_string()]]
        );
    }

    #[test]
    fn test_validate_all_on_clean_tree() {
        let summary = GraphValidator::default().validate_all(&chain_abc());
        assert!(summary.is_clean());
        assert_eq!(summary.checked_pairs, 2);
        assert!(summary.cycle_groups.is_empty());
    }

    #[test]
    fn test_suggestions_rank_by_tier_distance_then_name() {
        let validator = GraphValidator::default();
        let nodes = vec![
            Node::new("target", "Target", 3).with_prerequisites(["have"]),
            Node::new("have", "Have", 2),
            Node::new("far", "Aardvark", 1),
            Node::new("near_b", "Bravo", 2),
            Node::new("near_a", "Alpha", 4),
            Node::new("dependent", "Dependent", 4).with_prerequisites(["target"]),
        ];

        let suggestions = validator.suggest_prerequisites("target", &nodes, 10);
        let ids: Vec<&str> = suggestions.iter().map(|n| n.id.as_str()).collect();

        assert_eq!(ids, vec!["near_a", "near_b", "far"]);
    }

    #[test]
    fn test_suggestions_respect_max_results() {
        let validator = GraphValidator::default();
        let mut nodes = linear_chain(1);
        nodes.extend((0..5).map(|i| Node::new(format!("c{i}"), format!("C{i}"), 1)));
        assert_eq!(validator.suggest_prerequisites("n0", &nodes, 2).len(), 2);
        assert!(validator.suggest_prerequisites("unknown", &nodes, 2).is_empty());
    }

    #[test]
    fn test_tier_conflicts_cover_prerequisites_and_dependents() {
        let validator = GraphValidator::default();
        let nodes = chain_abc();

        let lowered = validator.tier_conflicts("B", 0, &nodes);
        assert_eq!(lowered.len(), 1);
        assert_eq!(lowered[0].prerequisite_id, "A");

        let raised = validator.tier_conflicts("B", 4, &nodes);
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].dependent_id, "C");

        assert!(validator.tier_conflicts("B", 2, &nodes).is_empty());
    }
}
