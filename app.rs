/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Editor state and the store every surface reads and writes through.
//!
//! `StateStore` owns the only mutable `EditorState`. Mutations go through its
//! patch and node APIs; each one bumps a revision, persists a snapshot to the
//! injected `SnapshotStore`, and publishes a `StateChangeEvent`. Validation
//! and desync checks are deferred to debounced deadlines that the host drives
//! by calling `tick()`.
//!
//! Two orthogonal status axes live in the state:
//! - workflow: clean -> (mutation) -> dirty -> (`mark_saved`) -> clean
//! - sync: synchronized -> (desync detected) -> desynchronized -> (recovery) -> synchronized

use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::graph::validator::{GraphValidator, PrerequisiteCheck, ReasonKind, ValidationSummary};
use crate::graph::{Node, NodeChanges, NodeId, find_node};
use crate::persistence::{
    MemorySnapshotStore, SNAPSHOT_KEY, SnapshotStore, encode_snapshot, load_editor_state,
};
use crate::services::{Debouncer, EventBus, IntervalTimer, SharedClock, SystemClock};

/// Transient errors kept for display; older entries are dropped.
const MAX_TRANSIENT_ERRORS: usize = 16;

/// Canvas camera and highlight as last committed by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasState {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    pub highlighted_node_id: Option<NodeId>,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            highlighted_node_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelVisibility {
    pub detail_panel: bool,
    pub preview_panel: bool,
    pub validation_panel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewState {
    pub node_id: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowFlags {
    pub is_dirty: bool,
    /// Milliseconds since the Unix epoch of the last save.
    pub last_saved: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DesyncProblem {
    DanglingSelection(NodeId),
    DanglingFocus(NodeId),
    DanglingHighlight(NodeId),
    DanglingPreview(NodeId),
    /// Reported only; which copy is authoritative is not decidable here.
    DuplicateId(NodeId),
}

impl DesyncProblem {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DesyncProblem::DuplicateId(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesyncFlags {
    pub is_desynchronized: bool,
    pub problems: Vec<DesyncProblem>,
    pub recovery_count: u32,
}

/// A structural change waiting on an external confirm or reject.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    /// Stable handle passed to `confirm_pending_change`/`reject_pending_change`.
    pub index: usize,
    pub node_id: NodeId,
    pub from_tier: u32,
    pub to_tier: u32,
    pub changes: NodeChanges,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditorState {
    pub nodes: Vec<Node>,
    pub selected_node_id: Option<NodeId>,
    pub focused_node_id: Option<NodeId>,
    pub canvas: CanvasState,
    pub panels: PanelVisibility,
    pub preview: PreviewState,
    pub validation: ValidationSummary,
    pub workflow: WorkflowFlags,
    pub desync: DesyncFlags,
    pub pending_changes: Vec<PendingChange>,
    pub errors: Vec<String>,
}

impl EditorState {
    pub fn node(&self, id: &str) -> Option<&Node> {
        find_node(&self.nodes, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected_node_id.as_deref().and_then(|id| self.node(id))
    }

    pub fn pending_change(&self, index: usize) -> Option<&PendingChange> {
        self.pending_changes.iter().find(|change| change.index == index)
    }

    /// Scan for references that do not resolve and for duplicate ids.
    pub fn desync_problems(&self) -> Vec<DesyncProblem> {
        let mut problems = Vec::new();
        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut reported = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
                problems.push(DesyncProblem::DuplicateId(node.id.clone()));
            }
        }

        let references: [(&Option<NodeId>, fn(NodeId) -> DesyncProblem); 4] = [
            (&self.selected_node_id, DesyncProblem::DanglingSelection),
            (&self.focused_node_id, DesyncProblem::DanglingFocus),
            (&self.canvas.highlighted_node_id, DesyncProblem::DanglingHighlight),
            (&self.preview.node_id, DesyncProblem::DanglingPreview),
        ];
        for (reference, problem) in references {
            if let Some(id) = reference
                && !seen.contains(id.as_str())
            {
                problems.push(problem(id.clone()));
            }
        }
        problems
    }
}

/// Shallow merge into `EditorState`. `None` leaves a field untouched; the
/// nested options (`Some(None)`) clear an id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub nodes: Option<Vec<Node>>,
    pub selected_node_id: Option<Option<NodeId>>,
    pub focused_node_id: Option<Option<NodeId>>,
    pub canvas: Option<CanvasState>,
    pub panels: Option<PanelVisibility>,
    pub preview: Option<PreviewState>,
    pub workflow: Option<WorkflowFlags>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn selected(mut self, id: Option<&str>) -> Self {
        self.selected_node_id = Some(id.map(str::to_string));
        self
    }

    pub fn focused(mut self, id: Option<&str>) -> Self {
        self.focused_node_id = Some(id.map(str::to_string));
        self
    }

    pub fn canvas(mut self, canvas: CanvasState) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn panels(mut self, panels: PanelVisibility) -> Self {
        self.panels = Some(panels);
        self
    }

    pub fn preview(mut self, preview: PreviewState) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn workflow(mut self, workflow: WorkflowFlags) -> Self {
        self.workflow = Some(workflow);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(self, state: &mut EditorState) {
        if let Some(nodes) = self.nodes {
            state.nodes = nodes;
        }
        if let Some(selected) = self.selected_node_id {
            state.selected_node_id = selected;
        }
        if let Some(focused) = self.focused_node_id {
            state.focused_node_id = focused;
        }
        if let Some(canvas) = self.canvas {
            state.canvas = canvas;
        }
        if let Some(panels) = self.panels {
            state.panels = panels;
        }
        if let Some(preview) = self.preview {
            state.preview = preview;
        }
        if let Some(workflow) = self.workflow {
            state.workflow = workflow;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Patch,
    NodesReplaced,
    NodeAdded(NodeId),
    NodeUpdated(NodeId),
    NodeRemoved(NodeId),
    PrerequisiteAdded { node_id: NodeId, prerequisite_id: NodeId },
    PrerequisiteRemoved { node_id: NodeId, prerequisite_id: NodeId },
    Selection,
    Focus,
    Highlight,
    Preview,
    Saved,
    Validated,
    DesyncDetected,
    Resynchronized,
    DesyncRecovered,
    ChangeQueued(usize),
    ChangeConfirmed(usize),
    ChangeRejected(usize),
}

impl ChangeKind {
    /// Mutations of the node list itself.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ChangeKind::NodesReplaced
                | ChangeKind::NodeAdded(_)
                | ChangeKind::NodeUpdated(_)
                | ChangeKind::NodeRemoved(_)
                | ChangeKind::PrerequisiteAdded { .. }
                | ChangeKind::PrerequisiteRemoved { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeEvent {
    pub revision: u64,
    /// Caller tag, for tracing only.
    pub source: String,
    pub kind: ChangeKind,
}

pub struct StateStore {
    state: EditorState,
    config: StoreConfig,
    validator: GraphValidator,
    snapshots: Box<dyn SnapshotStore>,
    clock: SharedClock,
    events: Rc<EventBus<StateChangeEvent>>,
    validation_pass: Debouncer,
    desync_check: Debouncer,
    desync_interval: IntervalTimer,
    revision: u64,
    nodes_revision: u64,
    next_pending_index: usize,
}

impl StateStore {
    /// Create a store, adopting a prior snapshot from `snapshots` when one
    /// passes the shape check.
    pub fn new(
        config: StoreConfig,
        validator: GraphValidator,
        snapshots: Box<dyn SnapshotStore>,
        clock: SharedClock,
    ) -> Self {
        let mut state = load_editor_state(snapshots.as_ref());
        state.validation = validator.validate_all(&state.nodes);
        let problems = state.desync_problems();
        state.desync.is_desynchronized = !problems.is_empty();
        state.desync.problems = problems;

        let mut desync_interval = IntervalTimer::new(config.desync_check_interval());
        desync_interval.reset(clock.now());

        let mut store = Self {
            validation_pass: Debouncer::new(config.validation_delay()),
            desync_check: Debouncer::new(config.desync_debounce()),
            desync_interval,
            state,
            config,
            validator,
            snapshots,
            clock,
            events: Rc::new(EventBus::new()),
            revision: 0,
            nodes_revision: 0,
            next_pending_index: 0,
        };
        if store.state.desync.is_desynchronized {
            warn!("Loaded editor state is desynchronized: {:?}", store.state.desync.problems);
            if store.config.auto_recover {
                store.recover_from_desync("startup");
            }
        }
        store
    }

    /// In-memory store on the system clock.
    pub fn in_memory(config: StoreConfig, validator: GraphValidator) -> Self {
        Self::new(
            config,
            validator,
            Box::new(MemorySnapshotStore::new()),
            Rc::new(SystemClock),
        )
    }

    pub fn current_state(&self) -> &EditorState {
        &self.state
    }

    pub fn nodes(&self) -> &[Node] {
        &self.state.nodes
    }

    pub fn validator(&self) -> &GraphValidator {
        &self.validator
    }

    pub fn events(&self) -> Rc<EventBus<StateChangeEvent>> {
        Rc::clone(&self.events)
    }

    /// Bumped by every committed change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bumped only when the node list changes.
    pub fn nodes_revision(&self) -> u64 {
        self.nodes_revision
    }

    pub fn is_dirty(&self) -> bool {
        self.state.workflow.is_dirty
    }

    pub fn is_desynchronized(&self) -> bool {
        self.state.desync.is_desynchronized
    }

    pub fn is_validation_pending(&self) -> bool {
        self.validation_pass.is_pending()
    }

    pub fn pending_changes(&self) -> &[PendingChange] {
        &self.state.pending_changes
    }

    pub fn patch(&mut self, patch: StatePatch, source: &str) {
        if patch.is_empty() {
            return;
        }
        let kind = if patch.nodes.is_some() {
            ChangeKind::NodesReplaced
        } else {
            ChangeKind::Patch
        };
        patch.apply_to(&mut self.state);
        self.commit(source, kind);
    }

    pub fn set_nodes(&mut self, nodes: Vec<Node>, source: &str) {
        self.state.nodes = nodes;
        self.commit(source, ChangeKind::NodesReplaced);
    }

    /// Apply `changes` to the node with `id`. Unknown ids are reported and ignored.
    pub fn update_node(&mut self, id: &str, changes: &NodeChanges, source: &str) -> bool {
        let Some(node) = self.state.nodes.iter_mut().find(|node| node.id == id) else {
            warn!("update_node from {source}: unknown node {id}");
            return false;
        };
        changes.apply_to(node);
        self.commit(source, ChangeKind::NodeUpdated(id.to_string()));
        true
    }

    /// Append `node`. A node whose id is already present is rejected.
    pub fn add_node(&mut self, node: Node, source: &str) -> bool {
        if self.state.contains(&node.id) {
            warn!("add_node from {source}: duplicate node id {}", node.id);
            return false;
        }
        let id = node.id.clone();
        self.state.nodes.push(node);
        self.commit(source, ChangeKind::NodeAdded(id));
        true
    }

    /// Remove every node with `id`. References held by the selection, focus,
    /// highlight, preview and pending queue are cleared with it. Prerequisite
    /// lists of other nodes are left alone; validation reports them as missing.
    pub fn remove_node(&mut self, id: &str, source: &str) -> bool {
        let before = self.state.nodes.len();
        self.state.nodes.retain(|node| node.id != id);
        if self.state.nodes.len() == before {
            warn!("remove_node from {source}: unknown node {id}");
            return false;
        }

        let state = &mut self.state;
        if state.selected_node_id.as_deref() == Some(id) {
            state.selected_node_id = None;
            state.panels.detail_panel = false;
        }
        if state.focused_node_id.as_deref() == Some(id) {
            state.focused_node_id = None;
        }
        if state.canvas.highlighted_node_id.as_deref() == Some(id) {
            state.canvas.highlighted_node_id = None;
        }
        if state.preview.node_id.as_deref() == Some(id) {
            state.preview.node_id = None;
            state.panels.preview_panel = false;
        }
        state.pending_changes.retain(|change| change.node_id != id);

        self.commit(source, ChangeKind::NodeRemoved(id.to_string()));
        true
    }

    /// Add `prerequisite_id` to `node_id` after a pre-commit validation.
    /// Advisory warnings (long chains, deprecated targets) do not block.
    pub fn add_prerequisite(
        &mut self,
        node_id: &str,
        prerequisite_id: &str,
        source: &str,
    ) -> Result<(), PrerequisiteCheck> {
        let Some(node) = self.state.node(node_id) else {
            return Err(PrerequisiteCheck::invalid(
                ReasonKind::Missing,
                format!("node '{node_id}' does not exist"),
            ));
        };
        if node.requires(prerequisite_id) {
            return Ok(());
        }

        let check =
            self.validator
                .validate_single_prerequisite(node_id, prerequisite_id, &self.state.nodes);
        if !check.is_valid {
            debug!("add_prerequisite from {source} rejected: {}", check.message);
            return Err(check);
        }
        if check.reason.is_warning() {
            info!("add_prerequisite from {source}: {}", check.message);
        }

        if let Some(node) = self.state.nodes.iter_mut().find(|node| node.id == node_id) {
            node.prerequisites.push(prerequisite_id.to_string());
        }
        self.commit(
            source,
            ChangeKind::PrerequisiteAdded {
                node_id: node_id.to_string(),
                prerequisite_id: prerequisite_id.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove_prerequisite(&mut self, node_id: &str, prerequisite_id: &str, source: &str) -> bool {
        let Some(node) = self.state.nodes.iter_mut().find(|node| node.id == node_id) else {
            warn!("remove_prerequisite from {source}: unknown node {node_id}");
            return false;
        };
        let before = node.prerequisites.len();
        node.prerequisites.retain(|id| id != prerequisite_id);
        if node.prerequisites.len() == before {
            return false;
        }
        self.commit(
            source,
            ChangeKind::PrerequisiteRemoved {
                node_id: node_id.to_string(),
                prerequisite_id: prerequisite_id.to_string(),
            },
        );
        true
    }

    /// Select `id`, or clear with `None`. The detail panel follows the selection.
    pub fn select_node(&mut self, id: Option<&str>, source: &str) -> bool {
        if !self.resolves(id, "select_node", source) {
            return false;
        }
        self.state.selected_node_id = id.map(str::to_string);
        self.state.panels.detail_panel = id.is_some();
        self.commit(source, ChangeKind::Selection);
        true
    }

    pub fn focus_node(&mut self, id: Option<&str>, source: &str) -> bool {
        if !self.resolves(id, "focus_node", source) {
            return false;
        }
        self.state.focused_node_id = id.map(str::to_string);
        self.state.panels.detail_panel = self.state.selected_node_id.is_some();
        self.commit(source, ChangeKind::Focus);
        true
    }

    pub fn set_highlight(&mut self, id: Option<&str>, source: &str) -> bool {
        if !self.resolves(id, "set_highlight", source) {
            return false;
        }
        if self.state.canvas.highlighted_node_id.as_deref() == id {
            return true;
        }
        self.state.canvas.highlighted_node_id = id.map(str::to_string);
        self.commit(source, ChangeKind::Highlight);
        true
    }

    /// Show `id` in the preview panel, or hide the panel with `None`.
    pub fn set_preview(&mut self, id: Option<&str>, source: &str) -> bool {
        if !self.resolves(id, "set_preview", source) {
            return false;
        }
        self.state.preview.node_id = id.map(str::to_string);
        self.state.panels.preview_panel = id.is_some();
        self.commit(source, ChangeKind::Preview);
        true
    }

    fn resolves(&self, id: Option<&str>, operation: &str, source: &str) -> bool {
        match id {
            Some(id) if !self.state.contains(id) => {
                warn!("{operation} from {source}: unknown node {id}");
                false
            },
            _ => true,
        }
    }

    /// Dirty -> clean.
    pub fn mark_saved(&mut self, source: &str) {
        self.state.workflow.is_dirty = false;
        self.state.workflow.last_saved = Some(self.clock.unix_millis());
        self.commit(source, ChangeKind::Saved);
    }

    /// Park a tier change until it is confirmed or rejected. Returns the
    /// handle to confirm or reject it with.
    pub fn queue_structural_change(
        &mut self,
        node_id: &str,
        changes: NodeChanges,
        description: impl Into<String>,
        source: &str,
    ) -> Option<usize> {
        let Some(node) = self.state.node(node_id) else {
            warn!("queue_structural_change from {source}: unknown node {node_id}");
            return None;
        };
        let from_tier = node.tier;
        let to_tier = changes.tier.unwrap_or(from_tier);

        let index = self.next_pending_index;
        self.next_pending_index += 1;
        self.state.pending_changes.push(PendingChange {
            index,
            node_id: node_id.to_string(),
            from_tier,
            to_tier,
            changes,
            description: description.into(),
        });
        self.commit(source, ChangeKind::ChangeQueued(index));
        Some(index)
    }

    /// Apply and dequeue the pending change with `index`.
    pub fn confirm_pending_change(&mut self, index: usize, source: &str) -> bool {
        let Some(change) = self.take_pending(index) else {
            warn!("confirm_pending_change from {source}: no pending change {index}");
            return false;
        };
        self.publish(source, ChangeKind::ChangeConfirmed(index));
        self.update_node(&change.node_id, &change.changes, source)
    }

    /// Discard the pending change with `index`; the node list is untouched.
    pub fn reject_pending_change(&mut self, index: usize, source: &str) -> bool {
        if self.take_pending(index).is_none() {
            warn!("reject_pending_change from {source}: no pending change {index}");
            return false;
        }
        self.commit(source, ChangeKind::ChangeRejected(index));
        true
    }

    fn take_pending(&mut self, index: usize) -> Option<PendingChange> {
        let position = self
            .state
            .pending_changes
            .iter()
            .position(|change| change.index == index)?;
        Some(self.state.pending_changes.remove(position))
    }

    /// Re-scan for dangling references and duplicate ids and record what was
    /// found. Returns whether any problem exists.
    pub fn check_for_desync(&mut self) -> bool {
        let problems = self.state.desync_problems();
        let found = !problems.is_empty();
        if problems == self.state.desync.problems && found == self.state.desync.is_desynchronized {
            return found;
        }

        let kind = if found {
            warn!("Editor state desynchronized: {problems:?}");
            ChangeKind::DesyncDetected
        } else {
            ChangeKind::Resynchronized
        };
        self.state.desync.problems = problems;
        self.state.desync.is_desynchronized = found;
        self.publish("desync-check", kind);
        found
    }

    /// Clear every dangling reference. Duplicate ids are left in place and
    /// stay reported. Returns whether anything was cleared; a second call with
    /// no intervening mutation is a no-op.
    pub fn recover_from_desync(&mut self, source: &str) -> bool {
        self.check_for_desync();
        let recoverable: Vec<DesyncProblem> = self
            .state
            .desync
            .problems
            .iter()
            .filter(|problem| problem.is_recoverable())
            .cloned()
            .collect();
        if recoverable.is_empty() {
            return false;
        }

        let state = &mut self.state;
        for problem in &recoverable {
            match problem {
                DesyncProblem::DanglingSelection(_) => {
                    state.selected_node_id = None;
                    state.panels.detail_panel = false;
                },
                DesyncProblem::DanglingFocus(_) => state.focused_node_id = None,
                DesyncProblem::DanglingHighlight(_) => state.canvas.highlighted_node_id = None,
                DesyncProblem::DanglingPreview(_) => {
                    state.preview.node_id = None;
                    state.panels.preview_panel = false;
                },
                DesyncProblem::DuplicateId(_) => {},
            }
        }
        state.desync.problems.retain(|problem| !problem.is_recoverable());
        state.desync.is_desynchronized = !state.desync.problems.is_empty();
        state.desync.recovery_count += 1;
        if state.desync.is_desynchronized {
            warn!(
                "Desync recovery from {source} left unresolved problems: {:?}",
                state.desync.problems
            );
        } else {
            info!("Desync recovered from {source}: {recoverable:?}");
        }

        self.commit(source, ChangeKind::DesyncRecovered);
        true
    }

    /// Re-run the validator now instead of waiting for the scheduled pass.
    pub fn run_validation(&mut self) -> &ValidationSummary {
        self.validation_pass.cancel();
        self.state.validation = self.validator.validate_all(&self.state.nodes);
        self.publish("validator", ChangeKind::Validated);
        &self.state.validation
    }

    /// Fire whatever deferred work is due: the scheduled validation pass, the
    /// debounced desync check and the periodic desync check.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if self.validation_pass.poll(now) {
            self.run_validation();
        }

        let debounced = self.desync_check.poll(now);
        let periodic = self.desync_interval.poll(now);
        if (debounced || periodic) && self.check_for_desync() && self.config.auto_recover {
            self.recover_from_desync("desync-monitor");
        }
    }

    fn commit(&mut self, source: &str, kind: ChangeKind) {
        let now = self.clock.now();
        if kind.is_structural() {
            self.nodes_revision += 1;
            self.state.workflow.is_dirty = true;
            self.validation_pass.schedule(now);
        }
        self.desync_check.schedule(now);
        if self.config.persist_on_mutation {
            self.persist();
        }
        self.publish(source, kind);
    }

    fn publish(&mut self, source: &str, kind: ChangeKind) {
        self.revision += 1;
        let event = StateChangeEvent {
            revision: self.revision,
            source: source.to_string(),
            kind,
        };
        self.events.publish(&event);
    }

    fn persist(&mut self) {
        let result = encode_snapshot(&self.state)
            .and_then(|bytes| self.snapshots.save(SNAPSHOT_KEY, &bytes));
        if let Err(e) = result {
            warn!("Failed to persist editor snapshot: {e}");
            self.state.errors.push(e.to_string());
            if self.state.errors.len() > MAX_TRANSIENT_ERRORS {
                self.state.errors.remove(0);
            }
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("nodes", &self.state.nodes.len())
            .field("revision", &self.revision)
            .field("nodes_revision", &self.nodes_revision)
            .field("dirty", &self.state.workflow.is_dirty)
            .field("desynchronized", &self.state.desync.is_desynchronized)
            .finish()
    }
}
