/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Serializable editor snapshot.

use serde::{Deserialize, Serialize};

use crate::app::{CanvasState, EditorState, PanelVisibility, PreviewState, WorkflowFlags};
use crate::graph::{Node, NodeId};

/// The persisted subset of `EditorState`.
///
/// Pending structural changes, transient errors, validation results and
/// desync bookkeeping are derived or session-local and never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEditorState {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub selected_node_id: Option<NodeId>,
    #[serde(default)]
    pub focused_node_id: Option<NodeId>,
    pub canvas: CanvasState,
    pub panels: PanelVisibility,
    pub preview: PreviewState,
    #[serde(default)]
    pub workflow: WorkflowFlags,
}

impl From<&EditorState> for PersistedEditorState {
    fn from(state: &EditorState) -> Self {
        Self {
            nodes: state.nodes.clone(),
            selected_node_id: state.selected_node_id.clone(),
            focused_node_id: state.focused_node_id.clone(),
            canvas: state.canvas.clone(),
            panels: state.panels,
            preview: state.preview.clone(),
            workflow: state.workflow,
        }
    }
}

impl PersistedEditorState {
    pub fn into_editor_state(self) -> EditorState {
        EditorState {
            nodes: self.nodes,
            selected_node_id: self.selected_node_id,
            focused_node_id: self.focused_node_id,
            canvas: self.canvas,
            panels: self.panels,
            preview: self.preview,
            workflow: self.workflow,
            ..EditorState::default()
        }
    }
}
