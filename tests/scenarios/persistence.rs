use techtree::config::EditorConfig;
use techtree::graph::Node;
use techtree::persistence::{RedbSnapshotStore, SNAPSHOT_KEY};
use techtree::services::ManualClock;
use techtree::{GraphValidator, StateStore};
use tempfile::TempDir;

use crate::harness::{Harness, open_store, two_tier_tree};

#[test]
fn editor_state_survives_restart() {
    let mut harness = Harness::new(EditorConfig::default(), two_tier_tree());
    harness.store.select_node(Some("T2"), "detail-panel");
    harness.controller.pan_by(-40.0, -20.0);
    harness.advance(16);
    harness
        .store
        .add_node(Node::new("T3", "Alloys", 3).with_prerequisites(["T2"]), "detail-panel");

    let reopened = open_store(&EditorConfig::default(), &harness.clock, &harness.snapshots);
    let state = reopened.current_state();

    assert_eq!(state.nodes.len(), 3);
    assert_eq!(state.selected_node_id.as_deref(), Some("T2"));
    assert!(state.panels.detail_panel);
    assert_eq!((state.canvas.pan_x, state.canvas.pan_y), (40.0, 20.0));
    assert!(state.workflow.is_dirty);
    assert!(state.pending_changes.is_empty());
}

#[test]
fn malformed_snapshot_falls_back_to_empty_state() {
    let harness = Harness::new(EditorConfig::default(), two_tier_tree());
    harness
        .snapshots
        .insert(SNAPSHOT_KEY, br#"{"nodes":[],"canvas":{}}"#.to_vec());

    let reopened = open_store(&EditorConfig::default(), &harness.clock, &harness.snapshots);

    assert!(reopened.nodes().is_empty());
    assert!(!reopened.is_dirty());
}

#[test]
fn redb_backed_store_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("editor.redb");
    let clock = ManualClock::new();

    {
        let snapshots = RedbSnapshotStore::open(&path).unwrap();
        let mut store = StateStore::new(
            Default::default(),
            GraphValidator::default(),
            Box::new(snapshots),
            clock.shared(),
        );
        store.set_nodes(two_tier_tree(), "import");
        store.mark_saved("toolbar");
    }

    let snapshots = RedbSnapshotStore::open(&path).unwrap();
    let store = StateStore::new(
        Default::default(),
        GraphValidator::default(),
        Box::new(snapshots),
        clock.shared(),
    );
    assert_eq!(store.nodes(), two_tier_tree().as_slice());
    assert!(!store.is_dirty());
    assert_eq!(store.current_state().workflow.last_saved, Some(0));
}
