use techtree::app::{DesyncProblem, StatePatch};
use techtree::config::{EditorConfig, StoreConfig};
use techtree::graph::Node;

use crate::harness::{Harness, two_tier_tree};

#[test]
fn removing_selected_node_clears_selection() {
    let mut harness = Harness::new(EditorConfig::default(), two_tier_tree());
    harness.store.select_node(Some("T2"), "detail-panel");

    harness.store.remove_node("T2", "detail-panel");
    harness.advance(1_000);

    let state = harness.store.current_state();
    assert_eq!(state.selected_node_id, None);
    assert!(!state.panels.detail_panel);
    assert!(!state.desync.is_desynchronized);
}

#[test]
fn dangling_selection_recovers_without_intervention() {
    let mut harness = Harness::new(EditorConfig::default(), two_tier_tree());
    harness.store.select_node(Some("T2"), "detail-panel");
    harness
        .store
        .patch(StatePatch::new().nodes(vec![Node::new("T1", "Tools", 1)]), "import");
    assert_eq!(harness.store.current_state().selected_node_id.as_deref(), Some("T2"));

    harness.advance(100);

    let state = harness.store.current_state();
    assert_eq!(state.selected_node_id, None);
    assert_eq!(state.desync.recovery_count, 1);
    assert!(!state.desync.is_desynchronized);
}

#[test]
fn burst_of_mutations_checks_once_after_quiet_period() {
    let mut harness = Harness::new(EditorConfig::default(), two_tier_tree());
    let events = harness.store.events().subscribe_channel();

    for step in 0..5 {
        harness
            .store
            .patch(StatePatch::new().focused(Some("ghost")), &format!("burst-{step}"));
        harness.advance(20);
    }
    assert_eq!(
        harness.store.current_state().focused_node_id.as_deref(),
        Some("ghost")
    );

    harness.advance(100);

    assert_eq!(harness.store.current_state().focused_node_id, None);
    let recoveries = events
        .try_iter()
        .filter(|event| event.kind == techtree::app::ChangeKind::DesyncRecovered)
        .count();
    assert_eq!(recoveries, 1);
}

#[test]
fn recovery_is_idempotent_and_duplicates_stay_reported() {
    let config = EditorConfig {
        store: StoreConfig {
            auto_recover: false,
            ..StoreConfig::default()
        },
        ..EditorConfig::default()
    };
    let mut nodes = two_tier_tree();
    nodes.push(Node::new("T1", "Tools (copy)", 1));
    let mut harness = Harness::new(config, nodes);
    harness
        .store
        .patch(StatePatch::new().selected(Some("gone")), "test");

    assert!(harness.store.check_for_desync());
    assert!(harness.store.recover_from_desync("test"));
    let after_first = harness.store.current_state().clone();
    assert!(!harness.store.recover_from_desync("test"));

    assert_eq!(harness.store.current_state(), &after_first);
    assert_eq!(after_first.selected_node_id, None);
    assert_eq!(after_first.nodes.len(), 3);
    assert_eq!(
        after_first.desync.problems,
        vec![DesyncProblem::DuplicateId("T1".to_string())]
    );
    assert!(after_first.desync.is_desynchronized);
}
