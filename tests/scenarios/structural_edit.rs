use std::cell::RefCell;
use std::rc::Rc;

use euclid::default::Vector2D;
use techtree::config::{CanvasConfig, EditorConfig};
use techtree::input::{ConfirmationRequest, DropOutcome};

use crate::harness::{Harness, two_tier_tree};

fn confirmation_required() -> EditorConfig {
    EditorConfig {
        canvas: CanvasConfig {
            structural_editing: true,
            require_structural_confirmation: true,
            ..CanvasConfig::default()
        },
        ..EditorConfig::default()
    }
}

#[test]
fn retier_waits_for_confirmation_then_applies() {
    let mut harness = Harness::new(confirmation_required(), two_tier_tree());
    let requests = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&requests);
    harness
        .controller
        .confirmation_requests()
        .subscribe(move |request: &ConfirmationRequest| sink.borrow_mut().push(request.clone()));
    assert!(!harness.store.is_dirty());

    // One tier row up: T2 lands in tier 1.
    let start = harness.screen_center("T2");
    assert!(harness.controller.begin_drag("T2", start, &harness.store));
    let preview = harness
        .controller
        .drag_move(start + Vector2D::new(0.0, -150.0))
        .expect("drag in progress");
    assert_eq!(preview.target_tier, 1);
    let before = harness.store.current_state().clone();
    let outcome = harness
        .controller
        .end_drag(start + Vector2D::new(0.0, -150.0), &mut harness.store);

    assert_eq!(outcome, DropOutcome::PendingConfirmation { index: 0 });
    assert_eq!(harness.tier_of("T2"), 2);
    assert_eq!(harness.store.nodes(), before.nodes.as_slice());
    assert!(!harness.store.is_dirty());
    {
        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].node_id, "T2");
        assert_eq!((requests[0].from_tier, requests[0].to_tier), (2, 1));
    }

    // Time passing does not apply the change on its own.
    harness.advance(10_000);
    assert_eq!(harness.tier_of("T2"), 2);

    assert!(harness.controller.confirm(0, &mut harness.store));
    assert_eq!(harness.tier_of("T2"), 1);
    assert!(harness.store.current_state().workflow.is_dirty);
    assert!(harness.store.pending_changes().is_empty());

    // The controller notices the new node list on its next tick and relayouts
    // once the list has settled.
    harness.advance(1);
    harness.advance(50);
    let placed = harness
        .controller
        .virtualizer()
        .virtual_node("T2")
        .expect("laid out");
    assert_eq!(placed.y, 0.0);
}

#[test]
fn rejected_retier_leaves_state_unchanged() {
    let mut harness = Harness::new(confirmation_required(), two_tier_tree());
    let start = harness.screen_center("T2");
    harness.controller.begin_drag("T2", start, &harness.store);
    let outcome = harness
        .controller
        .end_drag(start + Vector2D::new(0.0, -150.0), &mut harness.store);
    let DropOutcome::PendingConfirmation { index } = outcome else {
        panic!("expected a pending confirmation, got {outcome:?}");
    };
    let nodes = harness.store.nodes().to_vec();

    assert!(harness.controller.reject(index, &mut harness.store));

    assert_eq!(harness.store.nodes(), nodes.as_slice());
    assert!(!harness.store.is_dirty());
    assert!(!harness.controller.confirm(index, &mut harness.store));
}

#[test]
fn small_retier_applies_without_confirmation_by_default() {
    let mut harness = Harness::new(EditorConfig::default(), two_tier_tree());
    let start = harness.screen_center("T2");
    harness.controller.begin_drag("T2", start, &harness.store);

    let outcome = harness
        .controller
        .end_drag(start + Vector2D::new(0.0, 150.0), &mut harness.store);

    assert_eq!(
        outcome,
        DropOutcome::Retiered {
            node_id: "T2".to_string(),
            from_tier: 2,
            to_tier: 3,
        }
    );
    assert!(harness.store.is_dirty());
}

#[test]
fn validation_flags_cycle_introduced_by_bulk_replace() {
    let mut harness = Harness::new(EditorConfig::default(), two_tier_tree());
    let mut nodes = harness.store.nodes().to_vec();
    nodes[0].prerequisites.push("T2".to_string());

    // A bulk replace is tolerated and only reported.
    harness.store.set_nodes(nodes, "import");
    harness.advance(100);

    let validation = &harness.store.current_state().validation;
    assert_eq!(validation.circular, 2);
    assert_eq!(validation.cycle_groups, vec![vec!["T1".to_string(), "T2".to_string()]]);
}
