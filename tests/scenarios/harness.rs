use euclid::default::Point2D;
use techtree::app::StateStore;
use techtree::config::EditorConfig;
use techtree::graph::Node;
use techtree::input::CanvasController;
use techtree::persistence::MemorySnapshotStore;
use techtree::services::ManualClock;

pub struct Harness {
    pub clock: ManualClock,
    pub snapshots: MemorySnapshotStore,
    pub store: StateStore,
    pub controller: CanvasController,
}

impl Harness {
    pub fn new(config: EditorConfig, nodes: Vec<Node>) -> Self {
        let clock = ManualClock::new();
        let snapshots = MemorySnapshotStore::new();
        let mut store = open_store(&config, &clock, &snapshots);
        store.set_nodes(nodes, "scenario");
        store.mark_saved("scenario");
        let mut controller = CanvasController::new(&config, clock.shared());
        controller.sync(&store);
        Self {
            clock,
            snapshots,
            store,
            controller,
        }
    }

    /// Advance the clock and run one host tick.
    pub fn advance(&mut self, millis: u64) {
        self.clock.advance_millis(millis);
        self.controller.tick(&mut self.store);
    }

    /// Screen point at the centre of a node's layout box.
    pub fn screen_center(&self, id: &str) -> Point2D<f32> {
        let center = self
            .controller
            .virtualizer()
            .virtual_node(id)
            .unwrap_or_else(|| panic!("{id} is not laid out"))
            .center();
        self.controller.camera().canvas_to_screen(center)
    }

    pub fn tier_of(&self, id: &str) -> u32 {
        self.store.current_state().node(id).expect("node exists").tier
    }
}

pub fn open_store(
    config: &EditorConfig,
    clock: &ManualClock,
    snapshots: &MemorySnapshotStore,
) -> StateStore {
    StateStore::new(
        config.store.clone(),
        techtree::GraphValidator::new(config.validation.clone()),
        Box::new(snapshots.clone()),
        clock.shared(),
    )
}

pub fn two_tier_tree() -> Vec<Node> {
    vec![
        Node::new("T1", "Tools", 1),
        Node::new("T2", "Smithing", 2).with_prerequisites(["T1"]),
    ]
}
