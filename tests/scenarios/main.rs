use techtree::VERSION;

mod desync;
mod harness;
mod persistence;
mod structural_edit;

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}
