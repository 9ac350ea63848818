use std::collections::HashSet;
use std::fs;

use flow_pad::flow_utils::changes::{Connection, EdgeChange, NodeChange};
use flow_pad::flow_utils::descendants::descendants_of;
use flow_pad::flow_utils::state::{FlowState, NodeId, Position};
use flow_pad::persistence::persist::{self, BoardSnapshot};
use flow_pad::persistence::settings::AppSettings;

// A→B, B→C, A→D
fn diamond() -> (FlowState, NodeId, NodeId, NodeId, NodeId) {
    let mut state = FlowState::new();
    let a = state.create_node_at(Position::new(0.0, 0.0));
    let b = state.create_node_at(Position::new(10.0, 0.0));
    let c = state.create_node_at(Position::new(20.0, 0.0));
    let d = state.create_node_at(Position::new(30.0, 0.0));
    state.add_edge(Connection { source: a, target: b }, true);
    state.add_edge(Connection { source: b, target: c }, true);
    state.add_edge(Connection { source: a, target: d }, true);
    (state, a, b, c, d)
}

fn ids(set: &HashSet<NodeId>) -> Vec<NodeId> {
    let mut v: Vec<NodeId> = set.iter().copied().collect();
    v.sort();
    v
}

#[test]
fn node_ids_are_monotonic_and_resume_after_reload() {
    let mut state = FlowState::new();
    let first = state.create_node(250.0);
    let second = state.create_node(250.0);
    let third = state.create_node(250.0);
    assert_eq!(first, 1);
    assert!(second > first && third > second);

    // Rebuilding from persisted sequences resumes one past the max id
    let reloaded = FlowState::from_parts(state.nodes.clone(), state.edges.clone());
    assert_eq!(reloaded.next_node_id(), third + 1);

    // An empty board starts numbering over at 1
    let mut empty = FlowState::from_parts(Vec::new(), Vec::new());
    assert_eq!(empty.create_node(250.0), 1);
}

#[test]
fn node_ids_are_never_reused_after_delete() {
    let mut state = FlowState::new();
    let _ = state.create_node(250.0);
    let _ = state.create_node(250.0);
    let last = state.create_node(250.0);
    state.delete_subtree(last);
    assert_eq!(state.create_node(250.0), last + 1);
}

#[test]
fn created_nodes_spawn_inside_extent_with_default_label() {
    let mut state = FlowState::new();
    let id = state.create_node(120.0);
    let node = state.node(id).expect("node should exist");
    assert_eq!(node.label, format!("Node {}", id));
    assert!(node.position.x >= 0.0 && node.position.x < 120.0);
    assert!(node.position.y >= 0.0 && node.position.y < 120.0);
}

#[test]
fn descendants_on_acyclic_graph() {
    let (state, a, b, c, d) = diamond();
    assert_eq!(ids(&descendants_of(a, &state.edges)), vec![b, c, d]);
    assert_eq!(ids(&descendants_of(b, &state.edges)), vec![c]);
    assert!(descendants_of(d, &state.edges).is_empty());
}

#[test]
fn descendants_terminate_on_cycles_excluding_start() {
    let mut state = FlowState::new();
    let a = state.create_node_at(Position::new(0.0, 0.0));
    let b = state.create_node_at(Position::new(10.0, 0.0));
    state.add_edge(Connection { source: a, target: b }, true);
    state.add_edge(Connection { source: b, target: a }, true);

    assert_eq!(ids(&descendants_of(a, &state.edges)), vec![b]);
    assert_eq!(ids(&descendants_of(b, &state.edges)), vec![a]);

    // Self-loops are equally harmless
    state.add_edge(Connection { source: a, target: a }, true);
    assert_eq!(ids(&descendants_of(a, &state.edges)), vec![b]);
}

#[test]
fn delete_subtree_cascades_over_the_whole_reachable_set() {
    let (mut state, a, _, _, _) = diamond();
    assert_eq!(state.delete_subtree(a), 4);
    assert!(state.nodes.is_empty());
    assert!(state.edges.is_empty());
}

#[test]
fn delete_subtree_keeps_unreachable_siblings() {
    let (mut state, a, b, _, d) = diamond();
    assert_eq!(state.delete_subtree(b), 2);
    let remaining: Vec<NodeId> = state.nodes.iter().map(|n| n.id).collect();
    assert_eq!(remaining, vec![a, d]);
    assert_eq!(state.edge_count(), 1);
    assert_eq!(state.edges[0].source, a);
    assert_eq!(state.edges[0].target, d);
}

#[test]
fn delete_subtree_on_unknown_id_is_a_noop() {
    let (mut state, _, _, _, _) = diamond();
    let before_nodes = state.nodes.clone();
    let before_edges = state.edges.clone();
    assert_eq!(state.delete_subtree(999), 0);
    assert_eq!(state.nodes, before_nodes);
    assert_eq!(state.edges, before_edges);
}

#[test]
fn rename_on_unknown_id_leaves_the_sequence_unchanged() {
    let (mut state, a, _, _, _) = diamond();
    let before = state.nodes.clone();
    assert!(!state.rename_node(999, "x".to_string()));
    assert_eq!(state.nodes, before);

    // Empty labels are accepted
    assert!(state.rename_node(a, String::new()));
    assert_eq!(state.node(a).unwrap().label, "");
}

#[test]
fn add_edge_accepts_self_loops_and_dangling_endpoints() {
    let mut state = FlowState::new();
    let a = state.create_node_at(Position::new(0.0, 0.0));
    let loop_id = state.add_edge(Connection { source: a, target: a }, true);
    let dangling_id = state.add_edge(Connection { source: a, target: 404 }, false);
    let duplicate_id = state.add_edge(Connection { source: a, target: a }, true);

    assert_eq!(state.edge_count(), 3);
    assert_ne!(loop_id, dangling_id);
    assert_ne!(loop_id, duplicate_id);
    assert!(state.edges[0].animated);
    assert!(!state.edges[1].animated);
}

#[test]
fn canvas_changes_apply_verbatim() {
    let (mut state, a, b, _, _) = diamond();
    let edge_id = state.edges[0].id;

    state.apply_node_changes(&[
        NodeChange::Moved { id: a, position: Position::new(42.0, 7.0) },
        NodeChange::Selected { id: b, selected: true },
        NodeChange::Resized { id: b, size: (120.0, 40.0) },
        // Unknown ids are ignored
        NodeChange::Moved { id: 999, position: Position::new(1.0, 1.0) },
    ]);
    assert_eq!(state.node(a).unwrap().position, Position::new(42.0, 7.0));
    assert!(state.node(b).unwrap().selected);
    assert_eq!(state.node(b).unwrap().size, Some((120.0, 40.0)));

    state.apply_node_changes(&[NodeChange::Removed { id: a }]);
    assert!(state.node(a).is_none());
    assert_eq!(state.node_count(), 3);

    state.apply_edge_changes(&[EdgeChange::Removed { id: edge_id }]);
    assert!(state.edges.iter().all(|e| e.id != edge_id));
}

// All disk-touching assertions live in one test: the autosave override can
// only be installed once per process.
#[test]
fn slots_and_snapshots_round_trip_on_disk() {
    let dir = std::env::temp_dir().join(format!("flow-pad-test-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    persist::set_settings_override(AppSettings {
        autosave_override: Some(dir.clone()),
        ..AppSettings::default()
    });

    // Absent slots degrade to empty sequences
    assert!(persist::load_nodes().is_empty());
    assert!(persist::load_edges().is_empty());

    let (state, _, _, _, _) = diamond();
    persist::save_nodes(&state.nodes).expect("save nodes");
    persist::save_edges(&state.edges).expect("save edges");
    assert_eq!(persist::load_nodes(), state.nodes);
    assert_eq!(persist::load_edges(), state.edges);

    // A versioned snapshot is listed and restores both sequences
    let path = persist::save_versioned(&BoardSnapshot {
        nodes: state.nodes.clone(),
        edges: state.edges.clone(),
    })
    .expect("save version");
    let versions = persist::list_versions().expect("list versions");
    assert!(versions.contains(&path));
    let snapshot = persist::load_from_path(&path).expect("load version");
    assert_eq!(snapshot.nodes, state.nodes);
    assert_eq!(snapshot.edges, state.edges);

    // An unparseable slot also degrades to an empty sequence
    fs::write(persist::slot_path(persist::NODES_SLOT), b"not json").expect("corrupt slot");
    assert!(persist::load_nodes().is_empty());

    let _ = fs::remove_dir_all(&dir);
}
