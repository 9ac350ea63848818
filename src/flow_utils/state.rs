use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::changes::Connection;
use super::descendants::descendants_of;

// Basic type aliases for clarity
pub type NodeId = u64;
pub type EdgeId = Uuid;

/// Side length of the square freshly created nodes spawn inside, unless
/// overridden in settings.
pub const DEFAULT_SPAWN_EXTENT: f32 = 250.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: NodeId,
    pub position: Position,
    pub label: String,
    // Canvas-tracked flags; absent in board files written by older builds
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub size: Option<(f32, f32)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub animated: bool,
}

/// Authoritative board state: the node and edge sequences plus the id
/// counter new nodes draw from. The counter is derived from the node
/// sequence on load and never persisted.
#[derive(Clone, Debug)]
pub struct FlowState {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    next_node_id: NodeId,
}

impl FlowState {
    // Instantiate a new, empty board
    pub fn new() -> Self {
        FlowState {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_node_id: 1,
        }
    }

    /// Rebuild state from persisted sequences. Numbering resumes one past
    /// the highest id present; an empty node sequence starts over at 1.
    pub fn from_parts(nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> Self {
        let next_node_id = if nodes.is_empty() {
            1
        } else {
            nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1
        };
        FlowState { nodes, edges, next_node_id }
    }

    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    // Append a node at a random spot within the spawn square and return its ID
    pub fn create_node(&mut self, spawn_extent: f32) -> NodeId {
        let mut rng = rand::thread_rng();
        let extent = spawn_extent.max(1.0);
        let position = Position::new(rng.gen_range(0.0..extent), rng.gen_range(0.0..extent));
        self.create_node_at(position)
    }

    pub fn create_node_at(&mut self, position: Position) -> NodeId {
        let id = self.next_node_id;
        self.nodes.push(FlowNode {
            id,
            position,
            label: format!("Node {}", id),
            selected: false,
            size: None,
        });
        self.next_node_id += 1;
        id
    }

    /// Append an edge for a user-drawn connection and return its ID.
    /// Endpoints are taken as-is: self-loops, duplicate pairs and ids with
    /// no matching node are all accepted.
    pub fn add_edge(&mut self, conn: Connection, animated: bool) -> EdgeId {
        let id = Uuid::now_v7();
        self.edges.push(FlowEdge {
            id,
            source: conn.source,
            target: conn.target,
            animated,
        });
        id
    }

    /// Replace a node's label; returns false when the id is unknown.
    /// Empty labels are allowed.
    pub fn rename_node(&mut self, id: NodeId, new_label: String) -> bool {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.label = new_label;
            true
        } else {
            false
        }
    }

    /// Remove `id` and everything reachable from it, plus every edge with
    /// either endpoint in the removed set. Returns the number of nodes
    /// removed; an unknown id removes none, though stale edges naming it
    /// are still swept out.
    pub fn delete_subtree(&mut self, id: NodeId) -> usize {
        let mut doomed = descendants_of(id, &self.edges);
        doomed.insert(id);
        let before = self.nodes.len();
        self.nodes.retain(|n| !doomed.contains(&n.id));
        self.edges
            .retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));
        before - self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl Default for FlowState {
    fn default() -> Self {
        Self::new()
    }
}
