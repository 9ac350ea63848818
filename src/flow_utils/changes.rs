use super::state::{EdgeId, FlowState, NodeId, Position};

/// Incremental node updates emitted by the canvas layer for drag, remove,
/// select and resize gestures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeChange {
    Moved { id: NodeId, position: Position },
    Removed { id: NodeId },
    Selected { id: NodeId, selected: bool },
    Resized { id: NodeId, size: (f32, f32) },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EdgeChange {
    Removed { id: EdgeId },
}

/// Endpoints of a user-drawn connection, forwarded to `FlowState::add_edge`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
}

impl FlowState {
    /// Apply canvas node events verbatim. Events naming unknown ids are
    /// ignored.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) {
        for change in changes {
            match *change {
                NodeChange::Moved { id, position } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.position = position;
                    }
                }
                NodeChange::Removed { id } => {
                    self.nodes.retain(|n| n.id != id);
                }
                NodeChange::Selected { id, selected } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.selected = selected;
                    }
                }
                NodeChange::Resized { id, size } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.size = Some(size);
                    }
                }
            }
        }
    }

    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) {
        for change in changes {
            match *change {
                EdgeChange::Removed { id } => {
                    self.edges.retain(|e| e.id != id);
                }
            }
        }
    }
}
