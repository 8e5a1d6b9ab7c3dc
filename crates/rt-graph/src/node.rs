//! Graph vertices.
//!
//! A [`Node`] is either a rail point, a named port of some equipment, or the
//! internal robot (RM) of a stocker.  The variant-specific topology lives in
//! [`NodeKind`]; the variant-specific runtime state lives in [`NodeState`].
//! Keeping both closed lets the carry-forward merge match exhaustively.

use parking_lot::Mutex;

use rt_core::{CadPoint, DrawPoint, EdgeId, NodeId, PortKind};

// ── Topology ──────────────────────────────────────────────────────────────────

/// A numbered point on the rail layout.
#[derive(Clone, Debug)]
pub struct RailPoint {
    pub area: String,
    pub address: u32,
    /// Neighbour reached by the left track, or 0.
    pub left_address: u32,
    /// Neighbour reached by the right track, or 0.
    pub right_address: u32,
    /// More than one rail edge leaves this point.
    pub rail_branch: bool,
    /// More than one rail edge enters this point.
    pub rail_junction: bool,
    /// Dead end, track start, or self-loop in the layout data.
    pub terminal: bool,
    /// A bridged port hangs off this point instead of a transfer edge.
    pub bridged: bool,
}

/// A load/unload location owned by a piece of equipment.
#[derive(Clone, Debug)]
pub struct PortPoint {
    pub kind: PortKind,
    pub name: String,
    pub equipment: String,
    pub area: Option<String>,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Rail(RailPoint),
    Port(PortPoint),
    StockerRm { stocker: String },
}

// ── Runtime ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum NodeState {
    Rail { available: bool },
    Port { available: bool, carrier_id: Option<String> },
    Shelf { carrier_id: Option<String>, reserved: bool },
    StockerRm { available: bool },
}

impl NodeState {
    /// Fresh state for a node of `kind`.
    pub fn initial(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Rail(_) => NodeState::Rail { available: true },
            NodeKind::Port(p) if p.kind == PortKind::StockerShelf => {
                NodeState::Shelf { carrier_id: None, reserved: false }
            }
            NodeKind::Port(_) => NodeState::Port { available: true, carrier_id: None },
            NodeKind::StockerRm { .. } => NodeState::StockerRm { available: true },
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            NodeState::Rail { available }
            | NodeState::Port { available, .. }
            | NodeState::StockerRm { available } => *available,
            NodeState::Shelf { reserved, .. } => !*reserved,
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub draw: DrawPoint,
    pub cad: CadPoint,
    /// Every edge (any family) that ends here.
    pub in_edges: Vec<EdgeId>,
    /// Every edge (any family) that starts here.
    pub out_edges: Vec<EdgeId>,
    pub is_branch: bool,
    pub is_junction: bool,
    state: Mutex<NodeState>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, draw: DrawPoint, cad: CadPoint) -> Self {
        let state = NodeState::initial(&kind);
        Self {
            id,
            kind,
            draw,
            cad,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            is_branch: false,
            is_junction: false,
            state: Mutex::new(state),
        }
    }

    pub fn rail_point(&self) -> Option<&RailPoint> {
        match &self.kind {
            NodeKind::Rail(p) => Some(p),
            _ => None,
        }
    }

    pub fn port_point(&self) -> Option<&PortPoint> {
        match &self.kind {
            NodeKind::Port(p) => Some(p),
            _ => None,
        }
    }

    /// Set the in/out edge lists and derive the branch/junction flags from them.
    pub fn set_adjacency(&mut self, in_edges: Vec<EdgeId>, out_edges: Vec<EdgeId>) {
        self.is_branch = out_edges.len() > 1;
        self.is_junction = in_edges.len() > 1;
        self.in_edges = in_edges;
        self.out_edges = out_edges;
    }

    pub fn state(&self) -> NodeState {
        self.state.lock().clone()
    }

    pub fn set_state(&self, state: NodeState) {
        *self.state.lock() = state;
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().is_available()
    }
}
