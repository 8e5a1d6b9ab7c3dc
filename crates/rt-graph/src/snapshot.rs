//! One consistent instant of a facility's network.
//!
//! # Layout
//!
//! Each entity family has its own `FxHashMap` keyed by composite id.  Two
//! derived index families sit beside them:
//!
//! - `edges` maps every edge id, whatever its family, to an [`EdgeRef`];
//! - `from_index`/`to_index` map a node to the ids of all edges leaving or
//!   entering it, and `rail_out`/`rail_in` do the same for rail edges only.
//!
//! Collections are fixed once a snapshot is published.  Only the entities'
//! own runtime fields, the zone counters and the fault book change while the
//! snapshot is live.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use rt_core::{EdgeId, EquipmentId, Millis, NodeId, StationId, VehicleId, ZoneKey};

use crate::edge::{ConveyorEdge, EdgeCost, EdgeRef, RailEdge, StkRmEdge, TransferEdge};
use crate::faults::FaultBook;
use crate::learner::Learner;
use crate::node::Node;
use crate::station::Station;
use crate::vehicle::Vehicle;
use crate::zones::{ZoneCounters, ZoneInfo};
use crate::{GraphError, GraphResult};

/// A rail segment marked unavailable by the cut list.
#[derive(Clone, Debug, PartialEq)]
pub struct RailCutRecord {
    pub edge: EdgeId,
    pub area: String,
    pub from_address: u32,
    pub to_address: u32,
}

/// Aggregate of consecutive rail edges between two decision points.
#[derive(Clone, Debug)]
pub struct BranchJoin {
    pub id: EdgeId,
    pub area: String,
    pub from: NodeId,
    pub to: NodeId,
    pub edges: Vec<EdgeId>,
    pub length_mm: f64,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EquipmentKind {
    Stocker,
    ProcessTool,
    Conveyor,
    Interface,
}

#[derive(Clone, Debug)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
    pub kind: EquipmentKind,
    pub ports: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct NetworkSnapshot {
    pub facility: String,
    /// Increases by one with every publish.
    pub generation: u64,
    pub built_at: Millis,
    pub learner: Learner,

    pub nodes: FxHashMap<NodeId, Arc<Node>>,
    pub rail_edges: FxHashMap<EdgeId, Arc<RailEdge>>,
    pub transfer_edges: FxHashMap<EdgeId, Arc<TransferEdge>>,
    pub stk_rm_edges: FxHashMap<EdgeId, Arc<StkRmEdge>>,
    pub conveyor_edges: FxHashMap<EdgeId, Arc<ConveyorEdge>>,
    pub stations: FxHashMap<StationId, Arc<Station>>,
    pub vehicles: FxHashMap<VehicleId, Arc<Vehicle>>,
    pub equipment: FxHashMap<EquipmentId, Equipment>,
    pub branch_joins: FxHashMap<EdgeId, BranchJoin>,
    pub zones: FxHashMap<ZoneKey, ZoneInfo>,
    pub rail_cuts: Vec<RailCutRecord>,
    /// Alias or port name → port node.
    pub port_aliases: FxHashMap<String, NodeId>,

    // ── Derived indices ───────────────────────────────────────────────────
    pub edges: FxHashMap<EdgeId, EdgeRef>,
    pub from_index: FxHashMap<NodeId, Vec<EdgeId>>,
    pub to_index: FxHashMap<NodeId, Vec<EdgeId>>,
    pub rail_out: FxHashMap<NodeId, Vec<EdgeId>>,
    pub rail_in: FxHashMap<NodeId, Vec<EdgeId>>,

    // ── Live bookkeeping ──────────────────────────────────────────────────
    pub zone_counts: ZoneCounters,
    pub faults: FaultBook,
}

impl NetworkSnapshot {
    /// A snapshot with no entities, used before the first build completes.
    pub fn empty(facility: impl Into<String>, learner: Learner) -> Self {
        Self { facility: facility.into(), learner, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn node(&self, id: &str) -> GraphResult<&Arc<Node>> {
        self.nodes.get(id).ok_or_else(|| GraphError::NodeNotFound(id.to_owned()))
    }

    pub fn edge(&self, id: &str) -> GraphResult<&EdgeRef> {
        self.edges.get(id).ok_or_else(|| GraphError::EdgeNotFound(id.to_owned()))
    }

    /// Resolve `id` through the global edge index and require a rail edge.
    pub fn rail_edge(&self, id: &str) -> GraphResult<&Arc<RailEdge>> {
        let edge = self.edge(id)?;
        edge.as_rail().ok_or_else(|| GraphError::NotRailEdge {
            id: id.to_owned(),
            kind: edge.kind_name(),
        })
    }

    pub fn vehicle(&self, id: &str) -> GraphResult<&Arc<Vehicle>> {
        self.vehicles.get(id).ok_or_else(|| GraphError::VehicleNotFound(id.to_owned()))
    }

    /// Rail edges leaving `node`, in index order.
    pub fn rail_out_edges<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a Arc<RailEdge>> + use<'a> {
        self.rail_out
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rail_edges.get(id))
    }

    /// Rail edges entering `node`, in index order.
    pub fn rail_in_edges<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a Arc<RailEdge>> + use<'a> {
        self.rail_in
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rail_edges.get(id))
    }

    /// Resolve a reported port name, trying aliases first.
    pub fn resolve_port(&self, name: &str) -> Option<&NodeId> {
        self.port_aliases.get(name)
    }

    // ── Index construction ────────────────────────────────────────────────

    /// Rebuild `edges` and the four adjacency indices from the typed edge
    /// maps.  Index lists are sorted by edge id so iteration is stable
    /// across builds.
    pub fn rebuild_indices(&mut self) {
        let mut edges: FxHashMap<EdgeId, EdgeRef> = FxHashMap::default();
        edges.extend(self.rail_edges.iter().map(|(k, e)| (k.clone(), EdgeRef::Rail(e.clone()))));
        edges.extend(
            self.transfer_edges.iter().map(|(k, e)| (k.clone(), EdgeRef::Transfer(e.clone()))),
        );
        edges.extend(self.stk_rm_edges.iter().map(|(k, e)| (k.clone(), EdgeRef::StkRm(e.clone()))));
        edges.extend(
            self.conveyor_edges.iter().map(|(k, e)| (k.clone(), EdgeRef::Conveyor(e.clone()))),
        );

        let mut from_index: FxHashMap<NodeId, Vec<EdgeId>> = FxHashMap::default();
        let mut to_index: FxHashMap<NodeId, Vec<EdgeId>> = FxHashMap::default();
        for (id, e) in &edges {
            from_index.entry(e.from_node().clone()).or_default().push(id.clone());
            to_index.entry(e.to_node().clone()).or_default().push(id.clone());
        }

        let mut rail_out: FxHashMap<NodeId, Vec<EdgeId>> = FxHashMap::default();
        let mut rail_in: FxHashMap<NodeId, Vec<EdgeId>> = FxHashMap::default();
        for (id, e) in &self.rail_edges {
            rail_out.entry(e.from.clone()).or_default().push(id.clone());
            rail_in.entry(e.to.clone()).or_default().push(id.clone());
        }

        for list in from_index
            .values_mut()
            .chain(to_index.values_mut())
            .chain(rail_out.values_mut())
            .chain(rail_in.values_mut())
        {
            list.sort();
        }

        self.edges = edges;
        self.from_index = from_index;
        self.to_index = to_index;
        self.rail_out = rail_out;
        self.rail_in = rail_in;
    }

    // ── Invariants ────────────────────────────────────────────────────────

    /// Check that every edge endpoint resolves to a node of this snapshot.
    pub fn check_references(&self) -> GraphResult<()> {
        for edge in self.edges.values() {
            for node in [edge.from_node(), edge.to_node()] {
                if !self.nodes.contains_key(node) {
                    return Err(GraphError::DanglingEdge {
                        edge: edge.id().clone(),
                        node: node.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
