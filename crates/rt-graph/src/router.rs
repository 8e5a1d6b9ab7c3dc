//! Routing trait and default Dijkstra implementation.
//!
//! # Scope
//!
//! Only rail edges take part.  Transfer, stocker-RM and conveyor edges are
//! never relaxed, and neither is any rail edge whose `available(class)` is
//! false for the requested carrier class.
//!
//! # Unreachable targets
//!
//! A cut or a bad merge can legitimately split the rail graph.  The router
//! answers that with an empty [`Route`] and a debug log; callers treat an
//! empty route as "no attribution possible", not as a failure.
//!
//! # Cost units
//!
//! Edge weights are whole milliseconds from [`EdgeCost::cost`].

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use rt_core::{CarrierClass, NodeId};

use crate::edge::{EdgeCost, RailEdge};
use crate::snapshot::NetworkSnapshot;

// ── Route ─────────────────────────────────────────────────────────────────────

/// Ordered rail edges from source to destination.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub edges: Vec<Arc<RailEdge>>,
    pub total_cost: Duration,
}

impl Route {
    /// `true` when no path was found, or source and destination coincide.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn length_mm(&self) -> f64 {
        self.edges.iter().map(|e| e.length_mm).sum()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// by every report worker.
pub trait Router: Send + Sync {
    fn route(
        &self,
        snapshot: &NetworkSnapshot,
        from: &NodeId,
        to: &NodeId,
        class: CarrierClass,
    ) -> Route;
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Textbook Dijkstra with a binary heap and a settled set.
///
/// Ties are broken by discovery order: heap entries carry the sequence
/// number of the push, and relaxation only replaces a tentative distance on
/// a strictly smaller cost, so the first edge to reach a node at a given
/// cost keeps it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn route(
        &self,
        snapshot: &NetworkSnapshot,
        from: &NodeId,
        to: &NodeId,
        class: CarrierClass,
    ) -> Route {
        dijkstra(snapshot, from, to, class)
    }
}

fn dijkstra(snapshot: &NetworkSnapshot, from: &NodeId, to: &NodeId, class: CarrierClass) -> Route {
    if from == to {
        return Route::default();
    }

    let mut dist: FxHashMap<&NodeId, u64> = FxHashMap::default();
    // prev_edge[v] = the rail edge that reached v.
    let mut prev_edge: FxHashMap<&NodeId, &Arc<RailEdge>> = FxHashMap::default();
    let mut settled: FxHashSet<&NodeId> = FxHashSet::default();

    // Min-heap on (cost, push order).  Nodes ride along by index into `order`.
    let mut order: Vec<&NodeId> = Vec::new();
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();

    dist.insert(from, 0);
    order.push(from);
    heap.push(Reverse((0, 0)));

    while let Some(Reverse((cost, slot))) = heap.pop() {
        let node = order[slot];
        if !settled.insert(node) {
            continue;
        }
        if node == to {
            return reconstruct(&prev_edge, from, to, cost);
        }

        for edge in snapshot.rail_out_edges(node.as_str()) {
            if !edge.available(class) {
                continue;
            }
            let next = &edge.to;
            if settled.contains(next) {
                continue;
            }
            let weight = edge.cost(class).as_millis() as u64;
            let new_cost = cost.saturating_add(weight);
            let better = dist.get(next).is_none_or(|&d| new_cost < d);
            if better {
                dist.insert(next, new_cost);
                prev_edge.insert(next, edge);
                order.push(next);
                heap.push(Reverse((new_cost, order.len() - 1)));
            }
        }
    }

    debug!(%from, %to, "no rail route");
    Route::default()
}

fn reconstruct(
    prev_edge: &FxHashMap<&NodeId, &Arc<RailEdge>>,
    from: &NodeId,
    to: &NodeId,
    total_ms: u64,
) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    while cur != from {
        let Some(edge) = prev_edge.get(cur) else {
            break;
        };
        edges.push(Arc::clone(edge));
        cur = &edge.from;
    }
    edges.reverse();
    Route { edges, total_cost: Duration::from_millis(total_ms) }
}
