//! Bounded breadth-first walks over edge adjacency.
//!
//! Two callers share [`bounded_walk`]:
//!
//! - the builder, which tags zone membership by walking forward from each
//!   zone entry until it meets an exit;
//! - fault detection, which walks backward from a stopped vehicle's edge to
//!   find the track and ports it blocks ([`affected_upstream`]).
//!
//! The walk is made cycle-safe by its visited set.  Cycles are then
//! *reported*, not hidden: after collection a Kahn pass over the collected
//! sub-graph tells whether it contains a directed cycle.  A separate edge cap
//! reports truncation when malformed data makes a walk run away.

use std::collections::{BTreeSet, VecDeque};
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use rt_core::EdgeId;

use crate::snapshot::NetworkSnapshot;

/// Result of a [`bounded_walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk<T> {
    /// Visited items in discovery order.
    pub items: Vec<T>,
    /// The collected sub-graph contains a directed cycle.
    pub cycle: bool,
    /// The walk hit `limit` before running out of work.
    pub truncated: bool,
}

/// Breadth-first walk from `starts`.
///
/// `next(item)` yields successors; `stop(item)` marks items that are
/// collected but not expanded.  At most `limit` items are collected.
pub fn bounded_walk<T, N, S, I>(starts: I, mut next: N, mut stop: S, limit: usize) -> Walk<T>
where
    T: Clone + Eq + Hash,
    I: IntoIterator<Item = T>,
    N: FnMut(&T) -> Vec<T>,
    S: FnMut(&T) -> bool,
{
    let mut visited: FxHashSet<T> = FxHashSet::default();
    let mut items: Vec<T> = Vec::new();
    let mut queue: VecDeque<T> = VecDeque::new();
    // Successor lists of expanded items, for the cycle pass.
    let mut succ: FxHashMap<T, Vec<T>> = FxHashMap::default();
    let mut truncated = false;

    for s in starts {
        if visited.insert(s.clone()) {
            queue.push_back(s);
        }
    }

    while let Some(item) = queue.pop_front() {
        if items.len() >= limit {
            truncated = true;
            break;
        }
        items.push(item.clone());
        if stop(&item) {
            continue;
        }
        let children = next(&item);
        for c in &children {
            if visited.insert(c.clone()) {
                queue.push_back(c.clone());
            }
        }
        succ.insert(item, children);
    }

    let cycle = has_cycle(&items, &succ);
    Walk { items, cycle, truncated }
}

/// Kahn's algorithm restricted to `items`.
fn has_cycle<T: Clone + Eq + Hash>(items: &[T], succ: &FxHashMap<T, Vec<T>>) -> bool {
    let members: FxHashSet<&T> = items.iter().collect();
    let mut indegree: FxHashMap<&T, usize> = items.iter().map(|i| (i, 0)).collect();
    for children in succ.values() {
        for c in children.iter().filter(|c| members.contains(c)) {
            if let Some(d) = indegree.get_mut(c) {
                *d += 1;
            }
        }
    }

    let mut ready: Vec<&T> = indegree.iter().filter(|(_, d)| **d == 0).map(|(i, _)| *i).collect();
    let mut removed = 0usize;
    while let Some(i) = ready.pop() {
        removed += 1;
        for c in succ.get(i).into_iter().flatten().filter(|c| members.contains(c)) {
            if let Some(d) = indegree.get_mut(c) {
                *d -= 1;
                if *d == 0 {
                    ready.push(c);
                }
            }
        }
    }
    removed < items.len()
}

// ── Affected area ─────────────────────────────────────────────────────────────

/// Track and ports blocked by a vehicle stopped on one rail edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affected {
    pub edges: Vec<EdgeId>,
    /// From-addresses of the blocked edges.
    pub addresses: BTreeSet<String>,
    /// Port names of stations on the blocked edges.
    pub ports: BTreeSet<String>,
}

/// Walk upstream from `edge` until traffic could divert.
///
/// An edge's predecessors are the rail edges entering its from-node; the
/// walk stops expanding at a node with more than one rail exit, because a
/// vehicle arriving there can take the other track.
pub fn affected_upstream(snapshot: &NetworkSnapshot, edge: &EdgeId, limit: usize) -> Affected {
    if !snapshot.rail_edges.contains_key(edge) {
        return Affected::default();
    }

    let walk = bounded_walk(
        [edge.clone()],
        |id: &EdgeId| {
            snapshot
                .rail_edges
                .get(id)
                .map(|e| snapshot.rail_in_edges(e.from.as_str()).map(|p| p.id.clone()).collect())
                .unwrap_or_default()
        },
        |id: &EdgeId| {
            snapshot
                .rail_edges
                .get(id)
                .and_then(|e| snapshot.nodes.get(&e.from))
                .is_some_and(|n| n.rail_point().is_some_and(|p| p.rail_branch))
        },
        limit,
    );

    let mut out = Affected::default();
    for id in &walk.items {
        let Some(e) = snapshot.rail_edges.get(id) else { continue };
        out.addresses.insert(e.from_address.to_string());
        for st in &e.station_ids {
            if let Some(station) = snapshot.stations.get(st) {
                out.ports.insert(station.port_name.clone());
            }
        }
    }
    out.edges = walk.items;
    out
}
