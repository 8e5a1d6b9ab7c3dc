//! Runtime state hand-over from the outgoing snapshot to a fresh build.
//!
//! Meant to run as the merge step of [`SnapshotStore::publish`], after
//! mutators have drained:
//!
//! ```ignore
//! let fresh = builder.build(&input)?;
//! store.publish(fresh, |old, new| { carry_forward(old, new); });
//! ```
//!
//! Entities are matched by id.  Anything only in the new snapshot keeps its
//! initial state; anything only in the old one is dropped.  Rail
//! availability is *not* carried: the new cut list decides it.
//!
//! [`SnapshotStore::publish`]: rt_graph::SnapshotStore::publish

use tracing::{debug, info};

use rt_graph::{EdgeRef, NetworkSnapshot, NodeState};

/// What [`carry_forward`] moved across.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CarryStats {
    pub edges: usize,
    pub nodes: usize,
    pub stations: usize,
    pub vehicles: usize,
    /// Same id, different edge family or node state shape.
    pub mismatched: usize,
}

/// Copy learned and operational state from `previous` into `next`.
pub fn carry_forward(previous: &NetworkSnapshot, next: &NetworkSnapshot) -> CarryStats {
    let mut stats = CarryStats::default();
    let learner = &next.learner;

    for (id, fresh) in &next.edges {
        let Some(old) = previous.edges.get(id) else { continue };
        match (old, fresh) {
            (EdgeRef::Rail(old), EdgeRef::Rail(new)) => {
                let mut rt = old.runtime();
                if rt.velocity <= 0.0 {
                    let initial = new.runtime();
                    rt.velocity = initial.velocity;
                    rt.last_velocity = initial.last_velocity;
                }
                new.restore(learner, rt);
            }
            (EdgeRef::Transfer(old), EdgeRef::Transfer(new)) => new.restore(old.runtime()),
            (EdgeRef::StkRm(old), EdgeRef::StkRm(new)) => new.restore(learner, old.runtime()),
            (EdgeRef::Conveyor(old), EdgeRef::Conveyor(new)) => {
                new.restore(learner, old.avg_cost_ms());
            }
            (old, new) => {
                debug!(edge = %id, was = old.kind_name(), now = new.kind_name(), "edge changed family");
                stats.mismatched += 1;
                continue;
            }
        }
        stats.edges += 1;
    }

    for (id, fresh) in &next.nodes {
        let Some(old) = previous.nodes.get(id) else { continue };
        let state = old.state();
        let same_shape = matches!(
            (&state, fresh.state()),
            (NodeState::Rail { .. }, NodeState::Rail { .. })
                | (NodeState::Port { .. }, NodeState::Port { .. })
                | (NodeState::Shelf { .. }, NodeState::Shelf { .. })
                | (NodeState::StockerRm { .. }, NodeState::StockerRm { .. })
        );
        if same_shape {
            fresh.set_state(state);
            stats.nodes += 1;
        } else {
            debug!(node = %id, "node changed kind, fresh state kept");
            stats.mismatched += 1;
        }
    }

    for (id, fresh) in &next.stations {
        if let Some(old) = previous.stations.get(id) {
            fresh.restore(old.state());
            stats.stations += 1;
        }
    }

    for (id, fresh) in &next.vehicles {
        if let Some(old) = previous.vehicles.get(id) {
            fresh.restore(old.record());
            stats.vehicles += 1;
        }
    }

    next.zone_counts.restore_from(&previous.zone_counts);
    next.faults.restore_from(&previous.faults);

    info!(
        edges = stats.edges,
        nodes = stats.nodes,
        stations = stats.stations,
        vehicles = stats.vehicles,
        mismatched = stats.mismatched,
        "runtime state carried forward"
    );
    stats
}
