//! Unit tests for rt-graph.
//!
//! All tests use hand-built snapshots; no builder involved.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use rt_core::{CadPoint, Direction, DrawPoint, EdgeId, NodeId};

    use crate::node::{Node, NodeKind, RailPoint};
    use crate::{Learner, NetworkSnapshot, RailEdge};

    pub const FAB: &str = "F";
    pub const AREA: &str = "A";
    /// 300 m/min = 5 mm/ms, so a 1000 mm edge costs 200 ms.
    pub const MAX_V: f64 = 300.0;

    pub fn nid(addr: u32) -> NodeId {
        NodeId::rail(FAB, AREA, addr)
    }

    pub fn eid(from: u32, to: u32) -> EdgeId {
        EdgeId::rail(FAB, AREA, from, to)
    }

    pub fn rail_edge(from: u32, to: u32, length_mm: f64) -> RailEdge {
        RailEdge::new(eid(from, to), nid(from), nid(to), AREA, from, to, Direction::Left, length_mm)
            .with_max_velocity(MAX_V)
    }

    /// Snapshot of rail nodes and edges `(from, to, length_mm)`.
    pub fn snapshot(edges: &[(u32, u32, f64)]) -> NetworkSnapshot {
        let mut snap = NetworkSnapshot::empty(FAB, Learner::default());
        for &(from, to, len) in edges {
            for addr in [from, to] {
                snap.nodes.entry(nid(addr)).or_insert_with(|| {
                    Arc::new(Node::new(
                        nid(addr),
                        NodeKind::Rail(RailPoint {
                            area: AREA.into(),
                            address: addr,
                            left_address: 0,
                            right_address: 0,
                            rail_branch: false,
                            rail_junction: false,
                            terminal: false,
                            bridged: false,
                        }),
                        DrawPoint::default(),
                        CadPoint::default(),
                    ))
                });
            }
            snap.rail_edges.insert(eid(from, to), Arc::new(rail_edge(from, to, len)));
        }
        snap.rebuild_indices();
        snap
    }

    /// Mutate a rail edge's topology in place, then re-derive the indices.
    pub fn edit_rail(snap: &mut NetworkSnapshot, id: &EdgeId, f: impl FnOnce(&mut RailEdge)) {
        snap.edges.clear();
        if let Some(e) = snap.rail_edges.get_mut(id).and_then(Arc::get_mut) {
            f(e);
        }
        snap.rebuild_indices();
    }

    pub fn ids(route: &crate::Route) -> Vec<String> {
        route.edges.iter().map(|e| e.id.to_string()).collect()
    }
}

// ── Learner ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod learner {
    use proptest::prelude::*;

    use crate::{Band, EdgeCost, Learner};
    use super::helpers::{rail_edge, MAX_V};

    #[test]
    fn blend_uses_weight() {
        let l = Learner::default();
        assert!((l.blend(100.0, 0.0) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_band_collapses() {
        let b = Band::new(10.0, 5.0);
        assert_eq!(b.clamp(100.0), 10.0);
        assert_eq!(b.clamp(0.0), 10.0);
    }

    #[test]
    fn stk_rm_resets_above_cap() {
        let l = Learner::default();
        assert_eq!(l.stk_rm_step(7_000.0, 1_000_000.0), l.stk_rm_default());
        assert!((l.stk_rm_step(7_000.0, 8_000.0) - 7_300.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let l = Learner::default();
        let e = rail_edge(1, 2, 1_000.0);
        e.observe(&l, f64::NAN);
        e.observe(&l, f64::INFINITY);
        assert_eq!(e.velocity(), MAX_V);
        assert!(!e.runtime().learned);
    }

    proptest! {
        #[test]
        fn rail_velocity_converges_and_stays_in_band(
            target in 1.5f64..300.0,
            noise in proptest::collection::vec(-1.0e6f64..1.0e6, 0..20),
        ) {
            let l = Learner::default();
            let e = rail_edge(1, 2, 1_000.0);
            e.record_traversal();
            let band = l.rail_band(MAX_V);
            for s in noise {
                e.observe(&l, s);
                prop_assert!(band.contains(e.velocity()));
            }
            for _ in 0..200 {
                e.observe(&l, target);
                prop_assert!(band.contains(e.velocity()));
            }
            prop_assert!((e.velocity() - target).abs() < 1e-6);
        }

        #[test]
        fn conveyor_cost_converges_and_stays_in_band(
            target in 300.0f64..30_000.0,
            noise in proptest::collection::vec(-1.0e7f64..1.0e7, 0..20),
        ) {
            use rt_core::{EdgeId, NodeId};
            let l = Learner::default();
            let e = crate::ConveyorEdge::new(
                EdgeId::from("c"), NodeId::from("a"), NodeId::from("b"), "CV1", &l,
            );
            let band = l.conveyor_band();
            for s in noise {
                e.observe(&l, s);
                prop_assert!(band.contains(e.avg_cost_ms()));
            }
            for _ in 0..200 {
                e.observe(&l, target);
            }
            prop_assert!((e.avg_cost_ms() - target).abs() < 1e-3);
        }

        #[test]
        fn stk_rm_cost_converges_below_cap(target in 0.0f64..100_000.0) {
            use rt_core::{EdgeId, NodeId};
            let l = Learner::default();
            let e = crate::StkRmEdge::new(
                EdgeId::from("r"), NodeId::from("p"), NodeId::from("rm"), "STK1", false, &l,
            );
            for _ in 0..200 {
                e.observe(&l, target);
                prop_assert!(e.avg_cost_ms() <= l.stk_rm_cap());
            }
            prop_assert!((e.avg_cost_ms() - target).abs() < 1e-3);
        }
    }
}

// ── Edges ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod edges {
    use std::time::Duration;

    use rt_core::{CarrierClass, EdgeId, NodeId, StationId, VehicleId};

    use crate::edge::{VELOCITY_UNSET, CONVEYOR_PORT_ACQUIRE_CALL_COST_MS};
    use crate::{EdgeCost, Learner, RailEdge, TransferEdge, TransferKind};
    use super::helpers::{eid, nid, rail_edge, AREA, MAX_V};

    #[test]
    fn new_rail_edge_is_unset_until_speed_class_applied() {
        let e = RailEdge::new(eid(1, 2), nid(1), nid(2), AREA, 1, 2, rt_core::Direction::Left, 10.0);
        assert_eq!(e.velocity(), VELOCITY_UNSET);
        assert_eq!(rail_edge(1, 2, 10.0).velocity(), MAX_V);
    }

    #[test]
    fn first_sample_replaces_then_blends() {
        let l = Learner::default();
        let e = rail_edge(1, 2, 1_000.0);
        e.observe(&l, 100.0);
        assert_eq!(e.velocity(), 100.0);
        assert_eq!(e.runtime().last_velocity, MAX_V);

        e.record_traversal();
        e.observe(&l, 200.0);
        assert!((e.velocity() - 130.0).abs() < 1e-9);
        assert_eq!(e.runtime().last_velocity, 100.0);
    }

    #[test]
    fn sample_is_clamped_to_band() {
        let l = Learner::default();
        let e = rail_edge(1, 2, 1_000.0);
        e.observe(&l, 10_000.0);
        assert_eq!(e.velocity(), MAX_V);
        e.observe(&l, -5.0);
        assert_eq!(e.velocity(), 1.5);
    }

    #[test]
    fn rail_cost_is_length_over_velocity() {
        let e = rail_edge(1, 2, 1_000.0);
        assert_eq!(e.cost(CarrierClass::All), Duration::from_millis(200));
    }

    #[test]
    fn loop_segments_admit_pods_only() {
        let mut e = rail_edge(1, 2, 1_000.0);
        e.loop_id = 4;
        assert!(e.available(CarrierClass::Pod));
        assert!(e.available(CarrierClass::All));
        assert!(!e.available(CarrierClass::Reticle));
        e.set_available(false);
        assert!(!e.available(CarrierClass::Pod));
    }

    #[test]
    fn occupancy_is_a_set() {
        let e = rail_edge(1, 2, 2_168.0);
        let v = VehicleId::from("F:VHL:A:V1");
        e.add_occupant(&v);
        e.add_occupant(&v);
        assert_eq!(e.occupant_count(), 1);
        assert!((e.density(1_084.0) - 50.0).abs() < 1e-9);
        assert!(e.remove_occupant(&v));
        assert!(!e.has_occupant(&v));
    }

    #[test]
    fn density_caps_at_full() {
        let e = rail_edge(1, 2, 500.0);
        e.add_occupant(&VehicleId::from("a"));
        assert_eq!(e.density(1_084.0), 100.0);
    }

    #[test]
    fn transfer_defaults_by_kind() {
        let mk = |kind, cnv| {
            TransferEdge::new(
                EdgeId::from("t"), NodeId::from("a"), NodeId::from("b"), kind,
                StationId::from("s"), 4_000.0, cnv,
            )
        };
        let acquire = mk(TransferKind::Acquire, false);
        assert_eq!(acquire.cost(CarrierClass::All), Duration::from_millis(27_000));
        let deposit = mk(TransferKind::Deposit, false);
        assert_eq!(deposit.avg_call_cost_ms(), 0.0);
        let cnv = mk(TransferKind::Acquire, true);
        assert_eq!(cnv.avg_call_cost_ms(), CONVEYOR_PORT_ACQUIRE_CALL_COST_MS);
        assert_eq!(mk(TransferKind::Deposit, true).avg_cost_ms(), 12_000.0);
    }

    #[test]
    fn transfer_observe_stays_in_band() {
        let l = Learner::default();
        let e = TransferEdge::new(
            EdgeId::from("t"), NodeId::from("a"), NodeId::from("b"), TransferKind::Acquire,
            StationId::from("s"), 4_000.0, false,
        );
        e.observe(&l, 1.0e9);
        assert!(e.avg_cost_ms() <= l.transfer_band().max);
        e.observe_call(&l, 0.0);
        assert!(e.avg_call_cost_ms() >= l.transfer_band().min);
    }
}

// ── Router ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod routing {
    use rt_core::CarrierClass;

    use crate::{DijkstraRouter, Router};
    use super::helpers::{edit_rail, eid, ids, nid, snapshot};

    #[test]
    fn prefers_cheaper_path() {
        // 1→2→4 costs 2 × 1000 mm; 1→3→4 costs 5000 + 1000 mm.
        let snap = snapshot(&[
            (1, 2, 1_000.0),
            (2, 4, 1_000.0),
            (1, 3, 5_000.0),
            (3, 4, 1_000.0),
        ]);
        let r = DijkstraRouter.route(&snap, &nid(1), &nid(4), CarrierClass::All);
        assert_eq!(ids(&r), vec![eid(1, 2).to_string(), eid(2, 4).to_string()]);
        assert_eq!(r.total_cost.as_millis(), 400);
        assert_eq!(r.length_mm(), 2_000.0);
    }

    #[test]
    fn same_node_is_empty() {
        let snap = snapshot(&[(1, 2, 1_000.0)]);
        assert!(DijkstraRouter.route(&snap, &nid(1), &nid(1), CarrierClass::All).is_empty());
    }

    #[test]
    fn disconnected_returns_empty() {
        let snap = snapshot(&[(1, 2, 1_000.0), (3, 4, 1_000.0)]);
        assert!(DijkstraRouter.route(&snap, &nid(1), &nid(4), CarrierClass::All).is_empty());
    }

    #[test]
    fn cut_segment_without_alternative_returns_empty() {
        let snap = snapshot(&[(1, 2, 1_000.0), (2, 3, 1_000.0)]);
        snap.rail_edges[&eid(2, 3)].set_available(false);
        assert!(DijkstraRouter.route(&snap, &nid(1), &nid(3), CarrierClass::All).is_empty());
    }

    #[test]
    fn never_uses_unavailable_edge() {
        let snap = snapshot(&[
            (1, 2, 1_000.0),
            (2, 4, 1_000.0),
            (1, 3, 5_000.0),
            (3, 4, 1_000.0),
        ]);
        snap.rail_edges[&eid(2, 4)].set_available(false);
        let r = DijkstraRouter.route(&snap, &nid(1), &nid(4), CarrierClass::All);
        assert_eq!(ids(&r), vec![eid(1, 3).to_string(), eid(3, 4).to_string()]);
        assert!(r.edges.iter().all(|e| e.is_available()));
    }

    #[test]
    fn loop_restriction_applies_per_class() {
        let mut snap = snapshot(&[(1, 2, 1_000.0), (2, 3, 1_000.0)]);
        edit_rail(&mut snap, &eid(2, 3), |e| e.loop_id = 7);
        assert_eq!(DijkstraRouter.route(&snap, &nid(1), &nid(3), CarrierClass::Pod).edges.len(), 2);
        assert!(DijkstraRouter.route(&snap, &nid(1), &nid(3), CarrierClass::Reticle).is_empty());
    }

    #[test]
    fn equal_cost_tie_goes_to_first_discovered() {
        // 1→2→4 and 1→3→4 cost the same; 1→2 sorts first in the index.
        let snap = snapshot(&[
            (1, 2, 1_000.0),
            (1, 3, 1_000.0),
            (2, 4, 1_000.0),
            (3, 4, 1_000.0),
        ]);
        let r = DijkstraRouter.route(&snap, &nid(1), &nid(4), CarrierClass::All);
        assert_eq!(ids(&r), vec![eid(1, 2).to_string(), eid(2, 4).to_string()]);
    }

    #[test]
    fn routes_around_a_loop() {
        let snap = snapshot(&[(1, 2, 1_000.0), (2, 3, 1_000.0), (3, 1, 1_000.0)]);
        let r = DijkstraRouter.route(&snap, &nid(2), &nid(1), CarrierClass::All);
        assert_eq!(ids(&r), vec![eid(2, 3).to_string(), eid(3, 1).to_string()]);
    }
}

// ── Snapshot ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod snapshot {
    use std::sync::Arc;

    use rt_core::{EdgeId, NodeId, StationId};

    use crate::{GraphError, TransferEdge, TransferKind};
    use super::helpers::{eid, nid, snapshot};

    #[test]
    fn indices_cover_every_edge() {
        let snap = snapshot(&[(1, 2, 1.0), (1, 3, 1.0), (3, 2, 1.0)]);
        assert_eq!(snap.edge_count(), 3);
        assert_eq!(snap.rail_out[&nid(1)].len(), 2);
        assert_eq!(snap.rail_in[&nid(2)].len(), 2);
        assert_eq!(snap.from_index[&nid(3)], vec![eid(3, 2)]);
        assert!(snap.check_references().is_ok());
    }

    #[test]
    fn rail_lookup_rejects_other_families() {
        let mut snap = snapshot(&[(1, 2, 1.0)]);
        let te = TransferEdge::new(
            EdgeId::from("F:TE:A:A:00001"), NodeId::from("F:EPN:P1"), nid(1),
            TransferKind::Acquire, StationId::from("s"), 4_000.0, false,
        );
        snap.transfer_edges.insert(te.id.clone(), Arc::new(te));
        snap.rebuild_indices();

        assert!(snap.rail_edge(eid(1, 2).as_str()).is_ok());
        assert!(matches!(
            snap.rail_edge("F:TE:A:A:00001"),
            Err(GraphError::NotRailEdge { kind: "transfer", .. })
        ));
        assert!(matches!(snap.rail_edge("nope"), Err(GraphError::EdgeNotFound(_))));
        // The port node was never added.
        assert!(matches!(snap.check_references(), Err(GraphError::DanglingEdge { .. })));
    }
}

// ── Store ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod store {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use crate::{Learner, NetworkSnapshot, SnapshotStore};
    use super::helpers::{eid, snapshot};

    #[test]
    fn publish_swaps_and_bumps_generation() {
        let store = SnapshotStore::new(NetworkSnapshot::empty("F", Learner::default()));
        assert_eq!(store.generation(), 0);
        assert!(store.read().is_empty());

        let mut saw_previous = false;
        store.publish(snapshot(&[(1, 2, 1.0)]), |prev, _next| {
            saw_previous = prev.is_empty();
        });
        assert!(saw_previous);
        assert_eq!(store.generation(), 1);
        assert_eq!(store.read().edge_count(), 1);
        assert!(!store.is_blocked());
    }

    #[test]
    fn merge_sees_old_runtime_before_readers_see_new() {
        let store = SnapshotStore::new(snapshot(&[(1, 2, 1_000.0)]));
        store.read().rail_edges[&eid(1, 2)].record_traversal();

        store.publish(snapshot(&[(1, 2, 1_000.0)]), |prev, next| {
            let old = prev.rail_edges[&eid(1, 2)].runtime();
            next.rail_edges[&eid(1, 2)].restore(&next.learner, old);
        });
        assert_eq!(store.read().rail_edges[&eid(1, 2)].traversals(), 1);
    }

    #[test]
    fn publish_waits_for_mutation_tickets() {
        let store = Arc::new(SnapshotStore::new(snapshot(&[(1, 2, 1.0)])));
        let published = Arc::new(AtomicBool::new(false));

        let ticket = store.enter();
        assert_eq!(store.active_mutators(), 1);

        let handle = {
            let store = Arc::clone(&store);
            let published = Arc::clone(&published);
            thread::spawn(move || {
                store.publish(snapshot(&[(1, 2, 1.0), (2, 3, 1.0)]), |_, _| {});
                published.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!published.load(Ordering::SeqCst), "publish must wait for the ticket");
        assert!(store.is_blocked());
        assert_eq!(ticket.edge_count(), 1);
        drop(ticket);

        handle.join().unwrap();
        assert!(published.load(Ordering::SeqCst));
        assert_eq!(store.read().edge_count(), 2);
        assert_eq!(store.active_mutators(), 0);
    }

    #[test]
    fn readers_see_whole_old_or_whole_new() {
        let store = Arc::new(SnapshotStore::new(snapshot(&[(1, 2, 1.0)])));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = store.read();
                        let n = snap.edge_count();
                        assert!(n == 1 || n == 3, "partial snapshot with {n} edges");
                        assert!(snap.check_references().is_ok());
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            store.publish(snapshot(&[(1, 2, 1.0), (2, 3, 1.0), (3, 1, 1.0)]), |_, _| {});
            store.publish(snapshot(&[(1, 2, 1.0)]), |_, _| {});
        }
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(store.generation(), 40);
    }
}

// ── Vehicles ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod vehicles {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use rt_core::VehicleId;

    use crate::{Vehicle, VehicleRecord};

    #[test]
    fn sequence_gate_discards_stale_and_duplicate() {
        let mut rec = VehicleRecord::default();
        assert!(rec.accept_sequence(10));
        assert!(!rec.accept_sequence(7));
        assert!(!rec.accept_sequence(10));
        assert_eq!(rec.last_sequence, Some(10));
        assert!(rec.accept_sequence(11));
        assert_eq!(rec.last_sequence, Some(11));
    }

    #[test]
    fn first_report_is_always_accepted() {
        let mut rec = VehicleRecord::default();
        assert!(rec.accept_sequence(0));
    }

    #[test]
    fn try_acquire_times_out_while_held() {
        let v = Arc::new(Vehicle::new(VehicleId::from("F:VHL:A:V1"), "V1", "A"));
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let v = Arc::clone(&v);
            thread::spawn(move || {
                let _guard = v.try_acquire(Duration::from_secs(1)).unwrap();
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        };

        locked_rx.recv().unwrap();
        let err = v.try_acquire(Duration::from_millis(20)).err().unwrap();
        assert_eq!(err.vehicle.as_str(), "F:VHL:A:V1");

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert!(v.try_acquire(Duration::from_millis(20)).is_ok());
    }

    #[test]
    fn guard_writes_are_visible_after_drop() {
        let v = Vehicle::new(VehicleId::from("v"), "V1", "A");
        {
            let mut g = v.try_acquire(Duration::from_millis(10)).unwrap();
            g.carrier_id = "C1".into();
        }
        assert_eq!(v.record().carrier_id, "C1");
    }
}

// ── Reachability ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod reach {
    use std::sync::Arc;

    use rt_core::{EdgeId, StationId};

    use crate::node::{Node, NodeKind, RailPoint};
    use crate::{affected_upstream, bounded_walk, Station, StationKind, StationLocation};
    use super::helpers::{edit_rail, eid, nid, snapshot, AREA};

    fn chain(n: u32) -> impl FnMut(&u32) -> Vec<u32> {
        move |i| if *i + 1 < n { vec![i + 1] } else { vec![] }
    }

    #[test]
    fn stops_at_stop_items() {
        let w = bounded_walk([0u32], chain(10), |i| *i == 3, 100);
        assert_eq!(w.items, vec![0, 1, 2, 3]);
        assert!(!w.cycle && !w.truncated);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let w = bounded_walk(
            [0u32],
            |i| match i {
                0 => vec![1, 2],
                1 | 2 => vec![3],
                _ => vec![],
            },
            |_| false,
            100,
        );
        assert_eq!(w.items.len(), 4);
        assert!(!w.cycle);
    }

    #[test]
    fn reports_cycle_without_exit() {
        let w = bounded_walk([0u32], |i| vec![(i + 1) % 4], |_| false, 100);
        assert_eq!(w.items.len(), 4);
        assert!(w.cycle);
        assert!(!w.truncated);
    }

    #[test]
    fn exit_breaks_the_cycle() {
        let w = bounded_walk([0u32], |i| vec![(i + 1) % 4], |i| *i == 3, 100);
        assert!(!w.cycle);
    }

    #[test]
    fn reports_truncation() {
        let w = bounded_walk([0u32], chain(1_000), |_| false, 10);
        assert_eq!(w.items.len(), 10);
        assert!(w.truncated);
    }

    #[test]
    fn affected_walk_stops_at_branch() {
        // 5 → 1 → 2 → 3, with 1 also branching to 9.
        let mut snap = snapshot(&[(5, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (1, 9, 1.0)]);
        snap.nodes.insert(
            nid(1),
            Arc::new(Node::new(
                nid(1),
                NodeKind::Rail(RailPoint {
                    area: AREA.into(),
                    address: 1,
                    left_address: 2,
                    right_address: 9,
                    rail_branch: true,
                    rail_junction: false,
                    terminal: false,
                    bridged: false,
                }),
                Default::default(),
                Default::default(),
            )),
        );
        let st = Station::new(
            StationId::mint("F", AREA, 1), AREA, 1, 2, StationLocation::LeftBranch,
            StationKind::Dual, eid(2, 3), "EQP1_P1",
        );
        snap.stations.insert(st.id.clone(), Arc::new(st));
        edit_rail(&mut snap, &eid(2, 3), |e| e.station_ids.push(StationId::mint("F", AREA, 1)));

        let a = affected_upstream(&snap, &eid(2, 3), 50);
        assert_eq!(a.edges, vec![eid(2, 3), eid(1, 2)]);
        assert_eq!(a.addresses.iter().cloned().collect::<Vec<_>>(), vec!["1", "2"]);
        assert!(a.ports.contains("EQP1_P1"));
    }

    #[test]
    fn affected_walk_of_unknown_edge_is_empty() {
        let snap = snapshot(&[(1, 2, 1.0)]);
        assert!(affected_upstream(&snap, &EdgeId::from("missing"), 10).edges.is_empty());
    }
}

// ── Zones ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod zones {
    use rt_core::{ZoneId, ZoneKey};

    use crate::ZoneCounters;

    #[test]
    fn counters_saturate_at_zero() {
        let z = ZoneCounters::default();
        let k = ZoneKey::mint("F", "A", ZoneId(3));
        z.decrement(&k);
        assert_eq!(z.get(k.as_str()), 0);
        z.increment(&k);
        z.increment(&k);
        z.decrement(&k);
        assert_eq!(z.get(k.as_str()), 1);
    }

    #[test]
    fn restore_overlays_counts() {
        let a = ZoneCounters::default();
        let b = ZoneCounters::default();
        let k1 = ZoneKey::mint("F", "A", ZoneId(1));
        let k2 = ZoneKey::mint("F", "A", ZoneId(2));
        a.register(k1.clone());
        b.increment(&k2);
        a.restore_from(&b);
        assert_eq!(a.entries(), vec![(k1, 0), (k2, 1)]);
    }
}
