//! Unit tests for rt-build.
//!
//! The fixture is a five-point ring with one bypass:
//!
//! ```text
//!   1 ──► 2 ──► 3 ──► 4 ──► 1
//!         │     ▲
//!         └► 5 ─┘
//! ```
//!
//! Point 2 is the only rail branch and point 3 the only junction.

#[cfg(test)]
mod helpers {
    use std::collections::BTreeMap;

    use rt_core::{Config, DrawPoint, FacilityConfig, PortKind};
    use rt_graph::{EquipmentKind, StationKind, StationLocation};

    use crate::raw::*;
    use crate::GraphBuilder;

    pub const FAB: &str = "F";
    pub const AREA: &str = "A";

    pub fn point(address: u32, left: u32, right: u32) -> RawPoint {
        RawPoint {
            address,
            left_address: left,
            right_address: right,
            left_distance_mm: if left > 0 { 1_000.0 } else { 0.0 },
            right_distance_mm: if right > 0 { 1_000.0 } else { 0.0 },
            left_speed: 1,
            right_speed: 1,
            draw: DrawPoint::new(f64::from(address), 0.0),
            ..RawPoint::default()
        }
    }

    pub fn port(name: &str, kind: PortKind, equipment: &str) -> PortRecord {
        PortRecord {
            name: name.into(),
            kind,
            equipment: equipment.into(),
            area: Some(AREA.into()),
            rm_direction: RmDirection::Both,
            draw: DrawPoint::default(),
            cad: Default::default(),
        }
    }

    pub fn station(no: u32, address: u32, location: StationLocation, port_id: &str) -> RawStation {
        RawStation { station_no: no, address, location, kind: StationKind::Dual, port_id: port_id.into() }
    }

    pub fn ring() -> AreaTopology {
        AreaTopology {
            name: AREA.into(),
            points: vec![
                point(1, 2, 0),
                point(2, 3, 5),
                point(3, 4, 0),
                point(4, 1, 0),
                point(5, 3, 0),
            ],
            speed_classes: BTreeMap::from([(1, 240.0)]),
            ..AreaTopology::default()
        }
    }

    /// Ring plus one of every station and equipment flavour.
    pub fn facility() -> BuildInput {
        let mut area = ring();
        area.stations = vec![
            station(1, 2, StationLocation::LeftBranch, "EQ1_P1"),
            station(2, 5, StationLocation::NoCondition, ""),
            station(3, 3, StationLocation::NoCondition, "BR_P1"),
            station(4, 2, StationLocation::RightBranch, "EQ1-P2"),
        ];
        area.zones = vec![RawRegion { id: 12, entries: vec![(2, 5)], exits: vec![(5, 3)] }];
        area.cuts = vec![(4, 1)];

        BuildInput {
            facility: FAB.into(),
            areas: vec![area],
            ports: vec![
                port("EQ1_P1", PortKind::EquipmentPort, "EQ1"),
                port("BR_P1", PortKind::InterfacePort, "BRIDGE"),
                port("STK1_P1", PortKind::StockerPort, "STK1"),
                port("CV1_A", PortKind::ConveyorPort, "CV1"),
                port("CV1_B", PortKind::ConveyorPort, "CV1"),
            ],
            equipment: vec![
                EquipmentRecord { name: "EQ1".into(), kind: EquipmentKind::ProcessTool, ports: vec!["EQ1_P1".into()] },
                EquipmentRecord { name: "BRIDGE".into(), kind: EquipmentKind::Interface, ports: vec!["BR_P1".into()] },
                EquipmentRecord { name: "STK1".into(), kind: EquipmentKind::Stocker, ports: vec!["STK1_P1".into()] },
                EquipmentRecord {
                    name: "CV1".into(),
                    kind: EquipmentKind::Conveyor,
                    ports: vec!["CV1_A".into(), "CV1_B".into()],
                },
            ],
            vehicles: vec![RawVehicle { name: "V001".into(), area: AREA.into() }],
            aliases: vec![PortAliasRecord { alias: "EQ1_LP1".into(), port: "EQ1_P1".into() }],
        }
    }

    pub fn config() -> Config {
        let mut config = Config::default();
        config.build.workers = 2;
        config.facilities.push(FacilityConfig {
            id: FAB.into(),
            fac_id: "FAB01".into(),
            subscribers: Vec::new(),
            bridge_from: vec!["BRIDGE".into()],
            areas: Vec::new(),
        });
        config
    }

    pub fn builder() -> GraphBuilder {
        GraphBuilder::new(config()).unwrap()
    }
}

// ── Rail layout ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod rail {
    use rt_core::{EdgeId, NodeId};

    use super::helpers::*;

    #[test]
    fn one_edge_per_populated_side() {
        let snap = builder().build(&facility()).unwrap();
        assert_eq!(snap.rail_edges.len(), 6);
        let e = snap.rail_edge(EdgeId::rail(FAB, AREA, 2, 5).as_str()).unwrap();
        assert_eq!(e.length_mm, 1_000.0);
        assert_eq!(e.max_velocity, 240.0);
        assert_eq!(e.velocity(), 240.0);
    }

    #[test]
    fn branch_and_junction_flags_follow_degree() {
        let snap = builder().build(&facility()).unwrap();
        for addr in 1..=5 {
            let id = NodeId::rail(FAB, AREA, addr);
            let p = snap.node(id.as_str()).unwrap().rail_point().unwrap().clone();
            let outs = snap.rail_out.get(&id).map_or(0, Vec::len);
            let ins = snap.rail_in.get(&id).map_or(0, Vec::len);
            assert_eq!(p.rail_branch, outs > 1, "branch flag at {addr}");
            assert_eq!(p.rail_junction, ins > 1, "junction flag at {addr}");
        }
        let two = snap.node(NodeId::rail(FAB, AREA, 2).as_str()).unwrap();
        assert!(two.rail_point().unwrap().rail_branch);
    }

    #[test]
    fn cut_segments_are_unavailable_and_listed() {
        let snap = builder().build(&facility()).unwrap();
        let cut = EdgeId::rail(FAB, AREA, 4, 1);
        assert!(!snap.rail_edge(cut.as_str()).unwrap().is_available());
        assert_eq!(snap.rail_cuts.len(), 1);
        assert_eq!(snap.rail_cuts[0].edge, cut);
        assert_eq!((snap.rail_cuts[0].from_address, snap.rail_cuts[0].to_address), (4, 1));
    }

    #[test]
    fn zero_distance_falls_back_to_drawing() {
        let mut input = facility();
        input.areas[0].points[0].left_distance_mm = 0.0;
        let snap = builder().build(&input).unwrap();
        // Draw x is the address, so 1 → 2 is one drawing unit apart.
        let e = snap.rail_edge(EdgeId::rail(FAB, AREA, 1, 2).as_str()).unwrap();
        assert_eq!(e.length_mm, 1.0);
    }

    #[test]
    fn edges_to_unknown_points_are_skipped() {
        let mut input = facility();
        input.areas[0].points[2].right_address = 99;
        let snap = builder().build(&input).unwrap();
        assert_eq!(snap.rail_edges.len(), 6);
    }

    #[test]
    fn every_edge_endpoint_resolves() {
        let snap = builder().build(&facility()).unwrap();
        snap.check_references().unwrap();
        for node in snap.nodes.values() {
            let outs = snap.from_index.get(&node.id).cloned().unwrap_or_default();
            let ins = snap.to_index.get(&node.id).cloned().unwrap_or_default();
            assert_eq!(node.out_edges, outs, "out edges of {}", node.id);
            assert_eq!(node.in_edges, ins, "in edges of {}", node.id);
        }
    }
}

// ── Mandatory stages ──────────────────────────────────────────────────────────

#[cfg(test)]
mod failures {
    use super::helpers::*;
    use crate::raw::AreaTopology;
    use crate::BuildError;

    #[test]
    fn empty_area_fails_stage_two() {
        let mut input = facility();
        input.areas.push(AreaTopology { name: "EMPTY".into(), ..AreaTopology::default() });
        match builder().build(&input) {
            Err(BuildError::MandatoryStage { stage: 2, area, .. }) => assert_eq!(area, "EMPTY"),
            other => panic!("expected stage 2 failure, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_station_fails() {
        let mut input = facility();
        let dup = input.areas[0].stations[0].clone();
        input.areas[0].stations.push(dup);
        assert!(matches!(builder().build(&input), Err(BuildError::DuplicateStation(_))));
    }
}

// ── Stations and transfer edges ───────────────────────────────────────────────

#[cfg(test)]
mod stations {
    use rt_core::{EdgeId, NodeId, PortKind, StationId};
    use rt_graph::EdgeRef;

    use super::helpers::*;

    #[test]
    fn linked_station_gets_both_transfer_edges() {
        let snap = builder().build(&facility()).unwrap();
        let st = &snap.stations[StationId::mint(FAB, AREA, 1).as_str()];
        let port = NodeId::port(FAB, PortKind::EquipmentPort, "EQ1_P1");
        assert_eq!(st.rail_edge, EdgeId::rail(FAB, AREA, 2, 3));
        assert_eq!(st.port_node.as_ref(), Some(&port));

        let acquire = &snap.transfer_edges[EdgeId::acquire(FAB, AREA, 1).as_str()];
        assert_eq!(acquire.from, port);
        assert_eq!(acquire.to, NodeId::rail(FAB, AREA, 2));
        assert_eq!(acquire.length_mm, 4_000.0);
        let deposit = &snap.transfer_edges[EdgeId::deposit(FAB, AREA, 1).as_str()];
        assert_eq!(deposit.to, port);

        let rail = snap.rail_edge(EdgeId::rail(FAB, AREA, 2, 3).as_str()).unwrap();
        assert!(rail.station_ids.contains(&st.id));
        assert!(matches!(snap.edges.get(&acquire.id), Some(EdgeRef::Transfer(_))));
    }

    #[test]
    fn invalid_port_names_drop_the_station() {
        let snap = builder().build(&facility()).unwrap();
        assert!(!snap.stations.contains_key(StationId::mint(FAB, AREA, 2).as_str()));
        assert!(!snap.stations.contains_key(StationId::mint(FAB, AREA, 4).as_str()));
        let bypass = snap.rail_edge(EdgeId::rail(FAB, AREA, 5, 3).as_str()).unwrap();
        assert!(bypass.station_ids.is_empty());
    }

    #[test]
    fn bridged_port_marks_the_rail_point_only() {
        let snap = builder().build(&facility()).unwrap();
        let st = &snap.stations[StationId::mint(FAB, AREA, 3).as_str()];
        assert!(st.port_node.is_none());
        assert!(!snap.transfer_edges.contains_key(EdgeId::acquire(FAB, AREA, 3).as_str()));
        let rail = snap.node(NodeId::rail(FAB, AREA, 3).as_str()).unwrap();
        assert!(rail.rail_point().unwrap().bridged);
        assert!(snap.resolve_port("BR_P1").is_none());
    }

    #[test]
    fn aliases_resolve_to_port_nodes() {
        let snap = builder().build(&facility()).unwrap();
        let port = NodeId::port(FAB, PortKind::EquipmentPort, "EQ1_P1");
        assert_eq!(snap.resolve_port("EQ1_P1"), Some(&port));
        assert_eq!(snap.resolve_port("EQ1_LP1"), Some(&port));
    }
}

// ── Equipment ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod equipment {
    use rt_core::{EdgeId, NodeId, PortKind, VehicleId};

    use super::helpers::*;

    #[test]
    fn stocker_gets_rm_node_and_edges_both_ways() {
        let snap = builder().build(&facility()).unwrap();
        let rm = NodeId::stocker_rm(FAB, "STK1");
        let port = NodeId::port(FAB, PortKind::StockerPort, "STK1_P1");
        assert!(snap.nodes.contains_key(&rm));

        let inbound = &snap.stk_rm_edges[EdgeId::stocker_rm(FAB, "STK1", "STK1_P1", false).as_str()];
        assert_eq!((&inbound.from, &inbound.to), (&port, &rm));
        let outbound = &snap.stk_rm_edges[EdgeId::stocker_rm(FAB, "STK1", "STK1_P1", true).as_str()];
        assert_eq!((&outbound.from, &outbound.to), (&rm, &port));
        assert_eq!(inbound.avg_cost_ms(), 7_000.0);
    }

    #[test]
    fn conveyor_links_consecutive_ports() {
        let snap = builder().build(&facility()).unwrap();
        assert_eq!(snap.conveyor_edges.len(), 1);
        let e = &snap.conveyor_edges[EdgeId::conveyor(FAB, "CV1", "CV1_A", "CV1_B").as_str()];
        assert_eq!(e.avg_cost_ms(), 300.0);
    }

    #[test]
    fn equipment_and_vehicles_are_registered() {
        let snap = builder().build(&facility()).unwrap();
        assert_eq!(snap.equipment.len(), 4);
        let v = snap.vehicle(VehicleId::mint(FAB, AREA, "V001").as_str()).unwrap();
        assert_eq!(v.name, "V001");
        assert_eq!(v.record().last_sequence, None);
    }
}

// ── Branch joins ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod joins {
    use rt_core::{Direction, EdgeId, NodeId};

    use super::helpers::*;

    #[test]
    fn groups_cover_every_rail_edge() {
        let snap = builder().build(&facility()).unwrap();
        assert_eq!(snap.branch_joins.len(), 3);
        for e in snap.rail_edges.values() {
            let group = e.branch_join.as_ref().expect("every edge grouped");
            assert!(snap.branch_joins[group].edges.contains(&e.id));
        }

        let bypass = EdgeId::branch_join(FAB, AREA, 2, Direction::Right, 3);
        let join = &snap.branch_joins[&bypass];
        assert_eq!(join.edges, vec![EdgeId::rail(FAB, AREA, 2, 5), EdgeId::rail(FAB, AREA, 5, 3)]);
        assert_eq!(join.to, NodeId::rail(FAB, AREA, 3));
        assert_eq!(join.length_mm, 2_000.0);
    }

    #[test]
    fn ids_are_stable_across_rebuilds() {
        let builder = builder();
        let first = builder.build(&facility()).unwrap();
        let second = builder.build(&facility()).unwrap();
        let mut a: Vec<_> = first.branch_joins.keys().cloned().collect();
        let mut b: Vec<_> = second.branch_joins.keys().cloned().collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert_eq!(builder.remembered_joins(), 3);
    }
}

// ── Zones and loops ───────────────────────────────────────────────────────────

#[cfg(test)]
mod regions {
    use rt_core::{EdgeId, ZoneId, ZoneKey};

    use super::helpers::*;
    use crate::raw::RawRegion;

    #[test]
    fn zone_walk_stops_at_exit() {
        let snap = builder().build(&facility()).unwrap();
        let key = ZoneKey::mint(FAB, AREA, ZoneId(12));
        let zone = &snap.zones[&key];
        assert_eq!(zone.edges, vec![EdgeId::rail(FAB, AREA, 2, 5), EdgeId::rail(FAB, AREA, 5, 3)]);
        assert_eq!(zone.addresses, vec!["2".to_string(), "5".to_string()]);
        assert_eq!(snap.rail_edge(EdgeId::rail(FAB, AREA, 5, 3).as_str()).unwrap().zone, ZoneId(12));
        assert_eq!(snap.rail_edge(EdgeId::rail(FAB, AREA, 2, 3).as_str()).unwrap().zone, ZoneId::UNZONED);
        assert_eq!(snap.zone_counts.get(key.as_str()), 0);
        assert!(snap.zone_counts.entries().iter().any(|(k, _)| k == &key));
    }

    #[test]
    fn zone_without_exit_terminates_on_a_ring() {
        let mut input = facility();
        input.areas[0].zones = vec![RawRegion { id: 7, entries: vec![(3, 4)], exits: vec![] }];
        let snap = builder().build(&input).unwrap();
        let zone = &snap.zones[&ZoneKey::mint(FAB, AREA, ZoneId(7))];
        assert_eq!(zone.edges.len(), 6);
    }

    #[test]
    fn zone_lists_station_ports() {
        let mut input = facility();
        input.areas[0].zones = vec![RawRegion { id: 3, entries: vec![(2, 3)], exits: vec![(2, 3)] }];
        let snap = builder().build(&input).unwrap();
        let zone = &snap.zones[&ZoneKey::mint(FAB, AREA, ZoneId(3))];
        assert_eq!(zone.ports, vec!["EQ1_P1".to_string()]);
    }

    #[test]
    fn loop_membership_is_tagged() {
        let mut input = facility();
        input.areas[0].loops = vec![RawRegion { id: 2, entries: vec![(3, 4)], exits: vec![(1, 2)] }];
        let snap = builder().build(&input).unwrap();
        for (from, to) in [(3, 4), (4, 1), (1, 2)] {
            assert_eq!(snap.rail_edge(EdgeId::rail(FAB, AREA, from, to).as_str()).unwrap().loop_id, 2);
        }
        assert_eq!(snap.rail_edge(EdgeId::rail(FAB, AREA, 2, 3).as_str()).unwrap().loop_id, -1);
    }

    #[test]
    fn unknown_entry_segment_is_ignored() {
        let mut input = facility();
        input.areas[0].zones = vec![RawRegion { id: 5, entries: vec![(9, 8)], exits: vec![] }];
        let snap = builder().build(&input).unwrap();
        assert!(snap.zones[&ZoneKey::mint(FAB, AREA, ZoneId(5))].edges.is_empty());
    }
}

// ── Carry forward ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod carry {
    use rt_core::{EdgeId, Millis, NodeId, PortKind, StationId, VehicleId, ZoneId, ZoneKey};
    use rt_graph::{
        EdgeRef, FaultState, NodeState, SnapshotStore, StageRecord, TransferRuntime, ZoneFaultRecord,
    };

    use super::helpers::*;
    use crate::{carry_forward, GraphBuilder};

    #[test]
    fn learned_velocity_survives_republish() {
        let builder = builder();
        let store = SnapshotStore::new(builder.build(&facility()).unwrap());
        let id = EdgeId::rail(FAB, AREA, 2, 3);
        {
            let live = store.read();
            let edge = live.rail_edge(id.as_str()).unwrap();
            let mut rt = edge.runtime();
            rt.velocity = 42.0;
            rt.traversals = 3;
            edge.restore(&live.learner, rt);
            live.zone_counts.increment(&ZoneKey::mint(FAB, AREA, ZoneId(12)));
        }

        let mut stats = None;
        let fresh = builder.build(&facility()).unwrap();
        let live = store.publish(fresh, |old, new| stats = Some(carry_forward(old, new)));

        let edge = live.rail_edge(id.as_str()).unwrap();
        assert_eq!(edge.velocity(), 42.0);
        assert_eq!(edge.traversals(), 3);
        assert_eq!(live.zone_counts.get(ZoneKey::mint(FAB, AREA, ZoneId(12)).as_str()), 1);
        assert_eq!(live.generation, 1);
        let stats = stats.unwrap();
        assert_eq!(stats.edges, live.edge_count());
        assert_eq!(stats.vehicles, 1);
        assert_eq!(stats.mismatched, 0);
    }

    #[test]
    fn new_cut_list_wins_over_old_availability() {
        let builder = builder();
        let old = builder.build(&facility()).unwrap();
        let mut input = facility();
        input.areas[0].cuts.clear();
        let new = builder.build(&input).unwrap();
        carry_forward(&old, &new);
        assert!(new.rail_edge(EdgeId::rail(FAB, AREA, 4, 1).as_str()).unwrap().is_available());
    }

    #[test]
    fn vehicle_record_is_carried() {
        let builder = builder();
        let old = builder.build(&facility()).unwrap();
        let vid = VehicleId::mint(FAB, AREA, "V001");
        old.vehicles[&vid].try_acquire(std::time::Duration::from_millis(10)).unwrap().accept_sequence(9);
        let new = builder.build(&facility()).unwrap();
        carry_forward(&old, &new);
        assert_eq!(new.vehicles[&vid].record().last_sequence, Some(9));
    }

    #[test]
    fn occupants_survive_republish() {
        let builder = builder();
        let store = SnapshotStore::new(builder.build(&facility()).unwrap());
        let id = EdgeId::rail(FAB, AREA, 1, 2);
        let vid = VehicleId::mint(FAB, AREA, "V001");
        store.read().rail_edge(id.as_str()).unwrap().add_occupant(&vid);

        let live = store.publish(builder.build(&facility()).unwrap(), |old, new| {
            carry_forward(old, new);
        });
        let edge = live.rail_edge(id.as_str()).unwrap();
        assert!(edge.has_occupant(&vid));
        assert_eq!(edge.occupant_count(), 1);
    }

    #[test]
    fn transfer_and_conveyor_costs_are_carried() {
        let builder = builder();
        let old = builder.build(&facility()).unwrap();
        let acquire = EdgeId::acquire(FAB, AREA, 1);
        let conveyor = EdgeId::conveyor(FAB, "CV1", "CV1_A", "CV1_B");
        {
            let t = &old.transfer_edges[acquire.as_str()];
            t.restore(TransferRuntime { avg_cost_ms: 9_000.0, avg_call_cost_ms: 1_500.0, carrier_id: None });
            t.assign_carrier(Some("CAR7".into()));
            old.conveyor_edges[conveyor.as_str()].restore(&old.learner, 5_000.0);
        }

        let new = builder.build(&facility()).unwrap();
        let stats = carry_forward(&old, &new);
        let rt = new.transfer_edges[acquire.as_str()].runtime();
        assert_eq!((rt.avg_cost_ms, rt.avg_call_cost_ms), (9_000.0, 1_500.0));
        assert_eq!(rt.carrier_id.as_deref(), Some("CAR7"));
        assert_eq!(new.conveyor_edges[conveyor.as_str()].avg_cost_ms(), 5_000.0);
        assert_eq!(stats.edges, new.edge_count());
    }

    #[test]
    fn stocker_rm_cost_and_carriers_are_carried() {
        let builder = builder();
        let old = builder.build(&facility()).unwrap();
        let id = EdgeId::stocker_rm(FAB, "STK1", "STK1_P1", true);
        let rm = &old.stk_rm_edges[id.as_str()];
        let mut rt = rm.runtime();
        rt.avg_cost_ms = 12_000.0;
        rm.restore(&old.learner, rt);
        rm.start_moving("CAR1");
        rm.start_moving("CAR2");
        assert!(rm.finish_moving("CAR2"));

        let new = builder.build(&facility()).unwrap();
        carry_forward(&old, &new);
        let rt = new.stk_rm_edges[id.as_str()].runtime();
        assert_eq!(rt.avg_cost_ms, 12_000.0);
        assert!(rt.moving_carriers.contains("CAR1"));
        assert!(!rt.moving_carriers.contains("CAR2"));
    }

    #[test]
    fn stocker_rm_cost_above_the_new_cap_resets_to_default() {
        let mut loose = config();
        loose.learner.stk_rm_cost_cap_ms = 500_000.0;
        let old = GraphBuilder::new(loose).unwrap().build(&facility()).unwrap();
        let id = EdgeId::stocker_rm(FAB, "STK1", "STK1_P1", false);
        let rm = &old.stk_rm_edges[id.as_str()];
        let mut rt = rm.runtime();
        rt.avg_cost_ms = 200_000.0;
        rm.restore(&old.learner, rt);
        assert_eq!(rm.avg_cost_ms(), 200_000.0);

        let new = builder().build(&facility()).unwrap();
        carry_forward(&old, &new);
        assert_eq!(new.stk_rm_edges[id.as_str()].avg_cost_ms(), new.learner.stk_rm_default());
    }

    #[test]
    fn node_and_station_state_are_carried() {
        let builder = builder();
        let old = builder.build(&facility()).unwrap();
        let port = NodeId::port(FAB, PortKind::EquipmentPort, "EQ1_P1");
        let station = StationId::mint(FAB, AREA, 1);
        let vid = VehicleId::mint(FAB, AREA, "V001");
        old.node(port.as_str())
            .unwrap()
            .set_state(NodeState::Port { available: false, carrier_id: Some("CAR3".into()) });
        {
            let st = &old.stations[station.as_str()];
            st.assign(Some(vid.clone()));
            st.observe_assign_cost(&old.learner, 30_000.0);
        }
        let cost = old.stations[station.as_str()].state().avg_assign_cost_ms;

        let new = builder.build(&facility()).unwrap();
        let stats = carry_forward(&old, &new);
        match new.node(port.as_str()).unwrap().state() {
            NodeState::Port { available, carrier_id } => {
                assert!(!available);
                assert_eq!(carrier_id.as_deref(), Some("CAR3"));
            }
            other => panic!("expected port state, got {other:?}"),
        }
        let st = new.stations[station.as_str()].state();
        assert_eq!(st.assigned_vehicle, Some(vid));
        assert_eq!(st.avg_assign_cost_ms, cost);
        assert_eq!(stats.nodes, new.node_count());
        assert_eq!(stats.stations, new.stations.len());
    }

    #[test]
    fn changed_family_keeps_fresh_state() {
        let builder = builder();
        let old = builder.build(&facility()).unwrap();
        let acquire = EdgeId::acquire(FAB, AREA, 1);
        let port = NodeId::port(FAB, PortKind::EquipmentPort, "EQ1_P1");
        old.transfer_edges[acquire.as_str()].assign_carrier(Some("CAR7".into()));

        let mut new = builder.build(&facility()).unwrap();
        let rail = new.rail_edges[EdgeId::rail(FAB, AREA, 1, 2).as_str()].clone();
        new.edges.insert(acquire.clone(), EdgeRef::Rail(rail));
        new.node(port.as_str()).unwrap().set_state(NodeState::Rail { available: true });

        let stats = carry_forward(&old, &new);
        assert_eq!(stats.mismatched, 2);
        assert!(matches!(
            new.node(port.as_str()).unwrap().state(),
            NodeState::Rail { available: true }
        ));
        assert_eq!(new.transfer_edges[acquire.as_str()].runtime().carrier_id, None);
    }

    #[test]
    fn open_fault_records_are_carried() {
        let builder = builder();
        let old = builder.build(&facility()).unwrap();
        let key = ZoneKey::mint(FAB, AREA, ZoneId(12)).to_string();
        old.faults.zone_off.lock().insert(
            key.clone(),
            ZoneFaultRecord {
                key: key.clone(),
                area: AREA.into(),
                zone: ZoneId(12),
                alarm_code: "HID012".into(),
                error_code: "E101".into(),
                address: 2,
                next_address: 5,
                addresses: vec!["2".into()],
                ports: Vec::new(),
                state: FaultState::Abnormal,
                opened_at: Millis(1_000),
                last_seen: Millis(1_000),
                recovered_at: None,
            },
        );
        old.faults.stage.lock().insert(
            "F:A:V001".into(),
            StageRecord {
                key: "F:A:V001".into(),
                vehicle_name: "V001".into(),
                dest_port: "EQ1_P1".into(),
                state: FaultState::Abnormal,
                updated_at: Millis(1_000),
            },
        );

        let new = builder.build(&facility()).unwrap();
        carry_forward(&old, &new);
        assert_eq!(new.faults.open_counts(), (1, 0));
        assert_eq!(new.faults.zone_off.lock()[&key].opened_at, Millis(1_000));
        assert!(new.faults.stage.lock().contains_key("F:A:V001"));
    }
}
