//! The per-report update pipeline.
//!
//! [`IngestPipeline::process`] applies one decoded report to a live snapshot:
//!
//! 1. take the vehicle's lock (bounded wait) and apply the sequence gate;
//! 2. a `Removing` report resets the vehicle and releases its track;
//! 3. any other report becomes the vehicle's current telemetry and is
//!    reconciled against the previous one, which moves occupancy and feeds
//!    velocity samples to the edges travelled;
//! 4. zone counters and the fault monitors run, each behind its area switch;
//! 5. every event produced goes to each of the facility's subscribers.
//!
//! Snapshot access is the caller's business.  Holding a `MutationTicket`
//! across the call keeps a rebuild from publishing mid-report.
//!
//! # Velocity samples
//!
//! A sample is only taken while the vehicle is demonstrably driving a
//! transfer job: received within the motion window of the previous report,
//! in a travelling state, with run and vehicle cycles unchanged and set to a
//! pickup or drop-off move.  The sample is
//! `(track covered - previous distance + current distance) / elapsed * 60`.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use rt_core::{
    ids::vehicle_fault_key, CarrierClass, Config, DetailState, EdgeId, FacilityConfig, FeatureSwitches,
    Millis, NodeId, VehicleId, VehicleState, ZoneId, ZoneKey,
};
use rt_graph::{
    affected_upstream, EdgeCost, FaultState, NetworkSnapshot, RailEdge, Router, StageRecord,
    Telemetry, Vehicle, VehicleFaultRecord, VehicleRecord, ZoneFaultRecord,
};
use rt_output::{
    publish_all, vehicle_off_event, vehicle_off_tuple, zone_off_event, zone_off_tuple,
    EventPublisher, MetricsSink, OutboundEvent, Table, Tuple,
};

use crate::report::{decode, Decoded, VehicleReport};
use crate::{IngestError, IngestResult};

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// How a report moved its vehicle along the track.
#[derive(Clone, Debug, PartialEq)]
pub enum Movement {
    /// No usable previous edge; the vehicle was placed on the reported one.
    Entered,
    /// Still on the same edge.
    Stayed,
    /// Crossed onto the next edge.  `sample` is the velocity fed to the edge
    /// left behind, if the vehicle was in motion.
    Advanced { sample: Option<f64> },
    /// Passed over several edges between reports.  `path` is the number of
    /// edges on the inferred route.
    Jumped { path: usize, sample: Option<f64> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Applied {
    pub edge: EdgeId,
    pub movement: Movement,
    /// Events produced, before fan-out to subscribers.
    pub events: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IngestOutcome {
    /// Not a vehicle state report.
    Ignored,
    /// Sequence at or below the last accepted one.
    Stale { last: u64 },
    /// The vehicle left the track.
    Removed,
    Applied(Applied),
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Applies vehicle state reports to a snapshot.
///
/// One instance is shared by every report worker.
pub struct IngestPipeline {
    config:    Arc<Config>,
    router:    Arc<dyn Router>,
    publisher: Arc<dyn EventPublisher>,
    sink:      Arc<dyn MetricsSink>,
    /// Used for facilities missing from the config: no subscribers,
    /// every switch on.
    unconfigured: FacilityConfig,
}

impl IngestPipeline {
    pub fn new(
        config: Arc<Config>,
        router: Arc<dyn Router>,
        publisher: Arc<dyn EventPublisher>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self { config, router, publisher, sink, unconfigured: FacilityConfig::default() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decode `line` and process it if it is a vehicle state report.
    pub fn process_line(
        &self,
        snapshot: &NetworkSnapshot,
        line: &str,
        sequence: u64,
        received_at: Millis,
    ) -> IngestResult<IngestOutcome> {
        match decode(line)? {
            Decoded::Report(report) => self.process(snapshot, &report, sequence, received_at),
            Decoded::Other(kind) => {
                trace!(kind = %kind, "message type not handled");
                Ok(IngestOutcome::Ignored)
            }
        }
    }

    /// Apply one report.
    ///
    /// The vehicle's lock is held until this returns, on every path.
    pub fn process(
        &self,
        snapshot: &NetworkSnapshot,
        report: &VehicleReport,
        sequence: u64,
        received_at: Millis,
    ) -> IngestResult<IngestOutcome> {
        let id = VehicleId::mint(&snapshot.facility, &report.area, &report.vehicle);
        let vehicle = snapshot.vehicle(id.as_str())?;
        let mut record = vehicle.try_acquire(self.config.ingest.lock_timeout())?;

        if !record.accept_sequence(sequence) {
            let last = record.last_sequence.unwrap_or_default();
            trace!(vehicle = %vehicle.id, sequence, last, "stale report discarded");
            return Ok(IngestOutcome::Stale { last });
        }

        let facility = self.facility(&snapshot.facility);
        let features = facility.features(&report.area);

        if report.state == VehicleState::Removing {
            self.remove(snapshot, vehicle, &mut record, report, received_at, features.vehicle_count);
            return Ok(IngestOutcome::Removed);
        }

        let applied = self.apply(snapshot, facility, &features, vehicle, &mut record, report, received_at)?;
        Ok(IngestOutcome::Applied(applied))
    }

    fn facility(&self, id: &str) -> &FacilityConfig {
        self.config.facility(id).unwrap_or(&self.unconfigured)
    }

    // ── Removing ──────────────────────────────────────────────────────────

    fn remove(
        &self,
        snapshot: &NetworkSnapshot,
        vehicle: &Vehicle,
        record: &mut VehicleRecord,
        report: &VehicleReport,
        received_at: Millis,
        count_zones: bool,
    ) {
        record.shift();
        record.current = Telemetry {
            state: Some(VehicleState::Removing),
            em_status: report.em_status,
            group_id: report.group_id.clone(),
            received_at,
            ..Telemetry::default()
        };
        record.carrier_id.clear();
        record.command_id.clear();

        if let Some(edge) = record.previous.rail_edge.as_ref().and_then(|e| snapshot.rail_edges.get(e)) {
            edge.remove_occupant(&vehicle.id);
            edge.record_traversal();
        }
        if count_zones && record.zone.is_counted() {
            snapshot.zone_counts.decrement(&ZoneKey::mint(&snapshot.facility, &vehicle.area, record.zone));
        }
        record.zone = ZoneId::UNZONED;
        info!(vehicle = %vehicle.id, "vehicle removed from track");
    }

    // ── Normal update ─────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        snapshot: &NetworkSnapshot,
        facility: &FacilityConfig,
        features: &FeatureSwitches,
        vehicle: &Vehicle,
        record: &mut VehicleRecord,
        report: &VehicleReport,
        received_at: Millis,
    ) -> IngestResult<Applied> {
        let edge_id = EdgeId::rail(&snapshot.facility, &report.area, report.address, report.next_address);
        // An unknown edge leaves the record and every occupant set as they were.
        let Ok(edge) = snapshot.rail_edge(edge_id.as_str()).cloned() else {
            return Err(IngestError::OffTrack {
                vehicle: vehicle.id.to_string(),
                address: report.address,
                next_address: report.next_address,
            });
        };

        record.shift();
        record.current = self.telemetry(&snapshot.facility, report, received_at, Some(edge.id.clone()));
        record.carrier_id = report.carrier_id.clone();
        record.command_id = report.command_id.clone();

        let movement = self.reconcile(snapshot, &vehicle.id, record, &edge);
        trace!(vehicle = %vehicle.id, edge = %edge.id, ?movement, "report applied");

        if features.vehicle_count {
            count_zone(snapshot, record, &edge);
        }
        if features.stage_monitor {
            self.stage_monitor(snapshot, vehicle, report, received_at);
        }

        let mut events = Vec::new();
        if features.zone_off {
            events.extend(self.zone_off(snapshot, facility, &edge, report, received_at));
        }
        if features.vehicle_off {
            events.extend(self.vehicle_off(snapshot, facility, vehicle, &edge, report, received_at));
        }
        if !events.is_empty() {
            publish_all(self.publisher.as_ref(), &facility.subscribers, &events);
        }

        Ok(Applied { edge: edge.id.clone(), movement, events: events.len() })
    }

    fn telemetry(
        &self,
        fab: &str,
        report: &VehicleReport,
        received_at: Millis,
        rail_edge: Option<EdgeId>,
    ) -> Telemetry {
        let node = |address: u32| (address != 0).then(|| NodeId::rail(fab, &report.area, address));
        Telemetry {
            state: Some(report.state),
            address: report.address,
            next_address: report.next_address,
            rail_node: node(report.address),
            next_rail_node: node(report.next_address),
            rail_edge,
            distance_mm: report.distance * self.config.ingest.distance_scale,
            run_cycle: report.run_cycle,
            vehicle_cycle: report.vehicle_cycle,
            detail_state: report.detail_state,
            error_code: report.error_code.clone(),
            full: report.full,
            online: report.online,
            em_status: report.em_status,
            group_id: report.group_id.clone(),
            source_port: report.source_port.clone(),
            dest_port: report.dest_port.clone(),
            priority: report.priority,
            run_distance: report.run_distance,
            received_at,
        }
    }

    // ── Reconciliation ────────────────────────────────────────────────────

    fn reconcile(
        &self,
        snapshot: &NetworkSnapshot,
        id: &VehicleId,
        record: &mut VehicleRecord,
        edge: &Arc<RailEdge>,
    ) -> Movement {
        let mut last = record
            .previous
            .rail_edge
            .as_ref()
            .and_then(|e| snapshot.rail_edges.get(e))
            .cloned();

        // Same fork, other branch: the vehicle re-decided before leaving the
        // node, so the earlier edge was never actually entered.
        let reaimed = last.as_ref().is_some_and(|p| p.from == edge.from && p.to != edge.to);
        if reaimed {
            if let Some(prev) = &last {
                prev.remove_occupant(id);
                debug!(vehicle = %id, from = %prev.id, to = %edge.id, "re-aimed at branch");
            }
            record.previous.rail_edge = Some(edge.id.clone());
            last = Some(edge.clone());
        }

        let moving = self.in_motion(record);

        let Some(last) = last else {
            edge.add_occupant(id);
            return Movement::Entered;
        };

        if last.id == edge.id {
            // Hold the previous stamp so the eventual sample spans the whole
            // time spent on this edge.
            if moving {
                record.current.received_at = record.previous.received_at;
                record.current.distance_mm = record.previous.distance_mm;
            }
            edge.add_occupant(id);
            return Movement::Stayed;
        }

        if last.to == edge.from {
            let sample = moving.then(|| speed(record, last.length_mm));
            if let Some(v) = sample {
                last.observe(&snapshot.learner, v);
            }
            last.record_traversal();
            last.remove_occupant(id);
            edge.add_occupant(id);
            return Movement::Advanced { sample };
        }

        last.record_traversal();
        last.remove_occupant(id);
        edge.add_occupant(id);

        let route = self.router.route(snapshot, &last.from, &edge.from, CarrierClass::All);
        if route.is_empty() {
            debug!(vehicle = %id, from = %last.id, to = %edge.id, "no rail path between reports");
            return Movement::Jumped { path: 0, sample: None };
        }

        let sample = moving.then(|| speed(record, route.length_mm()));
        for hop in &route.edges {
            if hop.id != last.id {
                hop.record_traversal();
            }
            if let Some(v) = sample {
                hop.observe(&snapshot.learner, v);
            }
        }
        Movement::Jumped { path: route.edges.len(), sample }
    }

    fn in_motion(&self, record: &VehicleRecord) -> bool {
        let (cur, prev) = (&record.current, &record.previous);
        let elapsed = cur.received_at.since(prev.received_at);
        elapsed > 0
            && (elapsed as u64) < self.config.ingest.motion_window_ms
            && cur.state.is_some_and(VehicleState::is_travelling)
            && cur.run_cycle == prev.run_cycle
            && cur.vehicle_cycle == prev.vehicle_cycle
            && cur.run_cycle.is_transfer()
            && cur.vehicle_cycle.is_transfer_move()
    }

    // ── Monitors ──────────────────────────────────────────────────────────

    fn stage_monitor(&self, snapshot: &NetworkSnapshot, vehicle: &Vehicle, report: &VehicleReport, now: Millis) {
        let key = vehicle_fault_key(&snapshot.facility, &report.area, &vehicle.name);
        let mut stage = snapshot.faults.stage.lock();
        if report.detail_state == DetailState::StageMoving {
            let r = stage.entry(key.clone()).or_insert_with(|| StageRecord {
                key,
                vehicle_name: vehicle.name.clone(),
                dest_port: String::new(),
                state: FaultState::Abnormal,
                updated_at: now,
            });
            r.state = FaultState::Abnormal;
            r.updated_at = now;
            r.dest_port = report.dest_port.clone();
        } else if let Some(r) = stage.get_mut(&key) {
            r.state = FaultState::Normal;
        }
    }

    fn zone_off(
        &self,
        snapshot: &NetworkSnapshot,
        facility: &FacilityConfig,
        edge: &RailEdge,
        report: &VehicleReport,
        now: Millis,
    ) -> Option<OutboundEvent> {
        let zone = edge.zone;
        if !zone.is_zoned() {
            return None;
        }
        let fab = snapshot.facility.as_str();
        let key = ZoneKey::mint(fab, &edge.area, zone);
        let faulted = self.config.alarms.is_zone_off(&report.error_code);

        let changed = {
            let mut open = snapshot.faults.zone_off.lock();
            if faulted {
                if let Some(r) = open.get_mut(key.as_str()) {
                    r.last_seen = now;
                    return None;
                }
                let info = snapshot.zones.get(&key);
                let r = ZoneFaultRecord {
                    key: key.to_string(),
                    area: edge.area.clone(),
                    zone,
                    alarm_code: format!("HID{zone}"),
                    error_code: report.error_code.clone(),
                    address: report.address,
                    next_address: report.next_address,
                    addresses: info.map(|z| z.addresses.clone()).unwrap_or_default(),
                    ports: info.map(|z| z.ports.clone()).unwrap_or_default(),
                    state: FaultState::Abnormal,
                    opened_at: now,
                    last_seen: now,
                    recovered_at: None,
                };
                info!(zone = %key, code = %report.error_code, "zone stopped");
                open.insert(r.key.clone(), r.clone());
                r
            } else {
                let mut r = open.remove(key.as_str())?;
                r.state = FaultState::Normal;
                r.recovered_at = Some(now);
                info!(zone = %key, "zone recovered");
                r
            }
        };

        self.write(Table::ZoneOff, &[zone_off_tuple(fab, &changed)]);
        Some(zone_off_event(fab, &facility.fac_id, &changed))
    }

    fn vehicle_off(
        &self,
        snapshot: &NetworkSnapshot,
        facility: &FacilityConfig,
        vehicle: &Vehicle,
        edge: &RailEdge,
        report: &VehicleReport,
        now: Millis,
    ) -> Vec<OutboundEvent> {
        let fab = snapshot.facility.as_str();
        let key = vehicle_fault_key(fab, &report.area, &vehicle.name);
        let device = format!("{}:{}:{}", vehicle.name, report.address, report.error_code);
        let faulted = self.config.alarms.is_vehicle_off(&report.error_code);

        let mut changed = Vec::new();
        {
            let mut open = snapshot.faults.vehicle_off.lock();
            if faulted && open.get(&key).is_some_and(|r| r.device_id == device) {
                return Vec::new();
            }
            if let Some(mut old) = open.remove(&key) {
                old.state = FaultState::Normal;
                old.recovered_at = Some(now);
                info!(vehicle = %vehicle.id, device = %old.device_id, "vehicle fault cleared");
                changed.push(old);
            }
            if faulted {
                let affected = affected_upstream(snapshot, &edge.id, self.config.build.affected_walk_limit);
                let r = VehicleFaultRecord {
                    key: key.clone(),
                    device_id: device,
                    area: report.area.clone(),
                    vehicle_name: vehicle.name.clone(),
                    error_code: report.error_code.clone(),
                    address: report.address,
                    next_address: report.next_address,
                    addresses: affected.addresses.into_iter().collect(),
                    ports: affected.ports.into_iter().collect(),
                    state: FaultState::Abnormal,
                    opened_at: now,
                    recovered_at: None,
                };
                info!(vehicle = %vehicle.id, device = %r.device_id, blocked = r.addresses.len(), "vehicle stopped");
                open.insert(key, r.clone());
                changed.push(r);
            }
        }

        if changed.is_empty() {
            return Vec::new();
        }
        let tuples: Vec<Tuple> = changed.iter().map(|r| vehicle_off_tuple(fab, r)).collect();
        self.write(Table::VehicleOff, &tuples);
        changed.iter().map(|r| vehicle_off_event(fab, &facility.fac_id, r)).collect()
    }

    fn write(&self, table: Table, tuples: &[Tuple]) {
        if let Err(e) = self.sink.record(table, tuples) {
            warn!(table = %table, error = %e, "metrics write failed");
        }
    }
}

/// Move the vehicle's zone membership to `edge`'s zone.
fn count_zone(snapshot: &NetworkSnapshot, record: &mut VehicleRecord, edge: &RailEdge) {
    let (old, new) = (record.zone, edge.zone);
    if old == new {
        return;
    }
    if new.is_counted() {
        snapshot.zone_counts.increment(&ZoneKey::mint(&snapshot.facility, &edge.area, new));
    }
    if old.is_counted() {
        snapshot.zone_counts.decrement(&ZoneKey::mint(&snapshot.facility, &edge.area, old));
    }
    record.zone = new;
}

/// Velocity over `track_mm` of travel, starting `previous.distance_mm` into
/// the first edge and ending `current.distance_mm` into the last.
fn speed(record: &VehicleRecord, track_mm: f64) -> f64 {
    let elapsed = record.current.received_at.since(record.previous.received_at) as f64;
    (track_mm - record.previous.distance_mm + record.current.distance_mm) / elapsed * 60.0
}
