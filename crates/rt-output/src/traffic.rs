//! Periodic traffic and occupancy reports.
//!
//! Nothing here schedules itself; the host calls [`TrafficReporter::run`]
//! and [`zone_occupancy_rows`] on whatever cadence it likes (once a minute in
//! production).

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use rt_core::{EdgeId, FacilityConfig, Millis, VehicleConfig};
use rt_graph::{NetworkSnapshot, RailEdge};

use crate::event::{keys, publish_all, EventKind, EventPublisher, OutboundEvent};
use crate::sink::{MetricsSink, Table, Tuple};
use crate::OutputResult;

/// Pseudo edge id of the average over edges that have learned a velocity.
pub const LEARNED_AVERAGE: &str = "AVERAGE_PER_1MINUTES";
/// Pseudo edge id of the average over all edges.
pub const OVERALL_AVERAGE: &str = "AVERAGE_PER_1MINUTES_INCLUDE_INITIALIZATION";

/// Round to one decimal place.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 { 0.0 } else { round1(sum / n as f64) }
}

/// Outcome of one reporter pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrafficSummary {
    pub edges: usize,
    pub learned_edges: usize,
    pub learned_average: f64,
    pub overall_average: f64,
    /// Events handed to the publisher (one per subscriber).
    pub published: usize,
}

/// Velocity aggregates per facility area.
///
/// Keeps the traversal count seen at the previous pass per edge so each row
/// carries a pass-count delta rather than a running total.
pub struct TrafficReporter {
    footprint_mm: f64,
    last_passes:  Mutex<FxHashMap<EdgeId, u64>>,
}

impl TrafficReporter {
    pub fn new(vehicle: &VehicleConfig) -> Self {
        Self { footprint_mm: vehicle.footprint_mm(), last_passes: Mutex::new(FxHashMap::default()) }
    }

    /// Number of edges whose pass count is remembered between runs.
    pub fn tracked_edges(&self) -> usize {
        self.last_passes.lock().len()
    }

    /// Aggregate the rail edges of `area`, write tuples, publish the average.
    ///
    /// Per-edge rows are written only when the area's `traffic` switch is on;
    /// the two average rows and the event always go out.
    pub fn run(
        &self,
        snapshot: &NetworkSnapshot,
        facility: &FacilityConfig,
        area: &str,
        sink: &dyn MetricsSink,
        publisher: &dyn EventPublisher,
    ) -> OutputResult<TrafficSummary> {
        let now = Millis::now();
        let per_edge = facility.features(area).traffic;

        let mut edges: Vec<&RailEdge> =
            snapshot.rail_edges.values().map(|e| &**e).filter(|e| e.area == area).collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        let (mut learned_sum, mut learned_n, mut total_sum) = (0.0, 0usize, 0.0);
        let mut rows = Vec::with_capacity(if per_edge { edges.len() } else { 0 });
        {
            let mut last = self.last_passes.lock();
            for edge in &edges {
                let rt = edge.runtime();
                total_sum += rt.velocity;
                if rt.learned {
                    learned_sum += rt.velocity;
                    learned_n += 1;
                }

                let seen = last.insert(edge.id.clone(), rt.traversals).unwrap_or(0);
                let passes = rt.traversals.saturating_sub(seen);
                if per_edge {
                    rows.push(self.edge_row(now, &snapshot.facility, edge, rt.velocity, rt.learned, passes));
                }
            }
            // Edges dropped by a rebuild.
            last.retain(|id, _| snapshot.rail_edges.contains_key(id));
        }

        let summary = TrafficSummary {
            edges: edges.len(),
            learned_edges: learned_n,
            learned_average: mean(learned_sum, learned_n),
            overall_average: mean(total_sum, edges.len()),
            published: 0,
        };

        if !rows.is_empty() {
            sink.record(Table::TrafficEdge, &rows)?;
        }
        let averages = [(LEARNED_AVERAGE, summary.learned_average), (OVERALL_AVERAGE, summary.overall_average)]
            .map(|(id, v)| {
                Tuple::new()
                    .with("created_ms", now.0)
                    .with("fab_id", snapshot.facility.as_str())
                    .with("area", area)
                    .with("edge", id)
                    .with("velocity", v)
            });
        sink.record(Table::TrafficVelocity, &averages)?;

        let event = OutboundEvent::new(EventKind::AggregateSpeed)
            .with(keys::FAB_ID, &snapshot.facility)
            .with(keys::FAC_ID, &facility.fac_id)
            .with(keys::AREA, area)
            .with(keys::MACHINE_ID, "AVG")
            .with(keys::STATE, "NORMAL")
            .with(keys::VALUE, format!("{},{}", summary.learned_average, summary.overall_average))
            .with(keys::EVENT_DT, now.0);
        let published = publish_all(publisher, &facility.subscribers, &[event]);

        debug!(
            area,
            edges = summary.edges,
            learned = summary.learned_edges,
            average = summary.learned_average,
            "traffic pass"
        );
        Ok(TrafficSummary { published, ..summary })
    }

    fn edge_row(
        &self,
        now: Millis,
        fab: &str,
        edge: &RailEdge,
        velocity: f64,
        learned: bool,
        passes: u64,
    ) -> Tuple {
        let absolute = if edge.max_velocity > 0.0 { velocity / edge.max_velocity } else { 0.0 };
        Tuple::new()
            .with("created_ms", now.0)
            .with("edge", edge.id.as_str())
            .with("fab_id", fab)
            .with("area", edge.area.as_str())
            .with("zone", edge.zone.0)
            .with("velocity", velocity)
            .with("max_velocity", edge.max_velocity)
            .with("absolute_velocity", absolute)
            .with("vehicles", edge.occupant_count())
            .with("density", edge.density(self.footprint_mm))
            .with("passes", passes)
            .with("learned", learned)
    }
}

/// One tuple per registered zone counter.
pub fn zone_occupancy_rows(snapshot: &NetworkSnapshot) -> Vec<Tuple> {
    let now = Millis::now();
    snapshot
        .zone_counts
        .entries()
        .into_iter()
        .map(|(key, count)| {
            let (area, zone) = snapshot
                .zones
                .get(&key)
                .map_or((String::new(), -1), |z| (z.area.clone(), z.zone.0));
            Tuple::new()
                .with("created_ms", now.0)
                .with("fab_id", snapshot.facility.as_str())
                .with("zone_key", key.as_str())
                .with("area", area)
                .with("zone", zone)
                .with("vehicles", count)
        })
        .collect()
}
