//! The explicit application context.
//!
//! Everything a running facility needs is owned here and handed to whoever
//! needs it; nothing is reachable through globals.  One context serves one
//! facility.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, info_span, warn};

use rt_build::{carry_forward, CarryStats, GraphBuilder, TopologySource};
use rt_core::{Config, FacilityConfig};
use rt_graph::{Learner, NetworkSnapshot, SnapshotStore};
use rt_output::{zone_occupancy_rows, EventPublisher, MetricsSink, Table, TrafficReporter, TrafficSummary};

use crate::{ServiceError, ServiceResult};

/// Outcome of one [`AppContext::rebuild`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rebuilt {
    pub generation: u64,
    pub nodes: usize,
    pub edges: usize,
    pub carried: CarryStats,
}

pub struct AppContext {
    config:    Arc<Config>,
    facility:  FacilityConfig,
    store:     SnapshotStore,
    builder:   GraphBuilder,
    source:    Arc<dyn TopologySource>,
    publisher: Arc<dyn EventPublisher>,
    sink:      Arc<dyn MetricsSink>,
    reporter:  TrafficReporter,
}

impl AppContext {
    /// Validate `config` and set up an empty store for `facility`.
    ///
    /// Nothing is built yet; call [`rebuild`](Self::rebuild) before feeding
    /// reports.
    pub fn new(
        config: Config,
        facility: &str,
        source: Arc<dyn TopologySource>,
        publisher: Arc<dyn EventPublisher>,
        sink: Arc<dyn MetricsSink>,
    ) -> ServiceResult<Self> {
        config.validate()?;
        let fac = config
            .facility(facility)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownFacility(facility.to_owned()))?;
        let learner = Learner::new(&config.learner);
        let reporter = TrafficReporter::new(&config.vehicle);
        let builder = GraphBuilder::new(config.clone())?;
        Ok(Self {
            store: SnapshotStore::new(NetworkSnapshot::empty(facility, learner)),
            config: Arc::new(config),
            facility: fac,
            builder,
            source,
            publisher,
            sink,
            reporter,
        })
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn facility(&self) -> &FacilityConfig {
        &self.facility
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.publisher
    }

    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    /// Load fresh topology, build it, and publish it with the live runtime
    /// state carried over.
    ///
    /// A failed load or build leaves the live snapshot untouched.
    pub fn rebuild(&self) -> ServiceResult<Rebuilt> {
        let _span = info_span!("rebuild", facility = %self.facility.id).entered();
        let input = self.source.load(&self.facility.id)?;
        let fresh = self.builder.build(&input)?;

        let mut carried = CarryStats::default();
        let live = self.store.publish(fresh, |old, new| {
            carried = carry_forward(old, new);
        });

        let rebuilt = Rebuilt {
            generation: live.generation,
            nodes: live.node_count(),
            edges: live.edge_count(),
            carried,
        };
        info!(
            generation = rebuilt.generation,
            nodes = rebuilt.nodes,
            edges = rebuilt.edges,
            carried_edges = carried.edges,
            mismatched = carried.mismatched,
            "snapshot published"
        );
        Ok(rebuilt)
    }

    /// Run the traffic aggregate for every area of the facility.
    ///
    /// Areas come from the facility config; when none are listed, every
    /// area present in the live snapshot is reported.
    pub fn report_traffic(&self) -> ServiceResult<Vec<TrafficSummary>> {
        let snapshot = self.store.read();
        let areas: BTreeSet<String> = if self.facility.areas.is_empty() {
            snapshot.rail_edges.values().map(|e| e.area.clone()).collect()
        } else {
            self.facility.areas.iter().map(|a| a.name.clone()).collect()
        };

        let mut out = Vec::with_capacity(areas.len());
        for area in &areas {
            let summary = self.reporter.run(
                &snapshot,
                &self.facility,
                area,
                self.sink.as_ref(),
                self.publisher.as_ref(),
            )?;
            out.push(summary);
        }
        Ok(out)
    }

    /// Write one occupancy row per zone counter.
    pub fn report_occupancy(&self) -> ServiceResult<usize> {
        let rows = zone_occupancy_rows(&self.store.read());
        if let Err(e) = self.sink.record(Table::ZoneOccupancy, &rows) {
            warn!(error = %e, "occupancy write failed");
            return Err(e.into());
        }
        Ok(rows.len())
    }
}
