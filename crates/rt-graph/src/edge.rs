//! Edge families.
//!
//! Four kinds of directed edge live in a snapshot:
//!
//! | Type             | Connects                               | Learned value      |
//! |------------------|----------------------------------------|--------------------|
//! | [`RailEdge`]     | rail node → rail node (physical track) | velocity, m/min    |
//! | [`TransferEdge`] | rail node ↔ port at a station          | hand-off cost, ms  |
//! | [`StkRmEdge`]    | stocker port ↔ stocker RM              | RM move cost, ms   |
//! | [`ConveyorEdge`] | conveyor port → next conveyor port     | conveyor cost, ms  |
//!
//! Topology fields are plain and frozen once the builder hands the edge to a
//! snapshot.  Everything ingestion touches sits behind a per-edge
//! `parking_lot::Mutex` (or an atomic), so concurrent report workers can
//! update different edges without contention and the same edge without
//! tearing.
//!
//! [`EdgeRef`] is the closed sum over all four, used by the global edge index.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use rt_core::{CarrierClass, Direction, EdgeId, NodeId, StationId, VehicleId, ZoneId};

use crate::learner::Learner;

/// Velocity of a rail edge that has never been initialised or learned.
pub const VELOCITY_UNSET: f64 = -1.0;

pub const DEFAULT_TRANSFER_COST_MS: f64 = 7_000.0;
pub const DEFAULT_CALL_COST_MS: f64 = 20_000.0;
pub const CONVEYOR_PORT_ACQUIRE_COST_MS: f64 = 15_000.0;
pub const CONVEYOR_PORT_ACQUIRE_CALL_COST_MS: f64 = 60_000.0;
pub const CONVEYOR_PORT_DEPOSIT_COST_MS: f64 = 12_000.0;
pub const DEFAULT_CONVEYOR_COST_MS: f64 = 150.0;

// ── Common surface ────────────────────────────────────────────────────────────

/// Behaviour every edge family shares.
pub trait EdgeCost {
    fn id(&self) -> &EdgeId;
    fn from_node(&self) -> &NodeId;
    fn to_node(&self) -> &NodeId;

    /// Expected time to traverse the edge with a carrier of `class`.
    fn cost(&self, class: CarrierClass) -> Duration;

    /// Whether a carrier of `class` may use the edge right now.
    fn available(&self, class: CarrierClass) -> bool;

    /// Fold one observation into the learned value.  Non-finite samples are
    /// ignored.
    fn observe(&self, learner: &Learner, sample: f64);
}

#[inline]
fn ms(v: f64) -> Duration {
    Duration::from_millis(v.max(0.0).round() as u64)
}

// ── RailEdge ──────────────────────────────────────────────────────────────────

/// Mutable state of a rail edge.
#[derive(Clone, Debug, Default)]
pub struct RailRuntime {
    /// Smoothed velocity, m/min.
    pub velocity: f64,
    /// Value of `velocity` before the most recent sample.
    pub last_velocity: f64,
    /// Vehicles observed leaving this edge since it was first built.
    pub traversals: u64,
    pub occupants: FxHashSet<VehicleId>,
    /// A sample has been folded in since the edge was created.
    pub learned: bool,
}

/// A directed physical track segment.
#[derive(Debug)]
pub struct RailEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub area: String,
    pub from_address: u32,
    pub to_address: u32,
    pub direction: Direction,
    pub length_mm: f64,
    /// Speed-class ceiling, m/min.
    pub max_velocity: f64,
    pub zone: ZoneId,
    /// Loop the segment belongs to, or -1.  Loop segments only admit pods.
    pub loop_id: i32,
    pub branch_join: Option<EdgeId>,
    pub station_ids: Vec<StationId>,
    available: AtomicBool,
    runtime: Mutex<RailRuntime>,
}

impl RailEdge {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EdgeId,
        from: NodeId,
        to: NodeId,
        area: impl Into<String>,
        from_address: u32,
        to_address: u32,
        direction: Direction,
        length_mm: f64,
    ) -> Self {
        Self {
            id,
            from,
            to,
            area: area.into(),
            from_address,
            to_address,
            direction,
            length_mm,
            max_velocity: VELOCITY_UNSET,
            zone: ZoneId::UNZONED,
            loop_id: -1,
            branch_join: None,
            station_ids: Vec::new(),
            available: AtomicBool::new(true),
            runtime: Mutex::new(RailRuntime {
                velocity: VELOCITY_UNSET,
                last_velocity: VELOCITY_UNSET,
                ..RailRuntime::default()
            }),
        }
    }

    /// Set the speed-class ceiling and start the learned velocity there.
    pub fn with_max_velocity(mut self, max_velocity: f64) -> Self {
        self.max_velocity = max_velocity;
        let rt = self.runtime.get_mut();
        rt.velocity = max_velocity;
        rt.last_velocity = max_velocity;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn velocity(&self) -> f64 {
        self.runtime.lock().velocity
    }

    pub fn traversals(&self) -> u64 {
        self.runtime.lock().traversals
    }

    pub fn occupant_count(&self) -> usize {
        self.runtime.lock().occupants.len()
    }

    pub fn has_occupant(&self, vehicle: &VehicleId) -> bool {
        self.runtime.lock().occupants.contains(vehicle)
    }

    /// Insert `vehicle` into the occupant set.  Idempotent.
    pub fn add_occupant(&self, vehicle: &VehicleId) {
        self.runtime.lock().occupants.insert(vehicle.clone());
    }

    pub fn remove_occupant(&self, vehicle: &VehicleId) -> bool {
        self.runtime.lock().occupants.remove(vehicle)
    }

    /// Count one vehicle leaving the edge.
    pub fn record_traversal(&self) {
        self.runtime.lock().traversals += 1;
    }

    /// Copy of the mutable state.
    pub fn runtime(&self) -> RailRuntime {
        self.runtime.lock().clone()
    }

    /// Overwrite the mutable state, pinning velocity into this edge's band.
    pub fn restore(&self, learner: &Learner, mut rt: RailRuntime) {
        if rt.velocity > 0.0 {
            rt.velocity = learner.rail_band(self.max_velocity).clamp(rt.velocity);
        }
        *self.runtime.lock() = rt;
    }

    /// Occupied share of the track, in percent, capped at 100.
    pub fn density(&self, footprint_mm: f64) -> f64 {
        if self.length_mm <= 0.0 {
            return 0.0;
        }
        let occupied = self.occupant_count() as f64 * footprint_mm;
        (occupied / self.length_mm * 100.0).min(100.0)
    }
}

impl EdgeCost for RailEdge {
    fn id(&self) -> &EdgeId {
        &self.id
    }

    fn from_node(&self) -> &NodeId {
        &self.from
    }

    fn to_node(&self) -> &NodeId {
        &self.to
    }

    /// `length / velocity`, with velocity in mm/ms.
    fn cost(&self, _class: CarrierClass) -> Duration {
        let v = self.velocity();
        let v = if v > 0.0 { v } else { 1.0 };
        ms(self.length_mm / (v / 60.0))
    }

    fn available(&self, class: CarrierClass) -> bool {
        self.is_available()
            && (self.loop_id < 0 || matches!(class, CarrierClass::All | CarrierClass::Pod))
    }

    fn observe(&self, learner: &Learner, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        let band = learner.rail_band(self.max_velocity);
        let sample = band.clamp(sample);
        let mut rt = self.runtime.lock();
        rt.last_velocity = rt.velocity;
        rt.velocity = if rt.traversals > 0 && rt.velocity > 0.0 {
            band.clamp(learner.blend(rt.velocity, sample))
        } else {
            sample
        };
        rt.learned = true;
    }
}

// ── TransferEdge ──────────────────────────────────────────────────────────────

/// Pickup or drop-off hop.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TransferKind {
    /// Port → rail node: the vehicle lifts a carrier off the port.
    Acquire,
    /// Rail node → port: the vehicle lowers a carrier onto the port.
    Deposit,
}

#[derive(Clone, Debug, Default)]
pub struct TransferRuntime {
    pub avg_cost_ms: f64,
    /// Time spent waiting for the port to accept the hand-off.
    pub avg_call_cost_ms: f64,
    pub carrier_id: Option<String>,
}

#[derive(Debug)]
pub struct TransferEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: TransferKind,
    pub station: StationId,
    pub length_mm: f64,
    available: AtomicBool,
    runtime: Mutex<TransferRuntime>,
}

impl TransferEdge {
    pub fn new(
        id: EdgeId,
        from: NodeId,
        to: NodeId,
        kind: TransferKind,
        station: StationId,
        length_mm: f64,
        conveyor_port: bool,
    ) -> Self {
        let (cost, call) = match (kind, conveyor_port) {
            (TransferKind::Acquire, true) => {
                (CONVEYOR_PORT_ACQUIRE_COST_MS, CONVEYOR_PORT_ACQUIRE_CALL_COST_MS)
            }
            (TransferKind::Acquire, false) => (DEFAULT_TRANSFER_COST_MS, DEFAULT_CALL_COST_MS),
            (TransferKind::Deposit, true) => (CONVEYOR_PORT_DEPOSIT_COST_MS, 0.0),
            (TransferKind::Deposit, false) => (DEFAULT_TRANSFER_COST_MS, 0.0),
        };
        Self {
            id,
            from,
            to,
            kind,
            station,
            length_mm,
            available: AtomicBool::new(true),
            runtime: Mutex::new(TransferRuntime {
                avg_cost_ms: cost,
                avg_call_cost_ms: call,
                carrier_id: None,
            }),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn avg_cost_ms(&self) -> f64 {
        self.runtime.lock().avg_cost_ms
    }

    pub fn avg_call_cost_ms(&self) -> f64 {
        self.runtime.lock().avg_call_cost_ms
    }

    /// Fold a port call-wait observation into the call cost.
    pub fn observe_call(&self, learner: &Learner, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        let band = learner.transfer_band();
        let mut rt = self.runtime.lock();
        rt.avg_call_cost_ms = band.clamp(learner.blend(rt.avg_call_cost_ms, band.clamp(sample)));
    }

    /// Set by the job dispatcher when a carrier is booked onto this hand-off.
    /// Ingestion never touches it; the rebuild merge carries it over.
    pub fn assign_carrier(&self, carrier: Option<String>) {
        self.runtime.lock().carrier_id = carrier;
    }

    pub fn runtime(&self) -> TransferRuntime {
        self.runtime.lock().clone()
    }

    pub fn restore(&self, rt: TransferRuntime) {
        *self.runtime.lock() = rt;
    }
}

impl EdgeCost for TransferEdge {
    fn id(&self) -> &EdgeId {
        &self.id
    }

    fn from_node(&self) -> &NodeId {
        &self.from
    }

    fn to_node(&self) -> &NodeId {
        &self.to
    }

    fn cost(&self, _class: CarrierClass) -> Duration {
        let rt = self.runtime.lock();
        ms(rt.avg_cost_ms + rt.avg_call_cost_ms)
    }

    fn available(&self, _class: CarrierClass) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn observe(&self, learner: &Learner, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        let band = learner.transfer_band();
        let mut rt = self.runtime.lock();
        rt.avg_cost_ms = band.clamp(learner.blend(rt.avg_cost_ms, band.clamp(sample)));
    }
}

// ── StkRmEdge ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct StkRmRuntime {
    pub avg_cost_ms: f64,
    pub moving_carriers: FxHashSet<String>,
}

/// Hop through a stocker's internal robot.
#[derive(Debug)]
pub struct StkRmEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub stocker: String,
    /// `true` when the edge leaves the RM towards a port.
    pub from_rm: bool,
    available: AtomicBool,
    runtime: Mutex<StkRmRuntime>,
}

impl StkRmEdge {
    pub fn new(
        id: EdgeId,
        from: NodeId,
        to: NodeId,
        stocker: impl Into<String>,
        from_rm: bool,
        learner: &Learner,
    ) -> Self {
        Self {
            id,
            from,
            to,
            stocker: stocker.into(),
            from_rm,
            available: AtomicBool::new(true),
            runtime: Mutex::new(StkRmRuntime {
                avg_cost_ms: learner.stk_rm_default(),
                moving_carriers: FxHashSet::default(),
            }),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn avg_cost_ms(&self) -> f64 {
        self.runtime.lock().avg_cost_ms
    }

    /// Called by the job dispatcher when the RM picks up `carrier`.
    pub fn start_moving(&self, carrier: &str) {
        self.runtime.lock().moving_carriers.insert(carrier.to_owned());
    }

    /// Counterpart of [`start_moving`](Self::start_moving); `false` if the
    /// carrier was not in flight.
    pub fn finish_moving(&self, carrier: &str) -> bool {
        self.runtime.lock().moving_carriers.remove(carrier)
    }

    pub fn runtime(&self) -> StkRmRuntime {
        self.runtime.lock().clone()
    }

    pub fn restore(&self, learner: &Learner, mut rt: StkRmRuntime) {
        if rt.avg_cost_ms > learner.stk_rm_cap() {
            rt.avg_cost_ms = learner.stk_rm_default();
        }
        *self.runtime.lock() = rt;
    }
}

impl EdgeCost for StkRmEdge {
    fn id(&self) -> &EdgeId {
        &self.id
    }

    fn from_node(&self) -> &NodeId {
        &self.from
    }

    fn to_node(&self) -> &NodeId {
        &self.to
    }

    fn cost(&self, _class: CarrierClass) -> Duration {
        ms(self.avg_cost_ms())
    }

    fn available(&self, _class: CarrierClass) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn observe(&self, learner: &Learner, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        let mut rt = self.runtime.lock();
        rt.avg_cost_ms = learner.stk_rm_step(rt.avg_cost_ms, sample);
    }
}

// ── ConveyorEdge ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ConveyorEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub conveyor: String,
    available: AtomicBool,
    avg_cost_ms: Mutex<f64>,
}

impl ConveyorEdge {
    pub fn new(
        id: EdgeId,
        from: NodeId,
        to: NodeId,
        conveyor: impl Into<String>,
        learner: &Learner,
    ) -> Self {
        Self {
            id,
            from,
            to,
            conveyor: conveyor.into(),
            available: AtomicBool::new(true),
            avg_cost_ms: Mutex::new(learner.conveyor_band().clamp(DEFAULT_CONVEYOR_COST_MS)),
        }
    }

    pub fn avg_cost_ms(&self) -> f64 {
        *self.avg_cost_ms.lock()
    }

    pub fn restore(&self, learner: &Learner, cost_ms: f64) {
        *self.avg_cost_ms.lock() = learner.conveyor_band().clamp(cost_ms);
    }
}

impl EdgeCost for ConveyorEdge {
    fn id(&self) -> &EdgeId {
        &self.id
    }

    fn from_node(&self) -> &NodeId {
        &self.from
    }

    fn to_node(&self) -> &NodeId {
        &self.to
    }

    fn cost(&self, _class: CarrierClass) -> Duration {
        ms(self.avg_cost_ms())
    }

    fn available(&self, _class: CarrierClass) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn observe(&self, learner: &Learner, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        let band = learner.conveyor_band();
        let mut cost = self.avg_cost_ms.lock();
        *cost = band.clamp(learner.blend(*cost, band.clamp(sample)));
    }
}

// ── EdgeRef ───────────────────────────────────────────────────────────────────

/// Any edge in the global index.
#[derive(Clone, Debug)]
pub enum EdgeRef {
    Rail(Arc<RailEdge>),
    Transfer(Arc<TransferEdge>),
    StkRm(Arc<StkRmEdge>),
    Conveyor(Arc<ConveyorEdge>),
}

impl EdgeRef {
    pub fn as_rail(&self) -> Option<&Arc<RailEdge>> {
        match self {
            EdgeRef::Rail(e) => Some(e),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn EdgeCost {
        match self {
            EdgeRef::Rail(e) => e.as_ref(),
            EdgeRef::Transfer(e) => e.as_ref(),
            EdgeRef::StkRm(e) => e.as_ref(),
            EdgeRef::Conveyor(e) => e.as_ref(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            EdgeRef::Rail(_) => "rail",
            EdgeRef::Transfer(_) => "transfer",
            EdgeRef::StkRm(_) => "stocker-rm",
            EdgeRef::Conveyor(_) => "conveyor",
        }
    }
}

impl EdgeCost for EdgeRef {
    fn id(&self) -> &EdgeId {
        self.inner().id()
    }

    fn from_node(&self) -> &NodeId {
        self.inner().from_node()
    }

    fn to_node(&self) -> &NodeId {
        self.inner().to_node()
    }

    fn cost(&self, class: CarrierClass) -> Duration {
        self.inner().cost(class)
    }

    fn available(&self, class: CarrierClass) -> bool {
        self.inner().available(class)
    }

    fn observe(&self, learner: &Learner, sample: f64) {
        self.inner().observe(learner, sample)
    }
}
