//! Stations: the point on a rail edge where a vehicle stops to reach a port.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use rt_core::{EdgeId, Millis, NodeId, StationId, VehicleId};

use crate::learner::Learner;

pub const DEFAULT_ASSIGN_COST_MS: f64 = 24_000.0;

/// Which track of a branch the station sits on.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StationLocation {
    LeftBranch,
    RightBranch,
    NoCondition,
}

/// Which hand-offs the station supports.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StationKind {
    Acquire,
    Deposit,
    Dual,
}

impl StationKind {
    pub fn supports_acquire(self) -> bool {
        !matches!(self, StationKind::Deposit)
    }

    pub fn supports_deposit(self) -> bool {
        matches!(self, StationKind::Deposit | StationKind::Dual)
    }
}

/// Dispatch bookkeeping.  The engine never interprets these fields; it keeps
/// them alive across rebuilds for the job dispatcher.
#[derive(Clone, Debug)]
pub struct StationState {
    pub available: bool,
    pub assigned_vehicle: Option<VehicleId>,
    /// Command id → time the command was routed here.
    pub incoming_commands: BTreeMap<String, Millis>,
    pub outgoing_command: Option<String>,
    pub reassign_count: u32,
    pub avg_assign_cost_ms: f64,
    pub carrier_id: Option<String>,
}

impl Default for StationState {
    fn default() -> Self {
        Self {
            available: true,
            assigned_vehicle: None,
            incoming_commands: BTreeMap::new(),
            outgoing_command: None,
            reassign_count: 0,
            avg_assign_cost_ms: DEFAULT_ASSIGN_COST_MS,
            carrier_id: None,
        }
    }
}

#[derive(Debug)]
pub struct Station {
    pub id: StationId,
    pub area: String,
    pub station_no: u32,
    pub address: u32,
    pub location: StationLocation,
    pub kind: StationKind,
    pub rail_edge: EdgeId,
    pub port_name: String,
    /// Resolved port node; `None` when the port is bridged.
    pub port_node: Option<NodeId>,
    pub acquire_edge: Option<EdgeId>,
    pub deposit_edge: Option<EdgeId>,
    state: Mutex<StationState>,
}

impl Station {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: StationId,
        area: impl Into<String>,
        station_no: u32,
        address: u32,
        location: StationLocation,
        kind: StationKind,
        rail_edge: EdgeId,
        port_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            area: area.into(),
            station_no,
            address,
            location,
            kind,
            rail_edge,
            port_name: port_name.into(),
            port_node: None,
            acquire_edge: None,
            deposit_edge: None,
            state: Mutex::new(StationState::default()),
        }
    }

    pub fn state(&self) -> StationState {
        self.state.lock().clone()
    }

    pub fn restore(&self, state: StationState) {
        *self.state.lock() = state;
    }

    pub fn assign(&self, vehicle: Option<VehicleId>) {
        let mut s = self.state.lock();
        if s.assigned_vehicle.is_some() && vehicle.is_some() && s.assigned_vehicle != vehicle {
            s.reassign_count += 1;
        }
        s.assigned_vehicle = vehicle;
    }

    /// Fold one dispatch-to-arrival observation into the assign cost.
    pub fn observe_assign_cost(&self, learner: &Learner, sample_ms: f64) {
        if !sample_ms.is_finite() || sample_ms < 0.0 {
            return;
        }
        let mut s = self.state.lock();
        s.avg_assign_cost_ms = learner.blend(s.avg_assign_cost_ms, sample_ms);
    }
}
