//! Vehicles and their exclusive lock.
//!
//! All vehicle mutation happens inside the ingestion pipeline while holding
//! the vehicle's lock.  The lock is only ever taken with a deadline:
//! [`Vehicle::try_acquire`] returns a guard or a [`LockTimeout`], and the
//! guard releases the lock on every exit path when it drops.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

use rt_core::{
    DetailState, EdgeId, Millis, NodeId, RunCycle, VehicleCycle, VehicleId, VehicleState, ZoneId,
};

/// One decoded position/state report, as applied to a vehicle.
#[derive(Clone, Debug, Default)]
pub struct Telemetry {
    pub state: Option<VehicleState>,
    pub address: u32,
    pub next_address: u32,
    pub rail_node: Option<NodeId>,
    pub next_rail_node: Option<NodeId>,
    pub rail_edge: Option<EdgeId>,
    /// Distance travelled past `address`, mm.
    pub distance_mm: f64,
    pub run_cycle: RunCycle,
    pub vehicle_cycle: VehicleCycle,
    pub detail_state: DetailState,
    pub error_code: String,
    pub full: bool,
    pub online: bool,
    pub em_status: u8,
    pub group_id: String,
    pub source_port: String,
    pub dest_port: String,
    pub priority: i32,
    pub run_distance: i64,
    pub received_at: Millis,
}

/// Everything the lock protects.
#[derive(Clone, Debug, Default)]
pub struct VehicleRecord {
    pub current: Telemetry,
    /// `current` as it was before the last accepted report.
    pub previous: Telemetry,
    /// Sequence number of the last accepted report.
    pub last_sequence: Option<u64>,
    pub zone: ZoneId,
    pub carrier_id: String,
    pub command_id: String,
}

impl VehicleRecord {
    /// Sequence gate.  Accepts `seq` and records it when it is newer than the
    /// last accepted one.
    pub fn accept_sequence(&mut self, seq: u64) -> bool {
        match self.last_sequence {
            Some(last) if seq <= last => false,
            _ => {
                self.last_sequence = Some(seq);
                true
            }
        }
    }

    /// Move `current` into `previous`, leaving `current` as a copy to edit.
    pub fn shift(&mut self) {
        self.previous = self.current.clone();
    }
}

#[derive(Debug, Error)]
#[error("vehicle {vehicle} lock not acquired within {waited:?}")]
pub struct LockTimeout {
    pub vehicle: VehicleId,
    pub waited: Duration,
}

#[derive(Debug)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub area: String,
    record: Mutex<VehicleRecord>,
}

impl Vehicle {
    pub fn new(id: VehicleId, name: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            area: area.into(),
            record: Mutex::new(VehicleRecord::default()),
        }
    }

    /// Take the vehicle's exclusive lock, waiting at most `timeout`.
    pub fn try_acquire(&self, timeout: Duration) -> Result<VehicleGuard<'_>, LockTimeout> {
        match self.record.try_lock_for(timeout) {
            Some(guard) => Ok(VehicleGuard { guard }),
            None => Err(LockTimeout { vehicle: self.id.clone(), waited: timeout }),
        }
    }

    /// Copy of the record.  Blocks until any holder releases the lock.
    pub fn record(&self) -> VehicleRecord {
        self.record.lock().clone()
    }

    pub fn restore(&self, record: VehicleRecord) {
        *self.record.lock() = record;
    }
}

/// Exclusive access to a vehicle's record.
pub struct VehicleGuard<'a> {
    guard: MutexGuard<'a, VehicleRecord>,
}

impl Deref for VehicleGuard<'_> {
    type Target = VehicleRecord;

    fn deref(&self) -> &VehicleRecord {
        &self.guard
    }
}

impl DerefMut for VehicleGuard<'_> {
    fn deref_mut(&mut self) -> &mut VehicleRecord {
        &mut self.guard
    }
}
