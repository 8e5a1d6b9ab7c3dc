//! Open fault records.
//!
//! Ingestion opens a record when a configured alarm code appears and closes
//! it when the code clears.  Records belong to the snapshot so they survive
//! a rebuild through the carry-forward merge.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use rt_core::{Millis, ZoneId};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FaultState {
    Abnormal,
    Normal,
}

impl FaultState {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultState::Abnormal => "ABNORMAL",
            FaultState::Normal => "NORMAL",
        }
    }
}

/// A zone (HID) stopped by an alarm.
#[derive(Clone, Debug)]
pub struct ZoneFaultRecord {
    pub key: String,
    pub area: String,
    pub zone: ZoneId,
    /// `HID{zone:03}`.
    pub alarm_code: String,
    pub error_code: String,
    pub address: u32,
    pub next_address: u32,
    pub addresses: Vec<String>,
    pub ports: Vec<String>,
    pub state: FaultState,
    pub opened_at: Millis,
    pub last_seen: Millis,
    pub recovered_at: Option<Millis>,
}

/// A vehicle stopped by an alarm at one location.
#[derive(Clone, Debug)]
pub struct VehicleFaultRecord {
    pub key: String,
    /// `{vehicle}:{address}:{error}`; a change means a different fault.
    pub device_id: String,
    pub area: String,
    pub vehicle_name: String,
    pub error_code: String,
    pub address: u32,
    pub next_address: u32,
    pub addresses: Vec<String>,
    pub ports: Vec<String>,
    pub state: FaultState,
    pub opened_at: Millis,
    pub recovered_at: Option<Millis>,
}

/// A vehicle moving to a staging position.
#[derive(Clone, Debug)]
pub struct StageRecord {
    pub key: String,
    pub vehicle_name: String,
    pub dest_port: String,
    pub state: FaultState,
    pub updated_at: Millis,
}

/// All open records of one snapshot.
#[derive(Debug, Default)]
pub struct FaultBook {
    pub zone_off: Mutex<FxHashMap<String, ZoneFaultRecord>>,
    pub vehicle_off: Mutex<FxHashMap<String, VehicleFaultRecord>>,
    pub stage: Mutex<FxHashMap<String, StageRecord>>,
}

impl FaultBook {
    /// Replace this book's contents with a copy of `other`'s.
    pub fn restore_from(&self, other: &FaultBook) {
        *self.zone_off.lock() = other.zone_off.lock().clone();
        *self.vehicle_off.lock() = other.vehicle_off.lock().clone();
        *self.stage.lock() = other.stage.lock().clone();
    }

    pub fn open_counts(&self) -> (usize, usize) {
        (self.zone_off.lock().len(), self.vehicle_off.lock().len())
    }
}
