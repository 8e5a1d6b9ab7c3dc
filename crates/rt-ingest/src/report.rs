//! Vehicle state report decoding.
//!
//! A report is one comma-separated line.  Field 0 is the message type; only
//! type `2` (vehicle state) is decoded, every other type is passed over.
//! Empty fields are kept in place, so `a,,b` has three fields.
//!
//! Decoding is lenient where a wrong value is harmless and strict where it
//! would corrupt learning:
//!
//! - fewer than 21 fields, an unknown state, or a non-numeric run distance
//!   rejects the report;
//! - other numbers fall back to 0, and unknown cycle or detail codes fall
//!   back to `None`.

use rt_core::{DetailState, RunCycle, VehicleCycle, VehicleState};

use crate::{IngestError, IngestResult};

/// Message type of a vehicle state report.
pub const VEHICLE_STATE: &str = "2";

/// Fields up to and including the run distance.
const REQUIRED_FIELDS: usize = 21;

mod field {
    pub const AREA: usize = 1;
    pub const VEHICLE: usize = 2;
    pub const STATE: usize = 3;
    pub const FULL: usize = 4;
    pub const ERROR_CODE: usize = 5;
    pub const ONLINE: usize = 6;
    pub const ADDRESS: usize = 7;
    pub const DISTANCE: usize = 8;
    pub const NEXT_ADDRESS: usize = 9;
    pub const RUN_CYCLE: usize = 10;
    pub const VEHICLE_CYCLE: usize = 11;
    pub const CARRIER: usize = 12;
    pub const DESTINATION: usize = 13;
    pub const EM_STATUS: usize = 14;
    pub const GROUP: usize = 15;
    pub const SOURCE_PORT: usize = 16;
    pub const DEST_PORT: usize = 17;
    pub const PRIORITY: usize = 18;
    pub const DETAIL_STATE: usize = 19;
    pub const RUN_DISTANCE: usize = 20;
    pub const COMMAND: usize = 21;
    pub const DISPLAY_AREA: usize = 22;
}

/// A decoded vehicle state report.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleReport {
    pub area: String,
    pub vehicle: String,
    pub state: VehicleState,
    pub full: bool,
    pub error_code: String,
    pub online: bool,
    pub address: u32,
    /// Distance past `address` in wire units; `ingest.distance_scale` turns
    /// it into mm.
    pub distance: f64,
    pub next_address: u32,
    pub run_cycle: RunCycle,
    pub vehicle_cycle: VehicleCycle,
    pub carrier_id: String,
    pub destination: String,
    pub em_status: u8,
    pub group_id: String,
    pub source_port: String,
    pub dest_port: String,
    /// `-1` when the field is empty.
    pub priority: i32,
    pub detail_state: DetailState,
    pub run_distance: i64,
    pub command_id: String,
    pub display_area: String,
}

/// Result of decoding one line.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Report(VehicleReport),
    /// Some other message type.
    Other(String),
}

/// Decode one datagram line.
pub fn decode(line: &str) -> IngestResult<Decoded> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split(',').collect();
    let kind = fields[0].trim();
    if kind != VEHICLE_STATE {
        return Ok(Decoded::Other(kind.to_owned()));
    }
    if fields.len() < REQUIRED_FIELDS {
        return Err(IngestError::malformed(
            format!("{} fields, need {REQUIRED_FIELDS}", fields.len()),
            line,
        ));
    }

    let text = |i: usize| fields.get(i).map_or(String::new(), |s| s.trim().to_owned());

    let state = VehicleState::from_code(fields[field::STATE])
        .ok_or_else(|| IngestError::malformed(format!("state {:?}", fields[field::STATE]), line))?;
    let run_distance = fields[field::RUN_DISTANCE]
        .trim()
        .parse::<i64>()
        .map_err(|_| IngestError::malformed(format!("run distance {:?}", fields[field::RUN_DISTANCE]), line))?;

    let priority = match fields[field::PRIORITY].trim() {
        "" => -1,
        p => p.parse().unwrap_or(0),
    };

    Ok(Decoded::Report(VehicleReport {
        area: text(field::AREA),
        vehicle: text(field::VEHICLE),
        state,
        full: int_or_zero(fields[field::FULL]) > 0,
        error_code: text(field::ERROR_CODE),
        online: fields[field::ONLINE].trim() == "1",
        address: uint_or_zero(fields[field::ADDRESS]),
        distance: fields[field::DISTANCE].trim().parse().unwrap_or(0.0),
        next_address: uint_or_zero(fields[field::NEXT_ADDRESS]),
        run_cycle: RunCycle::from_code(fields[field::RUN_CYCLE]).unwrap_or_default(),
        vehicle_cycle: VehicleCycle::from_code(fields[field::VEHICLE_CYCLE]).unwrap_or_default(),
        carrier_id: text(field::CARRIER),
        destination: text(field::DESTINATION),
        em_status: u8::from_str_radix(fields[field::EM_STATUS].trim(), 2).unwrap_or(0),
        group_id: text(field::GROUP),
        source_port: text(field::SOURCE_PORT),
        dest_port: text(field::DEST_PORT),
        priority,
        detail_state: DetailState::from_code(fields[field::DETAIL_STATE]).unwrap_or_default(),
        run_distance,
        command_id: text(field::COMMAND),
        display_area: text(field::DISPLAY_AREA),
    }))
}

fn int_or_zero(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

fn uint_or_zero(s: &str) -> u32 {
    s.trim().parse().unwrap_or(0)
}
