//! Raw topology records, as handed over by a [`TopologySource`].
//!
//! These are plain serde structs with no graph semantics: addresses are bare
//! integers and ports are referenced by name.  The builder turns them into
//! typed entities with minted ids.
//!
//! [`TopologySource`]: crate::TopologySource

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rt_core::{CadPoint, DrawPoint, PortKind};
use rt_graph::{EquipmentKind, StationKind, StationLocation};

// ── Per-area layout ───────────────────────────────────────────────────────────

/// A numbered rail point with up to two outgoing tracks.
///
/// An address of `0` means "no track on that side".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPoint {
    pub address: u32,
    pub left_address: u32,
    pub right_address: u32,
    /// Track length to the left neighbour, mm.  `0` falls back to the
    /// distance between draw coordinates.
    pub left_distance_mm: f64,
    pub right_distance_mm: f64,
    /// Speed-class codes looked up in [`AreaTopology::speed_classes`].
    pub left_speed: u32,
    pub right_speed: u32,
    pub draw: DrawPoint,
    pub cad: CadPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawStation {
    pub station_no: u32,
    /// Rail point the station hangs off.
    pub address: u32,
    pub location: StationLocation,
    pub kind: StationKind,
    #[serde(default)]
    pub port_id: String,
}

/// Directed track segment given as `(from_address, to_address)`.
pub type Segment = (u32, u32);

/// A zone (HID) or loop region: everything reachable from the entry
/// segments without passing an exit segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRegion {
    pub id: i32,
    #[serde(default)]
    pub entries: Vec<Segment>,
    #[serde(default)]
    pub exits: Vec<Segment>,
}

/// Everything one sub-area contributes to the build.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaTopology {
    pub name: String,
    pub points: Vec<RawPoint>,
    pub stations: Vec<RawStation>,
    pub zones: Vec<RawRegion>,
    pub loops: Vec<RawRegion>,
    /// Segments closed by the lane-cut list.
    pub cuts: Vec<Segment>,
    /// Speed-class code → max velocity, m/min.
    pub speed_classes: BTreeMap<u32, f64>,
}

// ── Facility-wide records ─────────────────────────────────────────────────────

/// Which way a stocker port talks to the stocker's robot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RmDirection {
    In,
    Out,
    #[default]
    Both,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortRecord {
    pub name: String,
    pub kind: PortKind,
    pub equipment: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub rm_direction: RmDirection,
    #[serde(default)]
    pub draw: DrawPoint,
    #[serde(default)]
    pub cad: CadPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub name: String,
    pub kind: EquipmentKind,
    /// Port names in physical order; conveyors link consecutive entries.
    #[serde(default)]
    pub ports: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawVehicle {
    pub name: String,
    pub area: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortAliasRecord {
    pub alias: String,
    pub port: String,
}

/// Complete input for one facility build.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildInput {
    pub facility: String,
    pub areas: Vec<AreaTopology>,
    pub ports: Vec<PortRecord>,
    pub equipment: Vec<EquipmentRecord>,
    pub vehicles: Vec<RawVehicle>,
    pub aliases: Vec<PortAliasRecord>,
}
