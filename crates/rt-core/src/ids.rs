//! Composite string identifiers.
//!
//! Every entity in a network snapshot is keyed by a deterministic string of
//! the form `{facility}:{TYPE}:{qualifiers}`.  Because the same physical
//! element always mints the same key, a rebuilt snapshot can find the state
//! of its predecessor by plain map lookup.
//!
//! IDs wrap an `Arc<str>` so cloning one into an index or a vehicle record is
//! a reference-count bump, not an allocation.  All of them implement
//! `Borrow<str>`, so maps keyed by an ID can be probed with a `&str`.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Generate a typed ID wrapper around a shared string.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        $vis struct $name(Arc<str>);

        impl $name {
            /// Wrap an already-formatted key.
            #[inline]
            pub fn new(key: impl Into<Arc<str>>) -> Self {
                Self(key.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Arc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }
    };
}

string_id! {
    /// Key of any graph vertex: rail node, port, shelf, or stocker RM.
    pub struct NodeId;
}

string_id! {
    /// Key of any directed edge: rail, transfer, stocker-RM, or conveyor.
    pub struct EdgeId;
}

string_id! {
    /// Key of a station (load/unload point bound to one rail edge).
    pub struct StationId;
}

string_id! {
    /// Key of a vehicle.
    pub struct VehicleId;
}

string_id! {
    /// Key of a piece of equipment (stocker, tool, conveyor, interface).
    pub struct EquipmentId;
}

string_id! {
    /// Key of a zone counter: `{fab}:{area}:{zone:03}`.
    pub struct ZoneKey;
}

// ── Track direction ───────────────────────────────────────────────────────────

/// Which neighbour of a rail point an edge leads to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn code(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

// ── Port kinds ────────────────────────────────────────────────────────────────

/// The non-rail vertex families that carry a port name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum PortKind {
    StockerPort,
    StockerBuffer,
    StockerShelf,
    EquipmentPort,
    InterfacePort,
    ConveyorPort,
}

impl PortKind {
    /// Type segment used in the node id.
    pub fn prefix(self) -> &'static str {
        match self {
            PortKind::StockerPort => "SPN",
            PortKind::StockerBuffer => "SBN",
            PortKind::StockerShelf => "SSN",
            PortKind::EquipmentPort => "EPN",
            PortKind::InterfacePort => "FPN",
            PortKind::ConveyorPort => "CPN",
        }
    }
}

// ── Zones ─────────────────────────────────────────────────────────────────────

/// Zone (HID) number as carried on a rail edge.
///
/// Negative values mean "not in any zone".  Zone 0 exists in the layout data
/// but is never counted.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ZoneId(pub i32);

impl ZoneId {
    pub const UNZONED: ZoneId = ZoneId(-1);

    #[inline]
    pub fn is_zoned(self) -> bool {
        self.0 >= 0
    }

    /// Zones that keep a vehicle counter.
    #[inline]
    pub fn is_counted(self) -> bool {
        self.0 > 0
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::UNZONED
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

// ── Minting ───────────────────────────────────────────────────────────────────

impl NodeId {
    pub fn rail(fab: &str, area: &str, address: u32) -> Self {
        Self::new(format!("{fab}:RN:{area}:{address:05}"))
    }

    pub fn port(fab: &str, kind: PortKind, name: &str) -> Self {
        Self::new(format!("{fab}:{}:{name}", kind.prefix()))
    }

    pub fn stocker_rm(fab: &str, stocker: &str) -> Self {
        Self::new(format!("{fab}:SRM:{stocker}"))
    }
}

impl EdgeId {
    pub fn rail(fab: &str, area: &str, from: u32, to: u32) -> Self {
        Self::new(format!("{fab}:RE:{area}:{from:05}-{to:05}"))
    }

    pub fn acquire(fab: &str, area: &str, station_no: u32) -> Self {
        Self::new(format!("{fab}:TE:A:{area}:{station_no:05}"))
    }

    pub fn deposit(fab: &str, area: &str, station_no: u32) -> Self {
        Self::new(format!("{fab}:TE:D:{area}:{station_no:05}"))
    }

    pub fn stocker_rm(fab: &str, stocker: &str, port: &str, from_rm: bool) -> Self {
        let dir = if from_rm { "OUT" } else { "IN" };
        Self::new(format!("{fab}:RM:{stocker}:{port}-{dir}"))
    }

    pub fn conveyor(fab: &str, conveyor: &str, from_port: &str, to_port: &str) -> Self {
        Self::new(format!("{fab}:CE:{conveyor}:{from_port}-{to_port}"))
    }

    pub fn branch_join(fab: &str, area: &str, start: u32, dir: Direction, end: u32) -> Self {
        Self::new(format!("{fab}:BJ:{area}:{start:05}-{}-{end:05}", dir.code()))
    }
}

impl StationId {
    pub fn mint(fab: &str, area: &str, station_no: u32) -> Self {
        Self::new(format!("{fab}:ST:{area}:{station_no:05}"))
    }
}

impl VehicleId {
    pub fn mint(fab: &str, area: &str, name: &str) -> Self {
        Self::new(format!("{fab}:VHL:{area}:{name}"))
    }
}

impl EquipmentId {
    pub fn mint(fab: &str, name: &str) -> Self {
        Self::new(format!("{fab}:EQP:{name}"))
    }
}

impl ZoneKey {
    pub fn mint(fab: &str, area: &str, zone: ZoneId) -> Self {
        Self::new(format!("{fab}:{area}:{zone}"))
    }
}

/// Key of an open vehicle-fault record: `{fab}:{area}:{vehicleName}`.
pub fn vehicle_fault_key(fab: &str, area: &str, vehicle_name: &str) -> String {
    format!("{fab}:{area}:{vehicle_name}")
}
