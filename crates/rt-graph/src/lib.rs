//! `rt-graph` — network entities, snapshots, and rail routing.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`node`]     | `Node`, `NodeKind`, `NodeState`                            |
//! | [`edge`]     | `RailEdge`, `TransferEdge`, `StkRmEdge`, `ConveyorEdge`, `EdgeRef` |
//! | [`station`]  | `Station`, `StationState`                                  |
//! | [`vehicle`]  | `Vehicle`, `VehicleRecord`, `VehicleGuard`, `LockTimeout`  |
//! | [`learner`]  | `Learner` (EMA + clamp bands)                              |
//! | [`zones`]    | `ZoneInfo`, `ZoneCounters`                                 |
//! | [`faults`]   | Open zone/vehicle/stage fault records                      |
//! | [`snapshot`] | `NetworkSnapshot` and its derived indices                  |
//! | [`store`]    | `SnapshotStore`, `MutationTicket`                          |
//! | [`router`]   | `Router` trait, `Route`, `DijkstraRouter`                  |
//! | [`reach`]    | `bounded_walk`, `affected_upstream`                        |
//! | [`error`]    | `GraphError`, `GraphResult<T>`                             |

pub mod edge;
pub mod error;
pub mod faults;
pub mod learner;
pub mod node;
pub mod reach;
pub mod router;
pub mod snapshot;
pub mod station;
pub mod store;
pub mod vehicle;
pub mod zones;

#[cfg(test)]
mod tests;

pub use edge::{
    ConveyorEdge, EdgeCost, EdgeRef, RailEdge, RailRuntime, StkRmEdge, StkRmRuntime, TransferEdge,
    TransferKind, TransferRuntime,
};
pub use error::{GraphError, GraphResult};
pub use faults::{FaultBook, FaultState, StageRecord, VehicleFaultRecord, ZoneFaultRecord};
pub use learner::{Band, Learner};
pub use node::{Node, NodeKind, NodeState, PortPoint, RailPoint};
pub use reach::{affected_upstream, bounded_walk, Affected, Walk};
pub use router::{DijkstraRouter, Route, Router};
pub use snapshot::{BranchJoin, Equipment, EquipmentKind, NetworkSnapshot, RailCutRecord};
pub use station::{Station, StationKind, StationLocation, StationState};
pub use store::{MutationTicket, SnapshotStore};
pub use vehicle::{LockTimeout, Telemetry, Vehicle, VehicleGuard, VehicleRecord};
pub use zones::{ZoneCounters, ZoneInfo};
