//! `rt-core` — foundational types for the `railtwin` network engine.
//!
//! This crate is a dependency of every other `rt-*` crate.  It has no `rt-*`
//! dependencies and only three external ones (`serde`, `thiserror`, `toml`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`ids`]      | `NodeId`, `EdgeId`, `StationId`, `VehicleId`, `ZoneKey`, … |
//! | [`codes`]    | Telemetry code tables (`VehicleState`, `RunCycle`, …)      |
//! | [`geo`]      | `DrawPoint`, `CadPoint`                                    |
//! | [`time`]     | `Millis` wall-clock instants                               |
//! | [`config`]   | `Config` and its sections, TOML loading                    |
//! | [`error`]    | `CoreError`, `CoreResult`                                  |

pub mod codes;
pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use codes::{CarrierClass, DetailState, RunCycle, VehicleCycle, VehicleState};
pub use config::{
    AlarmConfig, AreaConfig, BuildConfig, Config, FacilityConfig, FeatureSwitches, IngestConfig,
    LearnerConfig, VehicleConfig,
};
pub use error::{CoreError, CoreResult};
pub use geo::{CadPoint, DrawPoint};
pub use ids::{Direction, EdgeId, EquipmentId, NodeId, PortKind, StationId, VehicleId, ZoneId, ZoneKey};
pub use time::Millis;
