//! `rt-build` — turns raw facility layout into a [`NetworkSnapshot`].
//!
//! # Crate layout
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`raw`]     | Serde records a [`TopologySource`] hands over          |
//! | [`source`]  | `TopologySource` trait, `StaticSource`                |
//! | [`builder`] | `GraphBuilder` and its twelve build stages            |
//! | [`carry`]   | `carry_forward`: runtime hand-over on republish        |
//! | [`error`]   | `BuildError`, `BuildResult<T>`                        |
//!
//! # Typical use
//!
//! ```ignore
//! let builder = GraphBuilder::new(config)?;
//! let fresh = builder.build(&source.load("F1")?)?;
//! store.publish(fresh, |old, new| { carry_forward(old, new); });
//! ```
//!
//! [`NetworkSnapshot`]: rt_graph::NetworkSnapshot

pub mod builder;
pub mod carry;
pub mod error;
pub mod raw;
pub mod source;

#[cfg(test)]
mod tests;

pub use builder::GraphBuilder;
pub use carry::{carry_forward, CarryStats};
pub use error::{BuildError, BuildResult};
pub use raw::{
    AreaTopology, BuildInput, EquipmentRecord, PortAliasRecord, PortRecord, RawPoint, RawRegion,
    RawStation, RawVehicle, RmDirection, Segment,
};
pub use source::{StaticSource, TopologySource};
