//! `rt-service` — wires the railtwin crates into a running facility.
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`context`]  | `AppContext`: store, builder, sinks; rebuild and reports  |
//! | [`ingest`]   | `IngestService`: sequence stamping and the worker pool    |
//! | [`listener`] | `UdpListener`: datagram ingress                           |
//! | [`error`]    | `ServiceError`, `ServiceResult<T>`                        |
//!
//! # Usage
//!
//! ```rust,ignore
//! let ctx = Arc::new(AppContext::new(config, "F1", source, publisher, sink)?);
//! ctx.rebuild()?;
//! let service = IngestService::new(ctx.clone())?;
//! UdpListener::bind("0.0.0.0:7100")?.run(&service)?;
//! ```

pub mod context;
pub mod error;
pub mod ingest;
pub mod listener;


pub use context::{AppContext, Rebuilt};
pub use error::{ServiceError, ServiceResult};
pub use ingest::{IngestCounts, IngestService};
pub use listener::UdpListener;
