//! `rt-ingest` — turns vehicle state reports into live network updates.
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`report`]   | `VehicleReport`, `decode`                                 |
//! | [`pipeline`] | `IngestPipeline`, `IngestOutcome`, `Movement`             |
//! | [`error`]    | `IngestError`, `IngestResult<T>`                          |
//!
//! # Usage
//!
//! ```rust,ignore
//! let pipeline = IngestPipeline::new(config, Arc::new(DijkstraRouter), publisher, sink);
//! let ticket = store.enter();
//! match pipeline.process_line(&ticket, line, seq, Millis::now()) { ... }
//! ```

pub mod error;
pub mod pipeline;
pub mod report;


pub use error::{IngestError, IngestResult};
pub use pipeline::{Applied, IngestOutcome, IngestPipeline, Movement};
pub use report::{decode, Decoded, VehicleReport, VEHICLE_STATE};
