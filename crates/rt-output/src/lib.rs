//! `rt-output` — everything the engine hands to the outside world.
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`event`]   | `OutboundEvent`, `EventPublisher`, `LoggingPublisher`      |
//! | [`sink`]    | `Tuple`, `Table`, `MetricsSink`, `NullSink`                |
//! | [`csv`]     | `CsvSink`: one appended CSV file per table                |
//! | [`records`] | Event and tuple builders for fault records                |
//! | [`traffic`] | `TrafficReporter`, `zone_occupancy_rows`                  |
//! | [`memory`]  | Recording publisher and sink                              |
//!
//! # Usage
//!
//! ```rust,ignore
//! use rt_output::{CsvSink, TrafficReporter};
//!
//! let sink = CsvSink::new(Path::new("./metrics"))?;
//! let reporter = TrafficReporter::new(&config.vehicle);
//! reporter.run(&store.read(), facility, "OHT01", &sink, &LoggingPublisher)?;
//! ```

pub mod csv;
pub mod error;
pub mod event;
pub mod memory;
pub mod records;
pub mod sink;
pub mod traffic;


pub use csv::CsvSink;
pub use error::{OutputError, OutputResult};
pub use event::{publish_all, EventKind, EventPublisher, LoggingPublisher, OutboundEvent};
pub use memory::{MemoryPublisher, MemorySink};
pub use records::{vehicle_off_event, vehicle_off_tuple, zone_off_event, zone_off_tuple};
pub use sink::{MetricsSink, NullSink, Table, Tuple, Value};
pub use traffic::{zone_occupancy_rows, TrafficReporter, TrafficSummary, LEARNED_AVERAGE, OVERALL_AVERAGE};
