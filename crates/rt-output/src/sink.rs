//! Metrics tuples and the sink seam.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::OutputResult;

/// Destination table of a batch of tuples.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Table {
    TrafficVelocity,
    TrafficEdge,
    ZoneOccupancy,
    ZoneOff,
    VehicleOff,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::TrafficVelocity,
        Table::TrafficEdge,
        Table::ZoneOccupancy,
        Table::ZoneOff,
        Table::VehicleOff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::TrafficVelocity => "traffic_velocity",
            Table::TrafficEdge => "traffic_edge",
            Table::ZoneOccupancy => "zone_occupancy",
            Table::ZoneOff => "zone_off",
            Table::VehicleOff => "vehicle_off",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One named-field row.  Field order is alphabetical.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Tuple {
    fields: BTreeMap<String, Value>,
}

impl Tuple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Receives analytics tuples.
///
/// Implementations must be callable from many report workers at once.
pub trait MetricsSink: Send + Sync {
    fn record(&self, table: Table, tuples: &[Tuple]) -> OutputResult<()>;
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn record(&self, _table: Table, _tuples: &[Tuple]) -> OutputResult<()> {
        Ok(())
    }
}
