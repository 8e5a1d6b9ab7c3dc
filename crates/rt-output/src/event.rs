//! Outbound notifications and the publisher seam.
//!
//! The engine only builds payload maps; getting them onto a message bus is the
//! [`EventPublisher`] implementation's business.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{info, warn};

use crate::OutputResult;

/// Payload key names shared by every event kind.
pub mod keys {
    pub const FAB_ID: &str = "FAB_ID";
    pub const FAC_ID: &str = "FAC_ID";
    pub const AREA: &str = "MCP_NM";
    pub const MACHINE_ID: &str = "MACHINE_ID";
    pub const STATE: &str = "STATE";
    pub const ALARM_CD: &str = "ALARM_CD";
    pub const VALUE: &str = "VALUE";
    pub const ADDR_LST: &str = "ADDR_LST";
    pub const PORT_LST: &str = "PORT_LST";
    pub const EVENT_DT: &str = "EVENT_DT";
    pub const RECOVERY_DT: &str = "RECOVERY_DT";
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    ZoneOff,
    VehicleOff,
    AggregateSpeed,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ZoneOff => "HID_OFF",
            EventKind::VehicleOff => "VHL_OFF",
            EventKind::AggregateSpeed => "VHL_AVG_SPEED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification, ready to be handed to a publisher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEvent {
    pub kind: EventKind,
    pub payload: BTreeMap<String, String>,
}

impl OutboundEvent {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, payload: BTreeMap::new() }
    }

    /// Add one payload field.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.payload.insert(key.to_owned(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }
}

/// Hands events to whatever transport the deployment uses.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, subject: &str, event: &OutboundEvent) -> OutputResult<()>;
}

/// Publish every event to every subject.
///
/// A failed hand-off is logged and skipped so one bad subject cannot starve
/// the others.  Returns the number of successful hand-offs.
pub fn publish_all(
    publisher: &dyn EventPublisher,
    subjects: &[String],
    events: &[OutboundEvent],
) -> usize {
    let mut sent = 0;
    for event in events {
        for subject in subjects {
            match publisher.publish(subject, event) {
                Ok(()) => sent += 1,
                Err(err) => warn!(subject = %subject, kind = %event.kind, %err, "event not published"),
            }
        }
    }
    sent
}

/// Writes each event to the log instead of a bus.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingPublisher;

impl EventPublisher for LoggingPublisher {
    fn publish(&self, subject: &str, event: &OutboundEvent) -> OutputResult<()> {
        info!(subject, kind = %event.kind, payload = ?event.payload, "outbound event");
        Ok(())
    }
}
