//! In-process collaborators that keep everything they receive.
//!
//! Used by dry runs and by tests across the workspace.

use parking_lot::Mutex;

use crate::event::{EventKind, EventPublisher, OutboundEvent};
use crate::sink::{MetricsSink, Table, Tuple};
use crate::OutputResult;

#[derive(Debug, Default)]
pub struct MemoryPublisher {
    sent: Mutex<Vec<(String, OutboundEvent)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, as `(subject, event)`.
    pub fn sent(&self) -> Vec<(String, OutboundEvent)> {
        self.sent.lock().clone()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<OutboundEvent> {
        self.sent.lock().iter().filter(|(_, e)| e.kind == kind).map(|(_, e)| e.clone()).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl EventPublisher for MemoryPublisher {
    fn publish(&self, subject: &str, event: &OutboundEvent) -> OutputResult<()> {
        self.sent.lock().push((subject.to_owned(), event.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<(Table, Tuple)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: Table) -> Vec<Tuple> {
        self.rows.lock().iter().filter(|(t, _)| *t == table).map(|(_, r)| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl MetricsSink for MemorySink {
    fn record(&self, table: Table, tuples: &[Tuple]) -> OutputResult<()> {
        self.rows.lock().extend(tuples.iter().cloned().map(|t| (table, t)));
        Ok(())
    }
}
