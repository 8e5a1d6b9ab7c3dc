//! Zone (HID) membership and vehicle counters.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use rt_core::{EdgeId, ZoneId, ZoneKey};

/// Static description of one zone, derived at build time.
#[derive(Clone, Debug)]
pub struct ZoneInfo {
    pub key: ZoneKey,
    pub area: String,
    pub zone: ZoneId,
    pub edges: Vec<EdgeId>,
    /// From-addresses of the member edges.
    pub addresses: Vec<String>,
    /// Port names of stations on the member edges, sorted.
    pub ports: Vec<String>,
}

/// Vehicles currently inside each zone.
#[derive(Debug, Default)]
pub struct ZoneCounters {
    counts: Mutex<FxHashMap<ZoneKey, u32>>,
}

impl ZoneCounters {
    pub fn increment(&self, key: &ZoneKey) {
        *self.counts.lock().entry(key.clone()).or_insert(0) += 1;
    }

    /// Saturates at zero.
    pub fn decrement(&self, key: &ZoneKey) {
        if let Some(n) = self.counts.lock().get_mut(key) {
            *n = n.saturating_sub(1);
        }
    }

    pub fn get(&self, key: &str) -> u32 {
        self.counts.lock().get(key).copied().unwrap_or(0)
    }

    /// Sorted copy of all counters.
    pub fn entries(&self) -> Vec<(ZoneKey, u32)> {
        let mut v: Vec<_> = self.counts.lock().iter().map(|(k, n)| (k.clone(), *n)).collect();
        v.sort();
        v
    }

    /// Seed a zero counter so idle zones still report.
    pub fn register(&self, key: ZoneKey) {
        self.counts.lock().entry(key).or_insert(0);
    }

    /// Copy `other`'s counts over this one's, keeping keys only this one has.
    pub fn restore_from(&self, other: &ZoneCounters) {
        let theirs = other.counts.lock().clone();
        let mut ours = self.counts.lock();
        for (k, n) in theirs {
            ours.insert(k, n);
        }
    }
}
