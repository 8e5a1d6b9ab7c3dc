//! The live-snapshot holder.
//!
//! # Protocol
//!
//! The store owns exactly one live [`NetworkSnapshot`] and a `blocked` flag,
//! both behind one mutex with a condition variable beside it.
//!
//! - [`SnapshotStore::read`] parks while `blocked` is set, then hands out an
//!   `Arc` to the live snapshot.
//! - [`SnapshotStore::enter`] does the same and additionally counts the
//!   caller as an active mutator until the returned [`MutationTicket`] drops.
//!   Report workers use this so a rebuild can wait for them to finish.
//! - [`SnapshotStore::publish`] raises `blocked`, waits for the active count
//!   to reach zero, runs the caller's merge from the old snapshot into the
//!   new one, swaps, and only then lowers `blocked` and wakes everyone.
//!
//! A reader therefore sees either the complete old snapshot or the complete
//! merged new one.  Holders of an old `Arc` keep a consistent view until they
//! drop it.
//!
//! A ticket holder must not call `read` or `enter` again while holding the
//! ticket: a publish waiting on that ticket would never finish.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::snapshot::NetworkSnapshot;

struct Gate {
    live: Arc<NetworkSnapshot>,
    blocked: bool,
    active: usize,
}

pub struct SnapshotStore {
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl SnapshotStore {
    pub fn new(initial: NetworkSnapshot) -> Self {
        Self {
            gate: Mutex::new(Gate { live: Arc::new(initial), blocked: false, active: 0 }),
            changed: Condvar::new(),
        }
    }

    /// The live snapshot, waiting out any publish in progress.
    pub fn read(&self) -> Arc<NetworkSnapshot> {
        let mut gate = self.gate.lock();
        while gate.blocked {
            self.changed.wait(&mut gate);
        }
        gate.live.clone()
    }

    /// Like [`read`](Self::read), but registers the caller as an active
    /// mutator until the ticket drops.
    pub fn enter(&self) -> MutationTicket<'_> {
        let mut gate = self.gate.lock();
        while gate.blocked {
            self.changed.wait(&mut gate);
        }
        gate.active += 1;
        MutationTicket { store: self, snapshot: gate.live.clone() }
    }

    fn leave(&self) {
        let mut gate = self.gate.lock();
        gate.active = gate.active.saturating_sub(1);
        if gate.active == 0 {
            self.changed.notify_all();
        }
    }

    /// Replace the live snapshot with `next`.
    ///
    /// `merge` receives the outgoing snapshot and the incoming one after all
    /// mutators have drained and before any reader can see `next`.  The new
    /// snapshot's generation is one past the old one's.
    pub fn publish<F>(&self, mut next: NetworkSnapshot, merge: F) -> Arc<NetworkSnapshot>
    where
        F: FnOnce(&NetworkSnapshot, &mut NetworkSnapshot),
    {
        let previous = {
            let mut gate = self.gate.lock();
            // One publisher at a time.
            while gate.blocked {
                self.changed.wait(&mut gate);
            }
            gate.blocked = true;
            while gate.active > 0 {
                debug!(active = gate.active, "publish waiting for mutators to drain");
                self.changed.wait(&mut gate);
            }
            gate.live.clone()
        };

        // Lowers the flag even if the merge unwinds.
        let unblock = Unblock(self);

        merge(&previous, &mut next);
        next.generation = previous.generation + 1;
        let next = Arc::new(next);
        self.gate.lock().live = next.clone();

        drop(unblock);
        next
    }

    /// Non-waiting look at the flag; for diagnostics and tests.
    pub fn is_blocked(&self) -> bool {
        self.gate.lock().blocked
    }

    pub fn active_mutators(&self) -> usize {
        self.gate.lock().active
    }

    /// Generation of the live snapshot without waiting on a publish.
    pub fn generation(&self) -> u64 {
        self.gate.lock().live.generation
    }
}

struct Unblock<'a>(&'a SnapshotStore);

impl Drop for Unblock<'_> {
    fn drop(&mut self) {
        let mut gate = self.0.gate.lock();
        gate.blocked = false;
        self.0.changed.notify_all();
    }
}

/// Read access to the live snapshot that holds off publishes until dropped.
pub struct MutationTicket<'a> {
    store: &'a SnapshotStore,
    snapshot: Arc<NetworkSnapshot>,
}

impl MutationTicket<'_> {
    pub fn snapshot(&self) -> &Arc<NetworkSnapshot> {
        &self.snapshot
    }
}

impl Deref for MutationTicket<'_> {
    type Target = NetworkSnapshot;

    fn deref(&self) -> &NetworkSnapshot {
        &self.snapshot
    }
}

impl Drop for MutationTicket<'_> {
    fn drop(&mut self) {
        self.store.leave();
    }
}
