//! Worker pool that applies raw report lines to the live snapshot.
//!
//! Every submitted line gets a sequence number from a single ingress counter
//! before it reaches the pool, so the per-vehicle sequence gate can discard a
//! report that a faster worker has already overtaken.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{error, trace, warn};

use rt_core::Millis;
use rt_graph::DijkstraRouter;
use rt_ingest::{IngestError, IngestOutcome, IngestPipeline};

use crate::context::AppContext;
use crate::ServiceResult;

/// Running totals of what the pool has done with its input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub submitted: u64,
    pub applied:   u64,
    pub removed:   u64,
    pub stale:     u64,
    pub ignored:   u64,
    pub malformed: u64,
    /// Lock timeouts, off-track reports, and graph or output failures.
    pub dropped:   u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    applied:   AtomicU64,
    removed:   AtomicU64,
    stale:     AtomicU64,
    ignored:   AtomicU64,
    malformed: AtomicU64,
    dropped:   AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> IngestCounts {
        IngestCounts {
            submitted: self.submitted.load(Ordering::Relaxed),
            applied:   self.applied.load(Ordering::Relaxed),
            removed:   self.removed.load(Ordering::Relaxed),
            stale:     self.stale.load(Ordering::Relaxed),
            ignored:   self.ignored.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            dropped:   self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Tracks tasks handed to the pool but not yet finished.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle:  Condvar,
}

impl InFlight {
    fn start(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

pub struct IngestService {
    context:  Arc<AppContext>,
    pipeline: Arc<IngestPipeline>,
    pool:     ThreadPool,
    sequence: AtomicU64,
    inflight: Arc<InFlight>,
    counters: Arc<Counters>,
}

impl IngestService {
    /// Start a pool of `ingest.workers` threads over `context`.
    pub fn new(context: Arc<AppContext>) -> ServiceResult<Self> {
        let workers = context.config().ingest.workers;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ingest-{i}"))
            .build()?;
        let pipeline = IngestPipeline::new(
            context.config().clone(),
            Arc::new(DijkstraRouter),
            context.publisher().clone(),
            context.sink().clone(),
        );
        Ok(Self {
            context,
            pipeline: Arc::new(pipeline),
            pool,
            sequence: AtomicU64::new(0),
            inflight: Arc::new(InFlight::default()),
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    /// Queue one raw line; returns the sequence number it was stamped with.
    ///
    /// The task registers as a mutator for its whole run, so a concurrent
    /// rebuild waits for it and it never sees a half-published snapshot.
    pub fn submit(&self, line: String, received_at: Millis) -> u64 {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Counters::bump(&self.counters.submitted);
        self.inflight.start();

        let context = self.context.clone();
        let pipeline = self.pipeline.clone();
        let inflight = self.inflight.clone();
        let counters = self.counters.clone();
        self.pool.spawn(move || {
            let ticket = context.store().enter();
            let result = pipeline.process_line(&ticket, &line, seq, received_at);
            drop(ticket);
            tally(&counters, seq, result);
            inflight.finish();
        });
        seq
    }

    /// Block until every submitted line has been processed.
    pub fn flush(&self) {
        self.inflight.wait();
    }

    pub fn counts(&self) -> IngestCounts {
        self.counters.snapshot()
    }
}

fn tally(counters: &Counters, seq: u64, result: Result<IngestOutcome, IngestError>) {
    match result {
        Ok(IngestOutcome::Applied(_)) => Counters::bump(&counters.applied),
        Ok(IngestOutcome::Removed) => Counters::bump(&counters.removed),
        Ok(IngestOutcome::Ignored) => Counters::bump(&counters.ignored),
        Ok(IngestOutcome::Stale { last }) => {
            trace!(seq, last, "stale report discarded");
            Counters::bump(&counters.stale);
        }
        Err(e @ IngestError::Malformed { .. }) => {
            warn!(seq, error = %e, "malformed report");
            Counters::bump(&counters.malformed);
        }
        Err(e @ IngestError::Output(_)) => {
            error!(seq, error = %e, "report applied but output failed");
            Counters::bump(&counters.dropped);
        }
        Err(e) => {
            warn!(seq, error = %e, "report dropped");
            Counters::bump(&counters.dropped);
        }
    }
}
