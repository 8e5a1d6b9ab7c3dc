//! railnet — runs one facility of the live rail network.
//!
//! ```text
//! railnet <config.toml> <topology.json> [metrics-dir]
//! ```
//!
//! The topology file is a serialized `BuildInput`.  Reports arrive over UDP
//! when `ingest.listen_addr` is set, otherwise one per line on stdin.
//! Traffic and zone occupancy are reported once a minute and on exit.
//!
//! Logging is controlled by `RAILTWIN_LOG` (an `EnvFilter` directive, default
//! `info`) and `RAILTWIN_LOG_FORMAT` (`compact` or `json`).

use std::env;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rt_build::{BuildError, BuildInput, BuildResult, TopologySource};
use rt_core::{Config, Millis};
use rt_output::{CsvSink, LoggingPublisher};
use rt_service::{AppContext, IngestService, UdpListener};

// ── Constants ─────────────────────────────────────────────────────────────────

const REPORT_INTERVAL: Duration = Duration::from_secs(60);
const TICK:            Duration = Duration::from_millis(250);

// ── Topology file ─────────────────────────────────────────────────────────────

/// Re-reads the JSON file on every rebuild.
struct JsonSource {
    path: PathBuf,
}

impl TopologySource for JsonSource {
    fn load(&self, facility: &str) -> BuildResult<BuildInput> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| BuildError::Source(format!("{}: {e}", self.path.display())))?;
        let mut input: BuildInput = serde_json::from_str(&text)
            .map_err(|e| BuildError::Source(format!("{}: {e}", self.path.display())))?;
        if input.facility.is_empty() {
            input.facility = facility.to_owned();
        }
        Ok(input)
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RAILTWIN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let format = env::var("RAILTWIN_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => registry.with(fmt::layer().json().with_ansi(false)).init(),
        _ => registry.with(fmt::layer().compact()).init(),
    }
}

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: railnet <config.toml> <topology.json> [metrics-dir]");
    }
    let config = Config::load(Path::new(&args[0])).with_context(|| format!("loading {}", args[0]))?;
    let metrics_dir = PathBuf::from(args.get(2).map_or("railnet_out", String::as_str));
    fs::create_dir_all(&metrics_dir)?;

    let Some(facility) = config.facilities.first().map(|f| f.id.clone()) else {
        bail!("no facility configured");
    };
    let listen_addr = config.ingest.listen_addr.clone();

    let sink = Arc::new(CsvSink::new(&metrics_dir)?);
    let ctx = Arc::new(AppContext::new(
        config,
        &facility,
        Arc::new(JsonSource { path: PathBuf::from(&args[1]) }),
        Arc::new(LoggingPublisher),
        sink.clone(),
    )?);

    let t0 = Instant::now();
    let rebuilt = ctx.rebuild()?;
    println!(
        "facility {facility}: {} nodes, {} edges in {:.2?}",
        rebuilt.nodes,
        rebuilt.edges,
        t0.elapsed()
    );

    let service = IngestService::new(ctx.clone())?;
    let stop = Arc::new(AtomicBool::new(false));

    thread::scope(|s| -> Result<()> {
        let reporter = s.spawn(|| report_loop(&ctx, &stop));

        let fed = match &listen_addr {
            Some(addr) => UdpListener::bind(addr.as_str())
                .and_then(|listener| listener.run(&service))
                .map_err(anyhow::Error::from),
            None => feed_stdin(&service),
        };
        service.flush();
        // Stop the reporter on every path; the scope joins it.
        stop.store(true, Ordering::Relaxed);
        if reporter.join().is_err() {
            warn!("report thread panicked");
        }
        let lines = fed?;
        info!(lines, "ingest finished");
        Ok(())
    })?;

    report_once(&ctx);
    sink.finish()?;

    let counts = service.counts();
    println!(
        "{} lines: {} applied, {} removed, {} stale, {} ignored, {} malformed, {} dropped",
        counts.submitted,
        counts.applied,
        counts.removed,
        counts.stale,
        counts.ignored,
        counts.malformed,
        counts.dropped
    );
    println!("metrics in {}", metrics_dir.display());
    Ok(())
}

fn feed_stdin(service: &IngestService) -> Result<u64> {
    let mut lines = 0u64;
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        service.submit(line, Millis::now());
        lines += 1;
    }
    Ok(lines)
}

fn report_loop(ctx: &AppContext, stop: &AtomicBool) {
    let mut next = Instant::now() + REPORT_INTERVAL;
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(TICK);
        if Instant::now() >= next {
            report_once(ctx);
            next += REPORT_INTERVAL;
        }
    }
}

fn report_once(ctx: &AppContext) {
    if let Err(e) = ctx.report_traffic() {
        warn!(error = %e, "traffic report failed");
    }
    if let Err(e) = ctx.report_occupancy() {
        warn!(error = %e, "occupancy report failed");
    }
}
