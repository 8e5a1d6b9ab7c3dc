//! Typed engine configuration.
//!
//! Every tunable the engine reads lives in [`Config`].  The struct is plain
//! data: sections are populated by serde from TOML and passed down by value
//! or `Arc`, never looked up by name at runtime.
//!
//! ```toml
//! [learner]
//! smoothing_weight = 0.7
//!
//! [ingest]
//! workers = 8
//! lock_timeout_ms = 50
//!
//! [alarms]
//! zone_off_codes = ["E101", "E102"]
//!
//! [[facilities]]
//! id = "M14"
//! subscribers = ["FAB.M14.OHT.EVENT"]
//! areas = [{ name = "OHT01" }]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

// ── Root ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub learner: LearnerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub alarms: AlarmConfig,
    #[serde(default)]
    pub facilities: Vec<FacilityConfig>,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject combinations that would break learner or pool invariants.
    pub fn validate(&self) -> CoreResult<()> {
        let l = &self.learner;
        if !(0.0..1.0).contains(&l.smoothing_weight) {
            return Err(CoreError::Config(format!(
                "learner.smoothing_weight must be in [0, 1), got {}",
                l.smoothing_weight
            )));
        }
        if l.rail_velocity_min <= 0.0 || l.rail_velocity_min > self.build.default_max_velocity {
            return Err(CoreError::Config(format!(
                "learner.rail_velocity_min must be in (0, {}], got {}",
                self.build.default_max_velocity, l.rail_velocity_min
            )));
        }
        for (name, lo, hi) in [
            ("conveyor", l.conveyor_cost_min_ms, l.conveyor_cost_max_ms),
            ("transfer", l.transfer_cost_min_ms, l.transfer_cost_max_ms),
        ] {
            if lo > hi {
                return Err(CoreError::Config(format!(
                    "learner.{name}_cost band is inverted: [{lo}, {hi}]"
                )));
            }
        }
        if self.ingest.workers == 0 || self.build.workers == 0 {
            return Err(CoreError::Config("worker pools need at least one thread".into()));
        }
        for fac in &self.facilities {
            if fac.id.is_empty() {
                return Err(CoreError::Config("facility id must not be empty".into()));
            }
        }
        Ok(())
    }

    pub fn facility(&self, id: &str) -> Option<&FacilityConfig> {
        self.facilities.iter().find(|f| f.id == id)
    }
}

// ── Learner ───────────────────────────────────────────────────────────────────

/// Smoothing weight and per-edge-type clamp bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Weight of the prior value in `old*w + sample*(1-w)`.
    #[serde(default = "default_smoothing_weight")]
    pub smoothing_weight: f64,
    /// Floor for learned rail velocity, m/min.  The ceiling is per-edge.
    #[serde(default = "default_rail_velocity_min")]
    pub rail_velocity_min: f64,
    #[serde(default = "default_conveyor_cost_min_ms")]
    pub conveyor_cost_min_ms: f64,
    #[serde(default = "default_conveyor_cost_max_ms")]
    pub conveyor_cost_max_ms: f64,
    /// Stocker-RM costs above this are treated as corrupt and reset.
    #[serde(default = "default_stk_rm_cost_cap_ms")]
    pub stk_rm_cost_cap_ms: f64,
    #[serde(default = "default_stk_rm_cost_default_ms")]
    pub stk_rm_cost_default_ms: f64,
    #[serde(default = "default_transfer_cost_min_ms")]
    pub transfer_cost_min_ms: f64,
    #[serde(default = "default_transfer_cost_max_ms")]
    pub transfer_cost_max_ms: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            smoothing_weight: default_smoothing_weight(),
            rail_velocity_min: default_rail_velocity_min(),
            conveyor_cost_min_ms: default_conveyor_cost_min_ms(),
            conveyor_cost_max_ms: default_conveyor_cost_max_ms(),
            stk_rm_cost_cap_ms: default_stk_rm_cost_cap_ms(),
            stk_rm_cost_default_ms: default_stk_rm_cost_default_ms(),
            transfer_cost_min_ms: default_transfer_cost_min_ms(),
            transfer_cost_max_ms: default_transfer_cost_max_ms(),
        }
    }
}

// ── Ingest ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Report-worker threads.
    #[serde(default = "default_ingest_workers")]
    pub workers: usize,
    /// Longest wait for a vehicle's lock before the report is dropped.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Reports further apart than this never yield a velocity sample.
    #[serde(default = "default_motion_window_ms")]
    pub motion_window_ms: u64,
    /// Multiplier from the reported distance field to millimetres.
    #[serde(default = "default_distance_scale")]
    pub distance_scale: f64,
    /// UDP bind address for the report listener, e.g. `0.0.0.0:7001`.
    #[serde(default)]
    pub listen_addr: Option<String>,
}

impl IngestConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_ingest_workers(),
            lock_timeout_ms: default_lock_timeout_ms(),
            motion_window_ms: default_motion_window_ms(),
            distance_scale: default_distance_scale(),
            listen_addr: None,
        }
    }
}

// ── Build ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Graph-build pool threads.
    #[serde(default = "default_build_workers")]
    pub workers: usize,
    /// Max velocity (m/min) for speed classes missing from the layout table.
    #[serde(default = "default_max_velocity")]
    pub default_max_velocity: f64,
    /// Upper bound on edges a single zone walk may collect.
    #[serde(default = "default_zone_walk_limit")]
    pub zone_walk_limit: usize,
    /// Upper bound on edges an affected-area walk may collect.
    #[serde(default = "default_affected_walk_limit")]
    pub affected_walk_limit: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            workers: default_build_workers(),
            default_max_velocity: default_max_velocity(),
            zone_walk_limit: default_zone_walk_limit(),
            affected_walk_limit: default_affected_walk_limit(),
        }
    }
}

// ── Vehicle geometry ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    #[serde(default = "default_vehicle_length_mm")]
    pub length_mm: f64,
    /// Minimum following distance counted towards rail density.
    #[serde(default = "default_vehicle_gap_mm")]
    pub gap_mm: f64,
}

impl VehicleConfig {
    pub fn footprint_mm(&self) -> f64 {
        self.length_mm + self.gap_mm
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            length_mm: default_vehicle_length_mm(),
            gap_mm: default_vehicle_gap_mm(),
        }
    }
}

// ── Alarms ────────────────────────────────────────────────────────────────────

/// Error codes that open fault records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default)]
    pub zone_off_codes: Vec<String>,
    #[serde(default)]
    pub vehicle_off_codes: Vec<String>,
}

impl AlarmConfig {
    pub fn is_zone_off(&self, code: &str) -> bool {
        !code.is_empty() && self.zone_off_codes.iter().any(|c| c == code)
    }

    pub fn is_vehicle_off(&self, code: &str) -> bool {
        !code.is_empty() && self.vehicle_off_codes.iter().any(|c| c == code)
    }
}

// ── Facilities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityConfig {
    /// Facility key used as the first id segment, e.g. `M14`.
    pub id: String,
    /// Site code stamped on outbound payloads.
    #[serde(default)]
    pub fac_id: String,
    /// Destination subjects that receive every outbound event.
    #[serde(default)]
    pub subscribers: Vec<String>,
    /// Equipment whose ports are reached through a bridge, not a transfer edge.
    #[serde(default)]
    pub bridge_from: Vec<String>,
    #[serde(default)]
    pub areas: Vec<AreaConfig>,
}

impl FacilityConfig {
    /// Feature switches for `area`; unlisted areas run with everything on.
    pub fn features(&self, area: &str) -> FeatureSwitches {
        self.areas
            .iter()
            .find(|a| a.name == area)
            .map(|a| a.features.clone())
            .unwrap_or_default()
    }

    pub fn is_bridged(&self, equipment: &str) -> bool {
        self.bridge_from.iter().any(|e| e == equipment)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    pub name: String,
    #[serde(default)]
    pub features: FeatureSwitches,
}

/// Per-area toggles for the optional ingestion sub-processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSwitches {
    #[serde(default = "default_true")]
    pub vehicle_count: bool,
    #[serde(default = "default_true")]
    pub zone_off: bool,
    #[serde(default = "default_true")]
    pub vehicle_off: bool,
    #[serde(default = "default_true")]
    pub stage_monitor: bool,
    #[serde(default = "default_true")]
    pub traffic: bool,
}

impl Default for FeatureSwitches {
    fn default() -> Self {
        Self {
            vehicle_count: true,
            zone_off: true,
            vehicle_off: true,
            stage_monitor: true,
            traffic: true,
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_smoothing_weight() -> f64 {
    0.7
}

fn default_rail_velocity_min() -> f64 {
    1.5
}

fn default_conveyor_cost_min_ms() -> f64 {
    300.0
}

fn default_conveyor_cost_max_ms() -> f64 {
    30_000.0
}

fn default_stk_rm_cost_cap_ms() -> f64 {
    100_000.0
}

fn default_stk_rm_cost_default_ms() -> f64 {
    7_000.0
}

fn default_transfer_cost_min_ms() -> f64 {
    300.0
}

fn default_transfer_cost_max_ms() -> f64 {
    100_000.0
}

fn default_ingest_workers() -> usize {
    8
}

fn default_lock_timeout_ms() -> u64 {
    50
}

fn default_motion_window_ms() -> u64 {
    60_000
}

fn default_distance_scale() -> f64 {
    100.0
}

fn default_build_workers() -> usize {
    4
}

fn default_max_velocity() -> f64 {
    300.0
}

fn default_zone_walk_limit() -> usize {
    10_000
}

fn default_affected_walk_limit() -> usize {
    200
}

fn default_vehicle_length_mm() -> f64 {
    784.0
}

fn default_vehicle_gap_mm() -> f64 {
    300.0
}
