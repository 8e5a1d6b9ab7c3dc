//! Exponential-moving-average learner shared by every edge type.
//!
//! One smoothing weight `w` applies facility-wide:
//!
//! ```text
//! new = old * w + sample * (1 - w)
//! ```
//!
//! Each edge family then pins the result into its own [`Band`].  The learner
//! holds no per-edge state; edges pass their current value in and store what
//! comes back.

use rt_core::LearnerConfig;

/// Closed interval a learned value must stay inside.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    /// `max` below `min` collapses the band to `min`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max: max.max(min) }
    }

    #[inline]
    pub fn clamp(self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Blend rule plus the per-type bounds from [`LearnerConfig`].
#[derive(Clone, Debug)]
pub struct Learner {
    weight: f64,
    rail_velocity_min: f64,
    conveyor: Band,
    transfer: Band,
    stk_rm_cap: f64,
    stk_rm_default: f64,
}

impl Learner {
    pub fn new(cfg: &LearnerConfig) -> Self {
        Self {
            weight: cfg.smoothing_weight,
            rail_velocity_min: cfg.rail_velocity_min,
            conveyor: Band::new(cfg.conveyor_cost_min_ms, cfg.conveyor_cost_max_ms),
            transfer: Band::new(cfg.transfer_cost_min_ms, cfg.transfer_cost_max_ms),
            stk_rm_cap: cfg.stk_rm_cost_cap_ms,
            stk_rm_default: cfg.stk_rm_cost_default_ms,
        }
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Raw EMA step, no clamping.
    #[inline]
    pub fn blend(&self, old: f64, sample: f64) -> f64 {
        old * self.weight + sample * (1.0 - self.weight)
    }

    /// Velocity band of a rail edge whose ceiling is `max_velocity`.
    pub fn rail_band(&self, max_velocity: f64) -> Band {
        Band::new(self.rail_velocity_min, max_velocity)
    }

    pub fn conveyor_band(&self) -> Band {
        self.conveyor
    }

    pub fn transfer_band(&self) -> Band {
        self.transfer
    }

    /// Stocker-RM update: blend, and fall back to the default when the
    /// blended cost exceeds the cap.
    pub fn stk_rm_step(&self, old: f64, sample: f64) -> f64 {
        let v = self.blend(old, sample.max(0.0));
        if v > self.stk_rm_cap { self.stk_rm_default } else { v }
    }

    pub fn stk_rm_default(&self) -> f64 {
        self.stk_rm_default
    }

    pub fn stk_rm_cap(&self) -> f64 {
        self.stk_rm_cap
    }
}

impl Default for Learner {
    fn default() -> Self {
        Self::new(&LearnerConfig::default())
    }
}
