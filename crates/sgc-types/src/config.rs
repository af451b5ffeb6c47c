// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{SgcError, SgcResult};

fn check_unit(name: &str, value: f64) -> SgcResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SgcError::Config(format!(
            "{name} must be in [0, 1], got {value}"
        )));
    }
    Ok(())
}

/// Parameters of one collection run.
///
/// Constructed once and passed immutably through the recursion.
/// Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgcParams {
    /// Resonance floor below which a structure becomes a prune candidate.
    /// Default: 0.3.
    pub epsilon: f64,

    /// Coherence a structure must exceed (after regime biasing) to be
    /// grace-ready. Default: 0.5.
    pub grace_readiness_threshold: f64,

    /// Hard ceiling on recursion depth; the root sits at depth 0.
    /// Default: 10.
    pub max_recursion_depth: u32,

    /// Share of resonance blended into accumulated coherence.
    /// Default: 0.2.
    pub observer_feedback_weight: f64,
}

impl Default for SgcParams {
    fn default() -> Self {
        Self {
            epsilon: 0.3,
            grace_readiness_threshold: 0.5,
            max_recursion_depth: 10,
            observer_feedback_weight: 0.2,
        }
    }
}

impl SgcParams {
    /// Build and validate a parameter set.
    pub fn new(
        epsilon: f64,
        grace_readiness_threshold: f64,
        max_recursion_depth: u32,
        observer_feedback_weight: f64,
    ) -> SgcResult<Self> {
        let params = Self {
            epsilon,
            grace_readiness_threshold,
            max_recursion_depth,
            observer_feedback_weight,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> SgcResult<()> {
        check_unit("epsilon", self.epsilon)?;
        check_unit("grace_readiness_threshold", self.grace_readiness_threshold)?;
        if self.max_recursion_depth < 1 {
            return Err(SgcError::Config(format!(
                "max_recursion_depth must be >= 1, got {}",
                self.max_recursion_depth
            )));
        }
        check_unit("observer_feedback_weight", self.observer_feedback_weight)?;
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SgcResult<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| SgcError::Config(format!("JSON parse error: {e}")))?;
        params.validate()?;
        Ok(params)
    }
}

/// How the orchestrator picks a local rewrite mode per structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePolicy {
    /// Structure `i` uses mode `i mod 3` (shed, assimilate, reinstate).
    #[default]
    RoundRobin,
    /// Pick by phase order parameter: low R sheds, high R assimilates,
    /// the middle band reinstates.
    ByCoherence,
}

/// Parameters of one three-scale cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Circular distance (rad) beyond which `shed` deletes a spider.
    /// Default: 0.5.
    pub dissonance_threshold: f64,

    /// Circular distance (rad) below which `assimilate` fuses neighbours.
    /// Default: 0.2.
    pub resonance_threshold: f64,

    /// Fraction of each phase removed by `reinstate`. Default: 0.1.
    pub grace_flow_rate: f64,

    /// Strength of the ring couplings fed to the mid scale. Default: 0.5.
    pub coupling_strength: f64,

    /// Mid-scale evolution step. Default: 1.0.
    pub dt: f64,

    /// Mid-scale relaxation rate. Default: 0.1.
    pub grace_damping: f64,

    /// Minimum alignment for a structure to join a harmonic. Default: 0.8.
    pub alignment_threshold: f64,

    /// Largest order-parameter gap between a structure and a meta-monad
    /// group's leader for the structure to join that group. Default: 0.5.
    pub meta_group_threshold: f64,

    /// Local mode selection. Default: round robin.
    pub mode_policy: ModePolicy,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            dissonance_threshold: 0.5,
            resonance_threshold: 0.2,
            grace_flow_rate: 0.1,
            coupling_strength: 0.5,
            dt: 1.0,
            grace_damping: 0.1,
            alignment_threshold: 0.8,
            meta_group_threshold: 0.5,
            mode_policy: ModePolicy::RoundRobin,
        }
    }
}

impl CycleConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> SgcResult<()> {
        for (name, value) in [
            ("dissonance_threshold", self.dissonance_threshold),
            ("resonance_threshold", self.resonance_threshold),
        ] {
            if !(value > 0.0 && value <= PI) {
                return Err(SgcError::Config(format!(
                    "{name} must be in (0, pi], got {value}"
                )));
            }
        }
        check_unit("grace_flow_rate", self.grace_flow_rate)?;
        check_unit("alignment_threshold", self.alignment_threshold)?;
        check_unit("meta_group_threshold", self.meta_group_threshold)?;
        if !(self.coupling_strength >= 0.0 && self.coupling_strength.is_finite()) {
            return Err(SgcError::Config(format!(
                "coupling_strength must be finite and >= 0, got {}",
                self.coupling_strength
            )));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(SgcError::Config(format!(
                "dt must be finite and > 0, got {}",
                self.dt
            )));
        }
        if !(self.grace_damping >= 0.0 && self.grace_damping.is_finite()) {
            return Err(SgcError::Config(format!(
                "grace_damping must be finite and >= 0, got {}",
                self.grace_damping
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SgcResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SgcError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
