// ─────────────────────────────────────────────────────────────────────
// FIRM Core — SGC Kernel Shared Metrics
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// The three local rewrite primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// Delete dissonant spiders.
    Shed,
    /// Fuse resonant neighbours.
    Assimilate,
    /// Damp phases toward zero.
    Reinstate,
}

impl RewriteMode {
    pub const ALL: [RewriteMode; 3] = [Self::Shed, Self::Assimilate, Self::Reinstate];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shed => "shed",
            Self::Assimilate => "assimilate",
            Self::Reinstate => "reinstate",
        }
    }
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the listener history window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PruneSummary {
    /// Number of node ids removed in the run.
    pub pruned_count: usize,
    /// Entropy reduction in [0, 1].
    pub entropy_reduction: f64,
    /// Whether a collection actually ran.
    pub sgc_applied: bool,
}

impl PruneSummary {
    pub fn new(pruned_count: usize, entropy_reduction: f64, sgc_applied: bool) -> Self {
        Self {
            pruned_count,
            entropy_reduction: clamp_score(entropy_reduction, 0.0, 1.0),
            sgc_applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_nan_inf() {
        assert_eq!(clamp_score(f64::NAN, 0.0, 1.0), 0.0);
        assert_eq!(clamp_score(f64::INFINITY, 0.0, 1.0), 1.0);
        assert_eq!(clamp_score(f64::NEG_INFINITY, 0.0, 1.0), 0.0);
        assert!((clamp_score(0.42, 0.0, 1.0) - 0.42).abs() < 1e-12);
    }

    #[test]
    fn test_rewrite_mode_serde() {
        let json = serde_json::to_string(&RewriteMode::Assimilate).unwrap();
        assert_eq!(json, "\"assimilate\"");
        assert_eq!(RewriteMode::Reinstate.to_string(), "reinstate");
    }

    #[test]
    fn test_summary_clamps_reduction() {
        let s = PruneSummary::new(3, 1.7, true);
        assert!((s.entropy_reduction - 1.0).abs() < 1e-12);
    }
}
