// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Field Regime Classifier
// ─────────────────────────────────────────────────────────────────────
//! Five ordered regimes that bias how readily a structure is released.
//!
//! | Regime      | Size band    | Depth   | Grace openness |
//! |-------------|--------------|---------|----------------|
//! | NonBeing    | n ≤ 1        | 0       | 0.0            |
//! | Vacuum      | n ≤ 5        | 1       | 0.1            |
//! | DarkSector  | n ≤ 12       | 2–3     | 0.3            |
//! | Matter      | n ≤ 144      | ≥ 4     | 0.7            |
//! | Omega       | n > 144      | ∞       | 1.0            |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest structure still classified as Matter.
pub const MATTER_MAX_NODES: usize = 144;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRegime {
    NonBeing,
    Vacuum,
    DarkSector,
    Matter,
    Omega,
}

impl FieldRegime {
    pub const ALL: [FieldRegime; 5] = [
        Self::NonBeing,
        Self::Vacuum,
        Self::DarkSector,
        Self::Matter,
        Self::Omega,
    ];

    /// Classify by node count; monotonic in `n`.
    pub fn from_size(n: usize) -> Self {
        match n {
            0..=1 => Self::NonBeing,
            2..=5 => Self::Vacuum,
            6..=12 => Self::DarkSector,
            13..=MATTER_MAX_NODES => Self::Matter,
            _ => Self::Omega,
        }
    }

    /// Classify a recursion depth; `None` stands for unbounded depth.
    pub fn from_depth(depth: Option<u32>) -> Self {
        match depth {
            None => Self::Omega,
            Some(0) => Self::NonBeing,
            Some(1) => Self::Vacuum,
            Some(2..=3) => Self::DarkSector,
            Some(_) => Self::Matter,
        }
    }

    pub fn grace_openness(self) -> f64 {
        match self {
            Self::NonBeing => 0.0,
            Self::Vacuum => 0.1,
            Self::DarkSector => 0.3,
            Self::Matter => 0.7,
            Self::Omega => 1.0,
        }
    }

    /// Coherence level a structure of this regime must exceed to be
    /// grace-ready, given the base readiness threshold `t`.
    ///
    /// threshold = 1 − (1 − t) · openness
    ///
    /// NonBeing never qualifies (threshold 1); Omega uses `t` unchanged.
    pub fn grace_threshold(self, t: f64) -> f64 {
        1.0 - (1.0 - t) * self.grace_openness()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonBeing => "non_being",
            Self::Vacuum => "vacuum",
            Self::DarkSector => "dark_sector",
            Self::Matter => "matter",
            Self::Omega => "omega",
        }
    }
}

impl fmt::Display for FieldRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
