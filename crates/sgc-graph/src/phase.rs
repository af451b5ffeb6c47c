// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Rational Phases and Circular Statistics
// ─────────────────────────────────────────────────────────────────────
//! Spider phases are rational multiples of π, periodic in 2π:
//!
//! φ = π · n / d,   n ∈ [0, 2d),   gcd(n, d) = 1
//!
//! The float helpers below work on raw radians and are shared by the
//! local, mid and global scales.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use sgc_types::{SgcError, SgcResult};

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Least common multiple, saturating at `u64::MAX`.
pub fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b)).saturating_mul(b)
}

/// A phase `π · numer / denom`, kept in canonical reduced form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i64, u32)", into = "(i64, u32)")]
pub struct Phase {
    numer: i64,
    denom: u32,
}

impl Phase {
    pub const ZERO: Phase = Phase { numer: 0, denom: 1 };

    /// Build a phase, reducing `numer` modulo `2·denom` and by the gcd.
    pub fn new(numer: i64, denom: u32) -> SgcResult<Self> {
        if denom == 0 {
            return Err(SgcError::Graph(format!(
                "phase denominator must be > 0, got {numer}/{denom}"
            )));
        }
        let period = 2 * i64::from(denom);
        let n = numer.rem_euclid(period);
        if n == 0 {
            return Ok(Self::ZERO);
        }
        let g = gcd(n as u64, u64::from(denom));
        Ok(Self {
            numer: n / g as i64,
            denom: (u64::from(denom) / g) as u32,
        })
    }

    pub fn numer(&self) -> i64 {
        self.numer
    }

    pub fn denom(&self) -> u32 {
        self.denom
    }

    /// Phase in radians, in [0, 2π).
    pub fn radians(&self) -> f64 {
        PI * self.numer as f64 / f64::from(self.denom)
    }

    /// Histogram bin of this phase when [0, 2π) is cut into `bins` slots.
    ///
    /// Exact when `2·denom` divides `bins`; otherwise the floor of the
    /// proportional position.
    pub fn bin_index(&self, bins: usize) -> usize {
        if bins == 0 {
            return 0;
        }
        let scaled = i128::from(self.numer) * bins as i128;
        let idx = scaled.div_euclid(2 * i128::from(self.denom));
        idx.rem_euclid(bins as i128) as usize
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<(i64, u32)> for Phase {
    type Error = SgcError;

    fn try_from((numer, denom): (i64, u32)) -> SgcResult<Self> {
        Phase::new(numer, denom)
    }
}

impl From<Phase> for (i64, u32) {
    fn from(p: Phase) -> Self {
        (p.numer, p.denom)
    }
}

/// Wrap an angle into (−π, π].
#[inline]
pub fn wrap_to_pi(x: f64) -> f64 {
    let mut w = x.rem_euclid(TAU);
    if w > PI {
        w -= TAU;
    }
    w
}

/// Shortest angular distance, in [0, π].
#[inline]
pub fn circular_distance(a: f64, b: f64) -> f64 {
    wrap_to_pi(a - b).abs()
}

/// Circular mean in [0, 2π). Returns 0 for an empty slice or a
/// perfectly balanced set.
pub fn circular_mean(phases: &[f64]) -> f64 {
    let (s, c) = phases
        .iter()
        .fold((0.0, 0.0), |(s, c), &p| (s + p.sin(), c + p.cos()));
    if s.abs() < 1e-12 && c.abs() < 1e-12 {
        return 0.0;
    }
    s.atan2(c).rem_euclid(TAU)
}

/// Kuramoto order parameter R = |⟨e^{iφ}⟩| ∈ [0, 1].
pub fn order_parameter(phases: &[f64]) -> f64 {
    if phases.is_empty() {
        return 0.0;
    }
    let n = phases.len() as f64;
    let (s, c) = phases
        .iter()
        .fold((0.0, 0.0), |(s, c), &p| (s + p.sin(), c + p.cos()));
    ((s / n).powi(2) + (c / n).powi(2)).sqrt().min(1.0)
}
