// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Mid Scale: Meta-Monad Bivector State
// ─────────────────────────────────────────────────────────────────────
//! Siblings' entropies and pairwise couplings collapsed into one
//! aggregate state.
//!
//! Construction (N sub-monads with entropies e_i ≥ 0):
//!
//!   B[i mod 6]            += e_i / N
//!   flow_ij                = (e_i − e_j) / 2
//!   k                      = (i(i+1)/2 + j) mod 6
//!   B[k]                  += J_ij · flow_ij
//!   B[(k+1) mod 6]        += J_ij · |flow_ij| / 2
//!   S                      = Σ e_i
//!   g                      = 1 / (1 + S)
//!
//! Evolution over dt with damping γ, f = exp(−max(0, γ·dt)):
//!
//!   B ← f·B,   S ← f·S,   J̄ ← f·J̄,   g ← g + (1 − g)(1 − f)
//!
//! so ‖B‖ and S never grow, and g rises monotonically toward 1.

use serde::{Deserialize, Serialize};

/// Number of bivector components.
pub const BIVECTOR_DIM: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaMonadState {
    pub bivector: [f64; BIVECTOR_DIM],
    pub scalar_grace: f64,
    pub total_entropy: f64,
    pub sub_monad_count: usize,
    pub resonance_coupling: f64,
}

impl Default for MetaMonadState {
    fn default() -> Self {
        Self {
            bivector: [0.0; BIVECTOR_DIM],
            scalar_grace: 1.0,
            total_entropy: 0.0,
            sub_monad_count: 0,
            resonance_coupling: 0.0,
        }
    }
}

impl MetaMonadState {
    /// Aggregate sub-monads given their entropies and `(i, j, J)`
    /// couplings. Couplings with out-of-range or equal indices, or a
    /// non-finite strength, are skipped.
    pub fn create(entropies: &[f64], couplings: &[(usize, usize, f64)]) -> Self {
        let e: Vec<f64> = entropies
            .iter()
            .map(|&x| {
                if x.is_finite() && x >= 0.0 {
                    x
                } else {
                    log::warn!("meta-monad: entropy {x} replaced by 0");
                    0.0
                }
            })
            .collect();
        let n = e.len();
        if n == 0 {
            return Self::default();
        }

        let mut bivector = [0.0; BIVECTOR_DIM];
        for (i, &ei) in e.iter().enumerate() {
            bivector[i % BIVECTOR_DIM] += ei / n as f64;
        }

        let mut strength_sum = 0.0;
        let mut valid = 0usize;
        for &(i, j, strength) in couplings {
            if i >= n || j >= n || i == j || !strength.is_finite() {
                log::debug!("meta-monad: skipping coupling ({i}, {j}, {strength})");
                continue;
            }
            let flow = (e[i] - e[j]) / 2.0;
            let k = (i * (i + 1) / 2 + j) % BIVECTOR_DIM;
            bivector[k] += strength * flow;
            bivector[(k + 1) % BIVECTOR_DIM] += strength * flow.abs() * 0.5;
            strength_sum += strength;
            valid += 1;
        }

        let total_entropy: f64 = e.iter().sum();
        Self {
            bivector,
            scalar_grace: 1.0 / (1.0 + total_entropy),
            total_entropy,
            sub_monad_count: n,
            resonance_coupling: if valid > 0 {
                strength_sum / valid as f64
            } else {
                0.0
            },
        }
    }

    /// Relax the state over `dt`. Negative or NaN `dt·damping` is
    /// treated as no decay.
    pub fn evolve(&self, dt: f64, damping: f64) -> Self {
        let k = (dt * damping).max(0.0);
        let f = (-k).exp();
        let mut bivector = self.bivector;
        for b in &mut bivector {
            *b *= f;
        }
        Self {
            bivector,
            scalar_grace: self.scalar_grace + (1.0 - self.scalar_grace) * (1.0 - f),
            total_entropy: self.total_entropy * f,
            sub_monad_count: self.sub_monad_count,
            resonance_coupling: self.resonance_coupling * f,
        }
    }

    pub fn bivector_norm(&self) -> f64 {
        self.bivector.iter().map(|b| b * b).sum::<f64>().sqrt()
    }

    /// g / (1 + S): high when grace dominates entropy.
    pub fn stability(&self) -> f64 {
        self.scalar_grace / (1.0 + self.total_entropy.max(0.0))
    }
}
