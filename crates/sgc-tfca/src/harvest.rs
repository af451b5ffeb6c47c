// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Global Scale: Harmonic Harvest
// ─────────────────────────────────────────────────────────────────────
//! Compress a population of phase structures into canonical harmonics.
//!
//! Alignment of two structures over their common prefix of length L:
//!
//!   A(a, b) = 1 − (1/L) Σ d(a_k, b_k) / π,   d = circular distance
//!
//! (A = 0 when L = 0). Structures are grouped by leader clustering in
//! input order: a structure joins the first group whose leader it
//! aligns with at A ≥ threshold and A > 0, else it leads a new group.
//! Each group yields one harmonic; every absorbed member compresses one
//! unit of entropy and yields A(leader, member) grace. Zero alignment
//! never merges, so compression always comes with positive grace.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use sgc_graph::{circular_distance, circular_mean};
use sgc_types::clamp_score;

/// Bins of the harvest phase histogram.
pub const OMEGA_BINS: usize = 8;

/// One canonical group: the member indices (leader first) and the
/// position-wise circular mean of their phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Harmonic {
    pub members: Vec<usize>,
    pub pattern: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestResult {
    pub initial_structures: usize,
    pub compressed_harmonics: usize,
    pub grace_yield: f64,
    pub entropy_compressed: f64,
    pub compression_ratio: f64,
    pub harmonics: Vec<Harmonic>,
    /// Normalised histogram of all harmonic phases over `OMEGA_BINS`
    /// bins; all zero when there are no phases.
    pub omega_signature: Vec<f64>,
}

impl Default for HarvestResult {
    fn default() -> Self {
        Self {
            initial_structures: 0,
            compressed_harmonics: 0,
            grace_yield: 0.0,
            entropy_compressed: 0.0,
            compression_ratio: 1.0,
            harmonics: Vec::new(),
            omega_signature: vec![0.0; OMEGA_BINS],
        }
    }
}

/// Alignment in [0, 1]; 1 means identical phases over the common prefix.
pub fn alignment(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<f64> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| circular_distance(x, y))
        .collect();
    if pairs.is_empty() {
        return 0.0;
    }
    let mean = pairs.iter().sum::<f64>() / pairs.len() as f64;
    clamp_score(1.0 - mean / PI, 0.0, 1.0)
}

fn pattern_of(structures: &[Vec<f64>], members: &[usize]) -> Vec<f64> {
    let width = members
        .iter()
        .map(|&m| structures[m].len())
        .max()
        .unwrap_or(0);
    (0..width)
        .map(|k| {
            let column: Vec<f64> = members
                .iter()
                .filter_map(|&m| structures[m].get(k).copied())
                .filter(|p| p.is_finite())
                .collect();
            circular_mean(&column)
        })
        .collect()
}

fn omega_histogram(harmonics: &[Harmonic]) -> Vec<f64> {
    let mut hist = vec![0.0; OMEGA_BINS];
    let mut total = 0usize;
    for p in harmonics.iter().flat_map(|h| &h.pattern) {
        let bin = ((p.rem_euclid(TAU) / TAU) * OMEGA_BINS as f64) as usize;
        hist[bin.min(OMEGA_BINS - 1)] += 1.0;
        total += 1;
    }
    if total > 0 {
        for h in &mut hist {
            *h /= total as f64;
        }
    }
    hist
}

/// Harvest `structures` at `alignment_threshold` (clamped to [0, 1]).
pub fn harvest(structures: &[Vec<f64>], alignment_threshold: f64) -> HarvestResult {
    if structures.is_empty() {
        return HarvestResult::default();
    }
    let threshold = clamp_score(alignment_threshold, 0.0, 1.0);

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut grace = 0.0;
    let mut merged = 0usize;
    for (idx, s) in structures.iter().enumerate() {
        let hit = groups.iter_mut().find_map(|g| {
            let a = alignment(&structures[g[0]], s);
            (a > 0.0 && a >= threshold).then_some((g, a))
        });
        match hit {
            Some((group, a)) => {
                group.push(idx);
                grace += a;
                merged += 1;
            }
            None => groups.push(vec![idx]),
        }
    }

    let harmonics: Vec<Harmonic> = groups
        .into_iter()
        .map(|members| Harmonic {
            pattern: pattern_of(structures, &members),
            members,
        })
        .collect();

    log::debug!(
        "harvest: {} structures -> {} harmonics, grace {grace:.4}",
        structures.len(),
        harmonics.len()
    );

    HarvestResult {
        initial_structures: structures.len(),
        compressed_harmonics: harmonics.len(),
        grace_yield: grace,
        entropy_compressed: merged as f64,
        compression_ratio: structures.len() as f64 / harmonics.len().max(1) as f64,
        omega_signature: omega_histogram(&harmonics),
        harmonics,
    }
}
