// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Local Scale: ZX Rewriting
// ─────────────────────────────────────────────────────────────────────
//! The three primitive collector actions as spider rewrites.
//!
//! - shed:       delete spiders far from the consensus phase,
//!               S += sin²(Δ/2) per deleted spider, G = 0
//! - assimilate: fuse adjacent spiders closer than the threshold into
//!               their circular midpoint, G += cos²(Δ/2), S += sin²(Δ/2)
//! - reinstate:  φ ← wrap(φ)·(1 − γ), G += |wrap(φ)|·γ, S = 0
//!
//! Δ is always the circular distance, in [0, π]. Non-finite phases are
//! dropped before rewriting.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use sgc_graph::{circular_distance, circular_mean, wrap_to_pi};
use sgc_types::{clamp_score, RewriteMode};

/// Outcome of one local rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteResult {
    pub structure_id: usize,
    pub initial_spider_count: usize,
    pub final_spider_count: usize,
    pub spiders_fused: usize,
    pub entropy_released: f64,
    pub grace_accumulated: f64,
    pub mode_used: RewriteMode,
    /// Spider phases after the rewrite.
    pub phases: Vec<f64>,
}

fn finite_phases(id: usize, phases: &[f64]) -> Vec<f64> {
    let kept: Vec<f64> = phases.iter().copied().filter(|p| p.is_finite()).collect();
    if kept.len() != phases.len() {
        log::warn!(
            "structure {id}: dropped {} non-finite phases",
            phases.len() - kept.len()
        );
    }
    kept
}

fn angle_threshold(name: &str, value: f64) -> f64 {
    let clamped = clamp_score(value, 0.0, PI);
    if clamped != value {
        log::warn!("{name} {value} outside [0, pi], using {clamped}");
    }
    clamped
}

fn half_angle_sin2(delta: f64) -> f64 {
    (delta / 2.0).sin().powi(2)
}

/// Delete spiders whose distance to the consensus cluster's centroid
/// exceeds `dissonance_threshold`.
///
/// Phases are clustered greedily in input order: each joins the first
/// cluster whose running centroid lies within the threshold, otherwise
/// it seeds a new one. The largest cluster (earliest on ties) is the
/// consensus. Minority clusters are shed whole even when internally
/// tight: dissonance is measured against the structure's dominant
/// phase, not against each spider's own cluster.
pub fn shed(id: usize, phases: &[f64], dissonance_threshold: f64) -> RewriteResult {
    let threshold = angle_threshold("dissonance_threshold", dissonance_threshold);
    let phases = finite_phases(id, phases);

    let mut clusters: Vec<(f64, Vec<f64>)> = Vec::new();
    for &p in &phases {
        match clusters
            .iter_mut()
            .find(|(centre, _)| circular_distance(p, *centre) <= threshold)
        {
            Some((centre, members)) => {
                members.push(p);
                *centre = circular_mean(members);
            }
            None => clusters.push((p.rem_euclid(TAU), vec![p])),
        }
    }

    let consensus = clusters
        .iter()
        .fold(None::<&(f64, Vec<f64>)>, |best, c| match best {
            Some(b) if b.1.len() >= c.1.len() => Some(b),
            _ => Some(c),
        })
        .map(|(centre, _)| *centre)
        .unwrap_or(0.0);

    let mut survivors = Vec::with_capacity(phases.len());
    let mut entropy = 0.0;
    for &p in &phases {
        let d = circular_distance(p, consensus);
        if d > threshold {
            entropy += half_angle_sin2(d);
        } else {
            survivors.push(p);
        }
    }

    RewriteResult {
        structure_id: id,
        initial_spider_count: phases.len(),
        final_spider_count: survivors.len(),
        spiders_fused: 0,
        entropy_released: entropy,
        grace_accumulated: 0.0,
        mode_used: RewriteMode::Shed,
        phases: survivors,
    }
}

/// Fuse adjacent spiders closer than `resonance_threshold`.
///
/// A fused spider stays in place and may fuse again with its next
/// neighbour.
pub fn assimilate(id: usize, phases: &[f64], resonance_threshold: f64) -> RewriteResult {
    let threshold = angle_threshold("resonance_threshold", resonance_threshold);
    let mut out = finite_phases(id, phases);
    let initial = out.len();

    let mut fused = 0;
    let mut grace = 0.0;
    let mut entropy = 0.0;
    let mut i = 0;
    while i + 1 < out.len() {
        let (a, b) = (out[i], out[i + 1]);
        let d = circular_distance(a, b);
        if d < threshold {
            out[i] = (a + wrap_to_pi(b - a) / 2.0).rem_euclid(TAU);
            out.remove(i + 1);
            fused += 1;
            let s = half_angle_sin2(d);
            grace += 1.0 - s;
            entropy += s;
        } else {
            i += 1;
        }
    }

    RewriteResult {
        structure_id: id,
        initial_spider_count: initial,
        final_spider_count: out.len(),
        spiders_fused: fused,
        entropy_released: entropy,
        grace_accumulated: grace,
        mode_used: RewriteMode::Assimilate,
        phases: out,
    }
}

/// Damp every phase toward 0 by `grace_flow_rate`. Never changes the
/// spider count and never releases entropy.
pub fn reinstate(id: usize, phases: &[f64], grace_flow_rate: f64) -> RewriteResult {
    let rate = clamp_score(grace_flow_rate, 0.0, 1.0);
    if rate != grace_flow_rate {
        log::warn!("grace_flow_rate {grace_flow_rate} outside [0, 1], using {rate}");
    }
    let phases = finite_phases(id, phases);

    let mut grace = 0.0;
    let damped: Vec<f64> = phases
        .iter()
        .map(|&p| {
            let w = wrap_to_pi(p);
            grace += w.abs() * rate;
            w * (1.0 - rate)
        })
        .collect();

    RewriteResult {
        structure_id: id,
        initial_spider_count: phases.len(),
        final_spider_count: damped.len(),
        spiders_fused: 0,
        entropy_released: 0.0,
        grace_accumulated: grace,
        mode_used: RewriteMode::Reinstate,
        phases: damped,
    }
}

/// Dispatch on `mode`; `threshold` is the mode-specific parameter.
pub fn rewrite(mode: RewriteMode, id: usize, phases: &[f64], threshold: f64) -> RewriteResult {
    match mode {
        RewriteMode::Shed => shed(id, phases, threshold),
        RewriteMode::Assimilate => assimilate(id, phases, threshold),
        RewriteMode::Reinstate => reinstate(id, phases, threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_shed_removes_outlier() {
        let r = shed(0, &[0.1, 0.15, 0.2, 3.0], 0.5);
        assert_eq!(r.initial_spider_count, 4);
        assert_eq!(r.final_spider_count, 3);
        assert_eq!(r.mode_used, RewriteMode::Shed);
        assert_eq!(r.grace_accumulated, 0.0);
        let d = circular_distance(3.0, 0.15);
        assert!((r.entropy_released - (d / 2.0).sin().powi(2)).abs() < 1e-9);
    }

    #[test]
    fn test_shed_drops_tight_minority_cluster() {
        let r = shed(0, &[0.1, 0.12, 0.14, 2.0, 2.05], 0.5);
        assert_eq!(r.final_spider_count, 3);
        assert_eq!(r.phases, vec![0.1, 0.12, 0.14]);
        let expected = half_angle_sin2(2.0 - 0.12) + half_angle_sin2(2.05 - 0.12);
        assert!((r.entropy_released - expected).abs() < 1e-9);
    }

    #[test]
    fn test_shed_consensus_keeps_all() {
        let r = shed(1, &[1.0, 1.1, 0.9, 1.05], 0.5);
        assert_eq!(r.final_spider_count, 4);
        assert_eq!(r.entropy_released, 0.0);
    }

    #[test]
    fn test_shed_wraps_around_zero() {
        let r = shed(2, &[0.05, TAU - 0.05, 0.0], 0.3);
        assert_eq!(r.final_spider_count, 3);
    }

    #[test]
    fn test_assimilate_chain() {
        let r = assimilate(0, &[0.0, 0.05, 0.1, 2.0, 2.1], 0.2);
        // 0.0+0.05 → 0.025, +0.1 → 0.0625; 2.0+2.1 → 2.05
        assert_eq!(r.spiders_fused, 3);
        assert_eq!(r.final_spider_count, 2);
        assert!((r.phases[0] - 0.0625).abs() < 1e-9, "{:?}", r.phases);
        assert!((r.phases[1] - 2.05).abs() < 1e-9);
        assert!(r.grace_accumulated > 2.9 && r.grace_accumulated <= 3.0);
        assert!(r.entropy_released > 0.0 && r.entropy_released < 0.01);
    }

    #[test]
    fn test_assimilate_across_wrap() {
        let r = assimilate(0, &[TAU - 0.02, 0.02], 0.1);
        assert_eq!(r.final_spider_count, 1);
        assert!(r.phases[0] < 1e-9 || (TAU - r.phases[0]) < 1e-9);
    }

    #[test]
    fn test_assimilate_nothing_close() {
        let r = assimilate(0, &[0.0, 1.0, 2.0], 0.2);
        assert_eq!(r.spiders_fused, 0);
        assert_eq!(r.grace_accumulated, 0.0);
    }

    #[test]
    fn test_reinstate_damps() {
        let r = reinstate(0, &[1.0, -1.0, 4.0], 0.1);
        assert_eq!(r.entropy_released, 0.0);
        assert_eq!(r.final_spider_count, 3);
        assert!((r.phases[0] - 0.9).abs() < 1e-12);
        assert!((r.phases[1] + 0.9).abs() < 1e-12);
        let w = 4.0 - TAU;
        assert!((r.phases[2] - w * 0.9).abs() < 1e-12);
        let expected = (1.0 + 1.0 + w.abs()) * 0.1;
        assert!((r.grace_accumulated - expected).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_dropped() {
        let r = shed(0, &[0.1, f64::NAN, 0.2, f64::INFINITY], 0.5);
        assert_eq!(r.initial_spider_count, 2);
        let r = reinstate(0, &[f64::NAN], 0.5);
        assert_eq!(r.final_spider_count, 0);
    }

    #[test]
    fn test_empty_phases() {
        for mode in RewriteMode::ALL {
            let r = rewrite(mode, 7, &[], 0.3);
            assert_eq!(r.structure_id, 7);
            assert_eq!(r.initial_spider_count, 0);
            assert_eq!(r.final_spider_count, 0);
            assert_eq!(r.mode_used, mode);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn test_local_purity(
            phases in prop::collection::vec(-10.0f64..10.0, 0..24),
            threshold in 0.01f64..3.0,
            rate in 0.0f64..1.0,
        ) {
            let s = shed(0, &phases, threshold);
            prop_assert!(s.final_spider_count <= s.initial_spider_count);
            prop_assert!(s.entropy_released >= 0.0);

            let a = assimilate(0, &phases, threshold);
            prop_assert!(a.final_spider_count <= a.initial_spider_count);
            prop_assert_eq!(a.initial_spider_count - a.final_spider_count, a.spiders_fused);
            prop_assert!(a.grace_accumulated >= 0.0);

            let r = reinstate(0, &phases, rate);
            prop_assert_eq!(r.final_spider_count, r.initial_spider_count);
            prop_assert_eq!(r.entropy_released, 0.0);
            for (before, after) in phases.iter().zip(&r.phases) {
                prop_assert!(after.abs() <= wrap_to_pi(*before).abs() + 1e-12);
            }
        }
    }
}
