// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Sub-Monad / Meta-Monad Hierarchy
// ─────────────────────────────────────────────────────────────────────
//! Grouping of sub-monads into resonant meta-monads, and the census of
//! a sub-monad population.
//!
//! Grouping is leader clustering in input order on the phase order
//! parameter R = |⟨e^{iφ}⟩|: a structure joins the first group whose
//! leader satisfies |R − R_leader| < threshold, else it leads a new
//! group. Each group aggregates its members' entropies into its own
//! `MetaMonadState`, ring-coupled inside the group and relaxed over one
//! step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sgc_graph::{coherence, order_parameter, FieldRegime, Graph};
use sgc_types::{clamp_score, CycleConfig};

use crate::meta::MetaMonadState;

/// One resonant ensemble of sub-monads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaGroup {
    /// Structure indices, leader first.
    pub members: Vec<usize>,
    /// Leader's order parameter.
    pub order_parameter: f64,
    /// Relaxed aggregate of the members' entropies.
    pub state: MetaMonadState,
}

/// Population census: size, mean coherence, regime histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubMonadMetrics {
    pub count: usize,
    pub avg_coherence: f64,
    /// Every regime is present, with zero counts where nothing falls.
    pub regime_distribution: BTreeMap<FieldRegime, usize>,
}

fn structure_order(phases: &[f64]) -> f64 {
    let finite: Vec<f64> = phases.iter().copied().filter(|p| p.is_finite()).collect();
    order_parameter(&finite)
}

/// Leader-cluster structures by order parameter. `threshold` is
/// clamped to [0, 1]; at 0 every structure stands alone.
pub fn organize_meta_monads(seeds: &[Vec<f64>], threshold: f64) -> Vec<Vec<usize>> {
    let threshold = clamp_score(threshold, 0.0, 1.0);
    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    for (idx, phases) in seeds.iter().enumerate() {
        let r = structure_order(phases);
        match groups
            .iter_mut()
            .find(|(leader, _)| (r - *leader).abs() < threshold)
        {
            Some((_, members)) => members.push(idx),
            None => groups.push((r, vec![idx])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

/// Group `seeds` and build one relaxed meta-monad per group from the
/// per-structure `entropies` (indexed like `seeds`; missing entries
/// count as 0).
pub fn meta_groups(seeds: &[Vec<f64>], entropies: &[f64], config: &CycleConfig) -> Vec<MetaGroup> {
    organize_meta_monads(seeds, config.meta_group_threshold)
        .into_iter()
        .map(|members| {
            let e: Vec<f64> = members
                .iter()
                .map(|&m| entropies.get(m).copied().unwrap_or(0.0))
                .collect();
            let n = e.len();
            let couplings: Vec<(usize, usize, f64)> = if n > 1 {
                (0..n).map(|i| (i, (i + 1) % n, config.coupling_strength)).collect()
            } else {
                Vec::new()
            };
            let state = MetaMonadState::create(&e, &couplings).evolve(config.dt, config.grace_damping);
            MetaGroup {
                order_parameter: structure_order(&seeds[members[0]]),
                members,
                state,
            }
        })
        .collect()
}

/// Census of `graphs` as sub-monads, each classified by node count.
pub fn sub_monad_metrics(graphs: &[Graph]) -> SubMonadMetrics {
    let mut regime_distribution: BTreeMap<FieldRegime, usize> =
        FieldRegime::ALL.iter().map(|&r| (r, 0)).collect();
    for g in graphs {
        *regime_distribution
            .entry(FieldRegime::from_size(g.len()))
            .or_insert(0) += 1;
    }
    let avg_coherence = if graphs.is_empty() {
        0.0
    } else {
        graphs.iter().map(coherence).sum::<f64>() / graphs.len() as f64
    };
    SubMonadMetrics {
        count: graphs.len(),
        avg_coherence,
        regime_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgc_graph::{NodeId, NodeLabel, Phase};
    use std::f64::consts::PI;

    fn path(n: NodeId) -> Graph {
        let labelled = (0..n).map(|i| (i, NodeLabel::z(Phase::ZERO))).collect();
        let edges = (1..n).map(|i| (i - 1, i)).collect();
        Graph::from_parts(labelled, edges).unwrap()
    }

    fn mixed_seeds() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 1.01, 0.99, 1.0],
            (0..4).map(|k| k as f64 * PI / 2.0).collect(),
            vec![2.0, 2.02, 1.98, 2.0],
            // R = √2/4
            vec![0.0, 0.0, PI / 2.0, PI],
        ]
    }

    #[test]
    fn test_groups_by_order_parameter() {
        let groups = organize_meta_monads(&mixed_seeds(), 0.5);
        assert_eq!(groups, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_zero_threshold_isolates() {
        let groups = organize_meta_monads(&mixed_seeds(), 0.0);
        assert_eq!(groups.len(), 4);
        assert!(organize_meta_monads(&[], 0.5).is_empty());
    }

    #[test]
    fn test_group_states_partition_population() {
        let seeds = mixed_seeds();
        let entropies = [0.4, 1.2, 0.1, 0.6];
        let groups = meta_groups(&seeds, &entropies, &CycleConfig::default());
        assert_eq!(groups.len(), 2);
        let counted: usize = groups.iter().map(|g| g.state.sub_monad_count).sum();
        assert_eq!(counted, seeds.len());
        // 0.5 · exp(−0.1) after one relaxation step
        let expected = 0.5 * (-0.1f64).exp();
        assert!((groups[0].state.total_entropy - expected).abs() < 1e-12);
        assert!(groups[0].order_parameter > 0.99);
        assert!(groups[1].order_parameter < 1e-9);
    }

    #[test]
    fn test_sub_monad_census() {
        let graphs = [path(1), path(3), path(8)];
        let m = sub_monad_metrics(&graphs);
        assert_eq!(m.count, 3);
        assert_eq!(m.regime_distribution.len(), FieldRegime::ALL.len());
        assert_eq!(m.regime_distribution[&FieldRegime::NonBeing], 1);
        assert_eq!(m.regime_distribution[&FieldRegime::Vacuum], 1);
        assert_eq!(m.regime_distribution[&FieldRegime::DarkSector], 1);
        assert_eq!(m.regime_distribution[&FieldRegime::Omega], 0);
        assert!(m.avg_coherence >= 0.5 && m.avg_coherence <= 1.0);

        let empty = sub_monad_metrics(&[]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.avg_coherence, 0.0);
        assert!(empty.regime_distribution.values().all(|&c| c == 0));
    }
}
