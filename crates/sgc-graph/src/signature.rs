// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Ω Signature and Resonance Alignment
// ─────────────────────────────────────────────────────────────────────
//! Structural fingerprint of a graph and the resonance score of a
//! sub-structure against it.
//!
//! resonance(G, Ω) = J(cycles(G), cycles(Ω)) · cos(h(G), h(Ω))
//!
//! - J: Jaccard index of canonical cycle-basis sets (two empty sets → 1).
//! - h: normalised phase histogram at Ω's binning, `2·lcm(denominators)`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NodeId};
use crate::phase::lcm;

/// Upper bound on histogram resolution; finer denominators fall back
/// to floor binning.
pub const MAX_PHASE_BINS: usize = 4096;

/// Immutable fingerprint derived once per collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmegaSignature {
    /// Canonical cycle basis (sorted, each cycle starting at its min id).
    pub cycles: Vec<Vec<NodeId>>,
    /// Number of phase bins over [0, 2π).
    pub phase_bins: usize,
    /// Normalised phase histogram (sums to 1 for a non-empty graph).
    pub phase_hist: Vec<f64>,
}

impl OmegaSignature {
    pub fn derive(graph: &Graph) -> Self {
        let phase_bins = phase_bins(graph);
        Self {
            cycles: cycle_basis(graph),
            phase_bins,
            phase_hist: phase_histogram(graph, phase_bins),
        }
    }
}

fn phase_bins(graph: &Graph) -> usize {
    let l = graph
        .labels()
        .values()
        .fold(1u64, |acc, l| lcm(acc, u64::from(l.phase.denom())));
    let bins = l.saturating_mul(2);
    if bins > MAX_PHASE_BINS as u64 {
        log::debug!("phase_bins: 2·lcm = {bins} exceeds {MAX_PHASE_BINS}, using floor binning");
        return MAX_PHASE_BINS;
    }
    (bins as usize).max(2)
}

/// Normalised histogram of node phases over `bins` slots.
pub fn phase_histogram(graph: &Graph, bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let mut hist = vec![0.0; bins];
    for label in graph.labels().values() {
        hist[label.phase.bin_index(bins)] += 1.0;
    }
    let total: f64 = hist.iter().sum();
    if total > 0.0 {
        for h in &mut hist {
            *h /= total;
        }
    }
    hist
}

fn canonical_cycle(mut cycle: Vec<NodeId>) -> Vec<NodeId> {
    let Some(pos) = cycle
        .iter()
        .enumerate()
        .min_by_key(|&(_, n)| *n)
        .map(|(i, _)| i)
    else {
        return cycle;
    };
    cycle.rotate_left(pos);
    if cycle.len() > 2 && cycle[cycle.len() - 1] < cycle[1] {
        cycle[1..].reverse();
    }
    cycle
}

/// Fundamental cycle basis from a BFS spanning forest in node order.
///
/// Every non-tree edge closes exactly one cycle through the tree.
pub fn cycle_basis(graph: &Graph) -> Vec<Vec<NodeId>> {
    let adj = graph.adjacency();
    let mut parent: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut depth: BTreeMap<NodeId, usize> = BTreeMap::new();

    for &root in graph.nodes() {
        if depth.contains_key(&root) {
            continue;
        }
        depth.insert(root, 0);
        let mut queue = VecDeque::from([root]);
        while let Some(u) = queue.pop_front() {
            let du = depth[&u];
            for &v in adj.get(&u).map(Vec::as_slice).unwrap_or_default() {
                if !depth.contains_key(&v) {
                    depth.insert(v, du + 1);
                    parent.insert(v, u);
                    queue.push_back(v);
                }
            }
        }
    }

    let is_tree_edge =
        |u: NodeId, v: NodeId| parent.get(&v) == Some(&u) || parent.get(&u) == Some(&v);

    let mut cycles = BTreeSet::new();
    for &(u, v) in graph.edges() {
        if is_tree_edge(u, v) {
            continue;
        }
        let (mut a, mut b) = (u, v);
        let mut left = vec![a];
        let mut right = vec![b];
        while a != b {
            if depth[&a] >= depth[&b] {
                a = parent[&a];
                left.push(a);
            } else {
                b = parent[&b];
                right.push(b);
            }
        }
        // a == b is the meeting point, present at the end of `left`
        right.pop();
        left.extend(right.into_iter().rev());
        cycles.insert(canonical_cycle(left));
    }
    cycles.into_iter().collect()
}

fn jaccard(a: &[Vec<NodeId>], b: &[Vec<NodeId>]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let sa: BTreeSet<&Vec<NodeId>> = a.iter().collect();
    let sb: BTreeSet<&Vec<NodeId>> = b.iter().collect();
    let inter = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    inter / union
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na < 1e-15 || nb < 1e-15 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(0.0, 1.0)
}

/// Resonance of `graph` against `omega`, in [0, 1]. Empty graph → 0.
pub fn resonance(graph: &Graph, omega: &OmegaSignature) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    let j = jaccard(&cycle_basis(graph), &omega.cycles);
    if j == 0.0 {
        return 0.0;
    }
    let hist = phase_histogram(graph, omega.phase_bins);
    (j * cosine(&hist, &omega.phase_hist)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeLabel;
    use crate::phase::Phase;

    fn ring(ids: std::ops::Range<NodeId>, n: i64, d: u32) -> Graph {
        let ids: Vec<NodeId> = ids.collect();
        let labelled = ids
            .iter()
            .map(|&i| (i, NodeLabel::z(Phase::new(n, d).unwrap())))
            .collect();
        let edges = ids
            .iter()
            .zip(ids.iter().cycle().skip(1))
            .map(|(&a, &b)| (a, b))
            .collect();
        Graph::from_parts(labelled, edges).unwrap()
    }

    #[test]
    fn test_ring_has_one_canonical_cycle() {
        let g = ring(0..5, 0, 1);
        let cycles = cycle_basis(&g);
        assert_eq!(cycles, vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn test_path_has_no_cycles() {
        let g = ring(0..5, 0, 1).subgraph(&[0, 1, 2, 3]);
        assert!(cycle_basis(&g).is_empty());
    }

    #[test]
    fn test_two_triangles_basis() {
        let labelled = (0..4)
            .map(|i| (i, NodeLabel::z(Phase::ZERO)))
            .collect();
        let g = Graph::from_parts(labelled, vec![(0, 1), (1, 2), (2, 0), (1, 3), (3, 2)]).unwrap();
        let cycles = cycle_basis(&g);
        assert_eq!(cycles, vec![vec![0, 1, 2], vec![0, 1, 3, 2]]);
    }

    #[test]
    fn test_signature_bins() {
        let mut labelled: Vec<(NodeId, NodeLabel)> = (0..3)
            .map(|i| (i, NodeLabel::z(Phase::new(1, 2).unwrap())))
            .collect();
        labelled.push((3, NodeLabel::z(Phase::new(1, 3).unwrap())));
        let g = Graph::from_parts(labelled, vec![]).unwrap();
        let sig = OmegaSignature::derive(&g);
        assert_eq!(sig.phase_bins, 12);
        let total: f64 = sig.phase_hist.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((sig.phase_hist[3] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_phase_histogram_quarter_turns() {
        let labelled = [(0, 1), (1, 2), (1, 1), (3, 2)]
            .iter()
            .enumerate()
            .map(|(i, &(n, d))| (i as NodeId, NodeLabel::z(Phase::new(n, d).unwrap())))
            .collect();
        let g = Graph::from_parts(labelled, vec![]).unwrap();
        assert_eq!(phase_histogram(&g, 4), vec![0.25; 4]);
        // zero bins collapses to a single slot
        assert_eq!(phase_histogram(&g, 0), vec![1.0]);
    }

    #[test]
    fn test_self_resonance_is_one() {
        let g = ring(0..6, 1, 2);
        let sig = OmegaSignature::derive(&g);
        let r = resonance(&g, &sig);
        assert!((r - 1.0).abs() < 1e-9, "r={r}");
    }

    #[test]
    fn test_acyclic_part_of_ring_has_zero_resonance() {
        let g = ring(0..8, 0, 1);
        let sig = OmegaSignature::derive(&g);
        let half = g.subgraph(&[0, 1, 2, 3]);
        assert_eq!(resonance(&half, &sig), 0.0);
    }

    #[test]
    fn test_empty_graph_resonance_zero() {
        let sig = OmegaSignature::derive(&ring(0..4, 0, 1));
        assert_eq!(resonance(&Graph::empty(), &sig), 0.0);
    }

    #[test]
    fn test_phase_mismatch_lowers_resonance() {
        let reference = ring(0..4, 0, 1);
        let sig = OmegaSignature::derive(&reference);
        let shifted = ring(0..4, 1, 1);
        assert!(resonance(&shifted, &sig) < 1e-12);
    }

    mod props {
        use std::collections::BTreeSet;

        use proptest::prelude::*;

        use super::super::*;
        use crate::coherence::coherence;
        use crate::graph::NodeLabel;
        use crate::phase::Phase;

        fn build(phases: &[(i64, u32)], chords: &[(usize, usize)]) -> Graph {
            let n = phases.len();
            let labelled = phases
                .iter()
                .enumerate()
                .map(|(i, &(num, den))| (i as NodeId, NodeLabel::z(Phase::new(num, den).unwrap())))
                .collect();
            let mut seen = BTreeSet::new();
            let mut edges = Vec::new();
            for i in 1..n {
                seen.insert((i - 1, i));
                edges.push(((i - 1) as NodeId, i as NodeId));
            }
            for &(a, b) in chords {
                let (a, b) = (a % n, b % n);
                let e = (a.min(b), a.max(b));
                if a != b && seen.insert(e) {
                    edges.push((e.0 as NodeId, e.1 as NodeId));
                }
            }
            Graph::from_parts(labelled, edges).unwrap()
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_resonance_and_coherence_bounded(
                phases in prop::collection::vec((-8i64..16, 1u32..6), 1..24),
                chords in prop::collection::vec((0usize..24, 0usize..24), 0..12),
            ) {
                let g = build(&phases, &chords);
                let sig = OmegaSignature::derive(&g);
                let half: Vec<NodeId> = g.nodes()[..g.len().div_ceil(2)].to_vec();
                let sub = g.subgraph(&half);
                let r = resonance(&sub, &sig);
                prop_assert!((0.0..=1.0).contains(&r), "r={}", r);
                let c = coherence(&sub);
                prop_assert!((0.0..=1.0).contains(&c), "C={}", c);
                prop_assert!((resonance(&g, &sig) - 1.0).abs() < 1e-9);
            }
        }
    }
}
