// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Coherence Functional
// ─────────────────────────────────────────────────────────────────────
//! C(G) = σ( Σ_cycles 2 / (1 + Var(φ_cycle)) + Σ_nodes ln(1 + deg) / (1 + d) )
//!
//! σ is the logistic function. Cycles come from the canonical basis, d is
//! the node's phase denominator. An empty graph has coherence 0; any
//! other graph lands in [0.5, 1].

use crate::graph::Graph;
use crate::signature::cycle_basis;

fn variance(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}

/// Raw (pre-sigmoid) coherence sum.
pub fn coherence_sum(graph: &Graph) -> f64 {
    let cycle_term: f64 = cycle_basis(graph)
        .iter()
        .map(|cycle| {
            let phases: Vec<f64> = cycle
                .iter()
                .filter_map(|&id| graph.label(id))
                .map(|l| l.phase.radians())
                .collect();
            2.0 / (1.0 + variance(&phases))
        })
        .sum();

    let node_term: f64 = graph
        .nodes()
        .iter()
        .filter_map(|&id| graph.label(id).map(|l| (id, l)))
        .map(|(id, l)| {
            let connectivity = (1.0 + graph.degree(id) as f64).ln();
            connectivity / (1.0 + f64::from(l.phase.denom()))
        })
        .sum();

    cycle_term + node_term
}

/// Coherence of a structure, in [0, 1].
pub fn coherence(graph: &Graph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    let total = coherence_sum(graph);
    (1.0 / (1.0 + (-total).exp())).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeId, NodeLabel};
    use crate::phase::Phase;

    fn path(n: NodeId) -> Graph {
        let labelled = (0..n).map(|i| (i, NodeLabel::z(Phase::ZERO))).collect();
        let edges = (1..n).map(|i| (i - 1, i)).collect();
        Graph::from_parts(labelled, edges).unwrap()
    }

    #[test]
    fn test_empty_graph_zero() {
        assert_eq!(coherence(&Graph::empty()), 0.0);
    }

    #[test]
    fn test_isolated_nodes_half() {
        let labelled = (0..3).map(|i| (i, NodeLabel::z(Phase::ZERO))).collect();
        let g = Graph::from_parts(labelled, vec![]).unwrap();
        assert!((coherence(&g) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_path_of_eight() {
        // 2·ln2/2 + 6·ln3/2
        let expected_sum = 2f64.ln() + 3.0 * 3f64.ln();
        let g = path(8);
        assert!((coherence_sum(&g) - expected_sum).abs() < 1e-9);
        let c = coherence(&g);
        assert!(c > 0.98 && c < 0.99, "C={c}");
    }

    #[test]
    fn test_uniform_cycle_adds_full_harmony() {
        let labelled: Vec<(NodeId, NodeLabel)> =
            (0..3).map(|i| (i, NodeLabel::z(Phase::ZERO))).collect();
        let open = Graph::from_parts(labelled.clone(), vec![(0, 1), (1, 2)]).unwrap();
        let closed = Graph::from_parts(labelled, vec![(0, 1), (1, 2), (0, 2)]).unwrap();
        assert!(coherence_sum(&closed) > coherence_sum(&open) + 2.0 - 1e-9);
    }

    #[test]
    fn test_coherence_bounded() {
        let c = coherence(&path(40));
        assert!((0.5..=1.0).contains(&c), "C={c}");
    }
}
