// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Soul Garbage Collector
// ─────────────────────────────────────────────────────────────────────
//! Recursive threshold-gated pruning over a morphic tree.
//!
//! For a structure μ at depth d:
//!
//! 1. d ≥ max_recursion_depth → μ is returned untouched.
//! 2. r = resonance(μ, Ω), g = grace(μ, r).
//! 3. r < ε ∧ g → μ is pruned; it releases (ε − r) · |μ| / |root|.
//! 4. Otherwise every child is collected at d + 1, pruned children are
//!    dropped and μ is rebuilt on the surviving node set.
//!
//! grace(μ, r) ⇔ (1 − w)·C(μ) + w·r > 1 − (1 − t)·openness(regime(μ))
//!
//! with `w` the observer feedback weight and `t` the readiness threshold.

use sgc_graph::{coherence, resonance, FieldRegime, Graph, NodeId, OmegaSignature};
use sgc_types::{clamp_score, SgcParams, SgcResult};

use crate::morphic::{Detached, MorphicTree, StructureId};

/// Result of one collection run.
#[derive(Debug, Clone)]
pub struct CollectOutcome {
    /// Surviving tree; `None` when the root itself was pruned.
    pub structure: Option<MorphicTree>,
    /// Ids of every node released, in discovery order.
    pub pruned_nodes: Vec<NodeId>,
    /// Σ (ε − r) weighted by subtree share of the root.
    pub entropy_released: f64,
    /// Number of structures whose resonance/grace were evaluated.
    pub evaluations: usize,
}

impl CollectOutcome {
    fn unchanged(tree: &MorphicTree) -> Self {
        Self {
            structure: Some(tree.clone()),
            pruned_nodes: Vec::new(),
            entropy_released: 0.0,
            evaluations: 0,
        }
    }
}

struct Verdict {
    kept: Option<Detached>,
    pruned: Vec<NodeId>,
    entropy: f64,
    evaluations: usize,
}

/// Soul Garbage Collector bound to one Ω signature and parameter set.
#[derive(Debug, Clone)]
pub struct SoulGarbageCollector {
    signature: Option<OmegaSignature>,
    params: SgcParams,
}

impl SoulGarbageCollector {
    /// Create a collector. A `None` signature makes every run a no-op.
    pub fn new(signature: Option<OmegaSignature>, params: SgcParams) -> SgcResult<Self> {
        params.validate()?;
        Ok(Self { signature, params })
    }

    /// Collector whose Ω is derived from `reference`.
    pub fn for_reference(reference: &Graph, params: SgcParams) -> SgcResult<Self> {
        Self::new(Some(OmegaSignature::derive(reference)), params)
    }

    pub fn params(&self) -> &SgcParams {
        &self.params
    }

    pub fn signature(&self) -> Option<&OmegaSignature> {
        self.signature.as_ref()
    }

    /// Whether `graph`, at resonance `r`, is ready to be released.
    pub fn grace_ready(&self, graph: &Graph, r: f64) -> bool {
        let w = self.params.observer_feedback_weight;
        let accumulated = (1.0 - w) * coherence(graph) + w * r;
        let regime = FieldRegime::from_size(graph.len());
        accumulated > regime.grace_threshold(self.params.grace_readiness_threshold)
    }

    /// Run one collection over `tree`.
    pub fn collect(&self, tree: &MorphicTree) -> CollectOutcome {
        let Some(omega) = self.signature.as_ref() else {
            log::debug!("SGC: no Ω signature, skipping collection");
            return CollectOutcome::unchanged(tree);
        };
        if tree.is_empty() {
            return CollectOutcome::unchanged(tree);
        }

        let root_len = tree[tree.root()].graph.len();
        let verdict = self.visit(omega, tree, tree.root(), 0, root_len);

        log::info!(
            "SGC: pruned {}/{} nodes, entropy released {:.4}, {} evaluations",
            verdict.pruned.len(),
            root_len,
            verdict.entropy,
            verdict.evaluations
        );

        CollectOutcome {
            structure: verdict.kept.map(MorphicTree::from_detached),
            pruned_nodes: verdict.pruned,
            entropy_released: verdict.entropy,
            evaluations: verdict.evaluations,
        }
    }

    fn visit(
        &self,
        omega: &OmegaSignature,
        tree: &MorphicTree,
        id: StructureId,
        depth: u32,
        root_len: usize,
    ) -> Verdict {
        if depth >= self.params.max_recursion_depth {
            return Verdict {
                kept: Some(tree.detach(id)),
                pruned: Vec::new(),
                entropy: 0.0,
                evaluations: 0,
            };
        }

        let node = &tree[id];
        let r = resonance(&node.graph, omega);
        let eps = self.params.epsilon;

        if r < eps && self.grace_ready(&node.graph, r) {
            let pruned = node.graph.nodes().to_vec();
            let share = pruned.len() as f64 / root_len.max(1) as f64;
            log::debug!(
                "SGC: prune structure {:?} at depth {depth} ({} nodes, r={r:.4})",
                id,
                pruned.len()
            );
            return Verdict {
                kept: None,
                pruned,
                entropy: (eps - r) * share,
                evaluations: 1,
            };
        }

        let mut pruned = Vec::new();
        let mut entropy = 0.0;
        let mut evaluations = 1;
        let mut survivors = Vec::with_capacity(node.children.len());
        for child in self.visit_children(omega, tree, &node.children, depth + 1, root_len) {
            pruned.extend(child.pruned);
            entropy += child.entropy;
            evaluations += child.evaluations;
            if let Some(kept) = child.kept.filter(|c| !c.graph.is_empty()) {
                survivors.push(kept);
            }
        }

        let graph = if node.children.is_empty() || pruned.is_empty() {
            node.graph.clone()
        } else {
            let keep: Vec<NodeId> = survivors
                .iter()
                .flat_map(|c| c.graph.nodes().iter().copied())
                .collect();
            node.graph.subgraph(&keep)
        };

        Verdict {
            kept: Some(Detached {
                graph,
                children: survivors,
            }),
            pruned,
            entropy,
            evaluations,
        }
    }

    #[cfg(feature = "parallel")]
    fn visit_children(
        &self,
        omega: &OmegaSignature,
        tree: &MorphicTree,
        children: &[StructureId],
        depth: u32,
        root_len: usize,
    ) -> Vec<Verdict> {
        match children {
            [] => Vec::new(),
            [only] => vec![self.visit(omega, tree, *only, depth, root_len)],
            [left, right] => {
                let (l, r) = rayon::join(
                    || self.visit(omega, tree, *left, depth, root_len),
                    || self.visit(omega, tree, *right, depth, root_len),
                );
                vec![l, r]
            }
            many => {
                use rayon::prelude::*;
                many.par_iter()
                    .map(|&c| self.visit(omega, tree, c, depth, root_len))
                    .collect()
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn visit_children(
        &self,
        omega: &OmegaSignature,
        tree: &MorphicTree,
        children: &[StructureId],
        depth: u32,
        root_len: usize,
    ) -> Vec<Verdict> {
        children
            .iter()
            .map(|&c| self.visit(omega, tree, c, depth, root_len))
            .collect()
    }
}

/// Fraction of `before`'s node ids that no longer survive, in [0, 1].
///
/// `after = None` (everything pruned) gives 1 for a non-empty `before`;
/// an empty `before` gives 0.
pub fn compute_entropy_reduction(before: &MorphicTree, after: Option<&MorphicTree>) -> f64 {
    let before_ids = before.node_ids();
    if before_ids.is_empty() {
        return 0.0;
    }
    let Some(after) = after else {
        return 1.0;
    };
    let surviving = after.node_ids().intersection(&before_ids).count();
    clamp_score(
        1.0 - surviving as f64 / before_ids.len() as f64,
        0.0,
        1.0,
    )
}
