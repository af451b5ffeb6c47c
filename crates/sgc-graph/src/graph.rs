// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Labeled Spider Graph
// ─────────────────────────────────────────────────────────────────────
//! Immutable-after-construction labeled graph.
//!
//! Nodes carry a spider kind (Z or X) and a rational phase; edges are
//! unordered pairs stored as `(min, max)`. Node order is significant:
//! morphic bisection splits the node list positionally.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use sgc_types::{SgcError, SgcResult};

use crate::phase::Phase;

pub type NodeId = u32;

/// The two spider colours of a ZX network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpiderKind {
    #[default]
    Z,
    X,
}

/// Label attached to every node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeLabel {
    pub kind: SpiderKind,
    pub phase: Phase,
    #[serde(default)]
    pub tag: String,
}

impl NodeLabel {
    pub fn new(kind: SpiderKind, phase: Phase) -> Self {
        Self {
            kind,
            phase,
            tag: String::new(),
        }
    }

    pub fn z(phase: Phase) -> Self {
        Self::new(SpiderKind::Z, phase)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

#[derive(Deserialize)]
struct GraphData {
    nodes: Vec<NodeId>,
    #[serde(default)]
    edges: Vec<(NodeId, NodeId)>,
    labels: BTreeMap<NodeId, NodeLabel>,
}

impl TryFrom<GraphData> for Graph {
    type Error = SgcError;

    fn try_from(data: GraphData) -> SgcResult<Self> {
        Graph::new(data.nodes, data.edges, data.labels)
    }
}

/// A validated labeled graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphData")]
pub struct Graph {
    nodes: Vec<NodeId>,
    edges: Vec<(NodeId, NodeId)>,
    labels: BTreeMap<NodeId, NodeLabel>,
}

impl Graph {
    /// Build a graph, enforcing the model invariants: unique node ids,
    /// exactly one label per node, edges between known nodes, no
    /// self-loops, no repeated edges.
    pub fn new(
        nodes: Vec<NodeId>,
        edges: Vec<(NodeId, NodeId)>,
        labels: BTreeMap<NodeId, NodeLabel>,
    ) -> SgcResult<Self> {
        let mut seen = BTreeSet::new();
        for &n in &nodes {
            if !seen.insert(n) {
                return Err(SgcError::Graph(format!("duplicate node id {n}")));
            }
            if !labels.contains_key(&n) {
                return Err(SgcError::Graph(format!("node {n} has no label")));
            }
        }
        if let Some(extra) = labels.keys().find(|id| !seen.contains(id)) {
            return Err(SgcError::Graph(format!(
                "label for unknown node {extra}"
            )));
        }

        let mut seen_edges = BTreeSet::new();
        let mut norm = Vec::with_capacity(edges.len());
        for (u, v) in edges {
            if u == v {
                return Err(SgcError::Graph(format!("self-loop on node {u}")));
            }
            if !seen.contains(&u) || !seen.contains(&v) {
                return Err(SgcError::Graph(format!(
                    "edge ({u}, {v}) references a missing node"
                )));
            }
            let e = (u.min(v), u.max(v));
            if !seen_edges.insert(e) {
                return Err(SgcError::Graph(format!("duplicate edge ({u}, {v})")));
            }
            norm.push(e);
        }

        Ok(Self {
            nodes,
            edges: norm,
            labels,
        })
    }

    /// Build from an ordered label list; node order follows the list.
    pub fn from_parts(
        labelled: Vec<(NodeId, NodeLabel)>,
        edges: Vec<(NodeId, NodeId)>,
    ) -> SgcResult<Self> {
        let nodes = labelled.iter().map(|(id, _)| *id).collect();
        let mut labels = BTreeMap::new();
        for (id, label) in labelled {
            if labels.insert(id, label).is_some() {
                return Err(SgcError::Graph(format!("duplicate node id {id}")));
            }
        }
        Self::new(nodes, edges, labels)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn label(&self, id: NodeId) -> Option<&NodeLabel> {
        self.labels.get(&id)
    }

    pub fn labels(&self) -> &BTreeMap<NodeId, NodeLabel> {
        &self.labels
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.labels.contains_key(&id)
    }

    pub fn node_set(&self) -> BTreeSet<NodeId> {
        self.nodes.iter().copied().collect()
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.edges
            .iter()
            .filter(|&&(u, v)| u == id || v == id)
            .count()
    }

    /// Adjacency lists; neighbours appear in edge order.
    pub fn adjacency(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut adj: BTreeMap<NodeId, Vec<NodeId>> =
            self.nodes.iter().map(|&n| (n, Vec::new())).collect();
        for &(u, v) in &self.edges {
            adj.entry(u).or_default().push(v);
            adj.entry(v).or_default().push(u);
        }
        adj
    }

    /// Induced subgraph on `keep`, in the order given. Ids not present
    /// in this graph are ignored.
    pub fn subgraph(&self, keep: &[NodeId]) -> Graph {
        let mut nodes = Vec::with_capacity(keep.len());
        let mut labels = BTreeMap::new();
        for &id in keep {
            if let Some(label) = self.labels.get(&id) {
                if labels.insert(id, label.clone()).is_none() {
                    nodes.push(id);
                }
            }
        }
        let edges = self
            .edges
            .iter()
            .filter(|(u, v)| labels.contains_key(u) && labels.contains_key(v))
            .copied()
            .collect();
        Graph {
            nodes,
            edges,
            labels,
        }
    }

    /// Node phases in radians, in node order.
    pub fn phases_radians(&self) -> Vec<f64> {
        self.nodes
            .iter()
            .filter_map(|id| self.labels.get(id))
            .map(|l| l.phase.radians())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(n: i64, d: u32) -> NodeLabel {
        NodeLabel::z(Phase::new(n, d).unwrap())
    }

    fn triangle() -> Graph {
        Graph::from_parts(
            vec![(0, label(0, 1)), (1, label(1, 2)), (2, label(1, 1))],
            vec![(0, 1), (2, 1), (0, 2)],
        )
        .unwrap()
    }

    #[test]
    fn test_valid_graph() {
        let g = triangle();
        assert_eq!(g.len(), 3);
        assert_eq!(g.edges(), &[(0, 1), (1, 2), (0, 2)]);
        assert_eq!(g.degree(1), 2);
    }

    #[test]
    fn test_rejects_self_loop() {
        let err = Graph::from_parts(vec![(0, label(0, 1))], vec![(0, 0)]).unwrap_err();
        assert!(matches!(err, SgcError::Graph(_)));
    }

    #[test]
    fn test_rejects_dangling_edge() {
        assert!(Graph::from_parts(vec![(0, label(0, 1))], vec![(0, 7)]).is_err());
    }

    #[test]
    fn test_rejects_unlabeled_node() {
        assert!(Graph::new(vec![0, 1], vec![], BTreeMap::from([(0, label(0, 1))])).is_err());
        assert!(Graph::new(vec![0], vec![], BTreeMap::from([(0, label(0, 1)), (1, label(0, 1))])).is_err());
    }

    #[test]
    fn test_rejects_duplicate_edge() {
        let nodes = vec![(0, label(0, 1)), (1, label(0, 1))];
        assert!(Graph::from_parts(nodes, vec![(0, 1), (1, 0)]).is_err());
    }

    #[test]
    fn test_subgraph_induced() {
        let g = triangle();
        let sub = g.subgraph(&[2, 0, 9]);
        assert_eq!(sub.nodes(), &[2, 0]);
        assert_eq!(sub.edges(), &[(0, 2)]);
        assert!(sub.label(1).is_none());
    }

    #[test]
    fn test_json_roundtrip_validates() {
        let g = triangle();
        let json = serde_json::to_string(&g).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);

        let bad = r#"{"nodes":[0],"edges":[[0,0]],"labels":{"0":{"kind":"Z","phase":[0,1]}}}"#;
        assert!(serde_json::from_str::<Graph>(bad).is_err());
    }

    #[test]
    fn test_phases_radians_in_node_order() {
        let p = triangle().phases_radians();
        assert!((p[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((p[2] - std::f64::consts::PI).abs() < 1e-12);
    }
}
