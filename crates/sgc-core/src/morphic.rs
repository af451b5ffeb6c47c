// ─────────────────────────────────────────────────────────────────────
// FIRM Core — Morphic Structure Tree
// ─────────────────────────────────────────────────────────────────────
//! Binary decomposition of a graph, stored as an arena.
//!
//! A structure with more than three nodes is split positionally at
//! `len / 2` into two induced subgraphs, recursively. Children are
//! owned through handle lists; the parent handle is navigation only.

use std::collections::BTreeSet;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use sgc_graph::{Graph, NodeId};

/// Structures with more nodes than this are bisected.
pub const SPLIT_THRESHOLD: usize = 3;

/// Handle of a structure inside its `MorphicTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MorphicNode {
    pub graph: Graph,
    pub children: Vec<StructureId>,
    pub parent: Option<StructureId>,
    pub depth: u32,
}

impl MorphicNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Owned, arena-free form used to carry collector decisions back up
/// the recursion before they are flattened into a new tree.
#[derive(Debug, Clone)]
pub(crate) struct Detached {
    pub graph: Graph,
    pub children: Vec<Detached>,
}

/// Arena of structures. Serialize-only: handles are trusted to be in
/// range, which only `build` and the collector guarantee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MorphicTree {
    nodes: Vec<MorphicNode>,
    root: StructureId,
}

impl MorphicTree {
    /// Decompose `graph`. An empty graph yields a single childless root.
    pub fn build(graph: Graph) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: StructureId(0),
        };
        tree.push_bisected(graph, None, 0);
        tree
    }

    fn push_bisected(&mut self, graph: Graph, parent: Option<StructureId>, depth: u32) -> StructureId {
        let id = StructureId(self.nodes.len());
        let halves = (graph.len() > SPLIT_THRESHOLD).then(|| {
            let (left, right) = graph.nodes().split_at(graph.len() / 2);
            (graph.subgraph(left), graph.subgraph(right))
        });
        self.nodes.push(MorphicNode {
            graph,
            children: Vec::new(),
            parent,
            depth,
        });
        if let Some((left, right)) = halves {
            let l = self.push_bisected(left, Some(id), depth + 1);
            let r = self.push_bisected(right, Some(id), depth + 1);
            self.nodes[id.0].children = vec![l, r];
        }
        id
    }

    pub(crate) fn from_detached(detached: Detached) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: StructureId(0),
        };
        tree.push_detached(detached, None, 0);
        tree
    }

    fn push_detached(&mut self, detached: Detached, parent: Option<StructureId>, depth: u32) -> StructureId {
        let id = StructureId(self.nodes.len());
        self.nodes.push(MorphicNode {
            graph: detached.graph,
            children: Vec::new(),
            parent,
            depth,
        });
        let children = detached
            .children
            .into_iter()
            .map(|c| self.push_detached(c, Some(id), depth + 1))
            .collect();
        self.nodes[id.0].children = children;
        id
    }

    pub(crate) fn detach(&self, id: StructureId) -> Detached {
        let node = &self.nodes[id.0];
        Detached {
            graph: node.graph.clone(),
            children: node.children.iter().map(|&c| self.detach(c)).collect(),
        }
    }

    pub fn root(&self) -> StructureId {
        self.root
    }

    pub fn get(&self, id: StructureId) -> Option<&MorphicNode> {
        self.nodes.get(id.0)
    }

    pub fn children(&self, id: StructureId) -> &[StructureId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn parent(&self, id: StructureId) -> Option<StructureId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Number of structures in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root carries no nodes. The arena itself always
    /// holds at least the root.
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.0].graph.is_empty()
    }

    /// Deepest structure level (root = 0).
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn leaves(&self) -> Vec<StructureId> {
        self.iter_preorder()
            .filter(|&id| self.nodes[id.0].is_leaf())
            .collect()
    }

    /// Node ids carried by the root structure.
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.nodes[self.root.0].graph.node_set()
    }

    /// Structures in depth-first pre-order, children left to right.
    pub fn iter_preorder(&self) -> impl Iterator<Item = StructureId> + '_ {
        let mut stack = vec![self.root];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
            Some(id)
        })
    }
}

impl Index<StructureId> for MorphicTree {
    type Output = MorphicNode;

    fn index(&self, id: StructureId) -> &MorphicNode {
        &self.nodes[id.0]
    }
}
