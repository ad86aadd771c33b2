//! The Node Store: an append-only columnar registry with structural
//! deduplication for constants.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::types::{Family, NodeId, NodeKind, OpKind};
use crate::lattice::{self, LatticeType};

/// Owns every node of one compile.
///
/// Dense columnar layout: one entry per node in `kinds`/`types`, parent lists
/// flattened CSR-style, plus a head-inserted child adjacency used for
/// downstream walks and edge emission. All creators are deterministic given
/// identical call history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    kinds: Vec<NodeKind>,
    types: Vec<LatticeType>,

    // Topology (CSR parents + linked-list children)
    parents_flat: Vec<NodeId>,
    parents_ranges: Vec<(u32, u32)>, // (start, count)
    first_child: Vec<u32>,
    child_targets: Vec<NodeId>,
    next_child: Vec<u32>,

    // Ephemeral dedup cache (not serialized, rebuilt on load)
    #[serde(skip)]
    constants: HashMap<u64, NodeId>,
}

/// Dedup key for a constant value. Negative zero folds onto zero so that
/// numerically equal constants share a node; NaNs compare by bit pattern.
fn constant_key(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.kinds.len()
    }

    /// Rebuilds the constant dedup cache after deserialization.
    pub fn rebuild_dedup_cache(&mut self) {
        self.constants = self
            .kinds
            .iter()
            .enumerate()
            .filter_map(|(i, k)| match k {
                NodeKind::Constant(v) => Some((constant_key(*v), NodeId::new(i))),
                _ => None,
            })
            .collect();
    }

    fn push_node(&mut self, kind: NodeKind, ty: LatticeType, parents: &[NodeId]) -> NodeId {
        let id = NodeId(self.kinds.len() as u32);

        // 1. Parents (CSR append)
        let start = self.parents_flat.len() as u32;
        let count = parents.len() as u32;
        self.parents_flat.extend_from_slice(parents);
        self.parents_ranges.push((start, count));

        // 2. Children (adjacency list, head insertion)
        for &parent in parents {
            let p_idx = parent.index();
            let head = self.first_child[p_idx];
            let new_edge = self.child_targets.len() as u32;
            self.child_targets.push(id);
            self.next_child.push(head);
            self.first_child[p_idx] = new_edge;
        }

        // 3. Payload columns
        self.kinds.push(kind);
        self.types.push(ty);
        self.first_child.push(u32::MAX);

        id
    }

    /// Lifts a concrete value, deduplicating by value equality: two requests
    /// for an equal constant return the same node id.
    pub fn constant(&mut self, value: f64) -> NodeId {
        let key = constant_key(value);
        if let Some(&id) = self.constants.get(&key) {
            return id;
        }
        let id = self.push_node(NodeKind::Constant(value), lattice::natural_type_of(value), &[]);
        self.constants.insert(key, id);
        id
    }

    /// Always creates a new node; reuse across identical random-variable
    /// invocations is the tracer's memoization, not store-level dedup.
    pub fn distribution(&mut self, family: Family, params: &[NodeId]) -> NodeId {
        self.push_node(NodeKind::Distribution(family), family.sample_type(), params)
    }

    pub fn sample(&mut self, distribution: NodeId) -> NodeId {
        let ty = self.types[distribution.index()];
        self.push_node(NodeKind::Sample, ty, &[distribution])
    }

    /// Creates an Operator node over operands whose types were already
    /// resolved against the operator's requirements by the Coercion Engine.
    pub fn operator(&mut self, op: OpKind, operands: &[NodeId], ty: LatticeType) -> NodeId {
        self.push_node(NodeKind::Operator(op), ty, operands)
    }

    pub fn query(&mut self, target: NodeId) -> NodeId {
        let ty = self.types[target.index()];
        self.push_node(NodeKind::Query, ty, &[target])
    }

    /// Records a construct the engine cannot execute. `display` is the text
    /// the reporter will show; `inputs` keep the node positioned in the DAG.
    pub fn unsupported(&mut self, display: String, inputs: &[NodeId]) -> NodeId {
        self.push_node(NodeKind::Unsupported(display), LatticeType::Tensor, inputs)
    }

    // --- Accessors ---

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.kinds[id.index()]
    }

    pub fn type_of(&self, id: NodeId) -> LatticeType {
        self.types[id.index()]
    }

    #[inline(always)]
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        let (start, count) = self.parents_ranges[id.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    /// Consumers of `id`, in the order they were created. Duplicate entries
    /// appear once per input slot that references `id`.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut edge_idx = self.first_child[id.index()];
        while edge_idx != u32::MAX {
            out.push(self.child_targets[edge_idx as usize]);
            edge_idx = self.next_child[edge_idx as usize];
        }
        // Head insertion yields newest-first; edge emission wants creation order.
        out.reverse();
        out
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.kinds.len()).map(NodeId::new)
    }

    /// Nodes reachable upstream from `roots`, roots included.
    pub fn upstream_of(&self, roots: &[NodeId]) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if visited.insert(node) {
                for &parent in self.parents(node) {
                    queue.push_back(parent);
                }
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_deduplicate_by_value() {
        let mut reg = Registry::new();
        let a = reg.constant(2.0);
        let b = reg.constant(2.0);
        let c = reg.constant(3.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.count(), 2);
    }

    #[test]
    fn negative_zero_folds_onto_zero() {
        let mut reg = Registry::new();
        assert_eq!(reg.constant(0.0), reg.constant(-0.0));
    }

    #[test]
    fn ids_are_dense_and_creation_ordered() {
        let mut reg = Registry::new();
        let c = reg.constant(2.0);
        let d = reg.distribution(Family::Beta, &[c, c]);
        let s = reg.sample(d);
        let q = reg.query(s);
        assert_eq!((c.0, d.0, s.0, q.0), (0, 1, 2, 3));
        assert_eq!(reg.parents(d), &[c, c]);
        assert_eq!(reg.parents(q), &[s]);
    }

    #[test]
    fn distributions_are_not_deduplicated() {
        let mut reg = Registry::new();
        let c = reg.constant(1.0);
        let d1 = reg.distribution(Family::HalfCauchy, &[c]);
        let d2 = reg.distribution(Family::HalfCauchy, &[c]);
        assert_ne!(d1, d2);
    }

    #[test]
    fn children_come_back_in_creation_order() {
        let mut reg = Registry::new();
        let c = reg.constant(2.0);
        let d1 = reg.distribution(Family::Beta, &[c, c]);
        let d2 = reg.distribution(Family::HalfCauchy, &[c]);
        // Duplicate parent entries produce duplicate child entries.
        assert_eq!(reg.children(c), vec![d1, d1, d2]);
    }

    #[test]
    fn sample_takes_the_distribution_type() {
        let mut reg = Registry::new();
        let c = reg.constant(2.0);
        let d = reg.distribution(Family::Beta, &[c, c]);
        let s = reg.sample(d);
        assert_eq!(reg.type_of(s), LatticeType::Probability);
    }

    #[test]
    fn upstream_walk_includes_roots_and_all_ancestors() {
        let mut reg = Registry::new();
        let c = reg.constant(0.5);
        let d = reg.distribution(Family::Bernoulli, &[c]);
        let s = reg.sample(d);
        let q = reg.query(s);
        let dead = reg.constant(9.0);

        let up = reg.upstream_of(&[q]);
        assert!(up.contains(&q));
        assert!(up.contains(&s));
        assert!(up.contains(&c));
        assert!(!up.contains(&dead));
    }

    #[test]
    fn snapshot_round_trips_and_rebuilds_dedup() {
        let mut reg = Registry::new();
        let c = reg.constant(0.5);
        let d = reg.distribution(Family::Bernoulli, &[c]);
        reg.sample(d);

        let json = serde_json::to_string(&reg).unwrap();
        let mut back: Registry = serde_json::from_str(&json).unwrap();
        back.rebuild_dedup_cache();

        assert_eq!(back.count(), 3);
        assert_eq!(back.constant(0.5), c);
        assert_eq!(back.count(), 3);
    }
}
