use std::collections::VecDeque;

use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;

use crate::mol::Mol;

/// Ring perception result: one entry per perceived small ring, each a cyclic
/// vertex sequence.
///
/// The engine only consumes rings for aromatic perception, so this keeps the
/// smallest-ring flavor of the full SSSR computation: for every non-tree
/// edge of a BFS spanning forest, the shortest cycle through that edge is a
/// candidate; candidates are deduplicated and the expected cycle-rank count
/// of smallest ones is kept.
#[derive(Debug, Clone)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
}

impl RingInfo {
    pub fn perceive<A, B>(mol: &Mol<A, B>) -> Self {
        let num_expected = Self::expected_ring_count(mol);
        if num_expected == 0 {
            return Self { rings: vec![] };
        }

        let mut candidates = ring_candidates(mol);
        candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        candidates.dedup();

        Self { rings: candidates }
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    /// Cycle rank: edges − vertices + components.
    pub fn expected_ring_count<A, B>(mol: &Mol<A, B>) -> usize {
        let components = connected_components(mol.graph());
        (mol.bond_count() + components).saturating_sub(mol.atom_count())
    }

    pub fn atom_ring_membership<A, B>(&self, mol: &Mol<A, B>) -> Vec<bool> {
        let mut in_ring = vec![false; mol.atom_count()];
        for ring in &self.rings {
            for &idx in ring {
                in_ring[idx.index()] = true;
            }
        }
        in_ring
    }
}

/// Shortest cycle through every non-tree edge of a BFS spanning forest.
fn ring_candidates<A, B>(mol: &Mol<A, B>) -> Vec<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let mut visited = vec![false; n];
    let mut tree_edge = vec![false; mol.bond_count()];
    let mut rings = Vec::new();

    for start in mol.atoms() {
        if visited[start.index()] {
            continue;
        }
        visited[start.index()] = true;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(v) = queue.pop_front() {
            for e in mol.bonds_of(v) {
                let (a, b) = match mol.bond_endpoints(e) {
                    Some(ends) => ends,
                    None => continue,
                };
                let w = if a == v { b } else { a };
                if !visited[w.index()] {
                    visited[w.index()] = true;
                    tree_edge[e.index()] = true;
                    queue.push_back(w);
                }
            }
        }
    }

    for e in mol.bonds() {
        if tree_edge[e.index()] {
            continue;
        }
        let (a, b) = match mol.bond_endpoints(e) {
            Some(ends) => ends,
            None => continue,
        };
        if let Some(path) = shortest_path_avoiding_edge(mol, a, b, e.index()) {
            rings.push(normalize_ring(&path));
        }
    }

    rings
}

/// BFS shortest path from `from` to `to` that does not traverse `skip_edge`.
fn shortest_path_avoiding_edge<A, B>(
    mol: &Mol<A, B>,
    from: NodeIndex,
    to: NodeIndex,
    skip_edge: usize,
) -> Option<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let mut prev: Vec<Option<NodeIndex>> = vec![None; n];
    let mut seen = vec![false; n];
    let mut queue = VecDeque::new();
    seen[from.index()] = true;
    queue.push_back(from);

    while let Some(v) = queue.pop_front() {
        if v == to {
            let mut path = vec![to];
            let mut cur = to;
            while let Some(p) = prev[cur.index()] {
                path.push(p);
                cur = p;
            }
            path.reverse();
            return Some(path);
        }
        for e in mol.bonds_of(v) {
            if e.index() == skip_edge {
                continue;
            }
            let (a, b) = match mol.bond_endpoints(e) {
                Some(ends) => ends,
                None => continue,
            };
            let w = if a == v { b } else { a };
            if !seen[w.index()] {
                seen[w.index()] = true;
                prev[w.index()] = Some(v);
                queue.push_back(w);
            }
        }
    }
    None
}

/// Rotate and orient a cyclic sequence into a canonical form so duplicate
/// rings found from different closure edges compare equal.
fn normalize_ring(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    let len = ring.len();
    let min_pos = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, v)| v.index())
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut forward = Vec::with_capacity(len);
    for i in 0..len {
        forward.push(ring[(min_pos + i) % len]);
    }
    let mut backward = Vec::with_capacity(len);
    for i in 0..len {
        backward.push(ring[(min_pos + len - i) % len]);
    }
    if forward <= backward {
        forward
    } else {
        backward
    }
}
