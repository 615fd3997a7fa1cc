use std::collections::HashSet;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use tracing::trace;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::cancel::Deadline;
use crate::counters::{pattern_lower_bounds, AtomCounters, NeighbourhoodCounters};
use crate::error::Result;
use crate::mol::Mol;
use crate::query::{BondExpr, Pattern};
use crate::resonance::ResonanceInfo;
use crate::tautomer::TautomerBondFilter;

/// Embedding deduplication policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Uniqueness {
    /// Keep every embedding, including automorphic images.
    None,
    /// Embeddings mapping onto the same target atom set are one.
    #[default]
    ByAtoms,
    /// Embeddings covering the same target bond set are one.
    ByBonds,
}

/// How query bonds are compared against target bonds.
#[derive(Debug, Clone)]
pub enum BondMatchKind {
    /// Orders must satisfy the bond expression as written.
    Exact,
    /// Order mismatches are tolerated inside conjugated systems.
    Resonance(Arc<ResonanceInfo>),
    /// Order mismatches are tolerated where a tautomer rule admits hydrogen
    /// migration across the bond.
    Tautomer(Arc<TautomerBondFilter>),
}

/// Construction-time options of an [`EmbeddingSearch`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub uniqueness: Uniqueness,
    /// Retain every found embedding for indexed access (iteration mode).
    pub save_embeddings: bool,
    /// Fold terminal query hydrogens into hydrogen-count demands on their
    /// neighbour instead of matching them as vertices.
    pub fold_query_hydrogens: bool,
    pub bond_mode: BondMatchKind,
    pub counters: Option<Arc<NeighbourhoodCounters>>,
    /// Target atoms excluded from matching, in the search target's own
    /// numbering. Empty means nothing is ignored.
    pub ignored: Vec<bool>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            uniqueness: Uniqueness::default(),
            save_embeddings: true,
            fold_query_hydrogens: false,
            bond_mode: BondMatchKind::Exact,
            counters: None,
            ignored: Vec::new(),
        }
    }
}

struct Frame {
    depth: usize,
    next_candidate: usize,
}

/// Lazy, resumable enumeration of embeddings of a query pattern in a target
/// molecule.
///
/// The backtracking state lives in an explicit stack so `find_next` can
/// return one embedding at a time and resume exactly where it stopped.
/// Embeddings are reported as `query vertex → target vertex` arrays with
/// `-1` for folded query hydrogens.
pub struct EmbeddingSearch {
    target: Arc<Mol<Atom, Bond>>,
    pattern: Arc<Pattern>,
    options: SearchOptions,
    deadline: Deadline,

    /// Kept query vertices in matching order (most constrained first).
    order: Vec<NodeIndex>,
    folded: Vec<bool>,
    extra_h: Vec<u8>,
    bounds: Vec<AtomCounters>,

    frames: Vec<Frame>,
    assigned: Vec<i32>,
    target_used: Vec<bool>,
    started: bool,
    exhausted: bool,
    tick: u32,

    seen: HashSet<Vec<usize>>,
    stored: Vec<Vec<i32>>,
    last: Option<Vec<i32>>,
}

impl EmbeddingSearch {
    pub fn new(
        target: Arc<Mol<Atom, Bond>>,
        pattern: Arc<Pattern>,
        options: SearchOptions,
    ) -> Self {
        let n_query = pattern.atom_count();
        let mut folded = vec![false; n_query];
        let mut extra_h = vec![0u8; n_query];

        if options.fold_query_hydrogens {
            for idx in pattern.atoms() {
                if !pattern.atom(idx).is_definitely_hydrogen() {
                    continue;
                }
                if pattern.degree(idx) != 1 {
                    continue;
                }
                let edge = match pattern.bonds_of(idx).next() {
                    Some(e) => e,
                    None => continue,
                };
                if matches!(pattern.bond(edge), BondExpr::Double | BondExpr::Triple) {
                    continue;
                }
                let neighbor = match pattern.neighbors(idx).next() {
                    Some(n) => n,
                    None => continue,
                };
                if pattern.atom(neighbor).is_definitely_hydrogen() {
                    continue;
                }
                folded[idx.index()] = true;
                extra_h[neighbor.index()] += 1;
            }
        }

        let mut order: Vec<NodeIndex> = pattern
            .atoms()
            .filter(|idx| !folded[idx.index()])
            .collect();
        order.sort_by(|&a, &b| pattern.degree(b).cmp(&pattern.degree(a)));

        let bounds = pattern_lower_bounds(&pattern);
        let target_count = target.atom_count();

        Self {
            target,
            pattern,
            options,
            deadline: Deadline::none(),
            order,
            folded,
            extra_h,
            bounds,
            frames: Vec::new(),
            assigned: vec![-1; n_query],
            target_used: vec![false; target_count],
            started: false,
            exhausted: false,
            tick: 0,
            seen: HashSet::new(),
            stored: Vec::new(),
            last: None,
        }
    }

    pub fn set_deadline(&mut self, deadline: Deadline) {
        self.deadline = deadline;
    }

    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }

    pub fn stored(&self, index: usize) -> &[i32] {
        &self.stored[index]
    }

    pub fn last_embedding(&self) -> Option<&[i32]> {
        self.last.as_deref()
    }

    /// Advance the search to the next embedding that survives the
    /// uniqueness filter. Returns `false` once the search space is
    /// exhausted.
    pub fn find_next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.started {
            self.started = true;
            if self.order.is_empty() {
                self.exhausted = true;
                return Ok(false);
            }
            self.frames.push(Frame {
                depth: 0,
                next_candidate: 0,
            });
        }

        let target_count = self.target.atom_count();
        loop {
            self.tick = self.tick.wrapping_add(1);
            if self.tick % 512 == 0 {
                self.deadline.check()?;
            }

            let top = match self.frames.len().checked_sub(1) {
                Some(i) => i,
                None => {
                    self.exhausted = true;
                    trace!("embedding search exhausted");
                    return Ok(false);
                }
            };
            let depth = self.frames[top].depth;
            let query_node = self.order[depth];

            let mut candidate = self.frames[top].next_candidate;
            let mut chosen = None;
            while candidate < target_count {
                if !self.target_used[candidate]
                    && !self
                        .options
                        .ignored
                        .get(candidate)
                        .copied()
                        .unwrap_or(false)
                    && self.is_feasible(query_node, NodeIndex::new(candidate))
                {
                    chosen = Some(candidate);
                    break;
                }
                candidate += 1;
            }

            match chosen {
                None => {
                    self.frames.pop();
                    if let Some(prev) = self.frames.last() {
                        let prev_node = self.order[prev.depth];
                        let assigned = self.assigned[prev_node.index()];
                        self.assigned[prev_node.index()] = -1;
                        if assigned >= 0 {
                            self.target_used[assigned as usize] = false;
                        }
                    } else {
                        self.exhausted = true;
                        trace!("embedding search exhausted");
                        return Ok(false);
                    }
                }
                Some(c) => {
                    self.frames[top].next_candidate = c + 1;
                    self.assigned[query_node.index()] = c as i32;
                    self.target_used[c] = true;

                    if depth + 1 == self.order.len() {
                        let embedding = self.current_embedding();
                        // Undo the deepest assignment so the stack is ready
                        // to continue from here on the next call.
                        self.assigned[query_node.index()] = -1;
                        self.target_used[c] = false;

                        if self.accept(embedding) {
                            return Ok(true);
                        }
                    } else {
                        self.frames.push(Frame {
                            depth: depth + 1,
                            next_candidate: 0,
                        });
                    }
                }
            }
        }
    }

    fn current_embedding(&self) -> Vec<i32> {
        (0..self.pattern.atom_count())
            .map(|v| if self.folded[v] { -1 } else { self.assigned[v] })
            .collect()
    }

    /// Uniqueness filtering and storage; returns whether the embedding is
    /// new under the configured policy.
    fn accept(&mut self, embedding: Vec<i32>) -> bool {
        let key = self.uniqueness_key(&embedding);
        if let Some(key) = key {
            if !self.seen.insert(key) {
                return false;
            }
        }
        if self.options.save_embeddings {
            self.stored.push(embedding.clone());
        }
        self.last = Some(embedding);
        true
    }

    fn uniqueness_key(&self, embedding: &[i32]) -> Option<Vec<usize>> {
        embedding_key(
            &self.target,
            &self.pattern,
            embedding,
            self.options.uniqueness,
        )
    }

    fn is_feasible(&self, query_node: NodeIndex, target_node: NodeIndex) -> bool {
        if !self
            .pattern
            .atom(query_node)
            .matches(&self.target, target_node)
        {
            return false;
        }

        let demand = self.extra_h[query_node.index()];
        if demand > 0 && available_hydrogens(&self.target, target_node) < demand {
            return false;
        }

        if let Some(counters) = &self.options.counters {
            // The query's lower bounds count folded hydrogens as explicit
            // neighbours; both sides include hydrogen, so coverage holds.
            if !counters
                .get(target_node)
                .covers(&self.bounds[query_node.index()])
            {
                return false;
            }
        }

        for q_neighbor in self.pattern.neighbors(query_node) {
            if self.folded[q_neighbor.index()] {
                continue;
            }
            let mapped = self.assigned[q_neighbor.index()];
            if mapped < 0 {
                continue;
            }
            let q_edge = match self.pattern.bond_between(query_node, q_neighbor) {
                Some(e) => e,
                None => continue,
            };
            let t_edge = match self
                .target
                .bond_between(target_node, NodeIndex::new(mapped as usize))
            {
                Some(e) => e,
                None => return false,
            };
            if !self.bond_feasible(*self.pattern.bond(q_edge), t_edge) {
                return false;
            }
        }

        true
    }

    fn bond_feasible(&self, expr: BondExpr, t_edge: petgraph::graph::EdgeIndex) -> bool {
        let order = self.target.bond(t_edge).order;
        if expr.matches(order) {
            return true;
        }
        match &self.options.bond_mode {
            BondMatchKind::Exact => false,
            BondMatchKind::Resonance(info) => {
                expr != BondExpr::Triple
                    && order != BondOrder::Triple
                    && info.is_conjugated(t_edge)
            }
            BondMatchKind::Tautomer(filter) => filter.allows(&self.target, t_edge, expr),
        }
    }
}

/// Hydrogens a target atom can still supply to folded query hydrogens:
/// its implicit count plus explicit hydrogen neighbours.
fn available_hydrogens(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    crate::query::total_hydrogens(mol, idx)
}

/// Deduplication key of an embedding under a uniqueness policy, or `None`
/// when every embedding counts.
pub fn embedding_key(
    target: &Mol<Atom, Bond>,
    pattern: &Pattern,
    embedding: &[i32],
    uniqueness: Uniqueness,
) -> Option<Vec<usize>> {
    match uniqueness {
        Uniqueness::None => None,
        Uniqueness::ByAtoms => {
            let mut atoms: Vec<usize> = embedding
                .iter()
                .filter(|&&v| v >= 0)
                .map(|&v| v as usize)
                .collect();
            atoms.sort_unstable();
            Some(atoms)
        }
        Uniqueness::ByBonds => {
            let mut edges = Vec::new();
            for edge in pattern.bonds() {
                let (a, b) = match pattern.bond_endpoints(edge) {
                    Some(ends) => ends,
                    None => continue,
                };
                let ta = embedding[a.index()];
                let tb = embedding[b.index()];
                if ta < 0 || tb < 0 {
                    continue;
                }
                if let Some(te) =
                    target.bond_between(NodeIndex::new(ta as usize), NodeIndex::new(tb as usize))
                {
                    edges.push(te.index());
                }
            }
            edges.sort_unstable();
            Some(edges)
        }
    }
}
