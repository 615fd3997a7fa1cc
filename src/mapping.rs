use std::sync::Arc;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
use crate::query::Pattern;
use crate::registry::Handle;

/// The materialized result of one embedding: an immutable query→target
/// vertex array.
///
/// `map[v] == -1` means query vertex `v` is unmapped (a query hydrogen
/// absorbed into the target's implicit count, or a vertex outside the
/// matched region). A mapping outlives the iterator that produced it.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub query: Arc<Pattern>,
    pub query_handle: Handle,
    pub target: Arc<Mol<Atom, Bond>>,
    pub target_handle: Handle,
    map: Vec<i32>,
}

impl Mapping {
    pub fn new(
        query: Arc<Pattern>,
        query_handle: Handle,
        target: Arc<Mol<Atom, Bond>>,
        target_handle: Handle,
        map: Vec<i32>,
    ) -> Self {
        Self {
            query,
            query_handle,
            target,
            target_handle,
            map,
        }
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.map
    }

    /// Target vertex a query vertex maps to, or `None` when unmapped.
    pub fn resolve_atom(&self, query_atom: usize) -> Option<usize> {
        match self.map.get(query_atom) {
            Some(&v) if v >= 0 => Some(v as usize),
            _ => None,
        }
    }

    /// Target edge a query edge maps onto. Both endpoints must resolve and
    /// the target must actually carry an edge between their images.
    pub fn resolve_bond(&self, query_bond: usize) -> Option<usize> {
        let (a, b) = self.query.bond_endpoints(EdgeIndex::new(query_bond))?;
        let ta = self.resolve_atom(a.index())?;
        let tb = self.resolve_atom(b.index())?;
        self.target
            .bond_between(NodeIndex::new(ta), NodeIndex::new(tb))
            .map(|e| e.index())
    }
}
