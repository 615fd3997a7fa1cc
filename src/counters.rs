use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
use crate::query::Pattern;

/// Per-atom neighbour composition, bucketed by the elements that dominate
/// organic structures. Used as a cheap candidate prefilter: a target atom
/// can only host a query atom whose neighbourhood demands are covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtomCounters {
    pub carbon: u8,
    pub nitrogen: u8,
    pub oxygen: u8,
    pub sulfur: u8,
    pub phosphorus: u8,
    pub halogen: u8,
    pub other: u8,
    pub hydrogen: u8,
}

impl AtomCounters {
    fn bump(&mut self, atomic_num: u8) {
        match atomic_num {
            1 => self.hydrogen = self.hydrogen.saturating_add(1),
            6 => self.carbon += 1,
            7 => self.nitrogen += 1,
            8 => self.oxygen += 1,
            16 => self.sulfur += 1,
            15 => self.phosphorus += 1,
            9 | 17 | 35 | 53 => self.halogen += 1,
            _ => self.other += 1,
        }
    }

    /// Does this neighbourhood cover every demand of `required`?
    pub fn covers(&self, required: &AtomCounters) -> bool {
        self.carbon >= required.carbon
            && self.nitrogen >= required.nitrogen
            && self.oxygen >= required.oxygen
            && self.sulfur >= required.sulfur
            && self.phosphorus >= required.phosphorus
            && self.halogen >= required.halogen
            && self.other >= required.other
            && self.hydrogen >= required.hydrogen
    }
}

/// Neighbourhood counters for every atom of a prepared target variant.
#[derive(Debug, Clone, Default)]
pub struct NeighbourhoodCounters {
    per_atom: Vec<AtomCounters>,
}

impl NeighbourhoodCounters {
    pub fn calculate(mol: &Mol<Atom, Bond>) -> Self {
        let mut per_atom = vec![AtomCounters::default(); mol.atom_count()];
        for idx in mol.atoms() {
            let counters = &mut per_atom[idx.index()];
            for n in mol.neighbors(idx) {
                counters.bump(mol.atom(n).atomic_num);
            }
            counters.hydrogen = counters
                .hydrogen
                .saturating_add(mol.atom(idx).hydrogen_count);
        }
        Self { per_atom }
    }

    pub fn get(&self, idx: NodeIndex) -> &AtomCounters {
        &self.per_atom[idx.index()]
    }
}

/// Lower bounds a query atom places on its host's neighbourhood: only
/// neighbours whose expression pins down a single element contribute.
pub fn pattern_lower_bounds(pattern: &Pattern) -> Vec<AtomCounters> {
    let mut bounds = vec![AtomCounters::default(); pattern.atom_count()];
    for idx in pattern.atoms() {
        let b = &mut bounds[idx.index()];
        for n in pattern.neighbors(idx) {
            if let Some(num) = pattern.atom(n).definite_element() {
                b.bump(num);
            }
        }
    }
    bounds
}
