use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;

/// Conjugated-system perception for resonance matching.
///
/// A bond belongs to a conjugated system when both endpoints can take part
/// in pi delocalization: atoms carrying a multiple or aromatic bond, charged
/// carbons, and heteroatoms with an available lone pair. Within such a
/// system, resonance matching treats single/double/aromatic orders as
/// interchangeable.
#[derive(Debug, Clone)]
pub struct ResonanceInfo {
    conjugated_bond: Vec<bool>,
}

impl ResonanceInfo {
    pub fn perceive(mol: &Mol<Atom, Bond>) -> Self {
        let candidate: Vec<bool> = mol
            .atoms()
            .map(|idx| is_pi_candidate(mol, idx))
            .collect();

        let mut conjugated_bond = vec![false; mol.bond_count()];
        for edge in mol.bonds() {
            if let Some((a, b)) = mol.bond_endpoints(edge) {
                if mol.bond(edge).order == BondOrder::Triple {
                    continue;
                }
                if candidate[a.index()] && candidate[b.index()] {
                    conjugated_bond[edge.index()] = true;
                }
            }
        }

        Self { conjugated_bond }
    }

    pub fn is_conjugated(&self, edge: EdgeIndex) -> bool {
        self.conjugated_bond
            .get(edge.index())
            .copied()
            .unwrap_or(false)
    }
}

fn is_pi_candidate(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    let atom = mol.atom(idx);
    if atom.is_aromatic {
        return true;
    }
    let has_multiple = mol.bonds_of(idx).any(|e| {
        matches!(
            mol.bond(e).order,
            BondOrder::Double | BondOrder::Triple | BondOrder::Aromatic
        )
    });
    if has_multiple {
        return true;
    }
    match atom.atomic_num {
        // Heteroatom lone pair donors.
        7 | 8 | 15 | 16 => atom.formal_charge <= 0,
        6 => atom.formal_charge != 0,
        _ => false,
    }
}
