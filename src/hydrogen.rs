use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;

/// Result of unfolding implicit hydrogens into explicit vertices.
///
/// The variant molecule keeps the original vertices in their original order;
/// every unfolded hydrogen is appended after them. `to_original[v]` is the
/// original index of variant vertex `v`, or `-1` for an appended hydrogen.
/// `to_variant[u]` is the variant index of original vertex `u` (identity by
/// construction, kept explicit because the matcher translates ignore-set
/// atom ids through it).
#[derive(Debug, Clone)]
pub struct UnfoldedMol {
    pub mol: Mol<Atom, Bond>,
    pub to_original: Vec<i32>,
    pub to_variant: Vec<usize>,
}

/// Turn every implicit hydrogen of `mol` into an explicit hydrogen vertex
/// bonded by a single bond, zeroing the implicit counts.
pub fn unfold_hydrogens(mol: &Mol<Atom, Bond>) -> UnfoldedMol {
    let mut result = Mol::new();
    let mut to_variant = Vec::with_capacity(mol.atom_count());
    let mut to_original = Vec::with_capacity(mol.atom_count());

    for idx in mol.atoms() {
        let atom = mol.atom(idx);
        let new_idx = result.add_atom(Atom {
            hydrogen_count: 0,
            ..*atom
        });
        to_variant.push(new_idx.index());
        to_original.push(idx.index() as i32);
    }

    for edge in mol.bonds() {
        if let Some((a, b)) = mol.bond_endpoints(edge) {
            result.add_bond(
                NodeIndex::new(to_variant[a.index()]),
                NodeIndex::new(to_variant[b.index()]),
                *mol.bond(edge),
            );
        }
    }

    for idx in mol.atoms() {
        let parent = NodeIndex::new(to_variant[idx.index()]);
        for _ in 0..mol.atom(idx).hydrogen_count {
            let h = result.add_atom(Atom::of(1));
            result.add_bond(parent, h, Bond::of(BondOrder::Single));
            to_original.push(-1);
        }
    }

    UnfoldedMol {
        mol: result,
        to_original,
        to_variant,
    }
}
