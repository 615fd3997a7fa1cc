use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::rings::RingInfo;

/// Aromatic perception model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AromaticityModel {
    /// Ring-based Hückel counting over sp2-capable atoms.
    #[default]
    Huckel,
}

/// Options steering aromatic perception; carried by the session and applied
/// whenever a matcher prepares a target variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AromaticityOptions {
    pub model: AromaticityModel,
}

const SP2_CAPABLE: [u8; 9] = [
    5,  // B
    6,  // C
    7,  // N
    8,  // O
    15, // P
    16, // S
    33, // As
    34, // Se
    52, // Te
];

/// Perceive aromatic rings and normalize the molecule in place: atoms of
/// aromatic rings get their aromatic flag set and every bond of an aromatic
/// ring is rewritten to [`BondOrder::Aromatic`].
pub fn aromatize(mol: &mut Mol<Atom, Bond>, options: AromaticityOptions) {
    let AromaticityModel::Huckel = options.model;

    let ring_info = RingInfo::perceive(mol);
    let mut aromatic_atoms = vec![false; mol.atom_count()];
    let mut aromatic_rings = 0usize;

    for ring in ring_info.rings() {
        if is_aromatic_ring(mol, ring) {
            aromatic_rings += 1;
            for &idx in ring {
                aromatic_atoms[idx.index()] = true;
            }
        }
    }

    for idx in mol.atoms().collect::<Vec<_>>() {
        if aromatic_atoms[idx.index()] {
            mol.atom_mut(idx).is_aromatic = true;
        }
    }

    for ring in ring_info.rings() {
        if !ring.iter().all(|v| aromatic_atoms[v.index()]) {
            continue;
        }
        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            if let Some(edge) = mol.bond_between(a, b) {
                mol.bond_mut(edge).order = BondOrder::Aromatic;
            }
        }
    }

    debug!(
        rings = ring_info.num_rings(),
        aromatic = aromatic_rings,
        "aromatized molecule"
    );
}

fn is_aromatic_ring(mol: &Mol<Atom, Bond>, ring: &[NodeIndex]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    // Rings already carrying aromatic flags (e.g. from lowercase SMILES)
    // stay aromatic without re-deriving pi counts.
    if ring.iter().all(|&v| mol.atom(v).is_aromatic) {
        return true;
    }

    for &idx in ring {
        if !SP2_CAPABLE.contains(&mol.atom(idx).atomic_num) {
            return false;
        }
    }

    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        match mol.bond_between(a, b) {
            Some(edge) if mol.bond(edge).order == BondOrder::Triple => return false,
            Some(_) => {}
            None => return false,
        }
    }

    let mut pi_total: u8 = 0;
    for &idx in ring {
        match pi_electrons(mol, idx, ring) {
            Some(e) => pi_total = pi_total.saturating_add(e),
            None => return false,
        }
    }

    is_huckel(pi_total)
}

fn is_huckel(pi_total: u8) -> bool {
    pi_total >= 2 && (pi_total - 2) % 4 == 0
}

/// Pi-electron contribution of one ring atom, or `None` when the atom
/// cannot participate in an aromatic system.
fn pi_electrons(mol: &Mol<Atom, Bond>, idx: NodeIndex, ring: &[NodeIndex]) -> Option<u8> {
    let atom = mol.atom(idx);
    let charge = atom.formal_charge;

    let has_double = mol
        .bonds_of(idx)
        .any(|e| mol.bond(e).order == BondOrder::Double);
    let has_double_in_ring = mol.bonds_of(idx).any(|e| {
        if mol.bond(e).order != BondOrder::Double {
            return false;
        }
        match mol.bond_endpoints(e) {
            Some((a, b)) => {
                let other = if a == idx { b } else { a };
                ring.contains(&other)
            }
            None => false,
        }
    });
    let total_degree = mol.degree(idx) as u8 + atom.hydrogen_count;

    match atom.atomic_num {
        6 => match charge {
            0 => has_double.then_some(1),
            -1 => Some(2),
            1 => Some(if has_double { 1 } else { 0 }),
            _ => None,
        },
        7 | 15 => match charge {
            0 => {
                if has_double {
                    Some(1)
                } else if total_degree <= 3 {
                    Some(2)
                } else {
                    None
                }
            }
            1 => has_double_in_ring.then_some(1),
            _ => None,
        },
        8 | 16 | 34 | 52 => {
            if has_double_in_ring {
                Some(1)
            } else {
                Some(2)
            }
        }
        5 => Some(if has_double { 1 } else { 0 }),
        33 => has_double.then_some(1),
        _ => None,
    }
}
