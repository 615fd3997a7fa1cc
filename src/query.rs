use petgraph::graph::NodeIndex;

use crate::aromaticity::{aromatize, AromaticityOptions};
use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;

/// Atom test of a query pattern.
///
/// Each variant is a primitive predicate or a logical combination; during
/// substructure search, [`AtomExpr::matches`] evaluates the expression
/// against a target atom.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    /// Matches any atom.
    True,
    /// Matches by element. `aromatic` is `None` when either form is
    /// acceptable.
    Element {
        atomic_num: u8,
        aromatic: Option<bool>,
    },
    /// Matches any aromatic atom.
    Aromatic,
    /// Matches any non-aromatic atom.
    Aliphatic,
    /// Matches formal charge.
    Charge(i8),
    /// Matches a specific isotope number.
    Isotope(u16),
    /// Matches total hydrogen count (implicit plus explicit neighbours).
    TotalHCount(u8),
    /// Matches heavy-atom degree.
    Degree(u8),
    /// Logical AND of sub-expressions.
    And(Vec<AtomExpr>),
    /// Logical OR of sub-expressions.
    Or(Vec<AtomExpr>),
    /// Logical NOT of a sub-expression.
    Not(Box<AtomExpr>),
}

/// Bond test of a query pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondExpr {
    /// Matches any bond.
    True,
    Single,
    Double,
    Triple,
    Aromatic,
    /// The default for unannotated pattern bonds.
    SingleOrAromatic,
}

/// A query pattern is a molecular graph carrying expressions instead of
/// concrete atoms and bonds.
pub type Pattern = Mol<AtomExpr, BondExpr>;

impl AtomExpr {
    pub fn element(atomic_num: u8) -> Self {
        AtomExpr::Element {
            atomic_num,
            aromatic: None,
        }
    }

    /// Evaluate the expression against atom `idx` of `mol`.
    pub fn matches(&self, mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
        let atom = mol.atom(idx);
        match self {
            AtomExpr::True => true,
            AtomExpr::Element {
                atomic_num,
                aromatic,
            } => {
                atom.atomic_num == *atomic_num
                    && aromatic.map_or(true, |a| atom.is_aromatic == a)
            }
            AtomExpr::Aromatic => atom.is_aromatic,
            AtomExpr::Aliphatic => !atom.is_aromatic,
            AtomExpr::Charge(c) => atom.formal_charge == *c,
            AtomExpr::Isotope(i) => atom.isotope == *i,
            AtomExpr::TotalHCount(h) => total_hydrogens(mol, idx) == *h,
            AtomExpr::Degree(d) => heavy_degree(mol, idx) == *d,
            AtomExpr::And(children) => children.iter().all(|c| c.matches(mol, idx)),
            AtomExpr::Or(children) => children.iter().any(|c| c.matches(mol, idx)),
            AtomExpr::Not(child) => !child.matches(mol, idx),
        }
    }

    /// Could this expression match a hydrogen atom? Conservative: `true`
    /// unless hydrogen is provably excluded.
    pub fn can_match_hydrogen(&self) -> bool {
        match self {
            AtomExpr::Element { atomic_num, .. } => *atomic_num == 1,
            AtomExpr::Aromatic => false,
            AtomExpr::And(children) => children.iter().all(|c| c.can_match_hydrogen()),
            AtomExpr::Or(children) => children.iter().any(|c| c.can_match_hydrogen()),
            _ => true,
        }
    }

    /// Does this expression match hydrogen and nothing else?
    pub fn is_definitely_hydrogen(&self) -> bool {
        match self {
            AtomExpr::Element { atomic_num, .. } => *atomic_num == 1,
            AtomExpr::And(children) => children.iter().any(|c| c.is_definitely_hydrogen()),
            _ => false,
        }
    }

    /// The single element this expression pins down, if any.
    pub fn definite_element(&self) -> Option<u8> {
        match self {
            AtomExpr::Element { atomic_num, .. } => Some(*atomic_num),
            AtomExpr::And(children) => children.iter().find_map(|c| c.definite_element()),
            _ => None,
        }
    }
}

impl BondExpr {
    pub fn matches(&self, order: BondOrder) -> bool {
        match self {
            BondExpr::True => true,
            BondExpr::Single => order == BondOrder::Single,
            BondExpr::Double => order == BondOrder::Double,
            BondExpr::Triple => order == BondOrder::Triple,
            BondExpr::Aromatic => order == BondOrder::Aromatic,
            BondExpr::SingleOrAromatic => {
                order == BondOrder::Single || order == BondOrder::Aromatic
            }
        }
    }
}

pub fn total_hydrogens(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    let explicit = mol
        .neighbors(idx)
        .filter(|&n| mol.atom(n).is_hydrogen())
        .count() as u8;
    mol.atom(idx).hydrogen_count + explicit
}

pub fn heavy_degree(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    mol.neighbors(idx)
        .filter(|&n| !mol.atom(n).is_hydrogen())
        .count() as u8
}

/// Derive a query pattern from a plain molecule: the molecule is aromatized
/// and each atom becomes an element-and-aromaticity test (plus a charge test
/// when charged); each bond becomes its order's test. Implicit hydrogen
/// counts are not constrained — a methane query matches any carbon.
pub fn pattern_from_molecule(mol: &Mol<Atom, Bond>, options: AromaticityOptions) -> Pattern {
    let mut arom = mol.clone();
    aromatize(&mut arom, options);

    let mut pattern = Pattern::new();
    for idx in arom.atoms() {
        let atom = arom.atom(idx);
        let mut expr = AtomExpr::Element {
            atomic_num: atom.atomic_num,
            aromatic: Some(atom.is_aromatic),
        };
        if atom.formal_charge != 0 {
            expr = AtomExpr::And(vec![expr, AtomExpr::Charge(atom.formal_charge)]);
        }
        pattern.add_atom(expr);
    }
    for edge in arom.bonds() {
        if let Some((a, b)) = arom.bond_endpoints(edge) {
            let be = match arom.bond(edge).order {
                BondOrder::Single => BondExpr::Single,
                BondOrder::Double => BondExpr::Double,
                BondOrder::Triple => BondExpr::Triple,
                BondOrder::Aromatic => BondExpr::Aromatic,
            };
            pattern.add_bond(NodeIndex::new(a.index()), NodeIndex::new(b.index()), be);
        }
    }
    pattern
}

/// Decide whether matching `pattern` needs the target variant with unfolded
/// hydrogens.
///
/// A query atom that can be a lone hydrogen always forces unfolding. A
/// terminal hydrogen-capable atom on an ordinary single bond forces it when
/// the atom could also be something other than hydrogen, or when all
/// embeddings must be enumerated (`disable_folding_query_h`) — folding a
/// query hydrogen away would under-count symmetric placements.
pub fn requires_unfolded_hydrogens(pattern: &Pattern, disable_folding_query_h: bool) -> bool {
    for idx in pattern.atoms() {
        let expr = pattern.atom(idx);
        if !expr.can_match_hydrogen() {
            continue;
        }
        let degree = pattern.degree(idx);
        if degree > 1 {
            continue;
        }
        if degree == 0 {
            return true;
        }
        let edge = match pattern.bonds_of(idx).next() {
            Some(e) => e,
            None => continue,
        };
        match pattern.bond(edge) {
            BondExpr::Double | BondExpr::Triple => continue,
            _ => {}
        }
        if !expr.is_definitely_hydrogen() {
            return true;
        }
        if disable_folding_query_h {
            return true;
        }
    }
    false
}
