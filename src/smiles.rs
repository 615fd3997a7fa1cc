use std::collections::HashMap;
use std::fmt;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element::{atomic_num_from_symbol, implicit_hydrogens};
use crate::mol::Mol;

/// Errors produced when parsing a SMILES string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    /// The input string was empty or contained only whitespace.
    EmptyInput,
    /// An unexpected character was encountered at the given position.
    UnexpectedChar { pos: usize, ch: char },
    /// An unrecognized element symbol was found.
    InvalidElement { pos: usize, text: String },
    /// A bracket atom `[` was opened but never closed with `]`.
    UnclosedBracket { pos: usize },
    /// A ring-opening digit was never matched by a ring-closing digit.
    UnclosedRing { digit: u16 },
    /// A parenthesis was opened without a matching close, or vice versa.
    UnmatchedParen { pos: usize },
    /// A bond symbol had no preceding atom to attach to.
    DanglingBond { pos: usize },
    /// Two ring-closure bonds on the same digit specify conflicting orders.
    RingBondConflict { digit: u16 },
}

impl fmt::Display for SmilesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "empty SMILES string"),
            Self::UnexpectedChar { pos, ch } => {
                write!(f, "unexpected character '{ch}' at position {pos}")
            }
            Self::InvalidElement { pos, text } => {
                write!(f, "invalid element '{text}' at position {pos}")
            }
            Self::UnclosedBracket { pos } => {
                write!(f, "unclosed bracket atom starting at position {pos}")
            }
            Self::UnclosedRing { digit } => write!(f, "unclosed ring {digit}"),
            Self::UnmatchedParen { pos } => {
                write!(f, "unmatched parenthesis at position {pos}")
            }
            Self::DanglingBond { pos } => {
                write!(f, "bond with no preceding atom at position {pos}")
            }
            Self::RingBondConflict { digit } => {
                write!(f, "conflicting bond orders on ring closure {digit}")
            }
        }
    }
}

impl std::error::Error for SmilesError {}

/// Parse a SMILES string into a molecule.
///
/// Supported subset: organic-subset atoms and their aromatic lowercase
/// forms, bracket atoms with isotope/charge/hydrogen count, explicit bond
/// symbols, branches, ring closures (including `%nn`), and dot-separated
/// fragments. Stereo markers are accepted and ignored. Implicit hydrogens
/// are assigned from the element's default valences; aromatic atoms donate
/// one bond-order unit to the delocalized system.
pub fn from_smiles(input: &str) -> Result<Mol<Atom, Bond>, SmilesError> {
    Parser::new(input).run()
}

struct PendingRing {
    node: NodeIndex,
    order: Option<BondOrder>,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    mol: Mol<Atom, Bond>,
    // Atoms parsed without brackets get implicit hydrogens assigned at the end.
    organic: Vec<NodeIndex>,
    prev: Option<NodeIndex>,
    pending_order: Option<BondOrder>,
    branch_stack: Vec<(Option<NodeIndex>, usize)>,
    rings: HashMap<u16, PendingRing>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.trim().chars().collect(),
            pos: 0,
            mol: Mol::new(),
            organic: Vec::new(),
            prev: None,
            pending_order: None,
            branch_stack: Vec::new(),
            rings: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<Mol<Atom, Bond>, SmilesError> {
        if self.chars.is_empty() {
            return Err(SmilesError::EmptyInput);
        }
        while self.pos < self.chars.len() {
            self.step()?;
        }
        if let Some(&(_, pos)) = self.branch_stack.first() {
            return Err(SmilesError::UnmatchedParen { pos });
        }
        if let Some((&digit, _)) = self.rings.iter().next() {
            return Err(SmilesError::UnclosedRing { digit });
        }
        self.assign_implicit_hydrogens();
        Ok(self.mol)
    }

    fn step(&mut self) -> Result<(), SmilesError> {
        let pos = self.pos;
        let ch = self.chars[pos];
        match ch {
            '-' | '/' | '\\' => {
                self.require_prev(pos)?;
                self.pending_order = Some(BondOrder::Single);
                self.pos += 1;
            }
            '=' => {
                self.require_prev(pos)?;
                self.pending_order = Some(BondOrder::Double);
                self.pos += 1;
            }
            '#' => {
                self.require_prev(pos)?;
                self.pending_order = Some(BondOrder::Triple);
                self.pos += 1;
            }
            ':' => {
                self.require_prev(pos)?;
                self.pending_order = Some(BondOrder::Aromatic);
                self.pos += 1;
            }
            '(' => {
                self.branch_stack.push((self.prev, pos));
                self.pos += 1;
            }
            ')' => {
                let (restored, _) = self
                    .branch_stack
                    .pop()
                    .ok_or(SmilesError::UnmatchedParen { pos })?;
                self.prev = restored;
                self.pos += 1;
            }
            '.' => {
                self.prev = None;
                self.pending_order = None;
                self.pos += 1;
            }
            '%' => {
                let d1 = self.digit_at(pos + 1)?;
                let d2 = self.digit_at(pos + 2)?;
                self.pos += 3;
                self.ring_closure(d1 * 10 + d2)?;
            }
            '0'..='9' => {
                self.pos += 1;
                self.ring_closure(ch as u16 - '0' as u16)?;
            }
            '[' => self.bracket_atom(pos)?,
            _ => self.organic_atom(pos)?,
        }
        Ok(())
    }

    fn require_prev(&self, pos: usize) -> Result<(), SmilesError> {
        if self.prev.is_none() {
            return Err(SmilesError::DanglingBond { pos });
        }
        Ok(())
    }

    fn digit_at(&self, pos: usize) -> Result<u16, SmilesError> {
        match self.chars.get(pos) {
            Some(&c) if c.is_ascii_digit() => Ok(c as u16 - '0' as u16),
            Some(&c) => Err(SmilesError::UnexpectedChar { pos, ch: c }),
            None => Err(SmilesError::UnexpectedChar { pos, ch: '%' }),
        }
    }

    fn organic_atom(&mut self, pos: usize) -> Result<(), SmilesError> {
        let ch = self.chars[pos];
        let (symbol, aromatic, len): (String, bool, usize) = match ch {
            'C' if self.chars.get(pos + 1) == Some(&'l') => ("Cl".to_string(), false, 2),
            'B' if self.chars.get(pos + 1) == Some(&'r') => ("Br".to_string(), false, 2),
            'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' => (ch.to_string(), false, 1),
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                (ch.to_ascii_uppercase().to_string(), true, 1)
            }
            _ => return Err(SmilesError::UnexpectedChar { pos, ch }),
        };
        let atomic_num = atomic_num_from_symbol(&symbol).ok_or_else(|| {
            SmilesError::InvalidElement {
                pos,
                text: symbol.clone(),
            }
        })?;
        self.pos += len;
        let atom = Atom {
            atomic_num,
            is_aromatic: aromatic,
            ..Atom::default()
        };
        let idx = self.attach(atom);
        self.organic.push(idx);
        Ok(())
    }

    fn bracket_atom(&mut self, open_pos: usize) -> Result<(), SmilesError> {
        let close = self.chars[open_pos..]
            .iter()
            .position(|&c| c == ']')
            .map(|i| open_pos + i)
            .ok_or(SmilesError::UnclosedBracket { pos: open_pos })?;

        let mut i = open_pos + 1;
        let mut isotope: u16 = 0;
        while i < close && self.chars[i].is_ascii_digit() {
            isotope = isotope * 10 + (self.chars[i] as u16 - '0' as u16);
            i += 1;
        }

        if i >= close || !self.chars[i].is_ascii_alphabetic() {
            return Err(SmilesError::UnexpectedChar {
                pos: i,
                ch: *self.chars.get(i).unwrap_or(&']'),
            });
        }
        let first = self.chars[i];
        let aromatic = first.is_ascii_lowercase();
        let mut symbol = first.to_ascii_uppercase().to_string();
        i += 1;
        if i < close && self.chars[i].is_ascii_lowercase() {
            let two: String = format!("{}{}", symbol, self.chars[i]);
            if atomic_num_from_symbol(&two).is_some() {
                symbol = two;
                i += 1;
            }
        }
        let atomic_num =
            atomic_num_from_symbol(&symbol).ok_or_else(|| SmilesError::InvalidElement {
                pos: open_pos + 1,
                text: symbol.clone(),
            })?;

        let mut hydrogen_count: u8 = 0;
        let mut charge: i8 = 0;
        while i < close {
            match self.chars[i] {
                '@' => i += 1, // stereo marker, ignored
                'H' => {
                    i += 1;
                    if i < close && self.chars[i].is_ascii_digit() {
                        hydrogen_count = self.chars[i] as u8 - b'0';
                        i += 1;
                    } else {
                        hydrogen_count = 1;
                    }
                }
                '+' | '-' => {
                    let sign: i8 = if self.chars[i] == '+' { 1 } else { -1 };
                    i += 1;
                    if i < close && self.chars[i].is_ascii_digit() {
                        charge = sign * (self.chars[i] as i8 - b'0' as i8);
                        i += 1;
                    } else {
                        charge = sign;
                        while i < close && self.chars[i] == self.chars[i - 1] {
                            charge += sign;
                            i += 1;
                        }
                    }
                }
                ch => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
            }
        }

        self.pos = close + 1;
        let atom = Atom {
            atomic_num,
            formal_charge: charge,
            isotope,
            hydrogen_count,
            is_aromatic: aromatic,
        };
        self.attach(atom);
        Ok(())
    }

    fn attach(&mut self, atom: Atom) -> NodeIndex {
        let aromatic = atom.is_aromatic;
        let idx = self.mol.add_atom(atom);
        if let Some(prev) = self.prev {
            let order = self.pending_order.take().unwrap_or_else(|| {
                if aromatic && self.mol.atom(prev).is_aromatic {
                    BondOrder::Aromatic
                } else {
                    BondOrder::Single
                }
            });
            self.mol.add_bond(prev, idx, Bond::of(order));
        }
        self.pending_order = None;
        self.prev = Some(idx);
        idx
    }

    fn ring_closure(&mut self, digit: u16) -> Result<(), SmilesError> {
        let node = match self.prev {
            Some(n) => n,
            None => return Err(SmilesError::DanglingBond { pos: self.pos - 1 }),
        };
        let order_here = self.pending_order.take();
        match self.rings.remove(&digit) {
            Some(pending) => {
                let order = match (pending.order, order_here) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(SmilesError::RingBondConflict { digit })
                    }
                    (Some(a), _) => a,
                    (None, Some(b)) => b,
                    (None, None) => {
                        if self.mol.atom(node).is_aromatic
                            && self.mol.atom(pending.node).is_aromatic
                        {
                            BondOrder::Aromatic
                        } else {
                            BondOrder::Single
                        }
                    }
                };
                self.mol.add_bond(pending.node, node, Bond::of(order));
            }
            None => {
                self.rings.insert(
                    digit,
                    PendingRing {
                        node,
                        order: order_here,
                    },
                );
            }
        }
        Ok(())
    }

    fn assign_implicit_hydrogens(&mut self) {
        for &idx in &self.organic {
            let bond_sum: u8 = self
                .mol
                .bonds_of(idx)
                .map(|e| self.mol.bond(e).order.valence_contrib())
                .sum();
            let atom = *self.mol.atom(idx);
            // An aromatic atom donates one delocalized bond-order unit, but
            // only while its sigma bonds leave room for it (a 3-connected
            // aromatic nitrogen contributes its lone pair instead).
            let lowest = crate::element::default_valences(atom.atomic_num)
                .first()
                .copied()
                .unwrap_or(0);
            let effective = bond_sum + u8::from(atom.is_aromatic && bond_sum < lowest);
            self.mol.atom_mut(idx).hydrogen_count =
                implicit_hydrogens(atom.atomic_num, effective, atom.formal_charge);
        }
    }
}
