use std::collections::HashSet;
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::debug;

use crate::aromaticity::{aromatize, AromaticityOptions};
use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::cancel::Deadline;
use crate::element::atomic_num_from_symbol;
use crate::error::{EngineError, Result};
use crate::mol::Mol;
use crate::query::{BondExpr, Pattern};
use crate::search::{embedding_key, EmbeddingSearch, SearchOptions, Uniqueness};

/// Tautomer search strategy. Basic is a self-contained single-shot match;
/// the other two drive the layered iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TautomerMethod {
    #[default]
    Basic,
    InchiLike,
    RsmartsLike,
}

/// One side of a tautomer rule: an optional aromaticity constraint plus the
/// element labels hydrogen may leave from or arrive at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TautomerCondition {
    pub aromaticity: Option<bool>,
    pub labels: Vec<u8>,
}

/// An admissible hydrogen migration, described by its two endpoint
/// conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TautomerRule {
    pub start: TautomerCondition,
    pub end: TautomerCondition,
}

impl TautomerCondition {
    /// Parse a condition string: an optional leading `0`/`1` aromaticity
    /// digit followed by a comma-separated element symbol list, e.g.
    /// `"1N,O"`.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(EngineError::InvalidModeSpec(
                "null or empty tautomer rule description is not allowed".into(),
            ));
        }
        let mut rest = text;
        let aromaticity = match text.as_bytes()[0] {
            b'1' => {
                rest = &text[1..];
                Some(true)
            }
            b'0' => {
                rest = &text[1..];
                Some(false)
            }
            b if b.is_ascii_digit() => {
                return Err(EngineError::InvalidModeSpec(
                    "bad tautomer rule format".into(),
                ))
            }
            _ => None,
        };

        let mut labels = Vec::new();
        for part in rest.split(',') {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(EngineError::InvalidModeSpec(
                    "bad label list format in the tautomer rule".into(),
                ));
            }
            let num = atomic_num_from_symbol(part).ok_or_else(|| {
                EngineError::InvalidModeSpec(format!("unknown element '{part}' in tautomer rule"))
            })?;
            labels.push(num);
        }
        Ok(Self { aromaticity, labels })
    }

    fn admits(&self, atom: &Atom) -> bool {
        self.labels.contains(&atom.atomic_num)
            && self.aromaticity.map_or(true, |a| atom.is_aromatic == a)
    }
}

/// Parsed tautomer matching directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TautomerParams {
    pub method: TautomerMethod,
    /// Bitmask of selected session rules; zero selects every rule.
    pub conditions: u32,
    pub force_hydrogens: bool,
    pub ring_chain: bool,
}

/// Parse a matcher mode string as a tautomer directive.
///
/// Returns `Ok(None)` when the string does not start with the word `TAU`
/// (it is then some other mode); malformed flags after `TAU` are an error.
pub fn parse_tautomer_spec(spec: &str) -> Result<Option<TautomerParams>> {
    let mut words = spec.split_whitespace();
    match words.next() {
        Some(w) if w.eq_ignore_ascii_case("TAU") => {}
        _ => return Ok(None),
    }

    let mut params = TautomerParams::default();
    for word in words {
        let upper = word.to_ascii_uppercase();
        match upper.as_str() {
            "INCHI" => params.method = TautomerMethod::InchiLike,
            "RSMARTS" => params.method = TautomerMethod::RsmartsLike,
            "H" => params.force_hydrogens = true,
            "R" | "C" | "R-C" => params.ring_chain = true,
            _ => {
                if let Some(num) = upper.strip_prefix('R').and_then(|s| s.parse::<u32>().ok()) {
                    if !(1..=32).contains(&num) {
                        return Err(EngineError::InvalidModeSpec(format!(
                            "tautomer rule index {num} is out of range"
                        )));
                    }
                    params.conditions |= 1 << (num - 1);
                } else {
                    return Err(EngineError::InvalidModeSpec(format!(
                        "unknown tautomer flag '{word}'"
                    )));
                }
            }
        }
    }
    Ok(Some(params))
}

/// Resolve a directive's rule selection against the session rule table.
pub fn select_rules(
    table: &[Option<TautomerRule>],
    conditions: u32,
) -> Result<Vec<TautomerRule>> {
    if conditions == 0 {
        return Ok(table.iter().flatten().cloned().collect());
    }
    let mut rules = Vec::new();
    for bit in 0..32 {
        if conditions & (1 << bit) == 0 {
            continue;
        }
        match table.get(bit as usize).and_then(|r| r.as_ref()) {
            Some(rule) => rules.push(rule.clone()),
            None => {
                return Err(EngineError::InvalidModeSpec(format!(
                    "tautomer rule {} is not set",
                    bit + 1
                )))
            }
        }
    }
    Ok(rules)
}

/// Bond-order relaxation used by the Basic single-shot tautomer match: a
/// mismatched bond is tolerated where hydrogen migration across it is
/// admissible.
#[derive(Debug, Clone)]
pub struct TautomerBondFilter {
    rules: Vec<TautomerRule>,
}

impl TautomerBondFilter {
    pub fn new(rules: Vec<TautomerRule>) -> Self {
        Self { rules }
    }

    pub fn allows(&self, target: &Mol<Atom, Bond>, edge: EdgeIndex, expr: BondExpr) -> bool {
        if expr == BondExpr::Triple {
            return false;
        }
        let order = target.bond(edge).order;
        if order == BondOrder::Triple {
            return false;
        }
        if order == BondOrder::Aromatic {
            // A dearomatized form can realize single or double here.
            return true;
        }
        let (a, b) = match target.bond_endpoints(edge) {
            Some(ends) => ends,
            None => return false,
        };
        if self.rules.is_empty() {
            return default_migration_site(target, a) || default_migration_site(target, b);
        }
        let atom_a = target.atom(a);
        let atom_b = target.atom(b);
        self.rules.iter().any(|rule| {
            (rule.start.admits(atom_a) && rule.end.admits(atom_b))
                || (rule.start.admits(atom_b) && rule.end.admits(atom_a))
        })
    }
}

/// Without rules, hydrogen mobility is assumed around heteroatoms: an atom
/// is a migration site when it is N/O/S or carries such a neighbour.
fn default_migration_site(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> bool {
    let hetero = |n: u8| matches!(n, 7 | 8 | 16);
    hetero(mol.atom(idx).atomic_num) || mol.neighbors(idx).any(|n| hetero(mol.atom(n).atomic_num))
}

fn size_bounded_layer_cap(mol: &Mol<Atom, Bond>) -> usize {
    let size = mol.atom_count() + mol.bond_count();
    if size > 80 {
        4
    } else if size > 40 {
        8
    } else {
        16
    }
}

/// Enumerate tautomeric forms ("layers") of `base` by breadth-first
/// 1,3-hydrogen shifts. Layer 0 is the aromatized base itself; every layer
/// preserves the base vertex numbering. Duplicate forms are folded by their
/// hydrogen-placement/bond-order signature.
pub fn enumerate_layers(
    base: &Mol<Atom, Bond>,
    method: TautomerMethod,
    rules: &[TautomerRule],
    options: AromaticityOptions,
) -> Vec<Arc<Mol<Atom, Bond>>> {
    let cap = size_bounded_layer_cap(base);
    let mut raw: Vec<Mol<Atom, Bond>> = vec![base.clone()];
    let mut seen: HashSet<(Vec<u8>, Vec<u8>)> = HashSet::new();
    seen.insert(layer_signature(base));

    let mut cursor = 0;
    while cursor < raw.len() && raw.len() < cap {
        let shifts = admissible_shifts(&raw[cursor], method, rules);
        for (donor, mid, acceptor) in shifts {
            let mut next = raw[cursor].clone();
            apply_shift(&mut next, donor, mid, acceptor);
            let sig = layer_signature(&next);
            if seen.insert(sig) {
                raw.push(next);
                if raw.len() >= cap {
                    break;
                }
            }
        }
        cursor += 1;
    }

    debug!(layers = raw.len(), "enumerated tautomer layers");
    raw.into_iter()
        .map(|mut m| {
            aromatize(&mut m, options);
            Arc::new(m)
        })
        .collect()
}

fn layer_signature(mol: &Mol<Atom, Bond>) -> (Vec<u8>, Vec<u8>) {
    let hydrogens = mol.atoms().map(|i| mol.atom(i).hydrogen_count).collect();
    let orders = mol
        .bonds()
        .map(|e| mol.bond(e).order.valence_contrib())
        .collect();
    (hydrogens, orders)
}

/// All 1,3-shifts `donor—mid=acceptor → donor=mid—acceptor` the method
/// admits on this form.
fn admissible_shifts(
    mol: &Mol<Atom, Bond>,
    method: TautomerMethod,
    rules: &[TautomerRule],
) -> Vec<(NodeIndex, NodeIndex, NodeIndex)> {
    let mut shifts = Vec::new();
    for donor in mol.atoms() {
        if mol.atom(donor).hydrogen_count == 0 {
            continue;
        }
        for mid in mol.neighbors(donor) {
            let d_edge = match mol.bond_between(donor, mid) {
                Some(e) => e,
                None => continue,
            };
            if mol.bond(d_edge).order != BondOrder::Single {
                continue;
            }
            for acceptor in mol.neighbors(mid) {
                if acceptor == donor {
                    continue;
                }
                let a_edge = match mol.bond_between(mid, acceptor) {
                    Some(e) => e,
                    None => continue,
                };
                if mol.bond(a_edge).order != BondOrder::Double {
                    continue;
                }
                if shift_admissible(mol, donor, acceptor, method, rules) {
                    shifts.push((donor, mid, acceptor));
                }
            }
        }
    }
    shifts
}

fn shift_admissible(
    mol: &Mol<Atom, Bond>,
    donor: NodeIndex,
    acceptor: NodeIndex,
    method: TautomerMethod,
    rules: &[TautomerRule],
) -> bool {
    let hetero = |idx: NodeIndex| matches!(mol.atom(idx).atomic_num, 7 | 8 | 16);
    match method {
        TautomerMethod::InchiLike => hetero(donor) || hetero(acceptor),
        TautomerMethod::RsmartsLike => {
            if rules.is_empty() {
                return hetero(donor) || hetero(acceptor);
            }
            let d = mol.atom(donor);
            let a = mol.atom(acceptor);
            rules.iter().any(|rule| {
                (rule.start.admits(d) && rule.end.admits(a))
                    || (rule.start.admits(a) && rule.end.admits(d))
            })
        }
        TautomerMethod::Basic => false,
    }
}

fn apply_shift(mol: &mut Mol<Atom, Bond>, donor: NodeIndex, mid: NodeIndex, acceptor: NodeIndex) {
    mol.atom_mut(donor).hydrogen_count -= 1;
    mol.atom_mut(acceptor).hydrogen_count += 1;
    if let Some(e) = mol.bond_between(donor, mid) {
        mol.bond_mut(e).order = BondOrder::Double;
    }
    if let Some(e) = mol.bond_between(mid, acceptor) {
        mol.bond_mut(e).order = BondOrder::Single;
    }
}

/// Lazy enumeration of tautomer embeddings with their layer masks.
///
/// Embeddings are discovered layer by layer; a new embedding's mask records
/// every layer in which the same vertex assignment is valid, so one
/// embedding can stand for several admissible hydrogen placements.
pub struct TautomerSearch {
    layers: Vec<Arc<Mol<Atom, Bond>>>,
    pattern: Arc<Pattern>,
    uniqueness: Uniqueness,
    deadline: Deadline,

    layer_idx: usize,
    current: Option<EmbeddingSearch>,
    embeddings: Vec<Vec<i32>>,
    masks: Vec<FixedBitSet>,
    seen_maps: HashSet<Vec<i32>>,
    seen_keys: HashSet<Vec<usize>>,
}

impl TautomerSearch {
    pub fn new(
        layers: Vec<Arc<Mol<Atom, Bond>>>,
        pattern: Arc<Pattern>,
        uniqueness: Uniqueness,
    ) -> Self {
        Self {
            layers,
            pattern,
            uniqueness,
            deadline: Deadline::none(),
            layer_idx: 0,
            current: None,
            embeddings: Vec::new(),
            masks: Vec::new(),
            seen_maps: HashSet::new(),
            seen_keys: HashSet::new(),
        }
    }

    pub fn set_deadline(&mut self, deadline: Deadline) {
        self.deadline = deadline;
        if let Some(search) = &mut self.current {
            search.set_deadline(deadline);
        }
    }

    pub fn count(&self) -> usize {
        self.embeddings.len()
    }

    pub fn embedding(&self, index: usize) -> &[i32] {
        &self.embeddings[index]
    }

    pub fn mask(&self, index: usize) -> &FixedBitSet {
        &self.masks[index]
    }

    pub fn layer(&self, index: usize) -> Arc<Mol<Atom, Bond>> {
        self.layers[index].clone()
    }

    pub fn find_next(&mut self) -> Result<bool> {
        loop {
            if self.layer_idx >= self.layers.len() {
                return Ok(false);
            }
            if self.current.is_none() {
                let mut search = EmbeddingSearch::new(
                    self.layers[self.layer_idx].clone(),
                    self.pattern.clone(),
                    SearchOptions {
                        uniqueness: Uniqueness::None,
                        save_embeddings: false,
                        ..SearchOptions::default()
                    },
                );
                search.set_deadline(self.deadline);
                self.current = Some(search);
            }

            let search = match self.current.as_mut() {
                Some(s) => s,
                None => return Ok(false),
            };
            if search.find_next()? {
                let embedding = match search.last_embedding() {
                    Some(e) => e.to_vec(),
                    None => continue,
                };
                if !self.seen_maps.insert(embedding.clone()) {
                    continue;
                }
                if let Some(key) =
                    embedding_key(&self.layers[0], &self.pattern, &embedding, self.uniqueness)
                {
                    if !self.seen_keys.insert(key) {
                        continue;
                    }
                }
                let mask = self.mask_for(&embedding);
                self.embeddings.push(embedding);
                self.masks.push(mask);
                return Ok(true);
            }
            self.layer_idx += 1;
            self.current = None;
        }
    }

    /// Every layer in which this vertex assignment is a valid embedding.
    fn mask_for(&self, embedding: &[i32]) -> FixedBitSet {
        let mut mask = FixedBitSet::with_capacity(self.layers.len());
        for (idx, layer) in self.layers.iter().enumerate() {
            if validate_embedding(layer, &self.pattern, embedding) {
                mask.insert(idx);
            }
        }
        mask
    }
}

fn validate_embedding(layer: &Mol<Atom, Bond>, pattern: &Pattern, embedding: &[i32]) -> bool {
    for idx in pattern.atoms() {
        let mapped = embedding[idx.index()];
        if mapped < 0 {
            return false;
        }
        if !pattern
            .atom(idx)
            .matches(layer, NodeIndex::new(mapped as usize))
        {
            return false;
        }
    }
    for edge in pattern.bonds() {
        let (a, b) = match pattern.bond_endpoints(edge) {
            Some(ends) => ends,
            None => continue,
        };
        let ta = embedding[a.index()];
        let tb = embedding[b.index()];
        if ta < 0 || tb < 0 {
            return false;
        }
        let t_edge = match layer.bond_between(
            NodeIndex::new(ta as usize),
            NodeIndex::new(tb as usize),
        ) {
            Some(e) => e,
            None => return false,
        };
        if !pattern.bond(edge).matches(layer.bond(t_edge).order) {
            return false;
        }
    }
    true
}
