use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::aromaticity::AromaticityOptions;
use crate::atom::Atom;
use crate::bond::Bond;
use crate::cancel::Deadline;
use crate::error::{EngineError, Result};
use crate::mapping::Mapping;
use crate::matcher::{parse_mode_spec, MatchMode, Matcher};
use crate::mol::Mol;
use crate::query::{pattern_from_molecule, Pattern};
use crate::registry::{AtomRef, BondRef, EngineObject, Handle, Registry, SessionId};
use crate::search::Uniqueness;
use crate::smiles::from_smiles;
use crate::tautomer::{TautomerCondition, TautomerMethod, TautomerRule};

/// Highest admissible tautomer rule index (rules are 1-based).
pub const MAX_TAUTOMER_RULES: usize = 32;

/// Per-session engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Hard inclusive ceiling on enumerated embeddings per query.
    pub max_embeddings: usize,
    pub uniqueness: Uniqueness,
    pub aromaticity: AromaticityOptions,
    /// Cancellation timeout in milliseconds; zero disables the deadline.
    pub timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_embeddings: 10_000,
            uniqueness: Uniqueness::ByAtoms,
            aromaticity: AromaticityOptions::default(),
            timeout_ms: 0,
        }
    }
}

/// A named execution context: configuration, the tautomer rule table, and
/// exactly one object registry.
///
/// Sessions are plain values — there is no implicit "current session" and
/// no global state. Each session is single-threaded; distinct sessions
/// share nothing and may run on separate threads. Every failing engine call
/// records its message as the session's last error before propagating.
pub struct Session {
    id: SessionId,
    pub config: SessionConfig,
    tautomer_rules: Vec<Option<TautomerRule>>,
    registry: Registry,
    last_error: Option<String>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            config: SessionConfig::default(),
            tautomer_rules: Vec::new(),
            registry: Registry::new(id),
            last_error: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    /// Fresh deadline from the session timeout, re-armed for every
    /// top-level engine call.
    fn deadline(&self) -> Deadline {
        Deadline::from_millis(self.config.timeout_ms)
    }

    fn run<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.last_error = None;
        let result = f(self);
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        result
    }

    // ── object intake ───────────────────────────────────────────────

    pub fn add_molecule(&mut self, mol: Mol<Atom, Bond>) -> Handle {
        self.registry.add(EngineObject::Molecule(Arc::new(mol)))
    }

    pub fn add_pattern(&mut self, pattern: Pattern) -> Handle {
        self.registry.add(EngineObject::Pattern(Arc::new(pattern)))
    }

    pub fn molecule_from_smiles(&mut self, smiles: &str) -> Result<Handle> {
        self.run(|s| {
            let mol = from_smiles(smiles)?;
            Ok(s.add_molecule(mol))
        })
    }

    /// Load a query pattern from SMILES: the structure is aromatized and
    /// converted atom-for-atom into element/aromaticity tests.
    pub fn pattern_from_smiles(&mut self, smiles: &str) -> Result<Handle> {
        self.run(|s| {
            let mol = from_smiles(smiles)?;
            let pattern = pattern_from_molecule(&mol, s.config.aromaticity);
            Ok(s.add_pattern(pattern))
        })
    }

    /// Handle to one atom of a registered molecule or pattern.
    pub fn get_atom(&mut self, parent: Handle, index: usize) -> Result<Handle> {
        self.run(|s| {
            let count = match s.registry.get(parent)? {
                EngineObject::Molecule(mol) => mol.atom_count(),
                EngineObject::Pattern(pattern) => pattern.atom_count(),
                _ => return Err(s.wrong_kind(parent)),
            };
            if index >= count {
                return Err(s.wrong_kind(parent));
            }
            Ok(s.registry.add(EngineObject::AtomRef(AtomRef { parent, index })))
        })
    }

    /// Handle to one bond of a registered molecule or pattern.
    pub fn get_bond(&mut self, parent: Handle, index: usize) -> Result<Handle> {
        self.run(|s| {
            let count = match s.registry.get(parent)? {
                EngineObject::Molecule(mol) => mol.bond_count(),
                EngineObject::Pattern(pattern) => pattern.bond_count(),
                _ => return Err(s.wrong_kind(parent)),
            };
            if index >= count {
                return Err(s.wrong_kind(parent));
            }
            Ok(s.registry.add(EngineObject::BondRef(BondRef { parent, index })))
        })
    }

    pub fn remove_object(&mut self, handle: Handle) {
        self.registry.remove(handle);
    }

    fn wrong_kind(&self, handle: Handle) -> EngineError {
        EngineError::InvalidHandle {
            session: handle.session.0,
            id: handle.id,
        }
    }

    // ── configuration ───────────────────────────────────────────────

    /// Set a session option from its string form. Covered keys:
    /// `max-embeddings`, `embedding-uniqueness` (`atoms`/`bonds`/`none`)
    /// and `timeout` (milliseconds, 0 disables).
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        self.run(|s| match key {
            "max-embeddings" => {
                let parsed: usize = value
                    .parse()
                    .map_err(|_| EngineError::InvalidOption(format!("max-embeddings: {value}")))?;
                if parsed == 0 {
                    return Err(EngineError::InvalidOption(
                        "max-embeddings must be positive".into(),
                    ));
                }
                s.config.max_embeddings = parsed;
                Ok(())
            }
            "embedding-uniqueness" => {
                s.config.uniqueness = match value {
                    "atoms" => Uniqueness::ByAtoms,
                    "bonds" => Uniqueness::ByBonds,
                    "none" => Uniqueness::None,
                    _ => {
                        return Err(EngineError::InvalidOption(format!(
                            "embedding-uniqueness: {value}"
                        )))
                    }
                };
                Ok(())
            }
            "timeout" => {
                let parsed: u64 = value
                    .parse()
                    .map_err(|_| EngineError::InvalidOption(format!("timeout: {value}")))?;
                s.config.timeout_ms = parsed;
                Ok(())
            }
            _ => Err(EngineError::InvalidOption(format!("unknown option '{key}'"))),
        })
    }

    /// Install tautomer rule `n` (1-based, up to 32) from its two condition
    /// strings, e.g. `set_tautomer_rule(1, "N,O", "N,O")`.
    pub fn set_tautomer_rule(&mut self, n: usize, start: &str, end: &str) -> Result<()> {
        self.run(|s| {
            if n == 0 || n > MAX_TAUTOMER_RULES {
                return Err(EngineError::InvalidOption(format!(
                    "tautomer rule index {n} is out of range"
                )));
            }
            let rule = TautomerRule {
                start: TautomerCondition::parse(start)?,
                end: TautomerCondition::parse(end)?,
            };
            if s.tautomer_rules.len() < n {
                s.tautomer_rules.resize(n, None);
            }
            s.tautomer_rules[n - 1] = Some(rule);
            Ok(())
        })
    }

    pub fn remove_tautomer_rule(&mut self, n: usize) -> Result<()> {
        self.run(|s| {
            if n == 0 || n > s.tautomer_rules.len() {
                return Err(EngineError::InvalidOption(format!(
                    "tautomer rule index {n} is out of range"
                )));
            }
            s.tautomer_rules[n - 1] = None;
            Ok(())
        })
    }

    pub fn clear_tautomer_rules(&mut self) {
        self.tautomer_rules.clear();
    }

    // ── matcher construction and mutation ───────────────────────────

    /// Create a matcher for a registered target molecule. `mode_spec` is
    /// empty for Normal, `"RES"` for Resonance, or a `TAU …` directive.
    pub fn create_matcher(&mut self, target: Handle, mode_spec: &str) -> Result<Handle> {
        self.run(|s| {
            let mode = parse_mode_spec(mode_spec)?;
            let target_mol = match s.registry.get(target)? {
                EngineObject::Molecule(mol) => mol.clone(),
                _ => return Err(s.wrong_kind(target)),
            };
            let matcher = Matcher::new(target_mol, target, mode, s.config.aromaticity);
            debug!(session = s.id.0, ?mode_spec, "created matcher");
            Ok(s.registry.add(EngineObject::Matcher(matcher)))
        })
    }

    fn atom_ref(&self, handle: Handle) -> Result<AtomRef> {
        match self.registry.get(handle)? {
            EngineObject::AtomRef(atom) => Ok(*atom),
            _ => Err(self.wrong_kind(handle)),
        }
    }

    fn bond_ref(&self, handle: Handle) -> Result<BondRef> {
        match self.registry.get(handle)? {
            EngineObject::BondRef(bond) => Ok(*bond),
            _ => Err(self.wrong_kind(handle)),
        }
    }

    fn matcher_mut(&mut self, handle: Handle) -> Result<&mut Matcher> {
        let wrong = self.wrong_kind(handle);
        match self.registry.get_mut(handle)? {
            EngineObject::Matcher(matcher) => Ok(matcher),
            _ => Err(wrong),
        }
    }

    fn pattern_arc(&self, handle: Handle) -> Result<Arc<Pattern>> {
        match self.registry.get(handle)? {
            EngineObject::Pattern(pattern) => Ok(pattern.clone()),
            _ => Err(self.wrong_kind(handle)),
        }
    }

    /// Exclude a target atom from all subsequently created iterators.
    pub fn ignore_atom(&mut self, matcher: Handle, atom: Handle) -> Result<()> {
        self.run(|s| {
            let atom_ref = s.atom_ref(atom)?;
            let matcher = s.matcher_mut(matcher)?;
            if atom_ref.parent != matcher.target_handle() {
                return Err(EngineError::InvalidHandle {
                    session: atom_ref.parent.session.0,
                    id: atom_ref.parent.id,
                });
            }
            matcher.ignore_atom(atom_ref.index);
            Ok(())
        })
    }

    pub fn unignore_atom(&mut self, matcher: Handle, atom: Handle) -> Result<()> {
        self.run(|s| {
            let atom_ref = s.atom_ref(atom)?;
            let matcher = s.matcher_mut(matcher)?;
            if atom_ref.parent != matcher.target_handle() {
                return Err(EngineError::InvalidHandle {
                    session: atom_ref.parent.session.0,
                    id: atom_ref.parent.id,
                });
            }
            matcher.unignore_atom(atom_ref.index)
        })
    }

    pub fn unignore_all_atoms(&mut self, matcher: Handle) -> Result<()> {
        self.run(|s| {
            s.matcher_mut(matcher)?.unignore_all();
            Ok(())
        })
    }

    // ── queries ─────────────────────────────────────────────────────

    /// Single-embedding match. Returns a mapping handle, or `None` when the
    /// target does not contain the query — a normal negative result, not an
    /// error.
    pub fn match_once(&mut self, matcher: Handle, query: Handle) -> Result<Option<Handle>> {
        self.run(|s| {
            let deadline = s.deadline();
            let query_arc = s.pattern_arc(query)?;
            let rules = s.tautomer_rules.clone();
            let matcher_obj = s.matcher_mut(matcher)?;

            match matcher_obj.mode() {
                MatchMode::Tautomer(params) if params.method == TautomerMethod::Basic => {
                    let target = matcher_obj.target();
                    let target_handle = matcher_obj.target_handle();
                    let found =
                        matcher_obj.find_single_tautomer_match(query_arc.clone(), &rules, deadline)?;
                    match found {
                        Some(map) => {
                            let mapping =
                                Mapping::new(query_arc, query, target, target_handle, map);
                            Ok(Some(s.registry.add(EngineObject::Mapping(mapping))))
                        }
                        None => Ok(None),
                    }
                }
                MatchMode::Tautomer(_) => {
                    let mut iter = matcher_obj.make_tautomer_iterator(
                        query_arc.clone(),
                        query,
                        Uniqueness::None,
                        1,
                        &rules,
                    )?;
                    match iter.next(deadline)? {
                        Some((map, tautomer)) => {
                            let tautomer_handle =
                                s.registry.add(EngineObject::Molecule(tautomer.clone()));
                            let mapping =
                                Mapping::new(query_arc, query, tautomer, tautomer_handle, map);
                            Ok(Some(s.registry.add(EngineObject::Mapping(mapping))))
                        }
                        None => Ok(None),
                    }
                }
                MatchMode::Normal | MatchMode::Resonance => {
                    let mut iter = matcher_obj.make_iterator(
                        query_arc.clone(),
                        query,
                        Uniqueness::None,
                        false,
                        1,
                    )?;
                    let target = iter.target();
                    let target_handle = iter.target_handle();
                    match iter.next(deadline)? {
                        Some(map) => {
                            let mapping =
                                Mapping::new(query_arc, query, target, target_handle, map);
                            Ok(Some(s.registry.add(EngineObject::Mapping(mapping))))
                        }
                        None => Ok(None),
                    }
                }
            }
        })
    }

    /// Create a lazy match iterator. Fails for modes without iteration
    /// support (the Basic tautomer method).
    pub fn iterate_matches(&mut self, matcher: Handle, query: Handle) -> Result<Handle> {
        self.run(|s| {
            let query_arc = s.pattern_arc(query)?;
            let uniqueness = s.config.uniqueness;
            let cap = s.config.max_embeddings;
            let rules = s.tautomer_rules.clone();
            let matcher_obj = s.matcher_mut(matcher)?;

            match matcher_obj.mode() {
                MatchMode::Tautomer(params) if params.method != TautomerMethod::Basic => {
                    let iter = matcher_obj.make_tautomer_iterator(
                        query_arc, query, uniqueness, cap, &rules,
                    )?;
                    Ok(s.registry.add(EngineObject::TautomerMatchIter(iter)))
                }
                MatchMode::Tautomer(_) => {
                    Err(EngineError::UnsupportedModeOperation("iterate matches"))
                }
                MatchMode::Normal | MatchMode::Resonance => {
                    let iter =
                        matcher_obj.make_iterator(query_arc, query, uniqueness, true, cap)?;
                    Ok(s.registry.add(EngineObject::MatchIter(iter)))
                }
            }
        })
    }

    /// Count embeddings without materializing mappings. A `limit` of zero
    /// counts everything up to the session cap; crossing the cap with no
    /// limit is an error.
    pub fn count_matches(&mut self, matcher: Handle, query: Handle, limit: usize) -> Result<usize> {
        self.run(|s| {
            let deadline = s.deadline();
            if limit > s.config.max_embeddings {
                return Err(EngineError::InvalidOption(
                    "embeddings limit is more than maximum allowed embeddings".into(),
                ));
            }
            let query_arc = s.pattern_arc(query)?;
            let uniqueness = s.config.uniqueness;
            let cap = s.config.max_embeddings;
            let matcher_obj = s.matcher_mut(matcher)?;

            if matches!(matcher_obj.mode(), MatchMode::Tautomer(_)) {
                return Err(EngineError::UnsupportedModeOperation("count matches"));
            }
            let mut iter = matcher_obj.make_iterator(query_arc, query, uniqueness, false, cap)?;
            iter.count_matches(limit, deadline)
        })
    }

    pub fn iterator_has_next(&mut self, iterator: Handle) -> Result<bool> {
        self.run(|s| {
            let deadline = s.deadline();
            match s.registry.get_mut(iterator)? {
                EngineObject::MatchIter(iter) => iter.has_next(deadline),
                EngineObject::TautomerMatchIter(iter) => iter.has_next(deadline),
                _ => Err(EngineError::InvalidHandle {
                    session: iterator.session.0,
                    id: iterator.id,
                }),
            }
        })
    }

    /// Advance the iterator and register the produced mapping. `None` once
    /// the iterator is exhausted.
    pub fn iterator_next(&mut self, iterator: Handle) -> Result<Option<Handle>> {
        self.run(|s| {
            let deadline = s.deadline();
            match s.registry.get_mut(iterator)? {
                EngineObject::MatchIter(iter) => {
                    let query_arc = iter.query();
                    let query_handle = iter.query_handle();
                    let target = iter.target();
                    let target_handle = iter.target_handle();
                    match iter.next(deadline)? {
                        Some(map) => {
                            let mapping =
                                Mapping::new(query_arc, query_handle, target, target_handle, map);
                            Ok(Some(s.registry.add(EngineObject::Mapping(mapping))))
                        }
                        None => Ok(None),
                    }
                }
                EngineObject::TautomerMatchIter(iter) => {
                    let query_arc = iter.query();
                    let query_handle = iter.query_handle();
                    match iter.next(deadline)? {
                        Some((map, tautomer)) => {
                            let tautomer_handle =
                                s.registry.add(EngineObject::Molecule(tautomer.clone()));
                            let mapping = Mapping::new(
                                query_arc,
                                query_handle,
                                tautomer,
                                tautomer_handle,
                                map,
                            );
                            Ok(Some(s.registry.add(EngineObject::Mapping(mapping))))
                        }
                        None => Ok(None),
                    }
                }
                _ => Err(EngineError::InvalidHandle {
                    session: iterator.session.0,
                    id: iterator.id,
                }),
            }
        })
    }

    /// Resolve a query atom through a mapping to its target atom handle.
    /// `None` when the query vertex is unmapped.
    pub fn mapping_resolve_atom(
        &mut self,
        mapping: Handle,
        source_atom: Handle,
    ) -> Result<Option<Handle>> {
        self.run(|s| {
            let atom_ref = s.atom_ref(source_atom)?;
            let (resolved, target_handle) = match s.registry.get(mapping)? {
                EngineObject::Mapping(m) => {
                    if atom_ref.parent != m.query_handle {
                        return Err(s.wrong_kind(source_atom));
                    }
                    (m.resolve_atom(atom_ref.index), m.target_handle)
                }
                _ => return Err(s.wrong_kind(mapping)),
            };
            match resolved {
                Some(index) => Ok(Some(s.registry.add(EngineObject::AtomRef(AtomRef {
                    parent: target_handle,
                    index,
                })))),
                None => Ok(None),
            }
        })
    }

    /// Resolve a query bond through a mapping; both endpoints must map onto
    /// a real target edge.
    pub fn mapping_resolve_bond(
        &mut self,
        mapping: Handle,
        source_bond: Handle,
    ) -> Result<Option<Handle>> {
        self.run(|s| {
            let bond_ref = s.bond_ref(source_bond)?;
            let (resolved, target_handle) = match s.registry.get(mapping)? {
                EngineObject::Mapping(m) => {
                    if bond_ref.parent != m.query_handle {
                        return Err(s.wrong_kind(source_bond));
                    }
                    (m.resolve_bond(bond_ref.index), m.target_handle)
                }
                _ => return Err(s.wrong_kind(mapping)),
            };
            match resolved {
                Some(index) => Ok(Some(s.registry.add(EngineObject::BondRef(BondRef {
                    parent: target_handle,
                    index,
                })))),
                None => Ok(None),
            }
        })
    }

    /// Direct registry access for embedding into larger object models.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

/// Owner of all live sessions, addressed by id.
///
/// The pool itself is not synchronized; to run sessions on separate threads
/// move each `Session` value to its thread. Nothing is shared between
/// sessions.
#[derive(Default)]
pub struct SessionPool {
    sessions: HashMap<u32, Session>,
    next_id: u32,
}

impl SessionPool {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn open_session(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id.0, Session::new(id));
        debug!(session = id.0, "opened session");
        id
    }

    /// Destroy a session; every handle issued under it becomes invalid.
    pub fn close_session(&mut self, id: SessionId) {
        if let Some(mut session) = self.sessions.remove(&id.0) {
            session.registry_mut().clear();
            debug!(session = id.0, "closed session");
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id.0)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id.0)
    }
}
