use std::sync::Arc;

use tracing::debug;

use crate::aromaticity::{aromatize, AromaticityOptions};
use crate::atom::Atom;
use crate::bond::Bond;
use crate::cancel::Deadline;
use crate::counters::NeighbourhoodCounters;
use crate::error::{EngineError, Result};
use crate::hydrogen::unfold_hydrogens;
use crate::match_iter::{MatchIter, TautomerMatchIter};
use crate::mol::Mol;
use crate::query::{requires_unfolded_hydrogens, Pattern};
use crate::registry::Handle;
use crate::resonance::ResonanceInfo;
use crate::search::{BondMatchKind, EmbeddingSearch, SearchOptions, Uniqueness};
use crate::tautomer::{
    enumerate_layers, parse_tautomer_spec, select_rules, TautomerBondFilter, TautomerMethod,
    TautomerParams, TautomerRule, TautomerSearch,
};

/// Matching mode, fixed at matcher construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Normal,
    Resonance,
    Tautomer(TautomerParams),
}

/// Parse a matcher mode string: empty selects Normal, `RES` Resonance, a
/// `TAU …` directive Tautomer.
pub fn parse_mode_spec(spec: &str) -> Result<MatchMode> {
    let trimmed = spec.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("SIM") {
        return Ok(MatchMode::Normal);
    }
    if let Some(params) = parse_tautomer_spec(trimmed)? {
        return Ok(MatchMode::Tautomer(params));
    }
    if trimmed.eq_ignore_ascii_case("RES") {
        return Ok(MatchMode::Resonance);
    }
    Err(EngineError::InvalidModeSpec(trimmed.to_string()))
}

/// A lazily built derived representation of the matcher's target: an
/// aromatized clone, optionally with hydrogens unfolded, plus the vertex
/// correspondences and the neighbourhood counters computed on it.
#[derive(Debug, Clone)]
pub struct PreparedTarget {
    pub mol: Arc<Mol<Atom, Bond>>,
    /// Original vertex → variant vertex.
    pub to_variant: Vec<usize>,
    /// Variant vertex → original vertex, `-1` for unfolded hydrogens.
    pub to_original: Vec<i32>,
    pub counters: Arc<NeighbourhoodCounters>,
    pub resonance: Option<Arc<ResonanceInfo>>,
}

/// Binds one fixed target molecule to a matching mode and caches everything
/// needed to query it repeatedly.
pub struct Matcher {
    target: Arc<Mol<Atom, Bond>>,
    target_handle: Handle,
    mode: MatchMode,
    arom_options: AromaticityOptions,
    ignored_atoms: Vec<usize>,
    prepared_plain: Option<PreparedTarget>,
    prepared_unfolded: Option<PreparedTarget>,
    build_count: u32,
}

impl Matcher {
    pub fn new(
        target: Arc<Mol<Atom, Bond>>,
        target_handle: Handle,
        mode: MatchMode,
        arom_options: AromaticityOptions,
    ) -> Self {
        Self {
            target,
            target_handle,
            mode,
            arom_options,
            ignored_atoms: Vec::new(),
            prepared_plain: None,
            prepared_unfolded: None,
            build_count: 0,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn target(&self) -> Arc<Mol<Atom, Bond>> {
        self.target.clone()
    }

    pub fn target_handle(&self) -> Handle {
        self.target_handle
    }

    /// How many variant builds this matcher has performed. Stays constant
    /// across repeated queries against an already prepared variant.
    pub fn build_count(&self) -> u32 {
        self.build_count
    }

    pub fn ignore_atom(&mut self, atom_index: usize) {
        self.ignored_atoms.push(atom_index);
    }

    pub fn unignore_atom(&mut self, atom_index: usize) -> Result<()> {
        match self.ignored_atoms.iter().position(|&a| a == atom_index) {
            Some(pos) => {
                self.ignored_atoms.remove(pos);
                Ok(())
            }
            None => Err(EngineError::NotIgnored { atom: atom_index }),
        }
    }

    pub fn unignore_all(&mut self) {
        self.ignored_atoms.clear();
    }

    /// Return the cache entry for the requested variant, building it on
    /// first use. A variant is built at most once per matcher.
    pub fn prepare_variant(&mut self, need_unfolded_hydrogens: bool) -> &PreparedTarget {
        let built = if need_unfolded_hydrogens {
            self.prepared_unfolded.is_some()
        } else {
            self.prepared_plain.is_some()
        };
        if !built {
            let (mut mol, to_variant, to_original) = if need_unfolded_hydrogens {
                let unfolded = unfold_hydrogens(&self.target);
                (unfolded.mol, unfolded.to_variant, unfolded.to_original)
            } else {
                let mol = (*self.target).clone();
                let n = mol.atom_count();
                (mol, (0..n).collect(), (0..n as i32).collect())
            };
            aromatize(&mut mol, self.arom_options);
            let counters = Arc::new(NeighbourhoodCounters::calculate(&mol));
            let resonance = matches!(self.mode, MatchMode::Resonance)
                .then(|| Arc::new(ResonanceInfo::perceive(&mol)));
            self.build_count += 1;
            debug!(
                unfolded = need_unfolded_hydrogens,
                atoms = mol.atom_count(),
                "prepared target variant"
            );
            let entry = PreparedTarget {
                mol: Arc::new(mol),
                to_variant,
                to_original,
                counters,
                resonance,
            };
            if need_unfolded_hydrogens {
                self.prepared_unfolded = Some(entry);
            } else {
                self.prepared_plain = Some(entry);
            }
        }
        if need_unfolded_hydrogens {
            self.prepared_unfolded.as_ref().expect("entry just built")
        } else {
            self.prepared_plain.as_ref().expect("entry just built")
        }
    }

    /// Build a match iterator for Normal or Resonance mode.
    ///
    /// An embedding cap of 1 marks a pure existence check: query hydrogens
    /// are then folded into hydrogen-count demands and the cheaper target
    /// variant may be used.
    pub fn make_iterator(
        &mut self,
        query: Arc<Pattern>,
        query_handle: Handle,
        uniqueness: Uniqueness,
        for_iteration: bool,
        max_embeddings: usize,
    ) -> Result<MatchIter> {
        let bond_relax = match self.mode {
            MatchMode::Normal => None,
            MatchMode::Resonance => Some(()),
            MatchMode::Tautomer(_) => {
                return Err(EngineError::UnsupportedModeOperation("direct iteration"))
            }
        };

        let disable_folding = max_embeddings != 1;
        let need_unfolded = requires_unfolded_hydrogens(&query, disable_folding);
        let prepared = self.prepare_variant(need_unfolded).clone();

        let mut ignored = vec![false; prepared.mol.atom_count()];
        for &atom in &self.ignored_atoms {
            if let Some(&variant) = prepared.to_variant.get(atom) {
                ignored[variant] = true;
            }
        }

        let bond_mode = match bond_relax {
            Some(()) => BondMatchKind::Resonance(
                prepared
                    .resonance
                    .clone()
                    .expect("resonance info built for resonance mode"),
            ),
            None => BondMatchKind::Exact,
        };

        let search = EmbeddingSearch::new(
            prepared.mol.clone(),
            query.clone(),
            SearchOptions {
                uniqueness,
                save_embeddings: for_iteration,
                fold_query_hydrogens: !disable_folding,
                bond_mode,
                counters: Some(prepared.counters.clone()),
                ignored,
            },
        );

        Ok(MatchIter::new(
            search,
            prepared.to_original,
            query,
            query_handle,
            self.target.clone(),
            self.target_handle,
            max_embeddings,
        ))
    }

    /// Build a tautomer match iterator (InChI-like or ReactionSmarts-like
    /// methods only).
    pub fn make_tautomer_iterator(
        &mut self,
        query: Arc<Pattern>,
        query_handle: Handle,
        uniqueness: Uniqueness,
        max_embeddings: usize,
        rule_table: &[Option<TautomerRule>],
    ) -> Result<TautomerMatchIter> {
        let params = match self.mode {
            MatchMode::Tautomer(params) => params,
            _ => return Err(EngineError::UnsupportedModeOperation("tautomer iteration")),
        };
        if params.method == TautomerMethod::Basic {
            return Err(EngineError::UnsupportedModeOperation("tautomer iteration"));
        }
        let rules = select_rules(rule_table, params.conditions)?;
        let arom_options = self.arom_options;
        let prepared = self.prepare_variant(false).clone();
        let layers = enumerate_layers(&prepared.mol, params.method, &rules, arom_options);
        let search = TautomerSearch::new(layers, query.clone(), uniqueness);

        Ok(TautomerMatchIter::new(
            search,
            query,
            query_handle,
            self.target_handle,
            max_embeddings,
        ))
    }

    /// Self-contained single-shot search for the Basic tautomer method.
    /// Returns the query→target map in original numbering, or `None` when
    /// the target has no tautomeric occurrence of the query.
    pub fn find_single_tautomer_match(
        &mut self,
        query: Arc<Pattern>,
        rule_table: &[Option<TautomerRule>],
        deadline: Deadline,
    ) -> Result<Option<Vec<i32>>> {
        let params = match self.mode {
            MatchMode::Tautomer(params) => params,
            _ => {
                return Err(EngineError::UnsupportedModeOperation(
                    "single tautomer match",
                ))
            }
        };
        let rules = select_rules(rule_table, params.conditions)?;
        let need_unfolded = requires_unfolded_hydrogens(&query, false);
        let prepared = self.prepare_variant(need_unfolded).clone();

        let mut search = EmbeddingSearch::new(
            prepared.mol.clone(),
            query.clone(),
            SearchOptions {
                uniqueness: Uniqueness::None,
                save_embeddings: false,
                fold_query_hydrogens: true,
                bond_mode: BondMatchKind::Tautomer(Arc::new(TautomerBondFilter::new(rules))),
                counters: None,
                ignored: Vec::new(),
            },
        );
        search.set_deadline(deadline);

        if !search.find_next()? {
            return Ok(None);
        }
        let embedding = match search.last_embedding() {
            Some(e) => e,
            None => return Ok(None),
        };
        let map = embedding
            .iter()
            .map(|&v| {
                if v < 0 {
                    -1
                } else {
                    prepared.to_original[v as usize]
                }
            })
            .collect();
        Ok(Some(map))
    }
}
