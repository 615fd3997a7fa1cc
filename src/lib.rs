//! Chemical structure representation and structural queries: does pattern Q
//! occur in target T, how many times, and under which vertex mapping.
//!
//! The crate centers on a session-scoped query engine. A [`Session`] owns a
//! handle [`registry`](crate::registry::Registry) of molecules, query
//! patterns, matchers, match iterators and mappings; a [`Matcher`] binds one
//! target molecule to a matching mode (normal, resonance-aware, or one of
//! three tautomer strategies) and caches the derived target representations
//! (aromatized, with or without unfolded hydrogens) that repeated queries
//! share. Match iterators enumerate embeddings lazily, deduplicate them
//! under the session's uniqueness policy, and enforce the session's
//! embedding-count ceiling as a hard error rather than a silent truncation.
//!
//! ```
//! use molquery::SessionPool;
//!
//! let mut pool = SessionPool::new();
//! let id = pool.open_session();
//! let session = pool.session_mut(id).unwrap();
//!
//! let target = session.molecule_from_smiles("c1ccccc1").unwrap();
//! let query = session.pattern_from_smiles("c").unwrap();
//! let matcher = session.create_matcher(target, "").unwrap();
//! assert_eq!(session.count_matches(matcher, query, 0).unwrap(), 6);
//! ```

pub mod aromaticity;
pub mod atom;
pub mod bond;
pub mod cancel;
pub mod counters;
pub mod element;
pub mod error;
pub mod hydrogen;
pub mod mapping;
pub mod match_iter;
pub mod matcher;
pub mod mol;
pub mod query;
pub mod registry;
pub mod resonance;
pub mod rings;
pub mod search;
pub mod session;
pub mod smiles;
pub mod tautomer;

pub use aromaticity::{aromatize, AromaticityModel, AromaticityOptions};
pub use atom::Atom;
pub use bond::{Bond, BondOrder};
pub use cancel::Deadline;
pub use error::{EngineError, Result};
pub use mapping::Mapping;
pub use match_iter::{MatchIter, TautomerMatchIter};
pub use matcher::{parse_mode_spec, MatchMode, Matcher, PreparedTarget};
pub use mol::Mol;
pub use query::{pattern_from_molecule, AtomExpr, BondExpr, Pattern};
pub use registry::{EngineObject, Handle, Registry, SessionId};
pub use search::Uniqueness;
pub use session::{Session, SessionConfig, SessionPool};
pub use smiles::{from_smiles, SmilesError};
pub use tautomer::{TautomerMethod, TautomerParams, TautomerRule};

#[cfg(test)]
mod tests;
