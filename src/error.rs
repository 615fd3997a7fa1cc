use thiserror::Error;

use crate::smiles::SmilesError;

/// Engine-level failure conditions.
///
/// Every internal failure surfaces as one of these named conditions; nothing
/// is downgraded to a generic error. "No match found" is deliberately *not*
/// here — negative query results are `Ok(None)` at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The handle does not name a live object in this session.
    #[error("invalid handle {id} for session {session}")]
    InvalidHandle { session: u32, id: u32 },

    /// Enumeration found more embeddings than the session allows.
    #[error("number of embeddings exceeded maximum allowed limit ({limit}); adjust options to raise this limit")]
    EmbeddingLimitExceeded { limit: usize },

    /// The session's cancellation deadline expired mid-search.
    #[error("operation cancelled by timeout")]
    Cancelled,

    /// The operation is not available for the matcher's mode.
    #[error("{0} is not supported in this mode")]
    UnsupportedModeOperation(&'static str),

    /// Unignoring an atom that is not currently ignored.
    #[error("atom with index {atom} wasn't ignored")]
    NotIgnored { atom: usize },

    /// The matcher mode or tautomer directive string could not be parsed.
    #[error("unsupported mode: {0}")]
    InvalidModeSpec(String),

    /// A configuration option key or value was rejected.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// A structure string failed to parse.
    #[error("{0}")]
    Smiles(#[from] SmilesError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
