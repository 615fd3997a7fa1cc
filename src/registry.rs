use std::collections::HashMap;
use std::sync::Arc;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::error::{EngineError, Result};
use crate::mapping::Mapping;
use crate::match_iter::{MatchIter, TautomerMatchIter};
use crate::matcher::Matcher;
use crate::mol::Mol;
use crate::query::Pattern;

/// Opaque session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

/// A small-integer reference to an object owned by one session's registry.
///
/// Handles carry their session, so a handle from one session is invalid in
/// every other. Ids are monotonically assigned and never reused while the
/// object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub session: SessionId,
    pub id: u32,
}

/// Reference to one atom of a registered molecule or pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomRef {
    pub parent: Handle,
    pub index: usize,
}

/// Reference to one bond of a registered molecule or pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondRef {
    pub parent: Handle,
    pub index: usize,
}

/// The closed union of object kinds a registry can own.
///
/// Matched exhaustively everywhere; adding a kind is a compile-time-checked
/// change rather than a new runtime type tag.
pub enum EngineObject {
    Molecule(Arc<Mol<Atom, Bond>>),
    Pattern(Arc<Pattern>),
    Matcher(Matcher),
    MatchIter(MatchIter),
    TautomerMatchIter(TautomerMatchIter),
    Mapping(Mapping),
    AtomRef(AtomRef),
    BondRef(BondRef),
}

impl EngineObject {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineObject::Molecule(_) => "molecule",
            EngineObject::Pattern(_) => "pattern",
            EngineObject::Matcher(_) => "matcher",
            EngineObject::MatchIter(_) => "match iterator",
            EngineObject::TautomerMatchIter(_) => "tautomer match iterator",
            EngineObject::Mapping(_) => "mapping",
            EngineObject::AtomRef(_) => "atom",
            EngineObject::BondRef(_) => "bond",
        }
    }
}

/// Exclusive owner of all live engine objects within one session, looked up
/// by handle.
pub struct Registry {
    session: SessionId,
    objects: HashMap<u32, EngineObject>,
    next_id: u32,
}

impl Registry {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            objects: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Store an object and hand out its new, never-before-used handle.
    pub fn add(&mut self, object: EngineObject) -> Handle {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, object);
        Handle {
            session: self.session,
            id,
        }
    }

    fn invalid(&self, handle: Handle) -> EngineError {
        EngineError::InvalidHandle {
            session: handle.session.0,
            id: handle.id,
        }
    }

    pub fn get(&self, handle: Handle) -> Result<&EngineObject> {
        if handle.session != self.session {
            return Err(self.invalid(handle));
        }
        self.objects.get(&handle.id).ok_or_else(|| self.invalid(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut EngineObject> {
        if handle.session != self.session {
            return Err(self.invalid(handle));
        }
        let err = self.invalid(handle);
        self.objects.get_mut(&handle.id).ok_or(err)
    }

    /// Drop an object. Removing an absent or already-removed handle is a
    /// no-op, not an error.
    pub fn remove(&mut self, handle: Handle) {
        if handle.session != self.session {
            return;
        }
        self.objects.remove(&handle.id);
    }

    /// Drop every object; all previously issued handles become invalid.
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
