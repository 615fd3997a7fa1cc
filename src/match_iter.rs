use std::sync::Arc;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::cancel::Deadline;
use crate::error::{EngineError, Result};
use crate::mol::Mol;
use crate::query::Pattern;
use crate::registry::Handle;
use crate::search::EmbeddingSearch;
use crate::tautomer::TautomerSearch;

/// Lazy enumerator of Normal/Resonance match results.
///
/// State machine: uninitialized → has-match | exhausted. `has_next` is
/// idempotent until `next` consumes the current embedding; already stored
/// embeddings are replayed without re-searching, and only then is the
/// underlying search asked to advance. Finding more embeddings than the
/// configured cap is a hard error, not a truncation.
pub struct MatchIter {
    search: EmbeddingSearch,
    /// Variant vertex → original target vertex (`-1` for unfolded hydrogens).
    to_original: Vec<i32>,
    query: Arc<Pattern>,
    query_handle: Handle,
    target: Arc<Mol<Atom, Bond>>,
    target_handle: Handle,
    max_embeddings: usize,
    embedding_index: usize,
    initialized: bool,
    need_find: bool,
    found: bool,
}

impl MatchIter {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        search: EmbeddingSearch,
        to_original: Vec<i32>,
        query: Arc<Pattern>,
        query_handle: Handle,
        target: Arc<Mol<Atom, Bond>>,
        target_handle: Handle,
        max_embeddings: usize,
    ) -> Self {
        Self {
            search,
            to_original,
            query,
            query_handle,
            target,
            target_handle,
            max_embeddings,
            embedding_index: 0,
            initialized: false,
            need_find: true,
            found: false,
        }
    }

    pub fn query(&self) -> Arc<Pattern> {
        self.query.clone()
    }

    pub fn query_handle(&self) -> Handle {
        self.query_handle
    }

    pub fn target(&self) -> Arc<Mol<Atom, Bond>> {
        self.target.clone()
    }

    pub fn target_handle(&self) -> Handle {
        self.target_handle
    }

    pub fn has_next(&mut self, deadline: Deadline) -> Result<bool> {
        if !self.need_find {
            return Ok(self.found);
        }
        self.search.set_deadline(deadline);

        if !self.initialized {
            self.initialized = true;
            self.found = self.search.find_next()?;
        } else {
            self.embedding_index += 1;
            if self.embedding_index < self.search.stored_count() {
                self.found = true;
            } else {
                self.found = self.search.find_next()?;
            }
        }
        if self.found && self.embedding_index >= self.max_embeddings {
            return Err(EngineError::EmbeddingLimitExceeded {
                limit: self.max_embeddings,
            });
        }
        self.need_find = false;
        Ok(self.found)
    }

    /// Produce the current embedding as a query→original-target map and
    /// advance the logical position. Returns `None` once exhausted.
    pub fn next(&mut self, deadline: Deadline) -> Result<Option<Vec<i32>>> {
        if !self.has_next(deadline)? {
            return Ok(None);
        }
        let embedding: &[i32] = if self.embedding_index < self.search.stored_count() {
            self.search.stored(self.embedding_index)
        } else {
            match self.search.last_embedding() {
                Some(e) => e,
                None => return Ok(None),
            }
        };
        let map: Vec<i32> = embedding
            .iter()
            .map(|&v| if v < 0 { -1 } else { self.to_original[v as usize] })
            .collect();
        self.need_find = true;
        Ok(Some(map))
    }

    /// Non-incremental counting: run the search to exhaustion (or to the
    /// caller's limit) without materializing mappings.
    ///
    /// With a caller limit the count saturates at that limit; with none the
    /// session cap is a hard inclusive ceiling and crossing it fails.
    pub fn count_matches(&mut self, limit: usize, deadline: Deadline) -> Result<usize> {
        self.search.set_deadline(deadline);
        let stop = if limit != 0 {
            limit.min(self.max_embeddings)
        } else {
            // One past the cap: actually finding that embedding is the
            // error condition.
            self.max_embeddings + 1
        };
        let mut count = 0;
        while count < stop {
            if !self.search.find_next()? {
                break;
            }
            count += 1;
        }
        if limit != 0 {
            return Ok(count.min(limit));
        }
        if count > self.max_embeddings {
            return Err(EngineError::EmbeddingLimitExceeded {
                limit: self.max_embeddings,
            });
        }
        Ok(count)
    }
}

/// Tautomer match enumerator: a second index walks the admissible
/// hydrogen-placement mask of the current embedding before the embedding
/// index advances.
pub struct TautomerMatchIter {
    search: TautomerSearch,
    query: Arc<Pattern>,
    query_handle: Handle,
    target_handle: Handle,
    max_embeddings: usize,
    embedding_index: usize,
    mask_index: Option<usize>,
    initialized: bool,
    need_find: bool,
    found: bool,
}

impl TautomerMatchIter {
    pub(crate) fn new(
        search: TautomerSearch,
        query: Arc<Pattern>,
        query_handle: Handle,
        target_handle: Handle,
        max_embeddings: usize,
    ) -> Self {
        Self {
            search,
            query,
            query_handle,
            target_handle,
            max_embeddings,
            embedding_index: 0,
            mask_index: None,
            initialized: false,
            need_find: true,
            found: false,
        }
    }

    pub fn query(&self) -> Arc<Pattern> {
        self.query.clone()
    }

    pub fn query_handle(&self) -> Handle {
        self.query_handle
    }

    pub fn target_handle(&self) -> Handle {
        self.target_handle
    }

    fn first_mask_bit(&self, embedding_index: usize) -> Option<usize> {
        self.search.mask(embedding_index).ones().next()
    }

    pub fn has_next(&mut self, deadline: Deadline) -> Result<bool> {
        if !self.need_find {
            return Ok(self.found);
        }
        self.search.set_deadline(deadline);

        if !self.initialized {
            self.initialized = true;
            self.found = self.search.find_next()?;
            if self.found {
                self.embedding_index = 0;
                self.mask_index = self.first_mask_bit(0);
            }
        } else {
            let advanced = match self.mask_index {
                Some(current) if self.embedding_index < self.search.count() => self
                    .search
                    .mask(self.embedding_index)
                    .ones()
                    .find(|&b| b > current),
                _ => None,
            };
            match advanced {
                Some(bit) => {
                    self.mask_index = Some(bit);
                    self.found = true;
                }
                None => {
                    self.embedding_index += 1;
                    if self.embedding_index < self.search.count() {
                        self.mask_index = self.first_mask_bit(self.embedding_index);
                        self.found = true;
                    } else {
                        self.found = self.search.find_next()?;
                        if self.found {
                            self.mask_index = self.first_mask_bit(self.embedding_index);
                        }
                    }
                }
            }
        }
        if self.found && self.embedding_index >= self.max_embeddings {
            return Err(EngineError::EmbeddingLimitExceeded {
                limit: self.max_embeddings,
            });
        }
        self.need_find = false;
        Ok(self.found)
    }

    /// Produce the current `(embedding, mask position)` result: the
    /// query→target map plus the materialized tautomeric form it matched.
    pub fn next(
        &mut self,
        deadline: Deadline,
    ) -> Result<Option<(Vec<i32>, Arc<Mol<Atom, Bond>>)>> {
        if !self.has_next(deadline)? {
            return Ok(None);
        }
        let layer = self.search.layer(self.mask_index.unwrap_or(0));
        let map = self.search.embedding(self.embedding_index).to_vec();
        self.need_find = true;
        Ok(Some((map, layer)))
    }
}
