use std::time::{Duration, Instant};

use crate::error::{EngineError, Result};

/// A wall-clock deadline polled cooperatively inside search loops.
///
/// `Deadline::none()` never expires. The session re-arms a fresh deadline
/// from its timeout option before each top-level engine call, so a long
/// sequence of `has_next` calls gets the full budget per call rather than
/// sharing one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    /// Deadline `ms` milliseconds from now; `0` means no deadline.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self(None)
        } else {
            Self(Some(Instant::now() + Duration::from_millis(ms)))
        }
    }

    pub fn expired(&self) -> bool {
        match self.0 {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.expired() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
