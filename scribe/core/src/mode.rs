//! Mature Mode
//!
//! Runtime switch that decides which provider serves requests that do not
//! say for themselves. It is an injected value with an explicit API, shared
//! through an `Arc`, never a global.

use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime-switchable default for mature-content routing
#[derive(Debug, Default)]
pub struct MatureMode {
    enabled: AtomicBool,
}

impl MatureMode {
    /// Start in the given state
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Current state
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Set the state, returning the previous one
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst)
    }

    /// Flip the state, returning the new one
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::SeqCst)
    }

    /// A request's explicit flag wins; otherwise the current state applies
    #[must_use]
    pub fn resolve(&self, requested: Option<bool>) -> bool {
        requested.unwrap_or_else(|| self.is_enabled())
    }
}
