//! Provider Router
//!
//! Picks the provider for a request. There is always a standard provider;
//! a mature-content provider is optional. Requests flagged as mature go to
//! the mature provider when one is configured and fall back to the standard
//! one otherwise.

use std::sync::Arc;

use tracing::warn;

use super::openai::OpenAiBackend;
use super::traits::{ChatRequest, LlmBackend, ProviderProfile};

/// A backend together with the profile it was built from
#[derive(Clone)]
pub struct ProviderRoute {
    backend: Arc<dyn LlmBackend>,
    profile: ProviderProfile,
}

impl ProviderRoute {
    /// Pair a backend with its profile
    pub fn new(backend: Arc<dyn LlmBackend>, profile: ProviderProfile) -> Self {
        Self { backend, profile }
    }

    /// Shared handle to the backend
    #[must_use]
    pub fn backend(&self) -> Arc<dyn LlmBackend> {
        Arc::clone(&self.backend)
    }

    /// Profile defaults (model, sampling)
    #[must_use]
    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    /// Request skeleton for this route's model
    #[must_use]
    pub fn request(&self) -> ChatRequest {
        self.profile.request()
    }
}

impl std::fmt::Debug for ProviderRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRoute")
            .field("backend", &self.backend.name())
            .field("model", &self.profile.model)
            .finish()
    }
}

/// Standard and mature provider selection
#[derive(Clone, Debug)]
pub struct ProviderRouter {
    standard: ProviderRoute,
    mature: Option<ProviderRoute>,
}

impl ProviderRouter {
    /// Router with only a standard provider
    #[must_use]
    pub fn new(standard: ProviderRoute) -> Self {
        Self {
            standard,
            mature: None,
        }
    }

    /// Add the mature-content provider
    #[must_use]
    pub fn with_mature(mut self, mature: ProviderRoute) -> Self {
        self.mature = Some(mature);
        self
    }

    /// Build OpenAI-compatible backends for the configured profiles
    ///
    /// # Errors
    ///
    /// Fails if an HTTP client cannot be built.
    pub fn from_profiles(
        standard: ProviderProfile,
        mature: Option<ProviderProfile>,
    ) -> anyhow::Result<Self> {
        let backend = OpenAiBackend::new(standard.clone())?.with_name("standard");
        let mut router = Self::new(ProviderRoute::new(Arc::new(backend), standard));

        if let Some(profile) = mature {
            let backend = OpenAiBackend::new(profile.clone())?.with_name("mature");
            router = router.with_mature(ProviderRoute::new(Arc::new(backend), profile));
        }
        Ok(router)
    }

    /// Whether a mature provider is configured
    #[must_use]
    pub fn has_mature(&self) -> bool {
        self.mature.is_some()
    }

    /// Route for a request
    #[must_use]
    pub fn route(&self, mature: bool) -> &ProviderRoute {
        if !mature {
            return &self.standard;
        }
        if let Some(route) = &self.mature {
            route
        } else {
            warn!(
                model = %self.standard.profile.model,
                "Mature provider requested but none configured, using standard provider"
            );
            &self.standard
        }
    }
}
