//! The economy context shared by every request.
//!
//! Built once at process start and passed explicitly to the resolver, the
//! transfer engine and the actions. The store is not part of it: each
//! request brings its own mutable store handle.

use std::sync::Arc;

use rolling_core::{BuildConfig, GameConfig, ResourceConfig, StuffConfig};
use rolling_store::AffinityDirectory;
use rolling_types::{Build, ResourceId, StuffType};

use crate::error::ActionError;

/// Configuration plus the affinity directory.
#[derive(Clone)]
pub struct EconomyContext {
    config: Arc<GameConfig>,
    affinities: Arc<dyn AffinityDirectory + Send + Sync>,
}

impl core::fmt::Debug for EconomyContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EconomyContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EconomyContext {
    /// Create a context from a loaded configuration and a directory.
    pub fn new(
        config: GameConfig,
        affinities: impl AffinityDirectory + Send + Sync + 'static,
    ) -> Self {
        Self {
            config: Arc::new(config),
            affinities: Arc::new(affinities),
        }
    }

    /// The game configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The affinity directory.
    pub fn affinities(&self) -> &dyn AffinityDirectory {
        self.affinities.as_ref()
    }

    /// Configuration of a resource referenced by stored data.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownResource`] if it is not configured.
    pub fn resource(&self, id: &ResourceId) -> Result<&ResourceConfig, ActionError> {
        self.config
            .resource(id)
            .ok_or_else(|| ActionError::UnknownResource(id.clone()))
    }

    /// Configuration of a resource named in player input.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::WrongInput`] if it is not configured.
    pub fn requested_resource(&self, id: &ResourceId) -> Result<&ResourceConfig, ActionError> {
        self.config
            .resource(id)
            .ok_or_else(|| ActionError::wrong_input(format!("Unknown resource {id}")))
    }

    /// Configuration of a stuff kind referenced by stored data.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownStuffType`] if it is not configured.
    pub fn stuff(&self, stuff_type: &StuffType) -> Result<&StuffConfig, ActionError> {
        self.config
            .stuff(stuff_type)
            .ok_or_else(|| ActionError::UnknownStuffType(stuff_type.clone()))
    }

    /// Configuration of the kind of `build`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownBuildType`] if it is not configured.
    pub fn build_config(&self, build: &Build) -> Result<&BuildConfig, ActionError> {
        self.config
            .build(&build.build_type)
            .ok_or_else(|| ActionError::UnknownBuildType(build.build_type.clone()))
    }
}
