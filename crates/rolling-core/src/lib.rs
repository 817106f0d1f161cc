//! Configuration and world bootstrap for the Rolling economy core.
//!
//! # Modules
//!
//! - [`config`] -- Game content loaded from YAML into strongly-typed structs.
//! - [`seed`] -- Initial world content loaded from JSON into a store.

pub mod config;
pub mod seed;

pub use config::{
    ActionsConfig, BuildConfig, ConfigError, GameConfig, RequiredResource, ResourceConfig,
    StuffConfig,
};
pub use seed::{AffinitySeed, ClaimSeed, SeedError, WorldSeed};
