//! Game configuration.
//!
//! The game's content (resource kinds and their units, stuff kinds,
//! build kinds and their deposit rules, action costs) is declared in a
//! YAML file. This module mirrors it with strongly-typed structs and
//! checks that every cross reference names a declared resource.

use std::collections::BTreeMap;
use std::path::Path;

use rolling_types::{ActionType, ResourceId, StuffType, Unit};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The content parsed but is inconsistent.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Resource kinds, by key.
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, ResourceConfig>,

    /// Stuff kinds, by key.
    #[serde(default)]
    pub stuffs: BTreeMap<StuffType, StuffConfig>,

    /// Build kinds, by key.
    #[serde(default)]
    pub builds: BTreeMap<String, BuildConfig>,

    /// Action costs.
    #[serde(default)]
    pub actions: ActionsConfig,
}

impl GameConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a reference is dangling.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a reference is dangling.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        tracing::debug!(
            resources = config.resources.len(),
            stuffs = config.stuffs.len(),
            builds = config.builds.len(),
            "Game configuration parsed"
        );
        Ok(config)
    }

    /// Configuration of a resource kind.
    pub fn resource(&self, id: &ResourceId) -> Option<&ResourceConfig> {
        self.resources.get(id)
    }

    /// Configuration of a stuff kind.
    pub fn stuff(&self, stuff_type: &StuffType) -> Option<&StuffConfig> {
        self.stuffs.get(stuff_type)
    }

    /// Configuration of a build kind.
    pub fn build(&self, build_type: &str) -> Option<&BuildConfig> {
        self.builds.get(build_type)
    }

    /// Check every cross reference and numeric bound.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, build) in &self.builds {
            for id in &build.allowed_resource_ids {
                self.require_resource(id, &format!("build {key} allowed_resource_ids"))?;
            }
            for required in &build.required_resources {
                self.require_resource(
                    &required.resource_id,
                    &format!("build {key} required_resources"),
                )?;
                if required.quantity <= Decimal::ZERO {
                    return Err(invalid(format!(
                        "build {key} requires a non-positive quantity of {}",
                        required.resource_id
                    )));
                }
            }
        }

        for (key, stuff) in &self.stuffs {
            for id in &stuff.fill_accepts {
                self.require_resource(id, &format!("stuff {key} fill_accepts"))?;
            }
            if stuff.filled_capacity.is_some_and(|c| c <= Decimal::ZERO) {
                return Err(invalid(format!("stuff {key} has a non-positive capacity")));
            }
        }

        for (action, cost) in &self.actions.costs {
            if cost.is_sign_negative() {
                return Err(invalid(format!("action {action:?} has a negative cost")));
            }
        }

        Ok(())
    }

    fn require_resource(&self, id: &ResourceId, context: &str) -> Result<(), ConfigError> {
        if self.resources.contains_key(id) {
            Ok(())
        } else {
            Err(invalid(format!("{context} names unknown resource {id}")))
        }
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

/// A resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceConfig {
    /// Display name.
    pub name: String,
    /// Canonical storage unit.
    pub unit: Unit,
    /// Dropped quantities vanish instead of lying on the ground (liquids).
    #[serde(default)]
    pub drop_to_nowhere: bool,
}

/// A stuff kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StuffConfig {
    /// Display name.
    pub name: String,
    /// Containers: how much they hold, in the filling resource's base unit.
    #[serde(default)]
    pub filled_capacity: Option<Decimal>,
    /// Containers: which resources they accept.
    #[serde(default)]
    pub fill_accepts: Vec<ResourceId>,
}

/// A build kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
    /// Display name.
    pub name: String,
    /// Whether anything may be deposited inside.
    #[serde(default)]
    pub allow_deposit: bool,
    /// Restrict deposits to `allowed_resource_ids` (and no stuffs).
    #[serde(default)]
    pub allow_deposit_limited: bool,
    /// Resources accepted when deposits are limited.
    #[serde(default)]
    pub allowed_resource_ids: Vec<ResourceId>,
    /// Resources to bring before construction completes.
    #[serde(default)]
    pub required_resources: Vec<RequiredResource>,
}

impl BuildConfig {
    /// Whether a resource may be deposited inside this kind of build.
    pub fn accepts_resource(&self, id: &ResourceId) -> bool {
        self.allow_deposit
            && (!self.allow_deposit_limited || self.allowed_resource_ids.contains(id))
    }

    /// Whether stuffs may be deposited inside this kind of build.
    pub const fn accepts_stuffs(&self) -> bool {
        self.allow_deposit && !self.allow_deposit_limited
    }
}

/// A resource quantity a build needs during construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequiredResource {
    /// Which resource.
    pub resource_id: ResourceId,
    /// How much in total, in the resource's base unit.
    pub quantity: Decimal,
}

/// Action point costs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionsConfig {
    /// Overrides of the default base cost per action type.
    #[serde(default)]
    pub costs: BTreeMap<ActionType, Decimal>,
}

impl ActionsConfig {
    /// Base cost of an action, falling back to [`default_cost`].
    pub fn cost_of(&self, action: ActionType) -> Decimal {
        self.costs
            .get(&action)
            .copied()
            .unwrap_or_else(|| default_cost(action))
    }
}

/// Default action point cost of each action type.
///
/// | Action | Cost |
/// |--------|------|
/// | `DropOnGround` | 0 |
/// | `GiveToCharacter`, `DepositOnBuild`, `TakeFromBuild`, `PickUpFromGround`, `FillStuff`, `MakeDeal` | 0.5 |
/// | `TakeFromCharacter`, `BringResourceOnBuild` | 1 |
pub const fn default_cost(action: ActionType) -> Decimal {
    match action {
        ActionType::DropOnGround => Decimal::ZERO,
        ActionType::GiveToCharacter
        | ActionType::DepositOnBuild
        | ActionType::TakeFromBuild
        | ActionType::PickUpFromGround
        | ActionType::FillStuff
        | ActionType::MakeDeal => Decimal::from_parts(5, 0, 0, false, 1),
        ActionType::TakeFromCharacter | ActionType::BringResourceOnBuild => Decimal::ONE,
    }
}
