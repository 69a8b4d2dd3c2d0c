//! Graph configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::relation::Mode;
use crate::weight::WeightType;

/// Environment variable naming the registry file
pub const ENV_REGISTRY: &str = "GRAPHONY_REGISTRY";
/// Environment variable overriding the reserved relation-name prefix
pub const ENV_RESERVED_PREFIX: &str = "GRAPHONY_RESERVED_PREFIX";

/// Graph configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Registry file. `None` keeps the registry in memory only.
    pub registry_path: Option<PathBuf>,
    /// Relation names may not start with this prefix.
    pub reserved_prefix: String,
    /// Mode of relations created implicitly by `add`.
    pub default_mode: Mode,
    /// Weight type of relations created implicitly by an unweighted `add`.
    pub default_weight_type: WeightType,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            registry_path: None,
            reserved_prefix: "_".to_string(),
            default_mode: Mode::Adjacency,
            default_weight_type: WeightType::Bool,
        }
    }
}

impl GraphConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Defaults, overridden by `GRAPHONY_REGISTRY` and `GRAPHONY_RESERVED_PREFIX`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(ENV_REGISTRY) {
            config.registry_path = Some(PathBuf::from(path));
        }
        if let Ok(prefix) = std::env::var(ENV_RESERVED_PREFIX) {
            config.reserved_prefix = prefix;
        }
        config
    }

    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    pub fn with_default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_default_weight_type(mut self, weight_type: WeightType) -> Self {
        self.default_weight_type = weight_type;
        self
    }
}
