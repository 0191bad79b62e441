//! Engine configuration.
//!
//! Loaded from a TOML file by the controller binary; every field has a
//! default matching the documented engine behavior, so an empty file (or no
//! file at all) yields a working engine.

use crate::adaptive::AdaptiveConfig;
use crate::agent::AgentConfig;
use crate::policy::PathLimits;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the policy engine core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    pub adaptive: AdaptiveConfig,
    pub agent: AgentConfig,
    pub path: PathLimits,
    /// Hard ceiling on the size of one compiled snapshot. A store whose
    /// allow set compiles past this leaves the previous snapshot published.
    pub max_snapshot_paths: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adaptive: AdaptiveConfig::default(),
            agent: AgentConfig::default(),
            path: PathLimits::default(),
            max_snapshot_paths: 1_000_000,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing sections and fields fall back to
    /// their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}
