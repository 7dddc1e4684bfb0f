use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hard cap on visibility resolution passes.
pub const DEFAULT_MAX_VISIBILITY_PASSES: usize = 5;
/// Hard cap on chained `goto_if` jumps per navigation call.
pub const DEFAULT_MAX_NAV_HOPS: usize = 10;

/// Which rule engine interprets a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Grammar-based `*_if(...)` directives.
    #[default]
    Strict,
    /// Free-text `if ... skip ...` / `if ... goto ...` clauses.
    Legacy,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Strict => "strict",
            EngineKind::Legacy => "legacy",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(EngineKind::Strict),
            "legacy" => Ok(EngineKind::Legacy),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

/// Runtime engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default = "default_max_visibility_passes")]
    pub max_visibility_passes: usize,
    #[serde(default = "default_max_nav_hops")]
    pub max_nav_hops: usize,
    /// Memoize directive parses (strict engine only).
    #[serde(default = "default_cache")]
    pub cache: bool,
}

fn default_max_visibility_passes() -> usize {
    DEFAULT_MAX_VISIBILITY_PASSES
}

fn default_max_nav_hops() -> usize {
    DEFAULT_MAX_NAV_HOPS
}

fn default_cache() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            max_visibility_passes: DEFAULT_MAX_VISIBILITY_PASSES,
            max_nav_hops: DEFAULT_MAX_NAV_HOPS,
            cache: true,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config; blank input yields the defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }
}
