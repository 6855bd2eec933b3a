//! Resolver configuration.
//!
//! Read from an explicit JSON file or from `<config dir>/toporesolve/config.json`.
//! Every field has a default, so a partial file (or none at all) is valid.

use crate::error::{ConfigError, ResolveError, Result};
use crate::resolver::{
    Backoff, BasicMinDistResolver, DocCentroidResolver, LabelPropConfig, LabelPropResolver, PopulationResolver,
    RandomResolver, Resolver, WeightedMinDistResolver,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Primary resolution strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
    Basic,
    #[default]
    Weighted,
    Population,
    Random,
    LabelProp,
}

impl FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" | "basic-min-dist" => Ok(Self::Basic),
            "weighted" | "weighted-min-dist" => Ok(Self::Weighted),
            "population" => Ok(Self::Population),
            "random" => Ok(Self::Random),
            "label-prop" | "labelprop" => Ok(Self::LabelProp),
            _ => Err(format!(
                "Unknown resolver '{}'. Use: basic, weighted, population, random, label-prop",
                s
            )),
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Basic => "basic",
            Self::Weighted => "weighted",
            Self::Population => "population",
            Self::Random => "random",
            Self::LabelProp => "label-prop",
        };
        f.write_str(s)
    }
}

/// Strategy run after the primary one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffKind {
    #[default]
    None,
    Population,
    Random,
    DocCentroid,
}

impl FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "population" => Ok(Self::Population),
            "random" => Ok(Self::Random),
            "doc-centroid" | "centroid" => Ok(Self::DocCentroid),
            _ => Err(format!(
                "Unknown backoff '{}'. Use: none, population, random, doc-centroid",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub kind: ResolverKind,
    /// EM iterations for the weighted resolver.
    pub iterations: usize,
    pub phantom_count: f64,
    pub label_prop: LabelPropConfig,
    pub backoff: BackoffKind,
    pub backoff_overwrite: bool,
    pub random_seed: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind: ResolverKind::default(),
            iterations: 10,
            phantom_count: 0.0,
            label_prop: LabelPropConfig::default(),
            backoff: BackoffKind::default(),
            backoff_overwrite: false,
            random_seed: 42,
        }
    }
}

impl ResolverConfig {
    /// Load from a specific file. The file must exist.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing.
    pub fn load_default() -> std::result::Result<Self, ConfigError> {
        let path = Self::default_path();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("toporesolve")
            .join("config.json")
    }

    pub fn validate(&self) -> Result<()> {
        if !self.phantom_count.is_finite() || self.phantom_count < 0.0 {
            return Err(ResolveError::invalid_config(format!(
                "phantom_count must be non-negative, got {}",
                self.phantom_count
            )));
        }
        if self.kind == ResolverKind::LabelProp {
            self.label_prop.validate()?;
        }
        Ok(())
    }

    fn primary(&self) -> Result<Box<dyn Resolver>> {
        Ok(match self.kind {
            ResolverKind::Basic => Box::new(BasicMinDistResolver::new()),
            ResolverKind::Weighted => {
                Box::new(WeightedMinDistResolver::new(self.iterations).with_phantom_count(self.phantom_count))
            }
            ResolverKind::Population => Box::new(PopulationResolver::new()),
            ResolverKind::Random => Box::new(RandomResolver::new(self.random_seed)),
            ResolverKind::LabelProp => Box::new(LabelPropResolver::new(self.label_prop)?),
        })
    }

    /// Construct the configured resolver, wrapped in a backoff chain if one is set.
    pub fn build(&self) -> Result<Box<dyn Resolver>> {
        self.validate()?;
        let primary = self.primary()?;
        let fallback: Box<dyn Resolver> = match self.backoff {
            BackoffKind::None => return Ok(primary),
            BackoffKind::Population => Box::new(PopulationResolver::new()),
            BackoffKind::Random => Box::new(RandomResolver::new(self.random_seed)),
            BackoffKind::DocCentroid => Box::new(DocCentroidResolver::new()),
        };
        Ok(Box::new(Backoff::new(primary, fallback).with_overwrite(self.backoff_overwrite)))
    }
}
