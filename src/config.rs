//! Pipeline configuration and the providers that persist it.
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

use crate::{
    dedup::ConsolidationPolicy,
    error::{Result, TenetError},
};

/// Reject a similarity threshold outside `(0, 1]`.
pub fn check_threshold(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(TenetError::Config(format!(
            "{name} must lie in (0, 1], got {value}"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub enabled: bool,
    pub threshold: f64,
    pub policy: ConsolidationPolicy,
    pub max_features: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            enabled: true,
            threshold: 0.85,
            policy: ConsolidationPolicy::KeepAll,
            max_features: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingConfig {
    pub enabled: bool,
    pub threshold: f64,
    pub max_features: usize,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        LinkingConfig {
            enabled: true,
            threshold: 0.6,
            max_features: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Fold plural and "-ation" forms onto a shared stem before counting terms.
    ///
    /// On by default, which departs from plain TF-IDF scoring: "taxes are theft" and "taxation
    /// is theft" score 1.0 folded and about 0.22 unfolded. Set it to `false` for unfolded term
    /// counts; thresholds tuned against plain TF-IDF then behave as they did there.
    pub fold_inflections: bool,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        SimilarityConfig {
            fold_inflections: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Length of keystone and top-centrality lists.
    pub top_n: usize,
    pub damping: f64,
    pub max_iterations: usize,
    /// PageRank stops once the L1 change falls below `tolerance * node_count`.
    pub tolerance: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            top_n: 5,
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.damping.is_finite() && self.damping > 0.0 && self.damping < 1.0) {
            return Err(TenetError::Config(format!(
                "graph.damping must lie in (0, 1), got {}",
                self.damping
            )));
        }
        if self.max_iterations == 0 {
            return Err(TenetError::Config(
                "graph.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(TenetError::Config(format!(
                "graph.tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dedup: DedupConfig,
    pub linking: LinkingConfig,
    pub similarity: SimilarityConfig,
    pub graph: GraphConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        check_threshold("dedup.threshold", self.dedup.threshold)?;
        check_threshold("linking.threshold", self.linking.threshold)?;
        if self.dedup.max_features == 0 || self.linking.max_features == 0 {
            return Err(TenetError::Config(
                "max_features must be at least 1".to_string(),
            ));
        }
        self.graph.validate()
    }
}

pub trait PipelineConfigProvider {
    fn get_config(&self) -> Result<PipelineConfig>;
    fn set_config(&self, config: &PipelineConfig) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl PipelineConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<PipelineConfig> {
        tracing::debug!("Attempting to read pipeline config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(PipelineConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn set_config(&self, config: &PipelineConfig) -> Result<()> {
        tracing::debug!("Attempting to write pipeline config to: {:?}", &self.path);
        write(&self.path, toml::to_string(config)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlConfigProvider {
    path: PathBuf,
}

impl YamlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        YamlConfigProvider { path }
    }
}

impl PipelineConfigProvider for YamlConfigProvider {
    fn get_config(&self) -> Result<PipelineConfig> {
        tracing::debug!("Attempting to read pipeline config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(PipelineConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn set_config(&self, config: &PipelineConfig) -> Result<()> {
        tracing::debug!("Attempting to write pipeline config to: {:?}", &self.path);
        write(&self.path, serde_yaml::to_string(config)?)?;
        Ok(())
    }
}

/// Pick a provider by file extension: `.yaml`/`.yml` read as YAML, anything else as TOML.
pub fn provider_for_path<P: AsRef<Path>>(path: P) -> Box<dyn PipelineConfigProvider> {
    let path = path.as_ref().to_path_buf();
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Box::new(YamlConfigProvider::new(path)),
        _ => Box::new(TomlConfigProvider::new(path)),
    }
}
