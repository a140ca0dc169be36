//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. an explicit path (the CLI's `--config`)
//! 2. the `$ANOFOX_ECON_CONFIG` environment variable
//! 3. built-in defaults (every key is optional)

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::CovarianceType;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ANOFOX_ECON_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub estimation: EstimationConfig,
}

/// Where result files go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Per-analysis, per-date directories are created under this root.
    pub root_dir: PathBuf,
}

/// Estimator settings shared by every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Newton iteration cap for probit/logit.
    pub max_iterations: usize,
    /// Newton convergence threshold.
    pub tolerance: f64,
    /// Relative tolerance for collinearity screening.
    pub rank_tolerance: f64,
    pub confidence_level: f64,
    pub drop_singletons: bool,
    pub drop_absorbed: bool,
    pub covariance: CovarianceType,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("cloud_out"),
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 35,
            tolerance: 1e-8,
            rank_tolerance: 1e-10,
            confidence_level: 0.95,
            drop_singletons: true,
            drop_absorbed: true,
            covariance: CovarianceType::Unadjusted,
        }
    }
}

impl Config {
    /// Load from `path`, else from `$ANOFOX_ECON_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let Some(path) = resolved else {
            debug!("no config file given, using defaults");
            return Ok(Self::default());
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.estimation;
        let level = e.confidence_level;
        if level.is_nan() || level <= 0.0 || level >= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "confidence_level must be in (0, 1), got {}",
                level
            )));
        }
        if e.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be positive".to_string()));
        }
        if [e.tolerance, e.rank_tolerance].iter().any(|t| t.is_nan() || *t <= 0.0) {
            return Err(ConfigError::Invalid("tolerances must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.estimation.max_iterations, 35);
        assert!(config.estimation.drop_absorbed);
        assert_eq!(config.output.root_dir, PathBuf::from("cloud_out"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
[estimation]
max_iterations = 50
covariance = "hc3"
"#,
        )
        .unwrap();
        assert_eq!(config.estimation.max_iterations, 50);
        assert_eq!(config.estimation.covariance, CovarianceType::Hc3);
        assert_eq!(config.estimation.tolerance, 1e-8);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nroot_dir = \"/tmp/results\"").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.output.root_dir, PathBuf::from("/tmp/results"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[estimation]\nconfidence_level = 1.5").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load(Some(Path::new("/nonexistent/anofox.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
