use config::{Config as ConfigLoader, Environment, File};
use errprop_core::derivative::DEFAULT_SCALE_FACTOR;
use errprop_core::extremes::{DEFAULT_COHERENCE_SLACK, EXHAUSTIVE_LIMIT};
use errprop_core::{
    DEFAULT_MAX_SAMPLES, DEFAULT_STEP, ExtremesOptions, PropagatorOptions, StepPolicy,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use super::error::Error;
use super::format::DecimalLocale;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub derivative_step: f64,
    /// Use `max(derivative_step, |x| * 1e-6)` instead of a fixed step.
    pub scaled_step: bool,
    pub max_samples: usize,
    pub exhaustive_limit: usize,
    pub seed: Option<u64>,
    pub coherence_slack: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            derivative_step: DEFAULT_STEP,
            scaled_step: false,
            max_samples: DEFAULT_MAX_SAMPLES,
            exhaustive_limit: EXHAUSTIVE_LIMIT,
            seed: None,
            coherence_slack: DEFAULT_COHERENCE_SLACK,
        }
    }
}

impl EngineConfig {
    pub fn propagator_options(&self) -> PropagatorOptions {
        let step = if self.scaled_step {
            StepPolicy::Scaled {
                floor: self.derivative_step,
                factor: DEFAULT_SCALE_FACTOR,
            }
        } else {
            StepPolicy::Fixed(self.derivative_step)
        };

        PropagatorOptions {
            step,
            extremes: ExtremesOptions {
                max_samples: self.max_samples,
                exhaustive_limit: self.exhaustive_limit,
                seed: self.seed,
                coherence_slack: self.coherence_slack,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FormatConfig {
    pub locale: DecimalLocale,
    pub decimals: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Capacity of each pipeline channel, in batches.
    pub buffer_size: usize,
    /// Jobs per batch sent by a source.
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            buffer_size: 16,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub format: FormatConfig,
    pub batch: BatchConfig,
}

/// Loads configuration from a file and environment variables.
///
/// Without an explicit `path`, `crates/executor/Config.toml` under the current
/// directory is used if present and built-in defaults otherwise. `ERRPROP_*`
/// variables override both, with `__` between section and key.
pub fn load_config(path: Option<&Path>) -> Result<Config, Error> {
    let (config_file_path, required): (PathBuf, bool) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => {
            let base_path = env::current_dir().map_err(|e| {
                Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
            })?;
            let default_path = base_path
                .join("crates")
                .join("executor")
                .join("Config.toml");
            (default_path, false)
        }
    };

    let s = ConfigLoader::builder()
        .add_source(File::from(config_file_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix("ERRPROP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| Error::ConfigLoadError(e.to_string()))?;

    let app_config: Config = s
        .try_deserialize()
        .map_err(|e| Error::ConfigLoadError(format!("Failed to deserialize config: {}", e)))?;

    Ok(app_config)
}
