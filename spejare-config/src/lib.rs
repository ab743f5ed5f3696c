//! # Spejare Configuration System
//!
//! Hierarchical configuration for the Spejare observer: defaults, then an
//! optional YAML file, then `SPEJARE_*` environment overrides. The protocol
//! core itself reads no configuration; embedders load this once and pass the
//! relevant pieces down.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod observer;
mod telemetry;

pub use error::ConfigError;
pub use observer::{ObserverConfig, StitcherConfig};
pub use telemetry::{MetricsConfig, TelemetryConfig, TracingConfig};

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct SpejareConfig {
    /// Observer pipeline parameters (stitching).
    #[validate(nested)]
    pub observer: ObserverConfig,

    /// Telemetry and observability parameters.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl SpejareConfig {
    /// Load configuration from default locations and the environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/spejare.yaml`, when present
    /// 3. `SPEJARE_*` environment variables (`__` separates nesting)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SpejareConfig::default()));

        if Path::new("config/spejare.yaml").exists() {
            figment = figment.merge(Yaml::file("config/spejare.yaml"));
        }

        figment
            .merge(Env::prefixed("SPEJARE_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path for testing/validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Figment::from(Serialized::defaults(SpejareConfig::default()))
            .merge(Yaml::file(path))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
