//! Runtime configuration.
//!
//! Settings are layered: built-in defaults, then an optional `sgm.toml`
//! (or an explicit file), then `SGM_`-prefixed environment variables with
//! `__` between nested keys, e.g. `SGM_API__BASE_URL`. A `.env` file in the
//! working directory is loaded into the environment first.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DueThresholds, Result};

type ConfigFile = File<config::FileSourceFile, config::FileFormat>;

/// Default base URL of the SGM REST API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3002/api";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SgmConfig {
    /// Backend connection.
    pub api: ApiConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Due-date thresholds.
    pub due: DueConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Thresholds used by the due-date classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DueConfig {
    /// Measurement point calibration.
    pub calibration: DueThresholds,
    /// Stock item warranty.
    pub warranty: DueThresholds,
    /// Stock item inspection.
    pub inspection: DueThresholds,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for DueConfig {
    fn default() -> Self {
        Self {
            calibration: DueThresholds::CALIBRATION,
            warranty: DueThresholds::WARRANTY,
            inspection: DueThresholds::INSPECTION,
        }
    }
}

impl SgmConfig {
    /// Loads configuration from `sgm.toml` (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SgmError::EnvFile`](crate::SgmError::EnvFile) if `.env`
    /// exists but is malformed, and [`SgmError::Config`](crate::SgmError::Config)
    /// if a source cannot be parsed or a value has the wrong type.
    pub fn load() -> Result<Self> {
        load_env_file(Path::new(".env"))?;
        let file = Path::new("sgm.toml")
            .exists()
            .then(|| File::with_name("sgm"));
        Self::build(file, "SGM")
    }

    /// Loads configuration from an explicit file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SgmError::EnvFile`](crate::SgmError::EnvFile) if `.env`
    /// exists but is malformed, and [`SgmError::Config`](crate::SgmError::Config)
    /// if the file is missing or malformed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        load_env_file(Path::new(".env"))?;
        let file = File::from(path.as_ref());
        Self::build(Some(file), "SGM")
    }

    fn build(file: Option<ConfigFile>, env_prefix: &str) -> Result<Self> {
        let defaults = Config::try_from(&SgmConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(file) = file {
            builder = builder.add_source(file);
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

/// Loads a dotenv file into the process environment if it exists.
///
/// A missing file is fine; a present but malformed one is an error.
fn load_env_file(path: &Path) -> Result<()> {
    if path.exists() {
        dotenvy::from_path(path)?;
        debug!(path = %path.display(), "loaded environment file");
    }
    Ok(())
}
