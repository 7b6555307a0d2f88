//! `courgette.toml` loading.
//!
//! ```toml
//! [generate]
//! definition_period = "year"
//! documentation = false
//! ```

use std::path::{Path, PathBuf};

use courgette_codegen::GenerateConfig;
use serde::Deserialize;
use thiserror::Error;

/// File picked up from the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "courgette.toml";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
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
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    pub generate: GenerateConfig,
}

/// Read and parse a config file.
pub(crate) fn read_config(path: &Path) -> Result<CliConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_config(content: &str) -> Result<CliConfig, toml::de::Error> {
    toml::from_str(content)
}

/// An explicit path must exist; the default file is optional.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<CliConfig, ConfigError> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                read_config(path)
            } else {
                Ok(CliConfig::default())
            }
        }
    }
}
