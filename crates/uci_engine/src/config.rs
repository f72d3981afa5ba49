//! Optional TOML configuration read at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::options::EngineOptions;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "engine.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub logging: LoggingSection,
}

/// Initial option values, same meaning as the `setoption` names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub hash_mb: usize,
    pub own_book: bool,
    pub ponder: bool,
    pub analyse_mode: bool,
    pub strength: u32,
    pub random_seed: u64,
    pub ponder_single_move: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        let opts = EngineOptions::default();
        EngineSection {
            hash_mb: opts.hash_mb,
            own_book: opts.own_book,
            ponder: opts.ponder,
            analyse_mode: opts.analyse_mode,
            strength: opts.strength,
            random_seed: opts.random_seed,
            ponder_single_move: opts.ponder_single_move,
        }
    }
}

impl From<EngineSection> for EngineOptions {
    fn from(s: EngineSection) -> Self {
        EngineOptions {
            hash_mb: s.hash_mb,
            own_book: s.own_book,
            ponder: s.ponder,
            analyse_mode: s.analyse_mode,
            strength: s.strength,
            random_seed: s.random_seed,
            ponder_single_move: s.ponder_single_move,
        }
        .clamped()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing_subscriber::EnvFilter` directives, overridden by RUST_LOG
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given (it must exist), else `engine.toml` when present,
    /// else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
