//! Engine configuration.
//!
//! Resolution order: `WRITER_ASSIST_CONFIG_PATH`, then
//! `writer-assist/config/writer-assist.toml` searched from the current
//! directory upward, then the built-in example catalog compiled into the
//! binary. Unreadable or unparsable files fall back with a warning.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::suggestions::CompensationPolicy;

pub const CONFIG_PATH_ENV: &str = "WRITER_ASSIST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "writer-assist/config/writer-assist.toml";
const BUILTIN_CONFIG_TOML: &str = include_str!("../config/writer-assist.example.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AssistConfig {
    pub compensation_policy: CompensationPolicy,
    pub classifier: ClassifierConfig,
    pub context: ContextConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Accept payloads wrapped in a single ```json fenced block.
    pub unwrap_fenced_json: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            unwrap_fenced_json: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Document text sent along with a request is cut to this many chars.
    pub max_context_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 16_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_message_chars: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 8_000,
        }
    }
}

impl AssistConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn built_in() -> Self {
        Self::from_toml_str(BUILTIN_CONFIG_TOML).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to parse built-in writer-assist config");
            Self::default()
        })
    }
}

/// Load configuration using env override, default path search, then built-in.
pub fn load_config() -> AssistConfig {
    let explicit_path = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);

    let Some(path) = explicit_path.or_else(|| find_default_config_path(DEFAULT_CONFIG_PATH))
    else {
        tracing::debug!("No writer-assist config file found; using built-in defaults");
        return AssistConfig::built_in();
    };

    match AssistConfig::from_path(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Loaded writer-assist config");
            config
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Failed to load writer-assist config; using built-in defaults"
            );
            AssistConfig::built_in()
        }
    }
}

fn find_default_config_path(relative_path: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(relative_path))
        .find(|candidate| candidate.is_file())
}
