//! Layered configuration for go-testgen.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. TOML file (`--config <FILE>` or `./.go-testgen.toml`)
//! 3. Environment (`GPT_MODEL`, `OPENAI_BASE_URL`)
//! 4. Command-line flags
//!
//! The API key is only ever read from `OPENAI_API_KEY`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the completion service API key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// Environment variable selecting the chat model.
pub const ENV_MODEL: &str = "GPT_MODEL";

/// Environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

/// Config file looked up in the current directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = ".go-testgen.toml";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_FUNCTION_LINES: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Contents of a `.go-testgen.toml` file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_function_lines: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_function_lines: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model: String,
    pub base_url: String,
    pub max_function_lines: usize,
    pub timeout_secs: u64,
    /// True when no layer named a model and `DEFAULT_MODEL` is in use
    pub model_defaulted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_function_lines: DEFAULT_MAX_FUNCTION_LINES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            model_defaulted: true,
        }
    }
}

impl Config {
    /// Load configuration from the file system and process environment.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match config_path {
            Some(path) => Some(load_file(path)?),
            None => {
                let local = PathBuf::from(CONFIG_FILE_NAME);
                if local.is_file() {
                    Some(load_file(&local)?)
                } else {
                    None
                }
            }
        };

        Ok(Self::resolve(file.as_ref(), |key| std::env::var(key).ok(), overrides))
    }

    /// Merge the layers. `env` looks up an environment variable; empty values count as unset.
    pub fn resolve<F>(file: Option<&FileConfig>, env: F, overrides: &Overrides) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(file) = file {
            if let Some(model) = &file.model {
                config.model = model.clone();
                config.model_defaulted = false;
            }
            if let Some(base_url) = &file.base_url {
                config.base_url = base_url.clone();
            }
            if let Some(lines) = file.max_function_lines {
                config.max_function_lines = lines;
            }
            if let Some(secs) = file.timeout_secs {
                config.timeout_secs = secs;
            }
        }

        if let Some(model) = lookup(ENV_MODEL) {
            config.model = model;
            config.model_defaulted = false;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }

        if let Some(model) = &overrides.model {
            config.model = model.clone();
            config.model_defaulted = false;
        }
        if let Some(base_url) = &overrides.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(lines) = overrides.max_function_lines {
            config.max_function_lines = lines;
        }
        if let Some(secs) = overrides.timeout_secs {
            config.timeout_secs = secs;
        }

        config
    }
}

/// Parse a TOML config file
pub fn load_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Read the API key from `OPENAI_API_KEY`.
pub fn api_key() -> Result<String> {
    match std::env::var(ENV_API_KEY) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("Please set {} environment variable", ENV_API_KEY),
    }
}
