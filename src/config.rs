//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `RepasoConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a YAML file.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use repaso::config::{RepasoConfig, load_config};
//!
//! let config: RepasoConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config.model);
//! ```

use serde::{Deserialize, Serialize};
use std::{env, error::Error, fs, path::Path};

use tracing::*;

use crate::error::StudyError;
use crate::models::COURSE_OPTIONS;

/// Placeholder written by `repaso init`; treated as "no credential".
pub const PLACEHOLDER_API_KEY: &str = "CHANGEME";

/// Environment variables consulted, in order, for the access credential.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Toggles for the optional capabilities.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct CapabilityToggles {
    pub pdf: bool,
    pub docx: bool,
    pub graph: bool,
}

impl Default for CapabilityToggles {
    fn default() -> Self {
        Self {
            pdf: true,
            docx: true,
            graph: true,
        }
    }
}

/// Represents the application's configuration.
///
/// Every field has a default so a partial `config.yaml` is enough; the API key is the
/// only value that must be provided (in the file or through the environment).
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct RepasoConfig {
    /// The API key used to authenticate requests.
    pub api_key: String,

    /// Base URL of the generative-language API (without the `/models/...` suffix).
    pub api_base: String,

    /// Model used for every request.
    pub model: String,

    /// Course/level the explanations are calibrated to.
    pub course: Option<String>,

    pub capabilities: CapabilityToggles,

    /// Script referenced by exported concept maps.
    pub graph_script_url: String,

    /// Stylesheet referenced by exported concept maps.
    pub graph_style_url: String,
}

impl Default for RepasoConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            course: COURSE_OPTIONS.first().map(|c| c.to_string()),
            capabilities: CapabilityToggles::default(),
            graph_script_url:
                "https://cdnjs.cloudflare.com/ajax/libs/vis-network/9.1.9/standalone/umd/vis-network.min.js"
                    .to_string(),
            graph_style_url:
                "https://cdnjs.cloudflare.com/ajax/libs/vis-network/9.1.9/dist/vis-network.min.css"
                    .to_string(),
        }
    }
}

impl RepasoConfig {
    /// Returns the credential, or a configuration error when it is missing.
    pub fn credential(&self) -> Result<&str, StudyError> {
        let key = self.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(StudyError::Configuration(
                "La clave de API no está configurada. Define GEMINI_API_KEY o edita config.yaml."
                    .to_string(),
            ));
        }
        Ok(key)
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_ok()
    }

    /// Replaces the file's key with one taken from the environment, if any.
    pub fn with_env_key(mut self, env_key: Option<String>) -> Self {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            debug!("Using API key from environment");
            self.api_key = key;
        }
        self
    }
}

/// Reads the first non-empty credential from [`API_KEY_ENV_VARS`].
pub fn env_api_key() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
}

/// Loads the application's configuration from a YAML file.
///
/// # Returns
///
/// - `Ok(RepasoConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
pub fn load_config(file: impl AsRef<Path>) -> Result<RepasoConfig, Box<dyn Error>> {
    let file = file.as_ref();
    debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: RepasoConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Loads the config if the file exists, falling back to defaults, then applies the
/// environment credential.
pub fn load_or_default(file: impl AsRef<Path>) -> Result<RepasoConfig, Box<dyn Error>> {
    let file = file.as_ref();
    let config = if file.exists() {
        load_config(file)?
    } else {
        warn!(
            "No config found at {}; using defaults (run `repaso init`)",
            file.display()
        );
        RepasoConfig::default()
    };
    Ok(config.with_env_key(env_api_key()))
}

/// Writes a default configuration file, creating parent directories.
pub fn write_default_config(file: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let file = file.as_ref();
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    info!("Creating config file: {}", file.display());
    let yaml = serde_yaml::to_string(&RepasoConfig::default())?;
    fs::write(file, yaml)?;
    Ok(())
}
