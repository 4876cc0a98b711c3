//! Lifecycle settings.
//!
//! Settings can come from a serde source (a config file section) or from the
//! environment:
//!
//! | Variable                | Default    |
//! |-------------------------|------------|
//! | `LIFECYCLE_SUFFIX_AUTO` | `_AUTO`    |
//! | `LIFECYCLE_SUFFIX_REQ`  | `_REQ`     |
//! | `LIFECYCLE_SUFFIX_OK`   | `_OK`      |
//! | `LIFECYCLE_SUFFIX_ERR`  | `_ERR`     |
//! | `LIFECYCLE_DIAGNOSTICS` | debug build |
//!
//! # Example
//!
//! ```no_run
//! use composable_lifecycle_runtime::{LifecycleSettings, PromiseMiddleware};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = LifecycleSettings::from_env()?;
//! let middleware = PromiseMiddleware::new(settings.middleware_config()?);
//! # Ok(())
//! # }
//! ```

use crate::promise::PromiseMiddlewareConfig;
use composable_lifecycle_core::suffix::{
    DEFAULT_SUFFIX_AUTO, DEFAULT_SUFFIX_ERR, DEFAULT_SUFFIX_OK, DEFAULT_SUFFIX_REQ,
};
use composable_lifecycle_core::{SuffixError, Suffixes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable for the intent suffix
pub const ENV_SUFFIX_AUTO: &str = "LIFECYCLE_SUFFIX_AUTO";
/// Environment variable for the requested suffix
pub const ENV_SUFFIX_REQ: &str = "LIFECYCLE_SUFFIX_REQ";
/// Environment variable for the succeeded suffix
pub const ENV_SUFFIX_OK: &str = "LIFECYCLE_SUFFIX_OK";
/// Environment variable for the failed suffix
pub const ENV_SUFFIX_ERR: &str = "LIFECYCLE_SUFFIX_ERR";
/// Environment variable switching resolution diagnostics on or off
pub const ENV_DIAGNOSTICS: &str = "LIFECYCLE_DIAGNOSTICS";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The suffix set is unusable
    #[error("Invalid lifecycle suffixes: {0}")]
    Suffixes(#[from] SuffixError),

    /// A variable held something that is not a boolean
    #[error("Invalid value for {name}: `{value}` (expected true/false/1/0/yes/no/on/off)")]
    InvalidFlag {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Serializable lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Intent suffix
    pub suffix_auto: String,
    /// Requested suffix
    pub suffix_req: String,
    /// Succeeded suffix
    pub suffix_ok: String,
    /// Failed suffix
    pub suffix_err: String,
    /// Log resolution hits and misses
    pub diagnostics: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            suffix_auto: DEFAULT_SUFFIX_AUTO.to_string(),
            suffix_req: DEFAULT_SUFFIX_REQ.to_string(),
            suffix_ok: DEFAULT_SUFFIX_OK.to_string(),
            suffix_err: DEFAULT_SUFFIX_ERR.to_string(),
            diagnostics: cfg!(debug_assertions),
        }
    }
}

impl LifecycleSettings {
    /// Load settings from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the resulting
    /// suffixes are invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the resulting
    /// suffixes are invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup(ENV_SUFFIX_AUTO) {
            settings.suffix_auto = value;
        }
        if let Some(value) = lookup(ENV_SUFFIX_REQ) {
            settings.suffix_req = value;
        }
        if let Some(value) = lookup(ENV_SUFFIX_OK) {
            settings.suffix_ok = value;
        }
        if let Some(value) = lookup(ENV_SUFFIX_ERR) {
            settings.suffix_err = value;
        }
        if let Some(value) = lookup(ENV_DIAGNOSTICS) {
            settings.diagnostics = parse_flag(ENV_DIAGNOSTICS, &value)?;
        }

        settings.suffixes()?;
        Ok(settings)
    }

    /// Validate the suffix strings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Suffixes`] if a suffix lacks the delimiter or
    /// two suffixes collide.
    pub fn suffixes(&self) -> Result<Suffixes, ConfigError> {
        Ok(Suffixes::new(
            &self.suffix_auto,
            &self.suffix_req,
            &self.suffix_ok,
            &self.suffix_err,
        )?)
    }

    /// Middleware configuration with these suffixes and diagnostics
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Suffixes`] if the suffixes are invalid.
    pub fn middleware_config(&self) -> Result<PromiseMiddlewareConfig, ConfigError> {
        Ok(PromiseMiddlewareConfig::default()
            .with_suffixes(self.suffixes()?)
            .with_diagnostics(self.diagnostics))
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}
