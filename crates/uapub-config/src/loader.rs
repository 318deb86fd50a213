// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and detect its format from the extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders
//! 3. Parse YAML, TOML or JSON into [`BridgeConfig`]
//! 4. Apply `UAPUB_*` environment overrides
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! UAPUB_REQUEST_TIMEOUT_HINT=5s
//! UAPUB_CREDENTIALS_SESSION_TIMEOUT=45s
//! UAPUB_CREDENTIALS_STORE_PATH=/var/lib/uapub/pki/user
//! UAPUB_LOGGING_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{BridgeConfig, StoreKind};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UAPUB";

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML.
    Yaml,
    /// TOML.
    Toml,
    /// JSON.
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::unsupported_format(other)),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`BridgeConfig`] from files or strings.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    resolve_env_vars: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with the default `UAPUB` prefix.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Disables placeholder resolution and environment overrides.
    pub fn without_env(mut self) -> Self {
        self.resolve_env_vars = false;
        self
    }

    /// Loads and validates a configuration file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let config = self.load_from_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })?;

        info!(path = %path.display(), "Loaded bridge configuration");
        Ok(config)
    }

    /// Loads and validates configuration content.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<BridgeConfig> {
        let content = if self.resolve_env_vars {
            resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let mut config: BridgeConfig = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn env_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    fn apply_env_overrides(&self, config: &mut BridgeConfig) -> ConfigResult<()> {
        let name = self.env_name("REQUEST_TIMEOUT_HINT");
        if let Ok(value) = env::var(&name) {
            config.request.timeout_hint = humantime::parse_duration(&value)
                .map_err(|e| ConfigError::invalid_env_var(&name, e.to_string()))?;
            debug!(variable = %name, "Applied environment override");
        }

        let name = self.env_name("CREDENTIALS_SESSION_TIMEOUT");
        if let Ok(value) = env::var(&name) {
            config.credentials.session_timeout = humantime::parse_duration(&value)
                .map_err(|e| ConfigError::invalid_env_var(&name, e.to_string()))?;
            debug!(variable = %name, "Applied environment override");
        }

        let name = self.env_name("CREDENTIALS_STORE_PATH");
        if let Ok(value) = env::var(&name) {
            config.credentials.store.kind = StoreKind::Directory;
            config.credentials.store.path = Some(PathBuf::from(value));
            debug!(variable = %name, "Applied environment override");
        }

        let name = self.env_name("LOGGING_LEVEL");
        if let Ok(value) = env::var(&name) {
            config.logging.level = value
                .parse()
                .map_err(|e: ConfigError| ConfigError::invalid_env_var(&name, e.to_string()))?;
            debug!(variable = %name, "Applied environment override");
        }

        Ok(())
    }
}

/// Loads a configuration file with the default loader.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
    ConfigLoader::new().load(path)
}

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::serialization(e.to_string())),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

/// Resolves `${VAR}` and `${VAR:default}` placeholders.
///
/// Unknown variables without a default are kept verbatim.
fn resolve_env_placeholders(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let body = &after[..end];
        let (name, default) = match body.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };

        match (env::var(name), default) {
            (Ok(value), _) => result.push_str(&value),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {
                warn!("Environment variable '{}' not found", name);
                result.push_str(&rest[start..start + 2 + end + 1]);
            }
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}
