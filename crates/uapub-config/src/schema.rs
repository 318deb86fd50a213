// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for the publisher model bridge.
//!
//! # Structure
//!
//! ```text
//! BridgeConfig
//! ├── request: RequestSettings
//! ├── credentials: CredentialSettings
//! │   └── store: StoreSettings
//! └── logging: LoggingConfig
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default upper bound for resolving one session identity.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Issued-token type URI identifying JSON Web Tokens.
pub const DEFAULT_JWT_TOKEN_TYPE: &str = "http://opcfoundation.org/UA/UserToken#JWT";

/// Largest timeout hint representable in a request header (milliseconds).
pub const MAX_TIMEOUT_HINT_MS: u128 = u32::MAX as u128;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// Root configuration of the bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Request header defaults.
    #[serde(default)]
    pub request: RequestSettings,

    /// Credential resolution settings.
    #[serde(default)]
    pub credentials: CredentialSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validates every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.request.validate()?;
        self.credentials.validate()?;
        Ok(())
    }
}

// =============================================================================
// RequestSettings
// =============================================================================

/// Defaults applied when building request headers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestSettings {
    /// Timeout hint sent to the server (0 = no hint).
    #[serde(default, with = "humantime_serde")]
    pub timeout_hint: Duration,

    /// Diagnostics level used when a request carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics_level: Option<String>,
}

impl RequestSettings {
    /// Validates the request settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_hint.as_millis() > MAX_TIMEOUT_HINT_MS {
            return Err(ConfigError::validation(
                "request.timeout_hint",
                format!("must not exceed {} ms", u32::MAX),
            ));
        }
        Ok(())
    }

    /// Returns the timeout hint in whole milliseconds.
    pub fn timeout_hint_ms(&self) -> u32 {
        u32::try_from(self.timeout_hint.as_millis()).unwrap_or(u32::MAX)
    }
}

// =============================================================================
// CredentialSettings
// =============================================================================

/// Settings for resolving session identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSettings {
    /// Upper bound for one identity resolution, including store I/O.
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Trusted user certificate store.
    #[serde(default)]
    pub store: StoreSettings,

    /// Issued-token type URI accepted as a JWT policy.
    #[serde(default = "default_jwt_token_type")]
    pub jwt_token_type: String,
}

fn default_session_timeout() -> Duration {
    DEFAULT_SESSION_TIMEOUT
}

fn default_jwt_token_type() -> String {
    DEFAULT_JWT_TOKEN_TYPE.to_string()
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            session_timeout: default_session_timeout(),
            store: StoreSettings::default(),
            jwt_token_type: default_jwt_token_type(),
        }
    }
}

impl CredentialSettings {
    /// Validates the credential settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.session_timeout.is_zero() {
            return Err(ConfigError::validation(
                "credentials.session_timeout",
                "must be greater than zero",
            ));
        }
        if self.jwt_token_type.trim().is_empty() {
            return Err(ConfigError::validation(
                "credentials.jwt_token_type",
                "must not be empty",
            ));
        }
        self.store.validate()
    }
}

/// Trusted user certificate store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    /// Store backend.
    #[serde(default)]
    pub kind: StoreKind,

    /// Store directory (required for [`StoreKind::Directory`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreSettings {
    /// Validates the store settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.kind == StoreKind::Directory && self.path.is_none() {
            return Err(ConfigError::validation(
                "credentials.store.path",
                "a directory store requires a path",
            ));
        }
        Ok(())
    }
}

/// Certificate store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process store, empty at start.
    #[default]
    Memory,
    /// Directory with an `index.json` and DER files.
    Directory,
}

// =============================================================================
// LoggingConfig
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::validation(
                "logging.level",
                format!("unknown level '{}'", other),
            )),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON lines.
    Json,
    /// Compact single-line text.
    Compact,
}
