// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uapub-config
//!
//! Configuration management for the OPC UA publisher model bridge.
//!
//! ## Features
//!
//! - **Schema**: request defaults, credential resolution and logging settings
//! - **Multi-Format Support**: YAML, TOML and JSON files
//! - **Environment Overrides**: `${VAR:default}` placeholders and `UAPUB_*` variables
//! - **Logging**: `tracing-subscriber` setup in text, JSON or compact format
//!
//! ## Quick Start
//!
//! ```no_run
//! use uapub_config::loader::load_config;
//!
//! let config = load_config("uapub.yaml").unwrap();
//! println!("Session timeout: {:?}", config.credentials.session_timeout);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod logging;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, ConfigFormat, ConfigLoader};
pub use logging::init_logging;
pub use schema::{
    BridgeConfig, CredentialSettings, LogFormat, LogLevel, LoggingConfig, RequestSettings,
    StoreKind, StoreSettings, DEFAULT_JWT_TOKEN_TYPE, DEFAULT_SESSION_TIMEOUT,
};
