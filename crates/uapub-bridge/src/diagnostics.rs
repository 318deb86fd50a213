// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request header construction from diagnostics settings.
//!
//! # Diagnostics masks
//!
//! ```text
//! Level        Mask   Contents
//! None            0   -
//! Status         99   service + operation symbolic id and text
//! Operations    995   service symbolic id and text, all operation diagnostics
//! Diagnostics  1007   service diagnostics without inner status, all operation diagnostics
//! All          1023   everything
//! ```
//!
//! Absent settings default to `Status`, a fresh UUID audit entry id and the
//! current UTC time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use uapub_config::RequestSettings;

use crate::error::BridgeResult;
use crate::types::{EnumValue, ProtocolEnum};

/// OPC UA `DiagnosticsMasks` bits.
pub mod mask {
    /// ServiceSymbolicId | ServiceLocalizedText.
    pub const SERVICE_SYMBOLIC_ID_AND_TEXT: u32 = 0x0003;
    /// Service diagnostics except inner diagnostics.
    pub const SERVICE_NO_INNER_STATUS: u32 = 0x000F;
    /// OperationSymbolicId | OperationLocalizedText.
    pub const OPERATION_SYMBOLIC_ID_AND_TEXT: u32 = 0x0060;
    /// Every operation-level bit.
    pub const OPERATION_ALL: u32 = 0x03E0;
    /// Every bit.
    pub const ALL: u32 = 0x03FF;
}

// =============================================================================
// DiagnosticsLevel
// =============================================================================

/// Amount of diagnostic information requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiagnosticsLevel {
    /// No diagnostics.
    None,
    /// Symbolic ids and texts.
    #[default]
    Status,
    /// Full operation diagnostics.
    Operations,
    /// Service and operation diagnostics.
    Diagnostics,
    /// Everything the server can return.
    All,
}

impl DiagnosticsLevel {
    /// Returns the `returnDiagnostics` bitmask for this level.
    pub const fn mask(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Status => mask::SERVICE_SYMBOLIC_ID_AND_TEXT | mask::OPERATION_SYMBOLIC_ID_AND_TEXT,
            Self::Operations => mask::SERVICE_SYMBOLIC_ID_AND_TEXT | mask::OPERATION_ALL,
            Self::Diagnostics => mask::SERVICE_NO_INNER_STATUS | mask::OPERATION_ALL,
            Self::All => mask::ALL,
        }
    }
}

impl ProtocolEnum for DiagnosticsLevel {
    const KIND: &'static str = "DiagnosticsLevel";

    fn all() -> &'static [Self] {
        &[
            Self::None,
            Self::Status,
            Self::Operations,
            Self::Diagnostics,
            Self::All,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Status => "Status",
            Self::Operations => "Operations",
            Self::Diagnostics => "Diagnostics",
            Self::All => "All",
        }
    }

    fn value(&self) -> u32 {
        *self as u32
    }
}

// =============================================================================
// Input models
// =============================================================================

/// Per-request diagnostics settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsConfig {
    /// Requested level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<DiagnosticsLevel>,
    /// Audit entry id to forward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
    /// Client timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Caller context of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    /// Authority that issued the operation, forwarded as audit entry id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_id: Option<String>,
    /// Time the operation was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

// =============================================================================
// RequestHeader
// =============================================================================

/// Protocol request header, fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeader {
    /// Audit entry id.
    pub audit_entry_id: String,
    /// `DiagnosticsMasks` bits.
    pub return_diagnostics_mask: u32,
    /// Request timestamp.
    pub timestamp: DateTime<Utc>,
    /// Timeout hint in milliseconds (0 = none).
    pub timeout_hint: u32,
}

/// Builds a request header from optional diagnostics settings.
pub fn build_request_header(diagnostics: Option<&DiagnosticsConfig>, timeout_hint: u32) -> RequestHeader {
    header(
        diagnostics.and_then(|d| d.level),
        diagnostics.and_then(|d| d.audit_id.clone()),
        diagnostics.and_then(|d| d.timestamp),
        timeout_hint,
    )
}

/// Builds a request header for an operation context.
///
/// The context's authority id becomes the audit entry id.
pub fn build_context_header(
    context: Option<&OperationContext>,
    level: Option<DiagnosticsLevel>,
    timestamp: Option<DateTime<Utc>>,
    timeout_hint: u32,
) -> RequestHeader {
    header(
        level,
        context.and_then(|c| c.authority_id.clone()),
        timestamp,
        timeout_hint,
    )
}

fn header(
    level: Option<DiagnosticsLevel>,
    audit_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    timeout_hint: u32,
) -> RequestHeader {
    RequestHeader {
        audit_entry_id: audit_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        return_diagnostics_mask: level.unwrap_or_default().mask(),
        timestamp: timestamp.unwrap_or_else(Utc::now),
        timeout_hint,
    }
}

// =============================================================================
// RequestHeaderBuilder
// =============================================================================

/// Request header factory carrying configured defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestHeaderBuilder {
    timeout_hint: u32,
    default_level: DiagnosticsLevel,
}

impl RequestHeaderBuilder {
    /// Creates a builder with no timeout hint and the `Status` default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from configuration.
    ///
    /// An unknown `diagnostics_level` name fails with `Unsupported`.
    pub fn from_settings(settings: &RequestSettings) -> BridgeResult<Self> {
        let default_level = match settings.diagnostics_level.as_deref() {
            Some(name) => DiagnosticsLevel::resolve(&EnumValue::from(name))?,
            None => DiagnosticsLevel::default(),
        };
        Ok(Self {
            timeout_hint: settings.timeout_hint_ms(),
            default_level,
        })
    }

    /// Sets the timeout hint in milliseconds.
    pub fn with_timeout_hint(mut self, timeout_hint: u32) -> Self {
        self.timeout_hint = timeout_hint;
        self
    }

    /// Sets the level used when a request carries none.
    pub fn with_default_level(mut self, level: DiagnosticsLevel) -> Self {
        self.default_level = level;
        self
    }

    /// Returns the configured timeout hint.
    pub fn timeout_hint(&self) -> u32 {
        self.timeout_hint
    }

    /// Builds a header, filling gaps from the configured defaults.
    pub fn build(&self, diagnostics: Option<&DiagnosticsConfig>) -> RequestHeader {
        let header = header(
            Some(
                diagnostics
                    .and_then(|d| d.level)
                    .unwrap_or(self.default_level),
            ),
            diagnostics.and_then(|d| d.audit_id.clone()),
            diagnostics.and_then(|d| d.timestamp),
            self.timeout_hint,
        );
        debug!(
            audit_entry_id = %header.audit_entry_id,
            return_diagnostics = header.return_diagnostics_mask,
            "Built request header"
        );
        header
    }

    /// Builds a header for an operation context.
    pub fn build_for_context(&self, context: Option<&OperationContext>) -> RequestHeader {
        build_context_header(
            context,
            Some(self.default_level),
            context.and_then(|c| c.time),
            self.timeout_hint,
        )
    }
}
