// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the model bridge.
//!
//! Every failure surfaces to the immediate caller (session establishment,
//! monitored item creation, metadata assembly). Nothing is retried here;
//! [`BridgeError::is_retryable`] is only a hint for the caller.
//!
//! # Error Categories
//!
//! ```text
//! BridgeError
//! ├── InvalidArgument    - missing credential fields, malformed identifiers
//! ├── CertificateInvalid - private key lookup failed (carries subject/thumbprint)
//! ├── Unsupported        - unknown credential type, token subtype or enum value
//! ├── Timeout            - identity resolution exceeded the session timeout
//! └── Store              - certificate store I/O or index failure
//! ```
//!
//! # Examples
//!
//! ```
//! use uapub_bridge::error::{BridgeError, ErrorSeverity};
//!
//! let error = BridgeError::certificate_invalid("ABC123");
//! assert_eq!(error.status_code(), 0x8012_0000);
//! assert_eq!(error.severity(), ErrorSeverity::Error);
//! assert!(!error.is_retryable());
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

/// OPC UA status codes reported for bridge failures.
pub mod status {
    /// BadInternalError.
    pub const BAD_INTERNAL_ERROR: u32 = 0x8002_0000;
    /// BadTimeout.
    pub const BAD_TIMEOUT: u32 = 0x800A_0000;
    /// BadCertificateInvalid.
    pub const BAD_CERTIFICATE_INVALID: u32 = 0x8012_0000;
    /// BadNotSupported.
    pub const BAD_NOT_SUPPORTED: u32 = 0x803D_0000;
    /// BadInvalidArgument.
    pub const BAD_INVALID_ARGUMENT: u32 = 0x80AB_0000;
}

// =============================================================================
// BridgeError
// =============================================================================

/// The error type for all bridge conversions.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required argument is missing or malformed.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// No usable user certificate with private key was found.
    #[error(
        "User certificate for {subject} missing or provided password invalid. \
         Please configure the User Certificate correctly in the User certificate store."
    )]
    CertificateInvalid {
        /// Subject name or thumbprint used for the lookup.
        subject: String,
    },

    /// The requested feature or value is not supported.
    #[error("Not supported: {message}")]
    Unsupported {
        /// Error message.
        message: String,
    },

    /// Identity resolution did not complete in time.
    #[error("Identity resolution timed out after {duration:?}")]
    Timeout {
        /// Configured timeout.
        duration: Duration,
    },

    /// The certificate store could not be read.
    #[error("Certificate store '{store}' failed: {message}")]
    Store {
        /// Store name.
        store: String,
        /// Error message.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: Option<std::io::Error>,
    },
}

impl BridgeError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a certificate invalid error for a subject or thumbprint.
    pub fn certificate_invalid(subject: impl Into<String>) -> Self {
        Self::CertificateInvalid {
            subject: subject.into(),
        }
    }

    /// Creates an unsupported error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Creates an unsupported error for an enumerated value outside its table.
    pub fn unsupported_value(kind: &str, value: impl fmt::Display) -> Self {
        Self::Unsupported {
            message: format!("{} value '{}' is not recognized", kind, value),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Creates a store error.
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a store error from an I/O failure.
    pub fn store_io(
        store: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns the OPC UA status code for this error.
    pub fn status_code(&self) -> u32 {
        match self {
            Self::InvalidArgument { .. } => status::BAD_INVALID_ARGUMENT,
            Self::CertificateInvalid { .. } => status::BAD_CERTIFICATE_INVALID,
            Self::Unsupported { .. } => status::BAD_NOT_SUPPORTED,
            Self::Timeout { .. } => status::BAD_TIMEOUT,
            Self::Store { .. } => status::BAD_INTERNAL_ERROR,
        }
    }

    /// Returns `true` if the caller may reasonably retry the operation.
    ///
    /// Only transient conditions qualify; configuration defects never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Store { .. })
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::InvalidArgument { .. } | Self::CertificateInvalid { .. } => {
                ErrorSeverity::Error
            }
            Self::Unsupported { .. } => ErrorSeverity::Error,
            Self::Store { .. } => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::CertificateInvalid { .. } => "certificate",
            Self::Unsupported { .. } => "unsupported",
            Self::Timeout { .. } => "timeout",
            Self::Store { .. } => "store",
        }
    }

    /// Returns a structured error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::new(1, 1),
            Self::CertificateInvalid { .. } => ErrorCode::new(2, 1),
            Self::Unsupported { .. } => ErrorCode::new(3, 1),
            Self::Timeout { .. } => ErrorCode::new(4, 1),
            Self::Store { .. } => ErrorCode::new(5, 1),
        }
    }

    /// Returns a short message suitable for RPC responses.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument { message } => format!("Invalid request: {}", message),
            Self::CertificateInvalid { subject } => {
                format!("User certificate '{}' is not available", subject)
            }
            Self::Unsupported { message } => message.clone(),
            Self::Timeout { .. } => "Session establishment timed out".to_string(),
            Self::Store { store, .. } => format!("Certificate store '{}' unavailable", store),
        }
    }

    /// Logs this error with the level implied by its severity.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.severity().to_tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                status_code = self.status_code(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                status_code = self.status_code(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                status_code = self.status_code(),
                "{self}"
            ),
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - the operation failed, the process is unaffected.
    Error,
    /// Critical - a shared resource is unusable.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code, displayed as `UB-XXYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UB-{:02X}{:02X}", self.category, self.code)
    }
}
