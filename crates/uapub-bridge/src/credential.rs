// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session identity resolution.
//!
//! # Rules
//!
//! ```text
//! credential                                   result
//! absent / None                                Anonymous (store untouched)
//! UserName with user and password              UserPassword
//! UserName missing either                      InvalidArgument
//! X509Certificate with thumbprint or user      Certificate, or CertificateInvalid on miss
//! X509Certificate with neither                 Unsupported
//! JwtToken                                     Unsupported
//! ```
//!
//! # Examples
//!
//! ```
//! use uapub_bridge::certificate::MemoryStore;
//! use uapub_bridge::credential::{resolve_identity, SessionIdentity};
//!
//! # tokio_test_block(async {
//! let store = MemoryStore::new();
//! let identity = resolve_identity(None, &store).await.unwrap();
//! assert!(matches!(identity, SessionIdentity::Anonymous));
//! assert_eq!(store.open_count(), 0);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use uapub_config::CredentialSettings;

use crate::certificate::{store_from_settings, CertificateStore, CertificateWithKey, KeyQuery};
use crate::error::{BridgeError, BridgeResult};
use crate::types::ProtocolEnum;

// =============================================================================
// CredentialType
// =============================================================================

/// Kind of credential presented when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CredentialType {
    /// Anonymous.
    #[default]
    None,
    /// User name and password.
    UserName,
    /// X.509 user certificate.
    X509Certificate,
    /// JSON Web Token.
    JwtToken,
}

impl ProtocolEnum for CredentialType {
    const KIND: &'static str = "CredentialType";

    fn all() -> &'static [Self] {
        &[Self::None, Self::UserName, Self::X509Certificate, Self::JwtToken]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::UserName => "UserName",
            Self::X509Certificate => "X509Certificate",
            Self::JwtToken => "JwtToken",
        }
    }

    fn value(&self) -> u32 {
        *self as u32
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CredentialSpec
// =============================================================================

/// Credential configured for an endpoint.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSpec {
    /// Credential kind.
    #[serde(rename = "type", default)]
    pub credential_type: CredentialType,
    /// User name, or certificate subject name for X.509.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Password, or private key passcode for X.509.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Certificate thumbprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbprint: Option<String>,
}

impl CredentialSpec {
    /// Creates a user name credential.
    pub fn user_name(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credential_type: CredentialType::UserName,
            user: Some(user.into()),
            password: Some(password.into()),
            thumbprint: None,
        }
    }

    /// Creates a certificate credential selected by thumbprint.
    pub fn certificate(thumbprint: impl Into<String>, password: Option<String>) -> Self {
        Self {
            credential_type: CredentialType::X509Certificate,
            user: None,
            password,
            thumbprint: Some(thumbprint.into()),
        }
    }
}

impl fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSpec")
            .field("credential_type", &self.credential_type)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("thumbprint", &self.thumbprint)
            .finish()
    }
}

// =============================================================================
// SessionIdentity
// =============================================================================

/// Identity presented to the server when activating a session.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionIdentity {
    /// Anonymous identity token.
    Anonymous,
    /// User name identity token.
    UserPassword {
        /// User name.
        user: String,
        /// Password.
        password: String,
    },
    /// X.509 identity token with the key used to sign it.
    Certificate(CertificateWithKey),
}

impl SessionIdentity {
    /// Returns the matching credential type.
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Anonymous => CredentialType::None,
            Self::UserPassword { .. } => CredentialType::UserName,
            Self::Certificate(_) => CredentialType::X509Certificate,
        }
    }
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UserPassword { user, .. } => f
                .debug_struct("UserPassword")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Self::Certificate(cert) => f.debug_tuple("Certificate").field(cert).finish(),
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves a credential into a session identity.
///
/// Only certificate credentials touch the store. The store handle is
/// released before this returns, and when the future is dropped early.
pub async fn resolve_identity(
    credential: Option<&CredentialSpec>,
    store: &dyn CertificateStore,
) -> BridgeResult<SessionIdentity> {
    let Some(credential) = credential else {
        return Ok(SessionIdentity::Anonymous);
    };
    debug!(credential_type = %credential.credential_type, "Resolving session identity");

    match credential.credential_type {
        CredentialType::None => Ok(SessionIdentity::Anonymous),
        CredentialType::UserName => match (&credential.user, &credential.password) {
            (Some(user), Some(password)) => Ok(SessionIdentity::UserPassword {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => Err(BridgeError::invalid_argument(format!(
                "Credential type {} requires providing a user name and password.",
                credential.credential_type
            ))),
        },
        CredentialType::X509Certificate => {
            let query = KeyQuery {
                thumbprint: credential.thumbprint.as_deref(),
                subject: credential.user.as_deref(),
                password: credential.password.as_deref(),
            };
            if query.thumbprint.is_none() && query.subject.is_none() {
                return Err(BridgeError::unsupported(
                    "X509Certificate credential requires to set either a thumbprint or subject name (user).",
                ));
            }
            load_certificate(store, query).await
        }
        CredentialType::JwtToken => Err(BridgeError::unsupported(format!(
            "Credential type {} is not supported",
            credential.credential_type
        ))),
    }
}

async fn load_certificate(store: &dyn CertificateStore, query: KeyQuery<'_>) -> BridgeResult<SessionIdentity> {
    let found = {
        let mut handle = store.open().await?;
        handle.load_private_key(query).await?
    };

    match found {
        Some(certificate) => {
            debug!(thumbprint = %certificate.thumbprint, store = store.name(), "Loaded user certificate");
            Ok(SessionIdentity::Certificate(certificate))
        }
        None => {
            warn!(
                subject = query.subject,
                thumbprint = query.thumbprint,
                store = store.name(),
                "User certificate not found"
            );
            Err(BridgeError::certificate_invalid(query.describe()))
        }
    }
}

// =============================================================================
// CredentialResolver
// =============================================================================

/// Resolves identities against a store within the session timeout.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CertificateStore>,
    timeout: Duration,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("store", &self.store.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CredentialResolver {
    /// Creates a resolver.
    pub fn new(store: Arc<dyn CertificateStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Creates a resolver from configuration.
    pub fn from_settings(settings: &CredentialSettings) -> BridgeResult<Self> {
        Ok(Self::new(store_from_settings(&settings.store)?, settings.session_timeout))
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<dyn CertificateStore> {
        &self.store
    }

    /// Returns the timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a credential, failing with `Timeout` when the store does
    /// not answer in time.
    pub async fn resolve(&self, credential: Option<&CredentialSpec>) -> BridgeResult<SessionIdentity> {
        tokio::time::timeout(self.timeout, resolve_identity(credential, self.store.as_ref()))
            .await
            .map_err(|_| {
                let err = BridgeError::timeout(self.timeout);
                err.log("resolve_identity");
                err
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::MemoryStore;
    use uapub_config::StoreKind;

    fn operator() -> CertificateWithKey {
        CertificateWithKey::new("ABC123", "CN=operator", vec![0x30], vec![0x01])
    }

    #[tokio::test]
    async fn test_absent_and_none_are_anonymous() {
        let store = MemoryStore::new();
        assert_eq!(resolve_identity(None, &store).await.unwrap(), SessionIdentity::Anonymous);

        let spec = CredentialSpec::default();
        assert_eq!(
            resolve_identity(Some(&spec), &store).await.unwrap(),
            SessionIdentity::Anonymous
        );
        assert_eq!(store.open_count(), 0);
    }

    #[tokio::test]
    async fn test_user_name() {
        let store = MemoryStore::new();
        let spec = CredentialSpec::user_name("operator", "s3cret");
        let identity = resolve_identity(Some(&spec), &store).await.unwrap();
        assert_eq!(identity.credential_type(), CredentialType::UserName);
        assert!(!format!("{identity:?}").contains("s3cret"));
        assert_eq!(store.open_count(), 0);
    }

    #[tokio::test]
    async fn test_user_name_requires_password() {
        let store = MemoryStore::new();
        let spec = CredentialSpec {
            password: None,
            ..CredentialSpec::user_name("operator", "x")
        };
        let err = resolve_identity(Some(&spec), &store).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_certificate_found() {
        let store = MemoryStore::new();
        store.add(operator(), Some("p")).await;

        let spec = CredentialSpec::certificate("abc123", Some("p".into()));
        let identity = resolve_identity(Some(&spec), &store).await.unwrap();
        assert_eq!(identity, SessionIdentity::Certificate(operator()));
        assert_eq!(store.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_certificate_by_subject() {
        let store = MemoryStore::new();
        store.add(operator(), None).await;

        let spec = CredentialSpec {
            credential_type: CredentialType::X509Certificate,
            user: Some("operator".into()),
            ..Default::default()
        };
        assert!(resolve_identity(Some(&spec), &store).await.is_ok());
    }

    #[tokio::test]
    async fn test_certificate_miss_names_subject() {
        let store = MemoryStore::new();
        let spec = CredentialSpec {
            credential_type: CredentialType::X509Certificate,
            user: Some("CN=engineer".into()),
            thumbprint: Some("FFFF".into()),
            password: None,
        };
        let err = resolve_identity(Some(&spec), &store).await.unwrap_err();
        assert!(matches!(err, BridgeError::CertificateInvalid { .. }));
        assert!(err.to_string().contains("CN=engineer"));
        assert_eq!(store.release_count(), 1);
    }

    #[tokio::test]
    async fn test_certificate_requires_selector() {
        let store = MemoryStore::new();
        let spec = CredentialSpec {
            credential_type: CredentialType::X509Certificate,
            password: Some("p".into()),
            ..Default::default()
        };
        let err = resolve_identity(Some(&spec), &store).await.unwrap_err();
        assert!(matches!(err, BridgeError::Unsupported { .. }));
        assert_eq!(store.open_count(), 0);
    }

    #[tokio::test]
    async fn test_jwt_not_supported() {
        let store = MemoryStore::new();
        let spec = CredentialSpec {
            credential_type: CredentialType::JwtToken,
            ..Default::default()
        };
        let err = resolve_identity(Some(&spec), &store).await.unwrap_err();
        assert!(err.to_string().contains("JwtToken"));
    }

    #[tokio::test]
    async fn test_resolver_from_settings() {
        let resolver = CredentialResolver::from_settings(&CredentialSettings::default()).unwrap();
        assert_eq!(resolver.timeout(), Duration::from_secs(30));
        assert_eq!(resolver.store().name(), "MemoryStore");
        assert_eq!(resolver.resolve(None).await.unwrap(), SessionIdentity::Anonymous);

        let mut settings = CredentialSettings::default();
        settings.store.kind = StoreKind::Directory;
        assert!(matches!(
            CredentialResolver::from_settings(&settings),
            Err(BridgeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_spec_serde() {
        let spec: CredentialSpec =
            serde_json::from_str(r#"{"type":"X509Certificate","thumbprint":"ABC123","password":"p"}"#)
                .unwrap();
        assert_eq!(spec.credential_type, CredentialType::X509Certificate);
        assert!(!format!("{spec:?}").contains("\"p\""));
    }
}
