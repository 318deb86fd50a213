// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Certificate store traits and shared lookup rules.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::BridgeResult;

// =============================================================================
// CertificateWithKey
// =============================================================================

/// A user certificate together with its private key.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateWithKey {
    /// Certificate thumbprint (hex).
    pub thumbprint: String,
    /// Subject distinguished name.
    pub subject: String,
    /// DER-encoded certificate.
    pub certificate: Vec<u8>,
    /// DER-encoded private key.
    pub private_key: Vec<u8>,
}

impl CertificateWithKey {
    /// Creates a certificate with key.
    pub fn new(
        thumbprint: impl Into<String>,
        subject: impl Into<String>,
        certificate: Vec<u8>,
        private_key: Vec<u8>,
    ) -> Self {
        Self {
            thumbprint: thumbprint.into(),
            subject: subject.into(),
            certificate,
            private_key,
        }
    }
}

impl fmt::Debug for CertificateWithKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateWithKey")
            .field("thumbprint", &self.thumbprint)
            .field("subject", &self.subject)
            .field("certificate_len", &self.certificate.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// StoredCertificate
// =============================================================================

/// Index entry describing a stored user certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCertificate {
    /// Certificate thumbprint (hex, compared case-insensitively).
    pub thumbprint: String,
    /// Subject distinguished name, e.g. `CN=operator, O=Plant`.
    pub subject: String,
    /// DER certificate file, relative to the store root.
    pub certificate_file: PathBuf,
    /// DER private key file, relative to the store root.
    pub private_key_file: PathBuf,
    /// SHA-256 hex digest of the key passcode, if the key is protected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode_sha256: Option<String>,
    /// When the entry was added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

// =============================================================================
// KeyQuery
// =============================================================================

/// Private key lookup criteria.
#[derive(Clone, Copy, Default)]
pub struct KeyQuery<'a> {
    /// Thumbprint to match.
    pub thumbprint: Option<&'a str>,
    /// Subject name to match (full DN or common name).
    pub subject: Option<&'a str>,
    /// Passcode protecting the private key.
    pub password: Option<&'a str>,
}

impl fmt::Debug for KeyQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyQuery")
            .field("thumbprint", &self.thumbprint)
            .field("subject", &self.subject)
            .field("password", &self.password.map(|_| "<redacted>"))
            .finish()
    }
}

impl<'a> KeyQuery<'a> {
    /// Returns `true` if an entry satisfies the query.
    ///
    /// Thumbprint and subject must both match when both are given. A
    /// protected key only matches with the right passcode.
    pub fn matches(&self, thumbprint: &str, subject: &str, passcode_sha256: Option<&str>) -> bool {
        if self.thumbprint.is_none() && self.subject.is_none() {
            return false;
        }
        if let Some(wanted) = self.thumbprint {
            if !wanted.trim().eq_ignore_ascii_case(thumbprint.trim()) {
                return false;
            }
        }
        if let Some(wanted) = self.subject {
            if !subject_matches(subject, wanted) {
                return false;
            }
        }
        match passcode_sha256 {
            None => true,
            Some(expected) => self
                .password
                .map(|p| passcode_digest(p).eq_ignore_ascii_case(expected))
                .unwrap_or(false),
        }
    }

    /// Returns the subject or thumbprint used for the lookup.
    pub fn describe(&self) -> &'a str {
        self.subject.or(self.thumbprint).unwrap_or_default()
    }
}

/// Compares a stored subject DN against a requested subject.
///
/// Accepts the full DN (ignoring case and spacing around separators) or
/// the bare common name.
pub fn subject_matches(dn: &str, wanted: &str) -> bool {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return false;
    }
    if normalize_dn(dn) == normalize_dn(wanted) {
        return true;
    }
    common_name(dn)
        .map(|cn| cn.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(|part| part.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

fn common_name(dn: &str) -> Option<&str> {
    dn.split(',').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim().eq_ignore_ascii_case("CN").then(|| value.trim())
    })
}

/// Returns the SHA-256 hex digest of a key passcode.
pub fn passcode_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

// =============================================================================
// Store traits
// =============================================================================

/// A trusted user certificate store.
///
/// [`CertificateStore::open`] hands out a scoped handle; the handle is
/// released when dropped, including when the owning future is cancelled.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Returns the store name.
    fn name(&self) -> &str;

    /// Opens the store.
    async fn open(&self) -> BridgeResult<Box<dyn OpenStore>>;
}

/// An open certificate store handle.
#[async_trait]
pub trait OpenStore: Send {
    /// Loads the certificate and private key matching the query.
    ///
    /// Returns `Ok(None)` when nothing matches or the passcode is wrong.
    async fn load_private_key(&mut self, query: KeyQuery<'_>) -> BridgeResult<Option<CertificateWithKey>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_matching() {
        let dn = "CN=operator, O=Contoso Plant, C=DE";
        assert!(subject_matches(dn, "operator"));
        assert!(subject_matches(dn, "cn=Operator,o=contoso plant,  c=de"));
        assert!(!subject_matches(dn, "engineer"));
        assert!(!subject_matches(dn, ""));
    }

    #[test]
    fn test_thumbprint_case_insensitive() {
        let query = KeyQuery {
            thumbprint: Some("abc123"),
            ..Default::default()
        };
        assert!(query.matches("ABC123", "CN=x", None));
        assert!(!query.matches("ABC124", "CN=x", None));
    }

    #[test]
    fn test_passcode_required_for_protected_key() {
        let digest = passcode_digest("secret");
        let mut query = KeyQuery {
            subject: Some("x"),
            ..Default::default()
        };
        assert!(!query.matches("T", "CN=x", Some(&digest)));

        query.password = Some("wrong");
        assert!(!query.matches("T", "CN=x", Some(&digest)));

        query.password = Some("secret");
        assert!(query.matches("T", "CN=x", Some(&digest)));
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        assert!(!KeyQuery::default().matches("T", "CN=x", None));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cert = CertificateWithKey::new("T", "CN=x", vec![1], vec![0xAA, 0xBB]);
        let query = KeyQuery {
            password: Some("hunter2"),
            ..Default::default()
        };
        assert!(!format!("{cert:?}").contains("170"));
        assert!(format!("{cert:?}").contains("<redacted>"));
        assert!(!format!("{query:?}").contains("hunter2"));
    }

    #[test]
    fn test_describe_prefers_subject() {
        let query = KeyQuery {
            thumbprint: Some("ABC123"),
            subject: Some("operator"),
            password: None,
        };
        assert_eq!(query.describe(), "operator");
        let query = KeyQuery {
            thumbprint: Some("ABC123"),
            ..Default::default()
        };
        assert_eq!(query.describe(), "ABC123");
    }
}
