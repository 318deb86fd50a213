// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Directory-backed certificate store.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── index.json        list of StoredCertificate entries
//! ├── certs/<T>.der     certificates
//! └── private/<T>.key   private keys (0600 on unix)
//! ```
//!
//! The index is read when a handle is opened; files are read on lookup.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::store::{
    passcode_digest, CertificateStore, CertificateWithKey, KeyQuery, OpenStore, StoredCertificate,
};
use crate::error::{BridgeError, BridgeResult};

const INDEX_FILE: &str = "index.json";
const CERTS_DIR: &str = "certs";
const PRIVATE_DIR: &str = "private";

/// Certificate store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Creates a store rooted at `root`. Nothing is read until opened.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn io_error(&self, message: String, source: io::Error) -> BridgeError {
        BridgeError::store_io(self.root.display().to_string(), message, source)
    }

    async fn read_index(&self) -> BridgeResult<Vec<StoredCertificate>> {
        if !tokio::fs::try_exists(&self.root)
            .await
            .map_err(|e| self.io_error("Failed to access store directory".into(), e))?
        {
            return Err(BridgeError::store(
                self.root.display().to_string(),
                "store directory does not exist",
            ));
        }

        let path = self.index_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(format!("Failed to read {}", path.display()), e)),
        };

        serde_json::from_str(&content).map_err(|e| {
            BridgeError::store(
                self.root.display().to_string(),
                format!("Invalid index file: {}", e),
            )
        })
    }

    async fn write_index(&self, entries: &[StoredCertificate]) -> BridgeResult<()> {
        let content = serde_json::to_string_pretty(entries).map_err(|e| {
            BridgeError::store(
                self.root.display().to_string(),
                format!("Failed to serialize index: {}", e),
            )
        })?;
        let path = self.index_path();
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| self.io_error(format!("Failed to write {}", path.display()), e))
    }

    /// Adds a certificate with its private key, replacing any entry with
    /// the same thumbprint.
    pub async fn add(&self, certificate: &CertificateWithKey, password: Option<&str>) -> BridgeResult<StoredCertificate> {
        for dir in [self.root.join(CERTS_DIR), self.root.join(PRIVATE_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| self.io_error(format!("Failed to create {}", dir.display()), e))?;
        }

        let file_stem = certificate.thumbprint.to_ascii_uppercase();
        let certificate_file = PathBuf::from(CERTS_DIR).join(format!("{}.der", file_stem));
        let private_key_file = PathBuf::from(PRIVATE_DIR).join(format!("{}.key", file_stem));

        let cert_path = self.root.join(&certificate_file);
        tokio::fs::write(&cert_path, &certificate.certificate)
            .await
            .map_err(|e| self.io_error(format!("Failed to write {}", cert_path.display()), e))?;

        let key_path = self.root.join(&private_key_file);
        tokio::fs::write(&key_path, &certificate.private_key)
            .await
            .map_err(|e| self.io_error(format!("Failed to write {}", key_path.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&key_path, permissions).await.ok();
        }

        let stored = StoredCertificate {
            thumbprint: certificate.thumbprint.clone(),
            subject: certificate.subject.clone(),
            certificate_file,
            private_key_file,
            passcode_sha256: password.map(passcode_digest),
            added_at: Some(Utc::now()),
        };

        let mut entries = self.read_index().await?;
        entries.retain(|e| !e.thumbprint.eq_ignore_ascii_case(&stored.thumbprint));
        entries.push(stored.clone());
        self.write_index(&entries).await?;

        info!(
            thumbprint = %stored.thumbprint,
            subject = %stored.subject,
            "Added certificate to store"
        );
        Ok(stored)
    }
}

#[async_trait]
impl CertificateStore for DirectoryStore {
    fn name(&self) -> &str {
        "DirectoryStore"
    }

    async fn open(&self) -> BridgeResult<Box<dyn OpenStore>> {
        let entries = self.read_index().await?;
        debug!(
            root = %self.root.display(),
            entries = entries.len(),
            "Opened certificate store"
        );
        Ok(Box::new(DirectoryHandle {
            store: self.clone(),
            entries,
        }))
    }
}

struct DirectoryHandle {
    store: DirectoryStore,
    entries: Vec<StoredCertificate>,
}

#[async_trait]
impl OpenStore for DirectoryHandle {
    async fn load_private_key(&mut self, query: KeyQuery<'_>) -> BridgeResult<Option<CertificateWithKey>> {
        let Some(entry) = self
            .entries
            .iter()
            .find(|e| query.matches(&e.thumbprint, &e.subject, e.passcode_sha256.as_deref()))
        else {
            return Ok(None);
        };

        let root = self.store.root();
        let cert_path = root.join(&entry.certificate_file);
        let certificate = tokio::fs::read(&cert_path).await.map_err(|e| {
            self.store
                .io_error(format!("Failed to read {}", cert_path.display()), e)
        })?;

        let key_path = root.join(&entry.private_key_file);
        let private_key = match tokio::fs::read(&key_path).await {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(thumbprint = %entry.thumbprint, "Private key file missing");
                return Ok(None);
            }
            Err(e) => {
                return Err(self
                    .store
                    .io_error(format!("Failed to read {}", key_path.display()), e))
            }
        };

        Ok(Some(CertificateWithKey {
            thumbprint: entry.thumbprint.clone(),
            subject: entry.subject.clone(),
            certificate,
            private_key,
        }))
    }
}

impl Drop for DirectoryHandle {
    fn drop(&mut self) {
        debug!(root = %self.store.root.display(), "Released certificate store");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator() -> CertificateWithKey {
        CertificateWithKey::new("abc123", "CN=operator, O=Plant", vec![0x30, 0x82], vec![0x04, 0x01])
    }

    #[tokio::test]
    async fn test_add_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let stored = store.add(&operator(), Some("p")).await.unwrap();

        assert_eq!(stored.certificate_file, PathBuf::from("certs/ABC123.der"));
        assert!(dir.path().join("index.json").exists());

        let mut handle = store.open().await.unwrap();
        let found = handle
            .load_private_key(KeyQuery {
                thumbprint: Some("ABC123"),
                subject: None,
                password: Some("p"),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.certificate, vec![0x30, 0x82]);
        assert_eq!(found.private_key, vec![0x04, 0x01]);

        let wrong = handle
            .load_private_key(KeyQuery {
                subject: Some("operator"),
                password: Some("x"),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn test_add_replaces_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        store.add(&operator(), None).await.unwrap();
        store.add(&operator(), None).await.unwrap();

        let entries = store.read_index().await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let mut handle = store.open().await.unwrap();
        let found = handle
            .load_private_key(KeyQuery {
                thumbprint: Some("ABC123"),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("absent"));
        let err = store.open().await.err().unwrap();
        assert!(matches!(err, BridgeError::Store { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("index.json"), "{not json").await.unwrap();
        let store = DirectoryStore::new(dir.path());
        assert!(matches!(store.open().await, Err(BridgeError::Store { .. })));
    }

    #[tokio::test]
    async fn test_missing_key_file_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        store.add(&operator(), None).await.unwrap();
        tokio::fs::remove_file(dir.path().join("private/ABC123.key")).await.unwrap();

        let mut handle = store.open().await.unwrap();
        let found = handle
            .load_private_key(KeyQuery {
                thumbprint: Some("abc123"),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
