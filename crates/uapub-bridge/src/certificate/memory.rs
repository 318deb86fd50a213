// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory certificate store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{passcode_digest, CertificateStore, CertificateWithKey, KeyQuery, OpenStore};
use crate::error::BridgeResult;

#[derive(Debug, Clone)]
struct MemoryEntry {
    certificate: CertificateWithKey,
    passcode_sha256: Option<String>,
}

#[derive(Debug, Default)]
struct StoreStats {
    opened: AtomicUsize,
    released: AtomicUsize,
    lookups: AtomicUsize,
}

/// In-memory store for tests and embedding.
///
/// Counts handle acquisitions, releases and lookups.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    stats: Arc<StoreStats>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a certificate, optionally protected by a passcode.
    pub async fn add(&self, certificate: CertificateWithKey, password: Option<&str>) {
        tracing::debug!(
            thumbprint = %certificate.thumbprint,
            subject = %certificate.subject,
            "Added certificate to memory store"
        );
        self.entries.write().await.push(MemoryEntry {
            certificate,
            passcode_sha256: password.map(passcode_digest),
        });
    }

    /// Returns the number of stored certificates.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the store holds no certificates.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of handles opened so far.
    pub fn open_count(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    /// Number of handles released so far.
    pub fn release_count(&self) -> usize {
        self.stats.released.load(Ordering::SeqCst)
    }

    /// Number of key lookups performed.
    pub fn lookup_count(&self) -> usize {
        self.stats.lookups.load(Ordering::SeqCst)
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.open_count().saturating_sub(self.release_count())
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    async fn open(&self) -> BridgeResult<Box<dyn OpenStore>> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryHandle {
            entries: Arc::clone(&self.entries),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MemoryHandle {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    stats: Arc<StoreStats>,
}

#[async_trait]
impl OpenStore for MemoryHandle {
    async fn load_private_key(&mut self, query: KeyQuery<'_>) -> BridgeResult<Option<CertificateWithKey>> {
        self.stats.lookups.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| {
                query.matches(
                    &e.certificate.thumbprint,
                    &e.certificate.subject,
                    e.passcode_sha256.as_deref(),
                )
            })
            .map(|e| e.certificate.clone()))
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}
