// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Trusted user certificate stores.
//!
//! # Architecture
//!
//! ```text
//! CertificateStore (trait)  ── open() ──▶  OpenStore (scoped handle)
//!         ├── MemoryStore                      └── load_private_key()
//!         └── DirectoryStore
//! ```
//!
//! Handles are released when dropped, on success, on a lookup miss and
//! when the resolving future is cancelled.

mod directory;
mod memory;
mod store;

use std::sync::Arc;

use uapub_config::{StoreKind, StoreSettings};

use crate::error::{BridgeError, BridgeResult};

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use store::{
    passcode_digest, subject_matches, CertificateStore, CertificateWithKey, KeyQuery, OpenStore,
    StoredCertificate,
};

/// Creates the store described by configuration.
///
/// A directory store without a path fails with `InvalidArgument`.
pub fn store_from_settings(settings: &StoreSettings) -> BridgeResult<Arc<dyn CertificateStore>> {
    match settings.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Directory => {
            let path = settings.path.as_ref().ok_or_else(|| {
                BridgeError::invalid_argument(
                    "Directory certificate store requires credentials.store.path",
                )
            })?;
            Ok(Arc::new(DirectoryStore::new(path.clone())))
        }
    }
}
