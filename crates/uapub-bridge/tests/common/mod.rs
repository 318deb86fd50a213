// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared fixtures for bridge integration tests.

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use uapub_bridge::certificate::{CertificateStore, CertificateWithKey, KeyQuery, MemoryStore, OpenStore};
use uapub_bridge::metadata::{
    DataSetDescriptionSpec, FieldMetadataSpec, PublishedDataSetMetadataSpec, StructureDescriptionSpec,
    StructureFieldSpec,
};
use uapub_bridge::{BridgeResult, NamespaceTable};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Namespace of the OPC PLC simulator.
pub const PLC_NAMESPACE: &str = "http://microsoft.com/Opc/OpcPlc/";

/// Initializes test logging once per test binary.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,uapub_bridge=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Namespace table of a simulator session.
pub fn plc_namespaces() -> NamespaceTable {
    NamespaceTable::new([PLC_NAMESPACE, "http://microsoft.com/Opc/OpcPlc/Boiler"])
}

/// The same namespaces as [`plc_namespaces`], reordered after a server restart.
pub fn reordered_namespaces() -> NamespaceTable {
    NamespaceTable::new([
        "http://microsoft.com/Opc/OpcPlc/Boiler",
        "urn:OpcPlc:ReferenceServer",
        PLC_NAMESPACE,
    ])
}

/// An operator certificate with a dummy key.
pub fn operator_certificate() -> CertificateWithKey {
    CertificateWithKey::new(
        "5B6A3C9F0D1E2A4B8C7D6E5F4A3B2C1D0E9F8A7B",
        "CN=operator, O=Contoso, C=US",
        vec![0x30, 0x82, 0x01, 0x0A],
        vec![0x30, 0x82, 0x04, 0xA4],
    )
}

/// Metadata for one structured simulator field.
pub fn slow_node_metadata() -> PublishedDataSetMetadataSpec {
    PublishedDataSetMetadataSpec {
        data_set_metadata: DataSetDescriptionSpec {
            name: Some("SlowNodes".into()),
            description: None,
            data_set_class_id: Uuid::nil(),
            major_version: None,
        },
        minor_version: 1,
        structure_data_types: Some(vec![StructureDescriptionSpec {
            name: format!("nsu={};SlowState", PLC_NAMESPACE),
            data_type_id: format!("nsu={};s=SlowState", PLC_NAMESPACE),
            base_data_type: Some("i=22".into()),
            default_encoding_id: None,
            structure_type: None,
            fields: vec![StructureFieldSpec {
                name: "Counter".into(),
                data_type: "i=7".into(),
                value_rank: -1,
                ..Default::default()
            }],
        }]),
        enum_data_types: None,
        simple_data_types: None,
        fields: vec![
            FieldMetadataSpec {
                name: "SlowUInt1".into(),
                id: Uuid::nil(),
                array_dimensions: None,
                built_in_type: 7,
                data_type: Some("i=7".into()),
                description: None,
                max_string_length: 0,
                value_rank: -1,
                flags: 0,
            },
            FieldMetadataSpec {
                name: "SlowState".into(),
                id: Uuid::nil(),
                array_dimensions: None,
                built_in_type: 22,
                data_type: Some(format!("nsu={};s=SlowState", PLC_NAMESPACE)),
                description: None,
                max_string_length: 0,
                value_rank: -1,
                flags: 0,
            },
        ],
    }
}

/// A store whose lookups take `delay`, wrapping a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

impl SlowStore {
    pub fn new(inner: MemoryStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl CertificateStore for SlowStore {
    fn name(&self) -> &str {
        "SlowStore"
    }

    async fn open(&self) -> BridgeResult<Box<dyn OpenStore>> {
        let inner = self.inner.open().await?;
        Ok(Box::new(SlowHandle {
            inner,
            delay: self.delay,
        }))
    }
}

struct SlowHandle {
    inner: Box<dyn OpenStore>,
    delay: Duration,
}

#[async_trait]
impl OpenStore for SlowHandle {
    async fn load_private_key(&mut self, query: KeyQuery<'_>) -> BridgeResult<Option<CertificateWithKey>> {
        tokio::time::sleep(self.delay).await;
        self.inner.load_private_key(query).await
    }
}
