// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA protocol model bridge for the telemetry publisher.
//!
//! Translates publisher configuration models into the structures the OPC UA
//! session, subscription and PubSub layers expect.
//!
//! # Components
//!
//! - [`diagnostics`]: request headers from diagnostics settings
//! - [`filter`]: data change and aggregate monitoring filters
//! - [`credential`]: session identities, resolved against a [`certificate`] store
//! - [`policy`]: selectable authentication methods from server token policies
//! - [`metadata`]: PubSub dataset metadata bound to a namespace snapshot
//! - [`namespace`]: the namespace snapshot and identifier codec every
//!   converter reads from
//!
//! None of the components call each other. Everything except identity
//! resolution is synchronous and free of shared state.
//!
//! # Error Handling
//!
//! ```text
//! BridgeError
//! ├── InvalidArgument    - missing credential fields, malformed identifiers
//! ├── CertificateInvalid - user certificate or key not found
//! ├── Unsupported        - credential type, token subtype or enum value
//! ├── Timeout            - identity resolution exceeded the session timeout
//! └── Store              - certificate store unreadable
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use uapub_bridge::{build_request_header, translate, CredentialResolver, NamespaceTable};
//!
//! let namespaces = NamespaceTable::new(session.namespace_uris());
//! let header = build_request_header(request.diagnostics.as_ref(), 0);
//! let filter = translate(item.filter.as_ref(), &namespaces)?;
//! let identity = CredentialResolver::from_settings(&config.credentials)?
//!     .resolve(endpoint.credential.as_ref())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod certificate;
pub mod credential;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod namespace;
pub mod operand;
pub mod permission;
pub mod policy;
pub mod types;
pub mod view;

pub use error::{BridgeError, BridgeResult, ErrorCode, ErrorSeverity};

pub use types::{min_date_time, EnumValue, NodeId, NodeIdentifier, ProtocolEnum, QualifiedName};

pub use namespace::{NamespaceFormat, NamespaceTable, OPC_UA_NAMESPACE};

pub use diagnostics::{
    build_context_header, build_request_header, DiagnosticsConfig, DiagnosticsLevel,
    OperationContext, RequestHeader, RequestHeaderBuilder,
};

pub use filter::{
    translate, AggregateConfigSpec, AggregateConfiguration, AggregateFilter, AggregateFilterSpec,
    DataChangeFilter, DataChangeFilterSpec, DataChangeTrigger, DeadbandType, FilterSpec,
    ProtocolFilter,
};

pub use certificate::{
    store_from_settings, CertificateStore, CertificateWithKey, DirectoryStore, KeyQuery,
    MemoryStore, OpenStore, StoredCertificate,
};

pub use credential::{
    resolve_identity, CredentialResolver, CredentialSpec, CredentialType, SessionIdentity,
};

pub use policy::{
    derive_policies, derive_policies_with, AuthenticationMethod, ConfigurationParser, JsonParser,
    UserTokenPolicy, UserTokenType,
};

pub use metadata::{
    build_metadata, DataSetMetaData, DataSetMetadataBuilder, FieldMetaData,
    PublishedDataSetMetadataSpec, StructureType,
};

pub use view::{to_view_description, BrowseViewSpec, ViewDescription};

pub use operand::{NodeAttribute, SimpleAttributeOperand, SimpleAttributeOperandSpec};

pub use permission::{Permission, RolePermission, RolePermissionModel};
