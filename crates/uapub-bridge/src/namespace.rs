// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Namespace context snapshots and identifier codec.
//!
//! A [`NamespaceTable`] is an immutable snapshot of the session's namespace
//! array. Every converter takes one explicitly; identifiers resolved for a
//! single output structure must all come from the same snapshot, because
//! subscribers decode the embedded indices with the namespace array shipped
//! alongside them.
//!
//! # Accepted identifier forms
//!
//! ```text
//! i=85                                   namespace 0
//! ns=2;s=Line1.Speed                     explicit index
//! nsu=http://example.com/plant/;s=Speed  expanded, URI resolved to an index
//! http://example.com/plant/#s=Speed      URI form
//! ```
//!
//! # Examples
//!
//! ```
//! use uapub_bridge::namespace::{NamespaceFormat, NamespaceTable};
//!
//! let table = NamespaceTable::new(["http://microsoft.com/Opc/OpcPlc/"]);
//! let node = table
//!     .parse_node_id("nsu=http://microsoft.com/Opc/OpcPlc/;s=SlowUInt1")
//!     .unwrap();
//! assert_eq!(node.namespace_index, 1);
//! assert_eq!(
//!     table.format_node_id(&node, NamespaceFormat::Index).as_deref(),
//!     Some("ns=1;s=SlowUInt1")
//! );
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::types::{NodeId, NodeIdentifier, QualifiedName};

/// URI of the OPC UA base namespace, always at index 0.
pub const OPC_UA_NAMESPACE: &str = "http://opcfoundation.org/UA/";

// =============================================================================
// NamespaceFormat
// =============================================================================

/// Text form used when formatting identifiers for service models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NamespaceFormat {
    /// `<uri>#s=X`
    #[default]
    Uri,
    /// `ns=2;s=X`
    Index,
    /// `nsu=<uri>;s=X`
    Expanded,
}

// =============================================================================
// NamespaceTable
// =============================================================================

/// Immutable snapshot of a session's namespace array.
///
/// Clones share the same backing storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    uris: Arc<[String]>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl NamespaceTable {
    /// Creates a snapshot from server namespace URIs.
    ///
    /// The base namespace is inserted at index 0 when missing.
    pub fn new<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all: Vec<String> = uris.into_iter().map(Into::into).collect();
        if all.first().map(String::as_str) != Some(OPC_UA_NAMESPACE) {
            all.insert(0, OPC_UA_NAMESPACE.to_string());
        }
        Self { uris: all.into() }
    }

    /// Returns the namespace URIs in index order.
    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    /// Returns an owned copy of the namespace array.
    pub fn to_vec(&self) -> Vec<String> {
        self.uris.to_vec()
    }

    /// Returns the number of namespaces.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Always `false`; index 0 is always present.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Returns the index of a namespace URI.
    pub fn index_of(&self, uri: &str) -> Option<u16> {
        self.uris
            .iter()
            .position(|u| u == uri)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Returns the URI at a namespace index.
    pub fn uri(&self, index: u16) -> Option<&str> {
        self.uris.get(usize::from(index)).map(String::as_str)
    }

    fn require_index(&self, uri: &str, text: &str) -> BridgeResult<u16> {
        self.index_of(uri).ok_or_else(|| {
            BridgeError::invalid_argument(format!(
                "Namespace '{}' of '{}' is not in the namespace table",
                uri, text
            ))
        })
    }

    // =========================================================================
    // Node identifiers
    // =========================================================================

    /// Parses an identifier in any accepted form.
    pub fn parse_node_id(&self, text: &str) -> BridgeResult<NodeId> {
        let text = text.trim();

        if let Some(rest) = text.strip_prefix("nsu=") {
            let (uri, id) = rest.split_once(';').ok_or_else(|| {
                BridgeError::invalid_argument(format!(
                    "Invalid node id '{}': missing identifier after namespace uri",
                    text
                ))
            })?;
            let namespace_index = self.require_index(uri, text)?;
            let identifier = parse_identifier(id, text)?;
            return Ok(NodeId {
                namespace_index,
                identifier,
            });
        }

        if let Some((uri, id)) = split_uri_form(text).filter(|_| !is_index_form(text)) {
            let namespace_index = self.require_index(uri, text)?;
            let identifier = parse_identifier(id, text)?;
            return Ok(NodeId {
                namespace_index,
                identifier,
            });
        }

        let node: NodeId = text.parse()?;
        if usize::from(node.namespace_index) >= self.len() {
            return Err(BridgeError::invalid_argument(format!(
                "Namespace index {} of '{}' is outside the namespace table",
                node.namespace_index, text
            )));
        }
        Ok(node)
    }

    /// Resolves an optional identifier; absent or blank text is the null id.
    pub fn resolve_node_id(&self, text: Option<&str>) -> BridgeResult<NodeId> {
        match text.map(str::trim) {
            None | Some("") => Ok(NodeId::null()),
            Some(text) => self.parse_node_id(text),
        }
    }

    /// Formats an identifier; returns `None` for the null id.
    ///
    /// Indices missing from this table fall back to the index form.
    pub fn format_node_id(&self, node: &NodeId, format: NamespaceFormat) -> Option<String> {
        if node.is_null() {
            return None;
        }
        if node.namespace_index == 0 {
            return Some(node.identifier.to_string());
        }
        let text = match (format, self.uri(node.namespace_index)) {
            (NamespaceFormat::Uri, Some(uri)) => format!("{}#{}", uri, node.identifier),
            (NamespaceFormat::Expanded, Some(uri)) => format!("nsu={};{}", uri, node.identifier),
            _ => node.to_opc_string(),
        };
        Some(text)
    }

    // =========================================================================
    // Qualified names
    // =========================================================================

    /// Parses `Name`, `2:Name`, `nsu=<uri>;Name` or `<uri>#Name`.
    pub fn parse_qualified_name(&self, text: &str) -> BridgeResult<QualifiedName> {
        if let Some(rest) = text.strip_prefix("nsu=") {
            let (uri, name) = rest.split_once(';').ok_or_else(|| {
                BridgeError::invalid_argument(format!(
                    "Invalid qualified name '{}': missing name after namespace uri",
                    text
                ))
            })?;
            return Ok(QualifiedName::new(self.require_index(uri, text)?, name));
        }

        if let Some((uri, name)) = text.split_once('#') {
            if looks_like_uri(uri) {
                return Ok(QualifiedName::new(self.require_index(uri, text)?, name));
            }
        }

        if let Some((prefix, name)) = text.split_once(':') {
            if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
                let index = prefix
                    .parse::<u16>()
                    .ok()
                    .filter(|i| usize::from(*i) < self.len())
                    .ok_or_else(|| {
                        BridgeError::invalid_argument(format!(
                            "Namespace index {} of '{}' is outside the namespace table",
                            prefix, text
                        ))
                    })?;
                return Ok(QualifiedName::new(index, name));
            }
        }

        Ok(QualifiedName::new(0, text))
    }

    /// Formats a qualified name.
    pub fn format_qualified_name(&self, name: &QualifiedName, format: NamespaceFormat) -> String {
        if name.namespace_index == 0 {
            return name.name.clone();
        }
        match (format, self.uri(name.namespace_index)) {
            (NamespaceFormat::Uri, Some(uri)) => format!("{}#{}", uri, name.name),
            (NamespaceFormat::Expanded, Some(uri)) => format!("nsu={};{}", uri, name.name),
            _ => name.to_string(),
        }
    }
}

/// Index-form identifiers (`ns=...`, `i=...`) never carry a URI prefix.
fn is_index_form(text: &str) -> bool {
    ["ns=", "i=", "s=", "g=", "b="].iter().any(|t| text.starts_with(t))
}

/// Absolute URIs and URNs; a `#` in a plain browse name is part of the name.
fn looks_like_uri(text: &str) -> bool {
    text.contains("://") || text.starts_with("urn:")
}

/// Splits `<uri>#<kind>=<id>` at the first `#` followed by an identifier tag.
fn split_uri_form(text: &str) -> Option<(&str, &str)> {
    text.match_indices('#').find_map(|(pos, _)| {
        let id = &text[pos + 1..];
        let tagged = ["i=", "s=", "g=", "b="].iter().any(|t| id.starts_with(t));
        (tagged && pos > 0).then(|| (&text[..pos], id))
    })
}

fn parse_identifier(id: &str, text: &str) -> BridgeResult<NodeIdentifier> {
    id.parse().map_err(|reason: String| {
        BridgeError::invalid_argument(format!("Invalid node id '{}': {}", text, reason))
    })
}
