// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol-native value types shared by every converter.
//!
//! - **NodeId**: the four OPC UA identifier kinds bound to a namespace index
//! - **QualifiedName**: a namespace-qualified browse name
//! - **EnumValue**: an enumerated configuration value as received, before
//!   it is checked against the protocol table
//! - **min_date_time**: the protocol's "no timestamp" sentinel
//!
//! # Examples
//!
//! ```
//! use uapub_bridge::types::NodeId;
//!
//! let node: NodeId = "ns=2;s=Temperature".parse().unwrap();
//! assert_eq!(node.namespace_index, 2);
//! assert_eq!(node.to_string(), "ns=2;s=Temperature");
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA node identifier bound to a namespace index.
///
/// The index only has meaning together with the namespace table it was
/// resolved against; see [`crate::namespace::NamespaceTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Returns the null node ID (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self {
            namespace_index: 0,
            identifier: NodeIdentifier::Numeric(0),
        }
    }

    /// Returns `true` if this is the null node ID.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Formats with the namespace index (`ns=2;s=X`, or `i=85` for ns 0).
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = BridgeError;

    /// Parses the index-based forms `ns=2;i=1001`, `ns=2;s=X`, `i=85`, ...
    ///
    /// URI-qualified forms need a namespace table; use
    /// [`crate::namespace::NamespaceTable::parse_node_id`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest.split_once(';').ok_or_else(|| {
                    invalid_node_id(s, "missing identifier after namespace")
                })?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| invalid_node_id(s, "invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = identifier_part
            .parse::<NodeIdentifier>()
            .map_err(|reason| invalid_node_id(s, &reason))?;

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

fn invalid_node_id(text: &str, reason: &str) -> BridgeError {
    BridgeError::invalid_argument(format!("Invalid node id '{}': {}", text, reason))
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

impl FromStr for NodeIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("i=") {
            id.parse()
                .map(Self::Numeric)
                .map_err(|_| "invalid numeric identifier".to_string())
        } else if let Some(id) = s.strip_prefix("s=") {
            Ok(Self::String(id.to_string()))
        } else if let Some(id) = s.strip_prefix("g=") {
            Uuid::parse_str(id)
                .map(Self::Guid)
                .map_err(|e| format!("invalid GUID: {}", e))
        } else if let Some(id) = s.strip_prefix("b=") {
            BASE64
                .decode(id)
                .map(Self::Opaque)
                .map_err(|e| format!("invalid base64: {}", e))
        } else {
            Err("unknown identifier type, expected i=, s=, g= or b=".to_string())
        }
    }
}

// =============================================================================
// QualifiedName
// =============================================================================

/// Namespace-qualified name, e.g. a browse path element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,
    /// Name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

// =============================================================================
// EnumValue
// =============================================================================

/// An enumerated configuration value as it arrived from upstream.
///
/// Upstream validation only checks shape, so the value may name an entry
/// the protocol table does not contain. [`ProtocolEnum::resolve`] performs
/// the range check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    /// Numeric wire value.
    Value(i64),
    /// Symbolic name.
    Name(String),
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::Name(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for EnumValue {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<i64> for EnumValue {
    fn from(value: i64) -> Self {
        Self::Value(value)
    }
}

/// A closed protocol enumeration with a fixed name/value table.
pub trait ProtocolEnum: Sized + Copy + 'static {
    /// Name used in error messages.
    const KIND: &'static str;

    /// Every member, in wire-value order.
    fn all() -> &'static [Self];

    /// Symbolic name.
    fn name(&self) -> &'static str;

    /// Wire value.
    fn value(&self) -> u32;

    /// Looks up a member by wire value.
    fn from_value(value: i64) -> Option<Self> {
        Self::all().iter().copied().find(|m| i64::from(m.value()) == value)
    }

    /// Looks up a member by name (case-insensitive).
    fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Resolves a received value, failing with `Unsupported` when it lies
    /// outside the table.
    fn resolve(value: &EnumValue) -> BridgeResult<Self> {
        let found = match value {
            EnumValue::Value(v) => Self::from_value(*v),
            EnumValue::Name(n) => Self::from_name(n),
        };
        found.ok_or_else(|| BridgeError::unsupported_value(Self::KIND, value))
    }
}

// =============================================================================
// DateTime sentinel
// =============================================================================

/// Seconds between 1601-01-01 and 1970-01-01.
const UA_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Returns the protocol's minimum instant (1601-01-01T00:00:00Z).
///
/// Encoders write it as zero, which servers read as "not specified".
pub fn min_date_time() -> DateTime<Utc> {
    Utc.timestamp_opt(-UA_EPOCH_OFFSET_SECS, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_node_id_parse() {
        let node: NodeId = "ns=2;i=1001".parse().unwrap();
        assert_eq!(node, NodeId::numeric(2, 1001));

        let node: NodeId = "i=85".parse().unwrap();
        assert_eq!(node.namespace_index, 0);
        assert_eq!(node.as_numeric(), Some(85));

        let node: NodeId = "ns=3;s=Line1.Speed".parse().unwrap();
        assert_eq!(node.as_string(), Some("Line1.Speed"));

        let node: NodeId = "ns=1;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert!(matches!(node.identifier, NodeIdentifier::Guid(_)));

        let node: NodeId = "ns=1;b=AQIDBA==".parse().unwrap();
        assert_eq!(node.identifier, NodeIdentifier::Opaque(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_node_id_parse_errors() {
        for bad in ["ns=2", "ns=x;i=1", "ns=2;i=abc", "x=1", "ns=2;g=not-a-guid"] {
            let err = bad.parse::<NodeId>().unwrap_err();
            assert!(matches!(err, BridgeError::InvalidArgument { .. }), "{bad}");
        }
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::numeric(0, 85).to_string(), "i=85");
        assert_eq!(NodeId::string(2, "A").to_string(), "ns=2;s=A");
        assert!(NodeId::default().is_null());
    }

    #[test]
    fn test_qualified_name_display() {
        assert_eq!(QualifiedName::new(0, "Value").to_string(), "Value");
        assert_eq!(QualifiedName::new(3, "Speed").to_string(), "3:Speed");
    }

    #[test]
    fn test_enum_value_deserialize() {
        let v: EnumValue = serde_json::from_str("2").unwrap();
        assert_eq!(v, EnumValue::Value(2));
        let v: EnumValue = serde_json::from_str("\"Percent\"").unwrap();
        assert_eq!(v, EnumValue::Name("Percent".to_string()));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Off = 0,
        On = 4,
    }

    impl ProtocolEnum for Mode {
        const KIND: &'static str = "Mode";

        fn all() -> &'static [Self] {
            &[Self::Off, Self::On]
        }

        fn name(&self) -> &'static str {
            match self {
                Self::Off => "Off",
                Self::On => "On",
            }
        }

        fn value(&self) -> u32 {
            *self as u32
        }
    }

    #[test]
    fn test_protocol_enum_lookup() {
        assert_eq!(Mode::from_value(4), Some(Mode::On));
        assert_eq!(Mode::from_value(1), None);
        assert_eq!(Mode::from_name(" off "), Some(Mode::Off));
        assert_eq!(Mode::resolve(&EnumValue::from("ON")).unwrap(), Mode::On);

        let err = Mode::resolve(&EnumValue::Value(7)).unwrap_err();
        assert!(matches!(err, BridgeError::Unsupported { .. }));
    }

    #[test]
    fn test_min_date_time() {
        let min = min_date_time();
        assert_eq!(min.year(), 1601);
        assert_eq!(min.month(), 1);
        assert_eq!(min.day(), 1);
    }
}
