// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Simple attribute operands used in event filters.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::namespace::{NamespaceFormat, NamespaceTable};
use crate::types::{EnumValue, NodeId, ProtocolEnum, QualifiedName};

/// Node attribute ids.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeAttribute {
    NodeId = 1,
    NodeClass = 2,
    BrowseName = 3,
    DisplayName = 4,
    Description = 5,
    WriteMask = 6,
    UserWriteMask = 7,
    IsAbstract = 8,
    Symmetric = 9,
    InverseName = 10,
    ContainsNoLoops = 11,
    EventNotifier = 12,
    #[default]
    Value = 13,
    DataType = 14,
    ValueRank = 15,
    ArrayDimensions = 16,
    AccessLevel = 17,
    UserAccessLevel = 18,
    MinimumSamplingInterval = 19,
    Historizing = 20,
    Executable = 21,
    UserExecutable = 22,
    DataTypeDefinition = 23,
    RolePermissions = 24,
    UserRolePermissions = 25,
    AccessRestrictions = 26,
    AccessLevelEx = 27,
}

impl ProtocolEnum for NodeAttribute {
    const KIND: &'static str = "NodeAttribute";

    fn all() -> &'static [Self] {
        &[
            Self::NodeId,
            Self::NodeClass,
            Self::BrowseName,
            Self::DisplayName,
            Self::Description,
            Self::WriteMask,
            Self::UserWriteMask,
            Self::IsAbstract,
            Self::Symmetric,
            Self::InverseName,
            Self::ContainsNoLoops,
            Self::EventNotifier,
            Self::Value,
            Self::DataType,
            Self::ValueRank,
            Self::ArrayDimensions,
            Self::AccessLevel,
            Self::UserAccessLevel,
            Self::MinimumSamplingInterval,
            Self::Historizing,
            Self::Executable,
            Self::UserExecutable,
            Self::DataTypeDefinition,
            Self::RolePermissions,
            Self::UserRolePermissions,
            Self::AccessRestrictions,
            Self::AccessLevelEx,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::NodeId => "NodeId",
            Self::NodeClass => "NodeClass",
            Self::BrowseName => "BrowseName",
            Self::DisplayName => "DisplayName",
            Self::Description => "Description",
            Self::WriteMask => "WriteMask",
            Self::UserWriteMask => "UserWriteMask",
            Self::IsAbstract => "IsAbstract",
            Self::Symmetric => "Symmetric",
            Self::InverseName => "InverseName",
            Self::ContainsNoLoops => "ContainsNoLoops",
            Self::EventNotifier => "EventNotifier",
            Self::Value => "Value",
            Self::DataType => "DataType",
            Self::ValueRank => "ValueRank",
            Self::ArrayDimensions => "ArrayDimensions",
            Self::AccessLevel => "AccessLevel",
            Self::UserAccessLevel => "UserAccessLevel",
            Self::MinimumSamplingInterval => "MinimumSamplingInterval",
            Self::Historizing => "Historizing",
            Self::Executable => "Executable",
            Self::UserExecutable => "UserExecutable",
            Self::DataTypeDefinition => "DataTypeDefinition",
            Self::RolePermissions => "RolePermissions",
            Self::UserRolePermissions => "UserRolePermissions",
            Self::AccessRestrictions => "AccessRestrictions",
            Self::AccessLevelEx => "AccessLevelEx",
        }
    }

    fn value(&self) -> u32 {
        *self as u32
    }
}

/// Service-side operand with textual identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleAttributeOperandSpec {
    /// Event type definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definition_id: Option<String>,
    /// Browse path from the type definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_path: Option<Vec<String>>,
    /// Attribute to select, `Value` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_id: Option<EnumValue>,
    /// Index range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,
}

/// Protocol `SimpleAttributeOperand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleAttributeOperand {
    /// Event type definition.
    pub type_definition_id: NodeId,
    /// Browse path.
    pub browse_path: Vec<QualifiedName>,
    /// Attribute id.
    pub attribute_id: u32,
    /// Index range.
    pub index_range: Option<String>,
}

/// Converts a service operand to the protocol structure.
pub fn to_protocol(
    operand: Option<&SimpleAttributeOperandSpec>,
    namespaces: &NamespaceTable,
) -> BridgeResult<Option<SimpleAttributeOperand>> {
    let Some(operand) = operand else {
        return Ok(None);
    };
    let attribute = operand
        .attribute_id
        .as_ref()
        .map(NodeAttribute::resolve)
        .transpose()?
        .unwrap_or_default();
    let browse_path = operand
        .browse_path
        .iter()
        .flatten()
        .map(|name| namespaces.parse_qualified_name(name))
        .collect::<BridgeResult<Vec<_>>>()?;

    Ok(Some(SimpleAttributeOperand {
        type_definition_id: namespaces.resolve_node_id(operand.type_definition_id.as_deref())?,
        browse_path,
        attribute_id: attribute.value(),
        index_range: operand.index_range.clone(),
    }))
}

/// Converts a protocol operand back to its service form.
pub fn to_service(
    operand: Option<&SimpleAttributeOperand>,
    namespaces: &NamespaceTable,
    format: NamespaceFormat,
) -> BridgeResult<Option<SimpleAttributeOperandSpec>> {
    let Some(operand) = operand else {
        return Ok(None);
    };
    let attribute = NodeAttribute::from_value(i64::from(operand.attribute_id))
        .ok_or_else(|| BridgeError::unsupported_value(NodeAttribute::KIND, operand.attribute_id))?;

    Ok(Some(SimpleAttributeOperandSpec {
        type_definition_id: namespaces.format_node_id(&operand.type_definition_id, format),
        browse_path: Some(
            operand
                .browse_path
                .iter()
                .map(|name| namespaces.format_qualified_name(name, format))
                .collect(),
        ),
        attribute_id: Some(EnumValue::Name(attribute.name().to_string())),
        index_range: operand.index_range.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANT: &str = "urn:plant";

    #[test]
    fn test_to_protocol_defaults() {
        let namespaces = NamespaceTable::new([PLANT]);
        let spec = SimpleAttributeOperandSpec {
            type_definition_id: Some("i=2041".into()),
            browse_path: Some(vec!["Message".into(), format!("nsu={};Severity", PLANT)]),
            ..Default::default()
        };
        let operand = to_protocol(Some(&spec), &namespaces).unwrap().unwrap();
        assert_eq!(operand.attribute_id, NodeAttribute::Value.value());
        assert_eq!(operand.type_definition_id, NodeId::numeric(0, 2041));
        assert_eq!(
            operand.browse_path,
            vec![QualifiedName::new(0, "Message"), QualifiedName::new(1, "Severity")]
        );
    }

    #[test]
    fn test_unknown_attribute() {
        let spec = SimpleAttributeOperandSpec {
            attribute_id: Some(EnumValue::Value(99)),
            ..Default::default()
        };
        assert!(matches!(
            to_protocol(Some(&spec), &NamespaceTable::default()),
            Err(BridgeError::Unsupported { .. })
        ));

        let operand = SimpleAttributeOperand {
            type_definition_id: NodeId::null(),
            browse_path: Vec::new(),
            attribute_id: 0,
            index_range: None,
        };
        assert!(to_service(Some(&operand), &NamespaceTable::default(), NamespaceFormat::Uri).is_err());
    }

    #[test]
    fn test_to_service() {
        let namespaces = NamespaceTable::new([PLANT]);
        let operand = SimpleAttributeOperand {
            type_definition_id: NodeId::numeric(1, 7),
            browse_path: vec![QualifiedName::new(1, "Severity")],
            attribute_id: 4,
            index_range: Some("0:3".into()),
        };
        let spec = to_service(Some(&operand), &namespaces, NamespaceFormat::Expanded)
            .unwrap()
            .unwrap();
        assert_eq!(spec.type_definition_id.as_deref(), Some("nsu=urn:plant;i=7"));
        assert_eq!(spec.browse_path, Some(vec!["nsu=urn:plant;Severity".to_string()]));
        assert_eq!(spec.attribute_id, Some(EnumValue::Name("DisplayName".into())));
        assert_eq!(spec.index_range.as_deref(), Some("0:3"));

        let back = to_protocol(Some(&spec), &namespaces).unwrap().unwrap();
        assert_eq!(back, operand);
    }

    #[test]
    fn test_absent_operand() {
        assert!(to_protocol(None, &NamespaceTable::default()).unwrap().is_none());
        assert!(to_service(None, &NamespaceTable::default(), NamespaceFormat::Index)
            .unwrap()
            .is_none());
    }
}
