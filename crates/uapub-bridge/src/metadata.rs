// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! PubSub dataset metadata assembly.
//!
//! Subscribers decode every embedded identifier with the `namespaces`
//! array shipped in the same message. A build therefore binds to exactly
//! one [`NamespaceTable`] snapshot: it copies the table into the output and
//! resolves every identifier through it. The identifier cache lives for a
//! single build and is never shared.
//!
//! Structures always report a first explicit field index of 0; inherited
//! field offsets are not computed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::BridgeResult;
use crate::namespace::NamespaceTable;
use crate::types::{EnumValue, NodeId, ProtocolEnum, QualifiedName};

/// Built-in type code of `Null`.
pub const BUILT_IN_TYPE_NULL: u8 = 0;

/// Default configuration major version.
pub const DEFAULT_MAJOR_VERSION: u32 = 1;

// =============================================================================
// StructureType
// =============================================================================

/// Structure encoding kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StructureType {
    /// Plain structure.
    #[default]
    Structure = 0,
    /// Structure with optional fields.
    StructureWithOptionalFields = 1,
    /// Union.
    Union = 2,
    /// Structure with subtyped values.
    StructureWithSubtypedValues = 3,
    /// Union with subtyped values.
    UnionWithSubtypedValues = 4,
}

impl ProtocolEnum for StructureType {
    const KIND: &'static str = "StructureType";

    fn all() -> &'static [Self] {
        &[
            Self::Structure,
            Self::StructureWithOptionalFields,
            Self::Union,
            Self::StructureWithSubtypedValues,
            Self::UnionWithSubtypedValues,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Structure => "Structure",
            Self::StructureWithOptionalFields => "StructureWithOptionalFields",
            Self::Union => "Union",
            Self::StructureWithSubtypedValues => "StructureWithSubtypedValues",
            Self::UnionWithSubtypedValues => "UnionWithSubtypedValues",
        }
    }

    fn value(&self) -> u32 {
        *self as u32
    }
}

// =============================================================================
// Input models
// =============================================================================

/// Metadata of a published dataset as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedDataSetMetadataSpec {
    /// Dataset identity.
    pub data_set_metadata: DataSetDescriptionSpec,
    /// Configuration minor version.
    pub minor_version: u32,
    /// Structure types used by fields.
    #[serde(default)]
    pub structure_data_types: Option<Vec<StructureDescriptionSpec>>,
    /// Enumeration types used by fields.
    #[serde(default)]
    pub enum_data_types: Option<Vec<EnumDescriptionSpec>>,
    /// Simple types used by fields.
    #[serde(default)]
    pub simple_data_types: Option<Vec<SimpleTypeDescriptionSpec>>,
    /// Dataset fields.
    #[serde(default)]
    pub fields: Vec<FieldMetadataSpec>,
}

/// Dataset identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetDescriptionSpec {
    /// Dataset name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Dataset class id.
    #[serde(default)]
    pub data_set_class_id: Uuid,
    /// Configuration major version.
    #[serde(default)]
    pub major_version: Option<u32>,
}

/// Structure type description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDescriptionSpec {
    /// Qualified type name.
    pub name: String,
    /// Data type node id.
    pub data_type_id: String,
    /// Base data type node id.
    #[serde(default)]
    pub base_data_type: Option<String>,
    /// Default binary encoding node id.
    #[serde(default)]
    pub default_encoding_id: Option<String>,
    /// Structure kind.
    #[serde(default)]
    pub structure_type: Option<EnumValue>,
    /// Fields.
    #[serde(default)]
    pub fields: Vec<StructureFieldSpec>,
}

/// Field of a structure type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureFieldSpec {
    /// Field name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Data type node id.
    pub data_type: String,
    /// Value rank.
    #[serde(default = "scalar_rank")]
    pub value_rank: i32,
    /// Array dimensions.
    #[serde(default)]
    pub array_dimensions: Option<Vec<u32>>,
    /// Maximum string length (0 = unlimited).
    #[serde(default)]
    pub max_string_length: u32,
    /// Optional field.
    #[serde(default)]
    pub is_optional: bool,
}

/// Enumeration type description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDescriptionSpec {
    /// Qualified type name.
    pub name: String,
    /// Data type node id.
    pub data_type_id: String,
    /// Built-in type code.
    #[serde(default)]
    pub built_in_type: Option<u8>,
    /// Enumeration members.
    #[serde(default)]
    pub fields: Vec<EnumFieldSpec>,
    /// Bit flag enumeration.
    #[serde(default)]
    pub is_option_set: bool,
}

/// Enumeration member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumFieldSpec {
    /// Member name.
    pub name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Member value.
    pub value: i64,
}

/// Simple (derived built-in) type description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleTypeDescriptionSpec {
    /// Qualified type name.
    pub name: String,
    /// Data type node id.
    pub data_type_id: String,
    /// Base data type node id.
    #[serde(default)]
    pub base_data_type: Option<String>,
    /// Built-in type code.
    #[serde(default)]
    pub built_in_type: Option<u8>,
}

/// Dataset field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadataSpec {
    /// Field name.
    pub name: String,
    /// Field id.
    pub id: Uuid,
    /// Array dimensions.
    #[serde(default)]
    pub array_dimensions: Option<Vec<u32>>,
    /// Built-in type code.
    #[serde(default)]
    pub built_in_type: u8,
    /// Data type node id.
    #[serde(default)]
    pub data_type: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Maximum string length.
    #[serde(default)]
    pub max_string_length: u32,
    /// Value rank.
    #[serde(default = "scalar_rank")]
    pub value_rank: i32,
    /// `DataSetFieldFlags` bits.
    #[serde(default)]
    pub flags: u16,
}

fn scalar_rank() -> i32 {
    -1
}

// =============================================================================
// Protocol structures
// =============================================================================

/// PubSub `DataSetMetaDataType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetMetaData {
    /// Dataset name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Dataset class id.
    pub data_set_class_id: Uuid,
    /// Namespace array every embedded index refers to.
    pub namespaces: Vec<String>,
    /// Structure types.
    pub structure_data_types: Vec<StructureDescription>,
    /// Enumeration types.
    pub enum_data_types: Vec<EnumDescription>,
    /// Simple types.
    pub simple_data_types: Vec<SimpleTypeDescription>,
    /// Fields.
    pub fields: Vec<FieldMetaData>,
    /// Configuration version.
    pub configuration_version: ConfigurationVersion,
}

/// Configuration version of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationVersion {
    /// Major version.
    pub major_version: u32,
    /// Minor version.
    pub minor_version: u32,
}

/// Dataset field metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetaData {
    /// Field name.
    pub name: String,
    /// Field id.
    pub data_set_field_id: Uuid,
    /// Array dimensions.
    pub array_dimensions: Option<Vec<u32>>,
    /// Built-in type code.
    pub built_in_type: u8,
    /// Data type.
    pub data_type: NodeId,
    /// Description.
    pub description: Option<String>,
    /// Maximum string length.
    pub max_string_length: u32,
    /// Value rank.
    pub value_rank: i32,
    /// `DataSetFieldFlags` bits.
    pub field_flags: u16,
}

/// Structure type description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDescription {
    /// Type name.
    pub name: QualifiedName,
    /// Data type.
    pub data_type_id: NodeId,
    /// Structure definition.
    pub structure_definition: StructureDefinition,
}

/// Structure definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    /// Default binary encoding.
    pub default_encoding_id: NodeId,
    /// Base data type.
    pub base_data_type: NodeId,
    /// Structure kind.
    pub structure_type: StructureType,
    /// Always 0.
    pub first_explicit_field_index: u32,
    /// Fields.
    pub fields: Vec<StructureField>,
}

/// Structure field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureField {
    /// Field name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Data type.
    pub data_type: NodeId,
    /// Value rank.
    pub value_rank: i32,
    /// Array dimensions.
    pub array_dimensions: Option<Vec<u32>>,
    /// Maximum string length.
    pub max_string_length: u32,
    /// Optional field.
    pub is_optional: bool,
}

/// Enumeration type description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDescription {
    /// Type name.
    pub name: QualifiedName,
    /// Data type.
    pub data_type_id: NodeId,
    /// Built-in type code.
    pub built_in_type: u8,
    /// Members.
    pub fields: Vec<EnumField>,
    /// Bit flag enumeration.
    pub is_option_set: bool,
}

/// Enumeration member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumField {
    /// Member name.
    pub name: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Value.
    pub value: i64,
}

/// Simple type description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleTypeDescription {
    /// Type name.
    pub name: QualifiedName,
    /// Data type.
    pub data_type_id: NodeId,
    /// Base data type.
    pub base_data_type: NodeId,
    /// Built-in type code.
    pub built_in_type: u8,
}

// =============================================================================
// DataSetMetadataBuilder
// =============================================================================

/// Builds dataset metadata against one namespace snapshot.
#[derive(Debug)]
pub struct DataSetMetadataBuilder<'a> {
    namespaces: &'a NamespaceTable,
    resolved: HashMap<String, NodeId>,
}

impl<'a> DataSetMetadataBuilder<'a> {
    /// Creates a builder bound to a snapshot.
    pub fn new(namespaces: &'a NamespaceTable) -> Self {
        Self {
            namespaces,
            resolved: HashMap::new(),
        }
    }

    /// Builds the metadata, consuming the builder and its cache.
    pub fn build(mut self, spec: &PublishedDataSetMetadataSpec) -> BridgeResult<DataSetMetaData> {
        let structure_data_types = spec
            .structure_data_types
            .iter()
            .flatten()
            .map(|s| self.structure(s))
            .collect::<BridgeResult<Vec<_>>>()?;
        let enum_data_types = spec
            .enum_data_types
            .iter()
            .flatten()
            .map(|e| self.enumeration(e))
            .collect::<BridgeResult<Vec<_>>>()?;
        let simple_data_types = spec
            .simple_data_types
            .iter()
            .flatten()
            .map(|s| self.simple_type(s))
            .collect::<BridgeResult<Vec<_>>>()?;
        let fields = spec
            .fields
            .iter()
            .map(|f| self.field(f))
            .collect::<BridgeResult<Vec<_>>>()?;

        let identity = &spec.data_set_metadata;
        let metadata = DataSetMetaData {
            name: identity.name.clone(),
            description: identity.description.clone(),
            data_set_class_id: identity.data_set_class_id,
            namespaces: self.namespaces.to_vec(),
            structure_data_types,
            enum_data_types,
            simple_data_types,
            fields,
            configuration_version: ConfigurationVersion {
                major_version: identity.major_version.unwrap_or(DEFAULT_MAJOR_VERSION),
                minor_version: spec.minor_version,
            },
        };

        debug!(
            name = ?metadata.name,
            fields = metadata.fields.len(),
            namespaces = metadata.namespaces.len(),
            resolved_ids = self.resolved.len(),
            "Built dataset metadata"
        );
        Ok(metadata)
    }

    fn node_id(&mut self, text: Option<&str>) -> BridgeResult<NodeId> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(NodeId::null());
        };
        if let Some(node) = self.resolved.get(text) {
            return Ok(node.clone());
        }
        let node = self.namespaces.parse_node_id(text)?;
        self.resolved.insert(text.to_string(), node.clone());
        Ok(node)
    }

    fn structure(&mut self, spec: &StructureDescriptionSpec) -> BridgeResult<StructureDescription> {
        let structure_type = spec
            .structure_type
            .as_ref()
            .map(StructureType::resolve)
            .transpose()?
            .unwrap_or_default();

        let fields = spec
            .fields
            .iter()
            .map(|f| {
                Ok(StructureField {
                    name: f.name.clone(),
                    description: f.description.clone(),
                    data_type: self.node_id(Some(&f.data_type))?,
                    value_rank: f.value_rank,
                    array_dimensions: f.array_dimensions.clone(),
                    max_string_length: f.max_string_length,
                    is_optional: f.is_optional,
                })
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        Ok(StructureDescription {
            name: self.namespaces.parse_qualified_name(&spec.name)?,
            data_type_id: self.node_id(Some(&spec.data_type_id))?,
            structure_definition: StructureDefinition {
                default_encoding_id: self.node_id(spec.default_encoding_id.as_deref())?,
                base_data_type: self.node_id(spec.base_data_type.as_deref())?,
                structure_type,
                first_explicit_field_index: 0,
                fields,
            },
        })
    }

    fn enumeration(&mut self, spec: &EnumDescriptionSpec) -> BridgeResult<EnumDescription> {
        Ok(EnumDescription {
            name: self.namespaces.parse_qualified_name(&spec.name)?,
            data_type_id: self.node_id(Some(&spec.data_type_id))?,
            built_in_type: spec.built_in_type.unwrap_or(BUILT_IN_TYPE_NULL),
            fields: spec
                .fields
                .iter()
                .map(|f| EnumField {
                    name: f.name.clone(),
                    display_name: f.display_name.clone(),
                    description: f.description.clone(),
                    value: f.value,
                })
                .collect(),
            is_option_set: spec.is_option_set,
        })
    }

    fn simple_type(&mut self, spec: &SimpleTypeDescriptionSpec) -> BridgeResult<SimpleTypeDescription> {
        Ok(SimpleTypeDescription {
            name: self.namespaces.parse_qualified_name(&spec.name)?,
            data_type_id: self.node_id(Some(&spec.data_type_id))?,
            base_data_type: self.node_id(spec.base_data_type.as_deref())?,
            built_in_type: spec.built_in_type.unwrap_or(BUILT_IN_TYPE_NULL),
        })
    }

    fn field(&mut self, spec: &FieldMetadataSpec) -> BridgeResult<FieldMetaData> {
        Ok(FieldMetaData {
            name: spec.name.clone(),
            data_set_field_id: spec.id,
            array_dimensions: spec.array_dimensions.clone(),
            built_in_type: spec.built_in_type,
            data_type: self.node_id(spec.data_type.as_deref())?,
            description: spec.description.clone(),
            max_string_length: spec.max_string_length,
            value_rank: spec.value_rank,
            field_flags: spec.flags,
        })
    }
}

/// Builds dataset metadata bound to `namespaces`.
pub fn build_metadata(
    spec: &PublishedDataSetMetadataSpec,
    namespaces: &NamespaceTable,
) -> BridgeResult<DataSetMetaData> {
    DataSetMetadataBuilder::new(namespaces).build(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    const PLANT: &str = "urn:plant:line1";

    fn spec() -> PublishedDataSetMetadataSpec {
        PublishedDataSetMetadataSpec {
            data_set_metadata: DataSetDescriptionSpec {
                name: Some("Line1".into()),
                description: Some("Line 1 telemetry".into()),
                data_set_class_id: Uuid::nil(),
                major_version: None,
            },
            minor_version: 3,
            structure_data_types: Some(vec![StructureDescriptionSpec {
                name: format!("nsu={};MotorState", PLANT),
                data_type_id: format!("nsu={};i=3001", PLANT),
                base_data_type: Some("i=22".into()),
                default_encoding_id: Some(format!("nsu={};i=3002", PLANT)),
                structure_type: None,
                fields: vec![StructureFieldSpec {
                    name: "Speed".into(),
                    data_type: "i=11".into(),
                    value_rank: -1,
                    ..Default::default()
                }],
            }]),
            enum_data_types: Some(vec![EnumDescriptionSpec {
                name: "Mode".into(),
                data_type_id: format!("{}#i=3010", PLANT),
                built_in_type: None,
                fields: vec![EnumFieldSpec {
                    name: "Auto".into(),
                    display_name: None,
                    description: None,
                    value: 1,
                }],
                is_option_set: true,
            }]),
            simple_data_types: None,
            fields: vec![FieldMetadataSpec {
                name: "MotorState".into(),
                id: Uuid::nil(),
                array_dimensions: Some(vec![4]),
                built_in_type: 22,
                data_type: Some(format!("nsu={};i=3001", PLANT)),
                description: None,
                max_string_length: 0,
                value_rank: 1,
                flags: 0,
            }],
        }
    }

    #[test]
    fn test_build_defaults() {
        let namespaces = NamespaceTable::new([PLANT]);
        let metadata = build_metadata(&spec(), &namespaces).unwrap();

        assert_eq!(metadata.namespaces, namespaces.to_vec());
        assert_eq!(metadata.configuration_version.major_version, 1);
        assert_eq!(metadata.configuration_version.minor_version, 3);
        assert!(metadata.simple_data_types.is_empty());

        let structure = &metadata.structure_data_types[0];
        assert_eq!(structure.name, QualifiedName::new(1, "MotorState"));
        assert_eq!(structure.data_type_id, NodeId::numeric(1, 3001));
        assert_eq!(structure.structure_definition.first_explicit_field_index, 0);
        assert_eq!(structure.structure_definition.structure_type, StructureType::Structure);
        assert_eq!(structure.structure_definition.default_encoding_id, NodeId::numeric(1, 3002));

        let enumeration = &metadata.enum_data_types[0];
        assert_eq!(enumeration.built_in_type, BUILT_IN_TYPE_NULL);
        assert!(enumeration.is_option_set);
        assert_eq!(enumeration.data_type_id, NodeId::numeric(1, 3010));

        let field = &metadata.fields[0];
        assert_eq!(field.data_type, NodeId::numeric(1, 3001));
        assert_eq!(field.array_dimensions, Some(vec![4]));
        assert_eq!(field.value_rank, 1);
    }

    #[test]
    fn test_explicit_major_version() {
        let mut spec = spec();
        spec.data_set_metadata.major_version = Some(7);
        let metadata = build_metadata(&spec, &NamespaceTable::new([PLANT])).unwrap();
        assert_eq!(metadata.configuration_version.major_version, 7);
    }

    #[test]
    fn test_indices_follow_snapshot() {
        let a = NamespaceTable::new([PLANT]);
        let b = NamespaceTable::new(["urn:other", PLANT]);

        let from_a = build_metadata(&spec(), &a).unwrap();
        let from_b = build_metadata(&spec(), &b).unwrap();

        assert_ne!(from_a.namespaces, from_b.namespaces);
        assert_eq!(from_a.fields[0].data_type, NodeId::numeric(1, 3001));
        assert_eq!(from_b.fields[0].data_type, NodeId::numeric(2, 3001));
        for metadata in [&from_a, &from_b] {
            let index = metadata.fields[0].data_type.namespace_index;
            assert_eq!(metadata.namespaces[usize::from(index)], PLANT);
        }
    }

    #[test]
    fn test_unknown_structure_type() {
        let mut spec = spec();
        if let Some(structures) = spec.structure_data_types.as_mut() {
            structures[0].structure_type = Some(EnumValue::Value(42));
        }
        let err = build_metadata(&spec, &NamespaceTable::new([PLANT])).unwrap_err();
        assert!(matches!(err, BridgeError::Unsupported { .. }));
    }

    #[test]
    fn test_namespace_missing_from_snapshot() {
        let err = build_metadata(&spec(), &NamespaceTable::default()).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));
    }

    #[test]
    fn test_structure_name_index_outside_snapshot() {
        let namespaces = NamespaceTable::new([PLANT]);
        let mut spec = spec();
        if let Some(structures) = spec.structure_data_types.as_mut() {
            structures[0].name = "7:Motor".into();
        }
        let err = build_metadata(&spec, &namespaces).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));

        if let Some(structures) = spec.structure_data_types.as_mut() {
            structures[0].name = "1:Motor".into();
        }
        let metadata = build_metadata(&spec, &namespaces).unwrap();
        assert_eq!(metadata.structure_data_types[0].name, QualifiedName::new(1, "Motor"));
    }

    #[test]
    fn test_absent_data_type_is_null() {
        let mut spec = spec();
        spec.fields[0].data_type = None;
        let metadata = build_metadata(&spec, &NamespaceTable::new([PLANT])).unwrap();
        assert!(metadata.fields[0].data_type.is_null());
    }
}
