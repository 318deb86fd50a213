// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Monitored item filter translation.
//!
//! # Defaults
//!
//! ```text
//! DataChange
//!   deadbandValue        0.0
//!   deadbandType         None
//!   trigger              StatusValue
//! Aggregate
//!   startTime            minimum instant (no explicit start)
//!   processingInterval   0 ms
//!   config absent        server capability defaults
//!   config present       percentages 0, treatUncertainAsBad true,
//!                        useSlopedExtrapolation true
//! ```
//!
//! Enumerated values outside the protocol tables fail with `Unsupported`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BridgeResult;
use crate::namespace::NamespaceTable;
use crate::types::{min_date_time, EnumValue, NodeId, ProtocolEnum};

// =============================================================================
// Protocol enumerations
// =============================================================================

/// Deadband interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeadbandType {
    /// No deadband.
    #[default]
    None = 0,
    /// Absolute change in engineering units.
    Absolute = 1,
    /// Percentage of the EU range.
    Percent = 2,
}

impl ProtocolEnum for DeadbandType {
    const KIND: &'static str = "DeadbandType";

    fn all() -> &'static [Self] {
        &[Self::None, Self::Absolute, Self::Percent]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Absolute => "Absolute",
            Self::Percent => "Percent",
        }
    }

    fn value(&self) -> u32 {
        *self as u32
    }
}

/// Condition that triggers a data change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataChangeTrigger {
    /// Status changes only.
    Status = 0,
    /// Status or value changes.
    #[default]
    StatusValue = 1,
    /// Status, value or source timestamp changes.
    StatusValueTimestamp = 2,
}

impl ProtocolEnum for DataChangeTrigger {
    const KIND: &'static str = "DataChangeTrigger";

    fn all() -> &'static [Self] {
        &[Self::Status, Self::StatusValue, Self::StatusValueTimestamp]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::StatusValue => "StatusValue",
            Self::StatusValueTimestamp => "StatusValueTimestamp",
        }
    }

    fn value(&self) -> u32 {
        *self as u32
    }
}

// =============================================================================
// Input models
// =============================================================================

/// Monitoring filter as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FilterSpec {
    /// Data change filter.
    DataChange(DataChangeFilterSpec),
    /// Aggregate filter.
    Aggregate(AggregateFilterSpec),
}

/// Data change filter settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChangeFilterSpec {
    /// Deadband threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadband_value: Option<f64>,
    /// Deadband interpretation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadband_type: Option<EnumValue>,
    /// Notification trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<EnumValue>,
}

/// Aggregate filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFilterSpec {
    /// Aggregate configuration; absent means server defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AggregateConfigSpec>,
    /// Aggregate function node id.
    pub aggregate_type_id: String,
    /// Start of the first interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Interval length.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub processing_interval: Option<Duration>,
}

/// Aggregate configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateConfigSpec {
    /// Percentage of bad data that makes an interval bad.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_data_bad: Option<u8>,
    /// Percentage of good data that makes an interval good.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_data_good: Option<u8>,
    /// Treat uncertain values as bad.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treat_uncertain_as_bad: Option<bool>,
    /// Use sloped extrapolation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_sloped_extrapolation: Option<bool>,
}

// =============================================================================
// Protocol structures
// =============================================================================

/// Protocol monitoring filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProtocolFilter {
    /// `DataChangeFilter`.
    DataChange(DataChangeFilter),
    /// `AggregateFilter`.
    Aggregate(AggregateFilter),
}

/// Protocol `DataChangeFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataChangeFilter {
    /// Trigger.
    pub trigger: DataChangeTrigger,
    /// Deadband type.
    pub deadband_type: DeadbandType,
    /// Deadband value.
    pub deadband_value: f64,
}

/// Protocol `AggregateFilter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFilter {
    /// Start time; the minimum instant means "not specified".
    pub start_time: DateTime<Utc>,
    /// Aggregate function.
    pub aggregate_type: NodeId,
    /// Processing interval in milliseconds.
    pub processing_interval: f64,
    /// Aggregate configuration.
    pub aggregate_configuration: AggregateConfiguration,
}

/// Protocol `AggregateConfiguration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateConfiguration {
    /// When set, the server ignores the remaining fields.
    pub use_server_capabilities_defaults: bool,
    /// Treat uncertain values as bad.
    pub treat_uncertain_as_bad: bool,
    /// Percentage of bad data.
    pub percent_data_bad: u8,
    /// Percentage of good data.
    pub percent_data_good: u8,
    /// Use sloped extrapolation.
    pub use_sloped_extrapolation: bool,
}

impl AggregateConfiguration {
    /// Returns the "use server capability defaults" sentinel.
    ///
    /// The remaining fields carry the protocol's initial values and are
    /// ignored by servers.
    pub const fn server_defaults() -> Self {
        Self {
            use_server_capabilities_defaults: true,
            treat_uncertain_as_bad: true,
            percent_data_bad: 100,
            percent_data_good: 100,
            use_sloped_extrapolation: false,
        }
    }

    /// Converts optional configuration.
    ///
    /// Presence of the structure switches from the server-default sentinel
    /// to per-field defaults.
    pub fn from_spec(spec: Option<&AggregateConfigSpec>) -> Self {
        match spec {
            None => Self::server_defaults(),
            Some(spec) => Self {
                use_server_capabilities_defaults: false,
                treat_uncertain_as_bad: spec.treat_uncertain_as_bad.unwrap_or(true),
                percent_data_bad: spec.percent_data_bad.unwrap_or(0),
                percent_data_good: spec.percent_data_good.unwrap_or(0),
                use_sloped_extrapolation: spec.use_sloped_extrapolation.unwrap_or(true),
            },
        }
    }
}

// =============================================================================
// Translation
// =============================================================================

/// Translates a filter specification into a protocol filter.
///
/// An absent filter is valid and yields `None`.
pub fn translate(
    filter: Option<&FilterSpec>,
    namespaces: &NamespaceTable,
) -> BridgeResult<Option<ProtocolFilter>> {
    let translated = match filter {
        None => return Ok(None),
        Some(FilterSpec::DataChange(spec)) => ProtocolFilter::DataChange(data_change(spec)?),
        Some(FilterSpec::Aggregate(spec)) => ProtocolFilter::Aggregate(aggregate(spec, namespaces)?),
    };
    debug!(filter = ?translated, "Translated monitoring filter");
    Ok(Some(translated))
}

/// Translates a data change filter.
pub fn data_change(spec: &DataChangeFilterSpec) -> BridgeResult<DataChangeFilter> {
    let deadband_value = spec.deadband_value.unwrap_or(0.0);
    let deadband_type = spec
        .deadband_type
        .as_ref()
        .map(DeadbandType::resolve)
        .transpose()?
        .unwrap_or_default();
    let trigger = spec
        .trigger
        .as_ref()
        .map(DataChangeTrigger::resolve)
        .transpose()?
        .unwrap_or_default();

    Ok(DataChangeFilter {
        trigger,
        deadband_type,
        deadband_value,
    })
}

/// Translates an aggregate filter, resolving the aggregate type id.
///
/// A blank aggregate type id becomes the null id.
pub fn aggregate(spec: &AggregateFilterSpec, namespaces: &NamespaceTable) -> BridgeResult<AggregateFilter> {
    let aggregate_type = namespaces.resolve_node_id(Some(&spec.aggregate_type_id))?;

    Ok(AggregateFilter {
        start_time: spec.start_time.unwrap_or_else(min_date_time),
        aggregate_type,
        processing_interval: spec
            .processing_interval
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0),
        aggregate_configuration: AggregateConfiguration::from_spec(spec.config.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    fn namespaces() -> NamespaceTable {
        NamespaceTable::new(["urn:plant"])
    }

    fn aggregate_spec() -> AggregateFilterSpec {
        AggregateFilterSpec {
            config: None,
            aggregate_type_id: "i=2342".into(),
            start_time: None,
            processing_interval: None,
        }
    }

    #[test]
    fn test_absent_filter() {
        assert_eq!(translate(None, &namespaces()).unwrap(), None);
    }

    #[test]
    fn test_data_change_defaults() {
        let filter = FilterSpec::DataChange(DataChangeFilterSpec::default());
        let Some(ProtocolFilter::DataChange(result)) = translate(Some(&filter), &namespaces()).unwrap() else {
            panic!("expected data change filter");
        };
        assert_eq!(result.deadband_value, 0.0);
        assert_eq!(result.deadband_type, DeadbandType::None);
        assert_eq!(result.trigger, DataChangeTrigger::StatusValue);
    }

    #[test]
    fn test_data_change_values() {
        let spec = DataChangeFilterSpec {
            deadband_value: Some(2.5),
            deadband_type: Some("Percent".into()),
            trigger: Some(EnumValue::Value(2)),
        };
        let result = data_change(&spec).unwrap();
        assert_eq!(result.deadband_value, 2.5);
        assert_eq!(result.deadband_type, DeadbandType::Percent);
        assert_eq!(result.trigger, DataChangeTrigger::StatusValueTimestamp);
    }

    #[test]
    fn test_data_change_rejects_unknown_enum() {
        let spec = DataChangeFilterSpec {
            deadband_type: Some(EnumValue::Value(7)),
            ..Default::default()
        };
        let err = data_change(&spec).unwrap_err();
        assert!(matches!(err, BridgeError::Unsupported { .. }));
        assert!(err.to_string().contains("DeadbandType"));

        let spec = DataChangeFilterSpec {
            trigger: Some("OnEveryTick".into()),
            ..Default::default()
        };
        assert!(matches!(data_change(&spec), Err(BridgeError::Unsupported { .. })));
    }

    #[test]
    fn test_data_change_passes_deadband_through() {
        let spec = DataChangeFilterSpec {
            deadband_value: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(data_change(&spec).unwrap().deadband_value, -1.0);
    }

    #[test]
    fn test_aggregate_defaults() {
        let result = aggregate(&aggregate_spec(), &namespaces()).unwrap();
        assert_eq!(result.start_time, min_date_time());
        assert_eq!(result.processing_interval, 0.0);
        assert_eq!(result.aggregate_type, NodeId::numeric(0, 2342));
        assert_eq!(result.aggregate_configuration, AggregateConfiguration::server_defaults());
        assert!(result.aggregate_configuration.use_server_capabilities_defaults);
    }

    #[test]
    fn test_aggregate_config_present_uses_field_defaults() {
        let spec = AggregateFilterSpec {
            config: Some(AggregateConfigSpec {
                percent_data_good: Some(80),
                ..Default::default()
            }),
            processing_interval: Some(Duration::from_millis(1500)),
            aggregate_type_id: "urn:plant#s=Average".into(),
            ..aggregate_spec()
        };
        let result = aggregate(&spec, &namespaces()).unwrap();
        let config = result.aggregate_configuration;
        assert!(!config.use_server_capabilities_defaults);
        assert_eq!(config.percent_data_bad, 0);
        assert_eq!(config.percent_data_good, 80);
        assert!(config.treat_uncertain_as_bad);
        assert!(config.use_sloped_extrapolation);
        assert_eq!(result.processing_interval, 1500.0);
        assert_eq!(result.aggregate_type, NodeId::string(1, "Average"));
    }

    #[test]
    fn test_aggregate_type_resolution() {
        let spec = AggregateFilterSpec {
            aggregate_type_id: " ".into(),
            ..aggregate_spec()
        };
        assert!(aggregate(&spec, &namespaces()).unwrap().aggregate_type.is_null());

        let spec = AggregateFilterSpec {
            aggregate_type_id: "nsu=urn:other;i=1".into(),
            ..aggregate_spec()
        };
        assert!(aggregate(&spec, &namespaces()).is_err());
    }

    #[test]
    fn test_filter_spec_serde() {
        let filter: FilterSpec = serde_json::from_str(
            r#"{"type":"Aggregate","aggregateTypeId":"i=2342","processingInterval":"2s","config":{}}"#,
        )
        .unwrap();
        let Some(ProtocolFilter::Aggregate(result)) = translate(Some(&filter), &namespaces()).unwrap() else {
            panic!("expected aggregate filter");
        };
        assert_eq!(result.processing_interval, 2000.0);
        assert!(!result.aggregate_configuration.use_server_capabilities_defaults);

        let filter: FilterSpec =
            serde_json::from_str(r#"{"type":"DataChange","deadbandType":1,"trigger":"Status"}"#).unwrap();
        let Some(ProtocolFilter::DataChange(result)) = translate(Some(&filter), &namespaces()).unwrap() else {
            panic!("expected data change filter");
        };
        assert_eq!(result.deadband_type, DeadbandType::Absolute);
        assert_eq!(result.trigger, DataChangeTrigger::Status);
    }
}
