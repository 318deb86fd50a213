// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse view conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;
use crate::namespace::NamespaceTable;
use crate::types::{min_date_time, NodeId};

/// View to browse in, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseViewSpec {
    /// View node id.
    pub view_id: String,
    /// View version.
    #[serde(default)]
    pub version: Option<u32>,
    /// View timestamp.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Protocol `ViewDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDescription {
    /// View node id.
    pub view_id: NodeId,
    /// View version, 0 for the current one.
    pub view_version: u32,
    /// View timestamp; the minimum instant means "current".
    pub timestamp: DateTime<Utc>,
}

/// Converts an optional view; absent stays absent.
pub fn to_view_description(
    view: Option<&BrowseViewSpec>,
    namespaces: &NamespaceTable,
) -> BridgeResult<Option<ViewDescription>> {
    view.map(|v| {
        Ok(ViewDescription {
            view_id: namespaces.resolve_node_id(Some(&v.view_id))?,
            view_version: v.version.unwrap_or(0),
            timestamp: v.timestamp.unwrap_or_else(min_date_time),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_defaults() {
        let namespaces = NamespaceTable::new(["urn:plant"]);
        let view = BrowseViewSpec {
            view_id: "nsu=urn:plant;i=5000".into(),
            version: None,
            timestamp: None,
        };
        let result = to_view_description(Some(&view), &namespaces).unwrap().unwrap();
        assert_eq!(result.view_id, NodeId::numeric(1, 5000));
        assert_eq!(result.view_version, 0);
        assert_eq!(result.timestamp, min_date_time());
    }

    #[test]
    fn test_absent_view() {
        assert!(to_view_description(None, &NamespaceTable::default()).unwrap().is_none());
    }
}
