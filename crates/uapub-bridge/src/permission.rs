// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role permission conversion.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::namespace::{NamespaceFormat, NamespaceTable};
use crate::types::NodeId;

/// Permission bits of the `PermissionType` mask, in bit order.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Browse,
    ReadRolePermissions,
    WriteAttribute,
    WriteRolePermissions,
    WriteHistorizing,
    Read,
    Write,
    ReadHistory,
    InsertHistory,
    ModifyHistory,
    DeleteHistory,
    ReceiveEvents,
    Call,
    AddReference,
    RemoveReference,
    DeleteNode,
    AddNode,
}

impl Permission {
    const ALL: [Permission; 17] = [
        Self::Browse,
        Self::ReadRolePermissions,
        Self::WriteAttribute,
        Self::WriteRolePermissions,
        Self::WriteHistorizing,
        Self::Read,
        Self::Write,
        Self::ReadHistory,
        Self::InsertHistory,
        Self::ModifyHistory,
        Self::DeleteHistory,
        Self::ReceiveEvents,
        Self::Call,
        Self::AddReference,
        Self::RemoveReference,
        Self::DeleteNode,
        Self::AddNode,
    ];

    /// Returns the mask bit.
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Expands a mask into permissions; unknown bits are ignored.
    pub fn from_mask(mask: u32) -> Vec<Permission> {
        Self::ALL.into_iter().filter(|p| mask & p.bit() != 0).collect()
    }
}

/// Protocol `RolePermissionType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Role node id.
    pub role_id: NodeId,
    /// `PermissionType` mask.
    pub permissions: u32,
}

/// Service-side role permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionModel {
    /// Role id formatted under the requested namespace format.
    pub role_id: String,
    /// Granted permissions.
    pub permissions: Vec<Permission>,
}

impl RolePermission {
    /// Converts to the service model.
    pub fn to_service(&self, namespaces: &NamespaceTable, format: NamespaceFormat) -> BridgeResult<RolePermissionModel> {
        let role_id = namespaces
            .format_node_id(&self.role_id, format)
            .ok_or_else(|| BridgeError::invalid_argument("Permission type not a valid node id"))?;
        Ok(RolePermissionModel {
            role_id,
            permissions: Permission::from_mask(self.permissions),
        })
    }
}
