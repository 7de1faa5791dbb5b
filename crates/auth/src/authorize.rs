use std::collections::HashSet;

use thiserror::Error;

use erpkit_core::TenantId;

use crate::{Permission, PrincipalId, Role, TenantMembership};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: callers derive the
/// membership from whatever session/policy source they have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

impl Principal {
    /// Principal with an explicit permission list and no roles.
    pub fn with_permissions(
        principal_id: PrincipalId,
        tenant_id: TenantId,
        permissions: Vec<Permission>,
    ) -> Self {
        Self {
            principal_id,
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: Vec::new(),
                permissions,
            },
        }
    }

    /// Principal holding roles only.
    pub fn with_roles(principal_id: PrincipalId, tenant_id: TenantId, roles: Vec<Role>) -> Self {
        Self {
            principal_id,
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles,
                permissions: Vec::new(),
            },
        }
    }

    /// Non-failing form of [`authorize`].
    pub fn has_permission(&self, required: &Permission) -> bool {
        authorize(self, required).is_ok()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal within its active tenant context.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let from_roles: Vec<Permission> = principal
        .membership
        .roles
        .iter()
        .flat_map(Role::permissions)
        .collect();
    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .chain(from_roles.iter())
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
