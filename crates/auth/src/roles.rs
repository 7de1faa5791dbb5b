use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
///
/// The built-in commission roles grant their permissions through
/// [`Role::permissions`]; any other role grants nothing at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Salesperson: computes their own commission targets.
    pub const SALESPERSON: Role = Role(Cow::Borrowed("sales.salesperson"));

    /// Sales manager: also computes the targets of their team.
    pub const SALES_MANAGER: Role = Role(Cow::Borrowed("sales.manager"));

    /// Commission administrator.
    pub const COMMISSION_ADMINISTRATOR: Role = Role(Cow::Borrowed("commission.administrator"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Permissions granted by the role.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            "sales.salesperson" => vec![Permission::COMMISSION_COMPUTE],
            "sales.manager" => vec![
                Permission::COMMISSION_COMPUTE,
                Permission::COMMISSION_TEAM_MANAGER,
            ],
            "commission.administrator" => vec![
                Permission::COMMISSION_COMPUTE,
                Permission::COMMISSION_TEAM_MANAGER,
                Permission::COMMISSION_ADMIN,
            ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
