use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "commission.compute").
/// A special wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Compute commission targets within the caller's own scope.
    pub const COMMISSION_COMPUTE: Permission = Permission(Cow::Borrowed("commission.compute"));

    /// Read and compute the targets of the caller's team (department manager).
    pub const COMMISSION_TEAM_MANAGER: Permission =
        Permission(Cow::Borrowed("commission.team_manager"));

    /// Read and compute every target of the tenant.
    pub const COMMISSION_ADMIN: Permission = Permission(Cow::Borrowed("commission.admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
