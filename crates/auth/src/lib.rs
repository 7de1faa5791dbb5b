//! `erpkit-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from transport and storage. It answers
//! "does this principal hold that permission in its tenant"; record-level
//! scoping (e.g. a manager's team) is decided by the owning domain module.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError, Principal};
pub use permissions::Permission;
pub use principal::{PrincipalId, TenantMembership};
pub use roles::Role;
