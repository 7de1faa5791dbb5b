//! Minimal HR model: employees, departments and the management chain.
//!
//! Commission access rules and team roll-ups only need to know who manages
//! whom, so this crate keeps plain records in an [`OrgDirectory`].

pub mod department;
pub mod directory;
pub mod employee;

pub use department::{Department, DepartmentId};
pub use directory::OrgDirectory;
pub use employee::{Employee, EmployeeId};
