//! CRM territories and lead assignment by area.

pub mod assignment;
pub mod lead;
pub mod territory;

pub use assignment::assign_by_area;
pub use lead::{Lead, LeadId};
pub use territory::{SalespersonChange, Territory, TerritoryId};
