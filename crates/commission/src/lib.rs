//! Commission targets and their hierarchical roll-up.
//!
//! - [`category`]: commission categories (flat or interval rates, own-sales or
//!   team basis) forming a tree through their child categories
//! - [`target`]: per-employee, per-period targets and interval rate slices
//! - [`book`]: the [`CommissionBook`] holding targets, discovering child
//!   targets, enforcing access scope and computing amounts children-first
//! - [`dependency`]: topological ordering of the category tree
//! - [`settings`]: currency precision and team depth

pub mod book;
pub mod category;
pub mod dependency;
pub mod period;
pub mod settings;
pub mod target;

pub use book::{CommissionBook, SalesRecord, TargetFilter};
pub use category::{Basis, CategoryId, CommissionCategory, RateTemplate, RateType};
pub use period::DateRange;
pub use settings::CommissionSettings;
pub use target::{CommissionTarget, TargetId, TargetRate};
