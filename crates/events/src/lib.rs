//! Domain events.
//!
//! Aggregates in the sales, products and purchasing modules emit enums that
//! implement [`Event`]; storage and transport of those events belong to the
//! host platform.

pub mod event;

pub use event::Event;
