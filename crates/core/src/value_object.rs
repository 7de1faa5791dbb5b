//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two instances
/// with the same attributes are the same thing (a date range, a kit
/// reference), whereas entities are the same thing when their ids match.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
