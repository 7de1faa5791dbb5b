//! Products domain module (event-sourced).
//!
//! This crate contains business rules for the product catalog, including the
//! definition of kits (products sold as a bundle of component lines),
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod kit;
pub mod product;

pub use kit::{DisplayType, KitDefinition, KitLine, ProductSnapshot, Uom};
pub use product::{
    ActivateProduct, ArchiveProduct, CreateProduct, DefineKit, KitDefined, KitRemoved, Product,
    ProductActivated, ProductArchived, ProductCommand, ProductCreated, ProductEvent, ProductId,
    ProductStatus, ProductType, RemoveKit,
};
