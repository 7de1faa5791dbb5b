//! Purchasing domain module (Purchase Orders, event-sourced).
//!
//! - [`order`]: the `PurchaseOrder` aggregate
//! - [`intercompany`]: mirroring purchases from group companies as sale plans

pub mod intercompany;
pub mod order;

pub use intercompany::{InterCompanyRouteConfig, SalePlan, SalePlanLine, plan_inter_company_sale};
pub use order::{
    AddLine, Approve, CreatePurchaseOrder, GoodsReceived, LineItem, PartnerId, PurchaseOrder,
    PurchaseOrderApproved, PurchaseOrderCommand, PurchaseOrderCreated, PurchaseOrderEvent,
    PurchaseOrderId, PurchaseOrderLineAdded, PurchaseOrderStatus, ReceiveGoods, Supplier,
};
