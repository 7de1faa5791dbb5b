//! Sales Orders domain module (event-sourced).
//!
//! This crate contains business rules for sales orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage):
//!
//! - [`order`]: the `SalesOrder` aggregate (lines, lifecycle, kits, deliveries)
//! - [`kit`]: kit expansion, reference numbering, component rescaling
//! - [`delivery`]: delivery-cost adjustment and fixed carriers
//! - [`payment`]: confirmation driven by payment transactions

pub mod delivery;
pub mod kit;
pub mod line;
pub mod order;
pub mod payment;

pub use delivery::DeliveryCarrier;
pub use line::{DeliveredMethod, KitLink, KitRole, LineEditPolicy, OrderLine};
pub use order::{
    AddDeliveryLine, AddKit, AddLine, ChangeLineQuantity, ConfirmOrder, CreateSalesOrder,
    DeliveryRecorded, KitAdded, KitComponentsRescaled, LineAdded, LineQuantityChanged, LineRemoved,
    MarkInvoiced, OrderConfirmed, OrderInvoiced, PaymentTransaction, PaymentTransactionCreated, QuotationSent,
    RecordDelivery, RegisterPaymentTransaction, RemoveDanglingKitComponents, RemoveLine, SalesOrder,
    SalesOrderCommand, SalesOrderCreated, SalesOrderEvent, SalesOrderId, SalesOrderStatus, SendQuotation,
    UpdateKitComponentQuantities,
};
pub use payment::{AutoConfirmAction, PaymentAcquirer};
