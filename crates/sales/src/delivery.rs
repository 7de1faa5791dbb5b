//! Delivery cost adjustment.
//!
//! Carriers that ship for free above an order amount must compare that
//! threshold with the order total *without* the delivery lines themselves,
//! otherwise adding the delivery fee could push the order over the limit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_products::ProductSnapshot;

use crate::line::OrderLine;

/// Untaxed total of the order.
pub fn amount_untaxed(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::price_subtotal).sum()
}

/// Untaxed total of the delivery lines.
pub fn delivery_cost(lines: &[OrderLine]) -> Decimal {
    lines
        .iter()
        .filter(|l| l.is_delivery)
        .map(OrderLine::price_subtotal)
        .sum()
}

/// Untaxed total minus delivery lines.
pub fn amount_total_without_delivery(lines: &[OrderLine]) -> Decimal {
    amount_untaxed(lines) - delivery_cost(lines)
}

/// Fixed-price carrier, optionally free above an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCarrier {
    pub name: String,
    /// Product used on the generated delivery line.
    pub product: ProductSnapshot,
    pub fixed_price: Decimal,
    pub free_over: Option<Decimal>,
}

impl DeliveryCarrier {
    /// Delivery price for an order whose lines are `lines`.
    pub fn rate_for(&self, lines: &[OrderLine]) -> Decimal {
        match self.free_over {
            Some(threshold) if amount_total_without_delivery(lines) >= threshold => Decimal::ZERO,
            _ => self.fixed_price,
        }
    }
}
