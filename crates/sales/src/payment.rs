//! Order confirmation driven by payment transactions.

use serde::{Deserialize, Serialize};

/// What registering a payment transaction does to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoConfirmAction {
    /// Leave the order as it is.
    #[default]
    None,
    /// Confirm the order and request the confirmation e-mail.
    ConfirmOrder,
    /// Mark the quotation as sent.
    SendQuotation,
}

/// Payment acquirer (provider) configuration relevant to sales orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAcquirer {
    pub name: String,
    #[serde(default)]
    pub auto_confirm: AutoConfirmAction,
}

impl PaymentAcquirer {
    pub fn new(name: impl Into<String>, auto_confirm: AutoConfirmAction) -> Self {
        Self {
            name: name.into(),
            auto_confirm,
        }
    }
}
