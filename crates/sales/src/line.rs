//! Sales order lines and their kit extension.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_products::{DisplayType, ProductSnapshot, Uom};

/// Percentage base for line discounts.
const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// How the delivered quantity of a line is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveredMethod {
    /// Entered by hand (services, sections).
    Manual,
    /// Driven by stock moves.
    Stock,
    /// Derived from the kit's first important component.
    Kit,
}

/// Readonly/invisible flags shown by order line editors.
///
/// Computed once when the line is created; commands that edit a line check
/// the relevant flag and reject the change when it is readonly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineEditPolicy {
    pub handle_widget_invisible: bool,
    /// The line cannot be deleted.
    pub trash_widget_invisible: bool,
    pub product_readonly: bool,
    pub quantity_readonly: bool,
    pub uom_readonly: bool,
    pub kit_reference_readonly: bool,
}

impl LineEditPolicy {
    /// Regular line: everything editable.
    pub fn editable() -> Self {
        Self::default()
    }

    /// Kit line: only the quantity can change; the line can be deleted.
    pub fn kit() -> Self {
        Self {
            handle_widget_invisible: false,
            trash_widget_invisible: false,
            product_readonly: true,
            quantity_readonly: false,
            uom_readonly: true,
            kit_reference_readonly: true,
        }
    }

    /// Component line: important components are locked, optional ones are not.
    pub fn component(important: bool) -> Self {
        Self {
            handle_widget_invisible: false,
            trash_widget_invisible: important,
            product_readonly: important,
            quantity_readonly: important,
            uom_readonly: important,
            kit_reference_readonly: important,
        }
    }

    pub fn is_deletable(&self) -> bool {
        !self.trash_widget_invisible
    }
}

/// Role of a line inside a kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum KitRole {
    /// The line selling the kit product itself.
    Kit {
        /// Quantity the components were last scaled for.
        previous_quantity: Decimal,
    },
    /// A line generated from one of the kit's lines.
    Component { important: bool },
}

/// Kit extension attached to an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitLink {
    /// Shared by a kit line and its components ("K1", "K2", ...).
    pub reference: String,
    pub role: KitRole,
    /// 1-based position inside the kit (kit line first).
    pub kit_sequence: u32,
}

/// Order line: product (or section/note), quantity, price, optional kit link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub sequence: u32,
    pub display_type: Option<DisplayType>,
    /// `None` for sections and notes.
    pub product: Option<ProductSnapshot>,
    pub name: String,
    pub uom: Option<Uom>,
    pub quantity: Decimal,
    pub qty_delivered: Decimal,
    pub delivered_method: DeliveredMethod,
    pub unit_price: Decimal,
    /// Discount in percent (20 = 20%).
    pub discount: Decimal,
    pub is_delivery: bool,
    pub kit: Option<KitLink>,
    pub edit_policy: LineEditPolicy,
}

impl OrderLine {
    /// Plain product line priced at the product's list price.
    pub fn for_product(line_no: u32, product: ProductSnapshot, quantity: Decimal) -> Self {
        let delivered_method = if product.product_type.is_storable() {
            DeliveredMethod::Stock
        } else {
            DeliveredMethod::Manual
        };
        Self {
            line_no,
            sequence: line_no,
            display_type: None,
            name: product.name.clone(),
            uom: Some(product.uom.clone()),
            unit_price: product.list_price,
            product: Some(product),
            quantity,
            qty_delivered: Decimal::ZERO,
            delivered_method,
            discount: Decimal::ZERO,
            is_delivery: false,
            kit: None,
            edit_policy: LineEditPolicy::editable(),
        }
    }

    /// Section or note line.
    pub fn layout(line_no: u32, display_type: DisplayType, name: impl Into<String>) -> Self {
        Self {
            line_no,
            sequence: line_no,
            display_type: Some(display_type),
            product: None,
            name: name.into(),
            uom: None,
            quantity: Decimal::ZERO,
            qty_delivered: Decimal::ZERO,
            delivered_method: DeliveredMethod::Manual,
            unit_price: Decimal::ZERO,
            discount: Decimal::ZERO,
            is_delivery: false,
            kit: None,
            edit_policy: LineEditPolicy::editable(),
        }
    }

    pub fn is_kit(&self) -> bool {
        matches!(self.kit.as_ref().map(|k| k.role), Some(KitRole::Kit { .. }))
    }

    pub fn is_kit_component(&self) -> bool {
        matches!(self.kit.as_ref().map(|k| k.role), Some(KitRole::Component { .. }))
    }

    pub fn is_important_kit_component(&self) -> bool {
        matches!(
            self.kit.as_ref().map(|k| k.role),
            Some(KitRole::Component { important: true })
        )
    }

    pub fn kit_reference(&self) -> Option<&str> {
        self.kit.as_ref().map(|k| k.reference.as_str())
    }

    pub fn kit_sequence(&self) -> Option<u32> {
        self.kit.as_ref().map(|k| k.kit_sequence)
    }

    /// Quantity the components were last scaled for (kit lines only).
    pub fn kit_previous_quantity(&self) -> Option<Decimal> {
        match self.kit.as_ref().map(|k| k.role) {
            Some(KitRole::Kit { previous_quantity }) => Some(previous_quantity),
            _ => None,
        }
    }

    pub(crate) fn set_kit_previous_quantity(&mut self, quantity: Decimal) {
        if let Some(KitLink {
            role: KitRole::Kit { previous_quantity },
            ..
        }) = self.kit.as_mut()
        {
            *previous_quantity = quantity;
        }
    }

    pub fn is_layout(&self) -> bool {
        self.display_type.is_some()
    }

    /// Untaxed amount of the line after discount.
    pub fn price_subtotal(&self) -> Decimal {
        if self.is_layout() {
            return Decimal::ZERO;
        }
        self.quantity * self.unit_price * (HUNDRED - self.discount) / HUNDRED
    }
}
