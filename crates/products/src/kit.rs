//! Kit definition: the ordered list of lines a kit product expands into.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_core::{DomainError, DomainResult, ValueObject};

use crate::product::{ProductId, ProductType};

/// Unit of measure, identified by its display name ("Unit(s)", "kg", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uom(pub String);

impl Uom {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn unit() -> Self {
        Self::new("Unit(s)")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Uom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-product line kinds (order and kit layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    Section,
    Note,
}

/// The parts of a product a sales line needs, frozen at the time of use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub product_type: ProductType,
    pub list_price: Decimal,
    pub uom: Uom,
}

impl ValueObject for ProductSnapshot {}

/// One line of a kit definition.
///
/// Either a component (`component` set, `display_type` empty) or a
/// section/note carrying only a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitLine {
    pub display_type: Option<DisplayType>,
    pub component: Option<ProductSnapshot>,
    /// Overrides the component name on the generated order line.
    pub name: Option<String>,
    pub quantity: Decimal,
    pub uom: Option<Uom>,
    /// Important components drive delivery and cannot be edited or removed.
    pub is_important: bool,
}

impl KitLine {
    pub fn component(product: ProductSnapshot, quantity: Decimal, important: bool) -> Self {
        let uom = product.uom.clone();
        Self {
            display_type: None,
            component: Some(product),
            name: None,
            quantity,
            uom: Some(uom),
            is_important: important,
        }
    }

    pub fn section(name: impl Into<String>) -> Self {
        Self::layout(DisplayType::Section, name.into())
    }

    pub fn note(name: impl Into<String>) -> Self {
        Self::layout(DisplayType::Note, name.into())
    }

    fn layout(display_type: DisplayType, name: String) -> Self {
        Self {
            display_type: Some(display_type),
            component: None,
            name: Some(name),
            quantity: Decimal::ZERO,
            uom: None,
            is_important: false,
        }
    }

    pub fn with_uom(mut self, uom: Uom) -> Self {
        self.uom = Some(uom);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn validate(&self, kit_product: ProductId, index: usize) -> DomainResult<()> {
        match (self.display_type, &self.component) {
            (Some(_), Some(_)) => Err(DomainError::validation(format!(
                "kit line {index}: sections and notes cannot reference a product"
            ))),
            (Some(_), None) => {
                if self.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
                    return Err(DomainError::validation(format!(
                        "kit line {index}: sections and notes need a name"
                    )));
                }
                Ok(())
            }
            (None, None) => Err(DomainError::validation(format!(
                "kit line {index}: component product is required"
            ))),
            (None, Some(component)) => {
                if component.product_id == kit_product {
                    return Err(DomainError::invariant(format!(
                        "kit line {index}: a kit cannot contain itself"
                    )));
                }
                if self.quantity <= Decimal::ZERO {
                    return Err(DomainError::validation(format!(
                        "kit line {index}: quantity must be positive"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Complete kit definition of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitDefinition {
    pub lines: Vec<KitLine>,
    /// Discount applied to every generated component line, as a fraction (0.2 = 20%).
    pub discount: Decimal,
}

impl KitDefinition {
    pub fn new(lines: Vec<KitLine>) -> Self {
        Self {
            lines,
            discount: Decimal::ZERO,
        }
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    /// Component lines, in definition order (sections and notes skipped).
    pub fn components(&self) -> impl Iterator<Item = &KitLine> {
        self.lines.iter().filter(|l| l.component.is_some())
    }

    pub(crate) fn validate(&self, kit_product: ProductId) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("a kit needs at least one line"));
        }
        if self.discount < Decimal::ZERO || self.discount > Decimal::ONE {
            return Err(DomainError::validation(
                "kit discount must be a fraction between 0 and 1",
            ));
        }
        for (index, line) in self.lines.iter().enumerate() {
            line.validate(kit_product, index + 1)?;
        }
        Ok(())
    }
}
