use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_core::{DomainError, DomainResult, Entity};

erpkit_core::typed_id!(CategoryId);

/// How a target's total is derived from its base amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    /// `base_amount * fixed_rate`.
    Fixed,
    /// Sum of the interval slice subtotals.
    Interval,
}

/// What a target's base amount measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    /// Invoiced sales of the employee in the period.
    MySales,
    /// Commissions earned by the manager's team.
    MyTeamCommissions,
}

/// Interval slice copied onto targets that pick the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTemplate {
    /// Completion where the slice starts (fraction, 0.5 = 50%).
    pub slice_from: Decimal,
    pub slice_to: Decimal,
    /// Commission percentage as a fraction (0.05 = 5%).
    pub percentage: Decimal,
}

impl RateTemplate {
    pub fn new(slice_from: Decimal, slice_to: Decimal, percentage: Decimal) -> Self {
        Self {
            slice_from,
            slice_to,
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionCategory {
    pub id: CategoryId,
    pub name: String,
    pub rate_type: RateType,
    pub basis: Basis,
    /// Categories whose targets roll up into targets of this category.
    pub child_category_ids: Vec<CategoryId>,
    pub rates: Vec<RateTemplate>,
}

impl CommissionCategory {
    pub fn new(name: impl Into<String>, rate_type: RateType, basis: Basis) -> Self {
        Self {
            id: CategoryId::generate(),
            name: name.into(),
            rate_type,
            basis,
            child_category_ids: Vec::new(),
            rates: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = CategoryId>) -> Self {
        self.child_category_ids.extend(children);
        self
    }

    pub fn with_rate(mut self, rate: RateTemplate) -> Self {
        self.rates.push(rate);
        self
    }

    pub(crate) fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        for rate in &self.rates {
            if rate.slice_from < Decimal::ZERO || rate.slice_to < rate.slice_from {
                return Err(DomainError::validation(format!(
                    "invalid slice [{}, {}) in category '{}'",
                    rate.slice_from, rate.slice_to, self.name
                )));
            }
            if rate.percentage < Decimal::ZERO {
                return Err(DomainError::validation("commission percentage cannot be negative"));
            }
        }
        Ok(())
    }
}

impl Entity for CommissionCategory {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
