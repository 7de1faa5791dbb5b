use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_core::{CompanyId, Entity};
use erpkit_hr::EmployeeId;

use crate::category::{CategoryId, RateTemplate};
use crate::period::DateRange;

erpkit_core::typed_id!(TargetId);

/// One interval slice of a target, with its derived amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRate {
    pub slice_from: Decimal,
    pub slice_to: Decimal,
    pub percentage: Decimal,
    /// Share of the slice covered by the completion (0..=1).
    pub completion_rate: Decimal,
    pub subtotal: Decimal,
}

impl From<&RateTemplate> for TargetRate {
    fn from(template: &RateTemplate) -> Self {
        Self::new(template.slice_from, template.slice_to, template.percentage)
    }
}

impl TargetRate {
    pub fn new(slice_from: Decimal, slice_to: Decimal, percentage: Decimal) -> Self {
        Self {
            slice_from,
            slice_to,
            percentage,
            completion_rate: Decimal::ZERO,
            subtotal: Decimal::ZERO,
        }
    }

    pub fn width(&self) -> Decimal {
        self.slice_to - self.slice_from
    }

    /// Fraction of `[slice_from, slice_to)` reached by `completion`.
    ///
    /// Zero-width slices never contribute.
    pub fn completion_rate_for(&self, completion: Decimal) -> Decimal {
        let width = self.width();
        if width <= Decimal::ZERO || completion <= self.slice_from {
            return Decimal::ZERO;
        }
        ((completion - self.slice_from) / width).min(Decimal::ONE)
    }

    /// Refresh `completion_rate` and `subtotal`.
    pub fn compute(&mut self, completion: Decimal, target_amount: Decimal, decimals: u32) {
        self.completion_rate = self.completion_rate_for(completion);
        self.subtotal = (self.completion_rate * self.width() * target_amount * self.percentage)
            .round_dp(decimals)
            .normalize();
    }
}

/// Commission goal of an employee for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTarget {
    pub id: TargetId,
    pub employee_id: EmployeeId,
    pub company_id: CompanyId,
    pub category_id: Option<CategoryId>,
    pub period: DateRange,
    pub target_amount: Decimal,
    pub fixed_rate: Decimal,
    pub rates: Vec<TargetRate>,

    // Derived by `CommissionBook::compute`.
    pub invoiced_amount: Decimal,
    pub child_target_ids: Vec<TargetId>,
    pub child_commission_amount: Decimal,
    pub base_amount: Decimal,
    pub completion: Decimal,
    pub total_amount: Decimal,
    pub show_invoices: bool,
    pub show_child_targets: bool,
}

impl CommissionTarget {
    pub fn new(
        employee_id: EmployeeId,
        company_id: CompanyId,
        period: DateRange,
        target_amount: Decimal,
    ) -> Self {
        Self {
            id: TargetId::generate(),
            employee_id,
            company_id,
            category_id: None,
            period,
            target_amount,
            fixed_rate: Decimal::ZERO,
            rates: Vec::new(),
            invoiced_amount: Decimal::ZERO,
            child_target_ids: Vec::new(),
            child_commission_amount: Decimal::ZERO,
            base_amount: Decimal::ZERO,
            completion: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            show_invoices: false,
            show_child_targets: false,
        }
    }

    pub fn with_fixed_rate(mut self, fixed_rate: Decimal) -> Self {
        self.fixed_rate = fixed_rate;
        self
    }

    /// Replace the interval slices, keeping them ordered by `slice_from`.
    pub fn set_rates(&mut self, mut rates: Vec<TargetRate>) {
        rates.sort_by(|a, b| a.slice_from.cmp(&b.slice_from));
        self.rates = rates;
    }

    /// `base_amount / target_amount`, 0 without a target amount.
    pub fn completion_for(&self, base_amount: Decimal) -> Decimal {
        if self.target_amount.is_zero() {
            Decimal::ZERO
        } else {
            base_amount / self.target_amount
        }
    }
}

impl Entity for CommissionTarget {
    type Id = TargetId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
