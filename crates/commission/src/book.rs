//! Commission book: targets of a tenant and their roll-up.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_auth::{AuthzError, Permission, Principal, authorize};
use erpkit_core::{CompanyId, DomainError, DomainResult, TenantId};
use erpkit_hr::{EmployeeId, OrgDirectory};

use crate::category::{Basis, CategoryId, CommissionCategory, RateType};
use crate::dependency::topological_order;
use crate::settings::CommissionSettings;
use crate::target::{CommissionTarget, TargetId, TargetRate};

/// Invoiced sale attributed to an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub employee_id: EmployeeId,
    pub company_id: CompanyId,
    pub invoice_date: NaiveDate,
    pub amount: Decimal,
}

/// Search filter over commission targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum TargetFilter {
    All,
    Ids(BTreeSet<TargetId>),
    Employees(BTreeSet<EmployeeId>),
}

impl TargetFilter {
    pub fn matches(&self, target: &CommissionTarget) -> bool {
        match self {
            TargetFilter::All => true,
            TargetFilter::Ids(ids) => ids.contains(&target.id),
            TargetFilter::Employees(employees) => employees.contains(&target.employee_id),
        }
    }
}

/// Categories, targets and invoiced sales of one tenant.
#[derive(Debug, Clone)]
pub struct CommissionBook {
    tenant_id: TenantId,
    settings: CommissionSettings,
    directory: OrgDirectory,
    categories: BTreeMap<CategoryId, CommissionCategory>,
    targets: BTreeMap<TargetId, CommissionTarget>,
    sales: Vec<SalesRecord>,
}

impl CommissionBook {
    pub fn new(tenant_id: TenantId, directory: OrgDirectory, settings: CommissionSettings) -> Self {
        Self {
            tenant_id,
            settings,
            directory,
            categories: BTreeMap::new(),
            targets: BTreeMap::new(),
            sales: Vec::new(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn settings(&self) -> &CommissionSettings {
        &self.settings
    }

    pub fn directory(&self) -> &OrgDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut OrgDirectory {
        &mut self.directory
    }

    pub fn category(&self, id: CategoryId) -> Option<&CommissionCategory> {
        self.categories.get(&id)
    }

    pub fn target(&self, id: TargetId) -> Option<&CommissionTarget> {
        self.targets.get(&id)
    }

    pub fn add_category(&mut self, category: CommissionCategory) -> DomainResult<CategoryId> {
        category.validate()?;
        if self.categories.contains_key(&category.id) {
            return Err(DomainError::conflict("category already exists"));
        }
        let id = category.id;
        self.categories.insert(id, category);
        Ok(id)
    }

    /// Register a target; a category already set on it copies its template rates.
    pub fn add_target(&mut self, target: CommissionTarget) -> DomainResult<TargetId> {
        if self.targets.contains_key(&target.id) {
            return Err(DomainError::conflict("target already exists"));
        }
        if self.directory.employee(target.employee_id).is_none() {
            return Err(DomainError::validation(format!(
                "unknown employee {}",
                target.employee_id
            )));
        }
        if target.target_amount < Decimal::ZERO {
            return Err(DomainError::validation("target amount cannot be negative"));
        }

        let id = target.id;
        let category_id = target.category_id;
        self.targets.insert(id, target);
        if let Some(category_id) = category_id {
            self.apply_category(id, category_id)?;
        }
        Ok(id)
    }

    /// Point a target at a category and copy the category's template rates.
    pub fn apply_category(&mut self, target_id: TargetId, category_id: CategoryId) -> DomainResult<()> {
        let rates: Vec<TargetRate> = self
            .categories
            .get(&category_id)
            .ok_or_else(|| DomainError::validation(format!("unknown category {category_id}")))?
            .rates
            .iter()
            .map(TargetRate::from)
            .collect();

        let target = self
            .targets
            .get_mut(&target_id)
            .ok_or_else(DomainError::not_found)?;
        target.category_id = Some(category_id);
        target.set_rates(rates);
        Ok(())
    }

    pub fn record_sale(&mut self, record: SalesRecord) -> DomainResult<()> {
        if self.directory.employee(record.employee_id).is_none() {
            return Err(DomainError::validation(format!(
                "unknown employee {}",
                record.employee_id
            )));
        }
        self.sales.push(record);
        Ok(())
    }

    /// Invoiced sales counted in a target's own-sales base.
    pub fn invoices_for(&self, target: &CommissionTarget) -> Vec<&SalesRecord> {
        self.sales
            .iter()
            .filter(|s| {
                s.employee_id == target.employee_id
                    && s.company_id == target.company_id
                    && target.period.contains_date(s.invoice_date)
            })
            .collect()
    }

    /// Targets whose amounts roll up into `target_id`.
    ///
    /// Children belong to employees of the departments the target's employee
    /// manages, use one of the category's child categories, share the company
    /// and have a period overlapping the target's.
    pub fn child_targets(&self, target_id: TargetId) -> Vec<TargetId> {
        let Some(target) = self.targets.get(&target_id) else {
            return Vec::new();
        };
        let Some(category) = target.category_id.and_then(|c| self.categories.get(&c)) else {
            return Vec::new();
        };
        if category.child_category_ids.is_empty() {
            return Vec::new();
        }

        let team = self.directory.direct_team(target.employee_id);
        self.targets
            .values()
            .filter(|t| t.id != target.id)
            .filter(|t| team.contains(&t.employee_id))
            .filter(|t| {
                t.category_id
                    .is_some_and(|c| category.child_category_ids.contains(&c))
            })
            .filter(|t| t.company_id == target.company_id)
            .filter(|t| target.period.overlaps(&t.period))
            .map(|t| t.id)
            .collect()
    }

    /// Employees whose targets `principal` may see and compute.
    pub fn security_scope(&self, principal: &Principal) -> DomainResult<TargetFilter> {
        if principal.active_tenant_id != self.tenant_id {
            return Err(access_denied(AuthzError::TenantMismatch));
        }
        if principal.has_permission(&Permission::COMMISSION_ADMIN) {
            return Ok(TargetFilter::All);
        }
        authorize(principal, &Permission::COMMISSION_COMPUTE).map_err(access_denied)?;

        let employee = self
            .directory
            .employee_for_user(principal.principal_id)
            .ok_or_else(|| DomainError::forbidden("no employee linked to the user"))?;

        let mut employees = BTreeSet::from([employee.id]);
        if principal.has_permission(&Permission::COMMISSION_TEAM_MANAGER) {
            employees.extend(self.directory.team(employee.id, self.settings.team_depth));
        }
        Ok(TargetFilter::Employees(employees))
    }

    pub fn search(&self, filter: &TargetFilter) -> Vec<&CommissionTarget> {
        self.targets.values().filter(|t| filter.matches(t)).collect()
    }

    /// Targets visible to `principal`.
    pub fn visible_targets(&self, principal: &Principal) -> DomainResult<Vec<&CommissionTarget>> {
        let scope = self.security_scope(principal)?;
        Ok(self.search(&scope))
    }

    /// Filter listing the child targets of a target the principal may see.
    pub fn view_child_targets(
        &self,
        principal: &Principal,
        target_id: TargetId,
    ) -> DomainResult<TargetFilter> {
        self.ensure_in_scope(principal, &[target_id])?;
        Ok(TargetFilter::Ids(self.child_targets(target_id).into_iter().collect()))
    }

    /// Recompute `ids` and every target rolling up into them, children first.
    ///
    /// Every target of that closure must be in the principal's scope.
    /// Returns the targets in the order they were computed.
    pub fn compute(&mut self, principal: &Principal, ids: &[TargetId]) -> DomainResult<Vec<TargetId>> {
        self.ensure_in_scope(principal, ids)?;

        let mut closure = BTreeSet::new();
        let mut pending: Vec<TargetId> = ids.to_vec();
        while let Some(id) = pending.pop() {
            if closure.insert(id) {
                pending.extend(self.child_targets(id));
            }
        }
        let closure_ids: Vec<TargetId> = closure.iter().copied().collect();
        self.ensure_in_scope(principal, &closure_ids)?;

        let order = self.dependency_order(&closure)?;
        for id in &order {
            self.compute_target(*id);
        }

        tracing::info!(
            tenant_id = %self.tenant_id,
            requested = ids.len(),
            computed = order.len(),
            "commission targets computed"
        );
        Ok(order)
    }

    fn ensure_in_scope(&self, principal: &Principal, ids: &[TargetId]) -> DomainResult<()> {
        let scope = self.security_scope(principal)?;
        for id in ids {
            let target = self.targets.get(id).ok_or_else(DomainError::not_found)?;
            if !scope.matches(target) {
                tracing::warn!(
                    principal_id = %principal.principal_id,
                    target_id = %id,
                    "commission target outside the user's scope"
                );
                return Err(DomainError::forbidden(format!(
                    "target {id} is outside the user's commission scope"
                )));
            }
        }
        Ok(())
    }

    /// Order targets so each comes after the targets of its child categories.
    fn dependency_order(&self, targets: &BTreeSet<TargetId>) -> DomainResult<Vec<TargetId>> {
        let categories: Vec<CategoryId> = self.categories.keys().copied().collect();
        let category_order = topological_order(&categories, |c| {
            self.categories
                .get(&c)
                .map(|cat| cat.child_category_ids.clone())
                .unwrap_or_default()
        })
        .map_err(|c| {
            tracing::error!(category_id = %c, "commission category tree has a cycle");
            DomainError::configuration(format!("commission category {c} is part of a cycle"))
        })?;

        let rank: BTreeMap<CategoryId, usize> = category_order
            .into_iter()
            .enumerate()
            .map(|(i, c)| (c, i + 1))
            .collect();

        let mut ordered: Vec<TargetId> = targets.iter().copied().collect();
        ordered.sort_by_key(|id| {
            self.targets
                .get(id)
                .and_then(|t| t.category_id)
                .and_then(|c| rank.get(&c).copied())
                .unwrap_or(0)
        });
        Ok(ordered)
    }

    fn compute_target(&mut self, target_id: TargetId) {
        let child_target_ids = self.child_targets(target_id);
        let Some(target) = self.targets.get(&target_id) else {
            return;
        };

        let child_commission_amount: Decimal = child_target_ids
            .iter()
            .filter_map(|id| self.targets.get(id))
            .map(|t| t.total_amount)
            .sum();
        let invoiced_amount: Decimal = self.invoices_for(target).iter().map(|s| s.amount).sum();
        let category = target.category_id.and_then(|c| self.categories.get(&c));
        let basis = category.map(|c| c.basis);
        let rate_type = category.map(|c| c.rate_type);
        let decimals = self.settings.currency_decimals;

        let base_amount = match basis {
            Some(Basis::MySales) => invoiced_amount,
            Some(Basis::MyTeamCommissions) => child_commission_amount,
            None => Decimal::ZERO,
        };
        let completion = target.completion_for(base_amount);

        let Some(target) = self.targets.get_mut(&target_id) else {
            return;
        };
        for rate in &mut target.rates {
            rate.compute(completion, target.target_amount, decimals);
        }

        target.total_amount = match rate_type {
            Some(RateType::Fixed) => (base_amount * target.fixed_rate).round_dp(decimals).normalize(),
            Some(RateType::Interval) => target.rates.iter().map(|r| r.subtotal).sum(),
            None => Decimal::ZERO,
        };
        target.invoiced_amount = invoiced_amount;
        target.child_target_ids = child_target_ids;
        target.child_commission_amount = child_commission_amount;
        target.base_amount = base_amount;
        target.completion = completion;
        target.show_invoices = basis == Some(Basis::MySales);
        target.show_child_targets = basis == Some(Basis::MyTeamCommissions);

        tracing::debug!(
            target_id = %target_id,
            base = %base_amount,
            total = %target.total_amount,
            children = target.child_target_ids.len(),
            "commission target computed"
        );
    }
}

fn access_denied(err: AuthzError) -> DomainError {
    DomainError::forbidden(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpkit_auth::{PrincipalId, Role};
    use erpkit_hr::{Department, DepartmentId, Employee};

    use crate::category::RateTemplate;
    use crate::period::DateRange;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn year() -> DateRange {
        DateRange::new(date(2026, 1, 1), date(2026, 12, 31)).unwrap()
    }

    /// Manager (team, interval) over an employee (own sales, fixed 100%) who
    /// invoiced 20000 against the manager's 40000 target.
    struct Setup {
        book: CommissionBook,
        tenant_id: TenantId,
        company: CompanyId,
        manager_user: PrincipalId,
        employee_user: PrincipalId,
        other_user: PrincipalId,
        manager: EmployeeId,
        department: DepartmentId,
        seller_category: CategoryId,
        manager_category: CategoryId,
        employee_target: TargetId,
        manager_target: TargetId,
        other_target: TargetId,
    }

    fn setup(rates: &[(&str, &str)]) -> Setup {
        let tenant_id = TenantId::new();
        let company = CompanyId::new();
        let manager_user = PrincipalId::new();
        let employee_user = PrincipalId::new();
        let other_user = PrincipalId::new();

        let mut directory = OrgDirectory::new();
        let manager = directory
            .add_employee(Employee::new("Manager", company).with_user(manager_user))
            .unwrap();
        let department = directory
            .add_department(Department::new("Sales", company).managed_by(manager))
            .unwrap();
        let employee = directory
            .add_employee(
                Employee::new("Employee", company)
                    .with_user(employee_user)
                    .in_department(department),
            )
            .unwrap();
        let other = directory
            .add_employee(Employee::new("Other", company).with_user(other_user))
            .unwrap();

        let mut book = CommissionBook::new(tenant_id, directory, CommissionSettings::default());

        let seller_category = book
            .add_category(CommissionCategory::new("Seller", RateType::Fixed, Basis::MySales))
            .unwrap();
        let mut manager_category =
            CommissionCategory::new("Manager", RateType::Interval, Basis::MyTeamCommissions)
                .with_children([seller_category]);
        for (from, to) in rates {
            manager_category = manager_category.with_rate(RateTemplate::new(dec(from), dec(to), dec("0.05")));
        }
        let manager_category = book.add_category(manager_category).unwrap();

        let mut employee_target = CommissionTarget::new(employee, company, year(), dec("20000"))
            .with_fixed_rate(Decimal::ONE);
        employee_target.category_id = Some(seller_category);
        let employee_target = book.add_target(employee_target).unwrap();

        let mut manager_target = CommissionTarget::new(manager, company, year(), dec("40000"))
            .with_fixed_rate(dec("0.05"));
        manager_target.category_id = Some(manager_category);
        let manager_target = book.add_target(manager_target).unwrap();

        let mut other_target = CommissionTarget::new(other, company, year(), dec("10000"));
        other_target.category_id = Some(seller_category);
        let other_target = book.add_target(other_target).unwrap();

        book.record_sale(SalesRecord {
            employee_id: employee,
            company_id: company,
            invoice_date: date(2026, 3, 15),
            amount: dec("20000"),
        })
        .unwrap();

        Setup {
            book,
            tenant_id,
            company,
            manager_user,
            employee_user,
            other_user,
            manager,
            department,
            seller_category,
            manager_category,
            employee_target,
            manager_target,
            other_target,
        }
    }

    fn seller(s: &Setup, user: PrincipalId) -> Principal {
        Principal::with_permissions(user, s.tenant_id, vec![Permission::COMMISSION_COMPUTE])
    }

    fn team_manager(s: &Setup, user: PrincipalId) -> Principal {
        Principal::with_roles(user, s.tenant_id, vec![Role::SALES_MANAGER])
    }

    fn admin(s: &Setup) -> Principal {
        Principal::with_permissions(PrincipalId::new(), s.tenant_id, vec![Permission::COMMISSION_ADMIN])
    }

    #[test]
    fn child_targets_follow_category_and_department() {
        let s = setup(&[("0", "0.5")]);
        assert_eq!(s.book.child_targets(s.manager_target), vec![s.employee_target]);
        assert!(s.book.child_targets(s.employee_target).is_empty());
    }

    #[test]
    fn child_targets_require_matching_company_and_overlapping_period() {
        let mut s = setup(&[("0", "0.5")]);
        let employee = s.book.target(s.employee_target).unwrap().employee_id;

        let mut foreign = CommissionTarget::new(employee, CompanyId::new(), year(), dec("100"));
        foreign.category_id = Some(s.seller_category);
        s.book.add_target(foreign).unwrap();

        let straddling = DateRange::new(date(2026, 6, 1), date(2027, 5, 31)).unwrap();
        let mut late = CommissionTarget::new(employee, s.company, straddling, dec("100"));
        late.category_id = Some(s.seller_category);
        let late = s.book.add_target(late).unwrap();

        let next_year = DateRange::new(date(2027, 1, 1), date(2027, 12, 31)).unwrap();
        let mut disjoint = CommissionTarget::new(employee, s.company, next_year, dec("100"));
        disjoint.category_id = Some(s.seller_category);
        s.book.add_target(disjoint).unwrap();

        let mut children = s.book.child_targets(s.manager_target);
        children.sort();
        let mut expected = vec![s.employee_target, late];
        expected.sort();
        assert_eq!(children, expected);
    }

    #[test]
    fn manager_without_child_categories_earns_nothing() {
        let mut s = setup(&[("0", "0.5")]);
        let lonely = s
            .book
            .add_category(CommissionCategory::new("Lonely", RateType::Fixed, Basis::MyTeamCommissions))
            .unwrap();
        s.book.apply_category(s.manager_target, lonely).unwrap();

        let principal = admin(&s);
        s.book.compute(&principal, &[s.manager_target]).unwrap();

        let target = s.book.target(s.manager_target).unwrap();
        assert!(target.child_target_ids.is_empty());
        assert_eq!(target.total_amount, Decimal::ZERO);
    }

    #[test]
    fn interval_rates_roll_up_team_commissions() {
        let mut s = setup(&[("0", "0.5"), ("0.5", "1")]);
        let principal = team_manager(&s, s.manager_user);
        s.book.compute(&principal, &[s.manager_target]).unwrap();

        let employee = s.book.target(s.employee_target).unwrap();
        assert_eq!(employee.invoiced_amount, dec("20000"));
        assert_eq!(employee.total_amount, dec("20000"));
        assert!(employee.show_invoices);

        let manager = s.book.target(s.manager_target).unwrap();
        assert_eq!(manager.child_commission_amount, dec("20000"));
        assert_eq!(manager.base_amount, dec("20000"));
        assert_eq!(manager.completion, dec("0.5"));
        assert_eq!(manager.rates[0].completion_rate, Decimal::ONE);
        assert_eq!(manager.rates[0].subtotal, dec("1000"));
        assert_eq!(manager.rates[1].completion_rate, Decimal::ZERO);
        assert_eq!(manager.rates[1].subtotal, Decimal::ZERO);
        assert_eq!(manager.total_amount, dec("1000"));
        assert!(manager.show_child_targets);
        assert!(!manager.show_invoices);
    }

    #[test]
    fn straddling_and_empty_slices() {
        let mut s = setup(&[("0.3", "0.7"), ("1", "1")]);
        let principal = admin(&s);
        s.book.compute(&principal, &[s.manager_target]).unwrap();

        let manager = s.book.target(s.manager_target).unwrap();
        assert_eq!(manager.rates[0].completion_rate, dec("0.5"));
        assert_eq!(manager.rates[0].subtotal, dec("400"));
        assert_eq!(manager.rates[1].completion_rate, Decimal::ZERO);
        assert_eq!(manager.total_amount, dec("400"));
    }

    #[test]
    fn fixed_rate_applies_to_team_base() {
        let mut s = setup(&[]);
        let fixed = s
            .book
            .add_category(
                CommissionCategory::new("Fixed manager", RateType::Fixed, Basis::MyTeamCommissions)
                    .with_children([s.seller_category]),
            )
            .unwrap();
        s.book.apply_category(s.manager_target, fixed).unwrap();

        let principal = admin(&s);
        s.book.compute(&principal, &[s.manager_target]).unwrap();
        assert_eq!(s.book.target(s.manager_target).unwrap().total_amount, dec("1000"));
    }

    #[test]
    fn children_are_computed_before_parents() {
        let mut s = setup(&[("0", "0.5")]);
        let principal = admin(&s);
        let order = s
            .book
            .compute(&principal, &[s.manager_target, s.employee_target])
            .unwrap();
        assert_eq!(order, vec![s.employee_target, s.manager_target]);
    }

    #[test]
    fn category_cycle_is_a_configuration_error() {
        let mut s = setup(&[("0", "0.5")]);
        let mut seller = s.book.categories.get(&s.seller_category).unwrap().clone();
        seller.child_category_ids.push(s.manager_category);
        s.book.categories.insert(seller.id, seller);

        let principal = admin(&s);
        let err = s.book.compute(&principal, &[s.manager_target]).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn employee_cannot_compute_someone_elses_target() {
        let mut s = setup(&[("0", "0.5")]);
        let principal = seller(&s, s.employee_user);

        s.book.compute(&principal, &[s.employee_target]).unwrap();
        let err = s.book.compute(&principal, &[s.other_target]).unwrap_err();
        assert!(err.is_access_error());
        let err = s.book.compute(&principal, &[s.manager_target]).unwrap_err();
        assert!(err.is_access_error());
    }

    #[test]
    fn own_team_target_needs_scope_over_children() {
        let mut s = setup(&[("0", "0.5")]);
        let principal = seller(&s, s.manager_user);

        let err = s.book.compute(&principal, &[s.employee_target]).unwrap_err();
        assert!(err.is_access_error());

        let err = s.book.compute(&principal, &[s.manager_target]).unwrap_err();
        assert!(err.is_access_error());
        let employee = s.book.target(s.employee_target).unwrap();
        assert_eq!(employee.total_amount, Decimal::ZERO);
        assert_eq!(employee.invoiced_amount, Decimal::ZERO);
        assert_eq!(s.book.target(s.manager_target).unwrap().total_amount, Decimal::ZERO);
    }

    #[test]
    fn manager_computes_team_targets_until_replaced() {
        let mut s = setup(&[("0", "0.5")]);
        let principal = team_manager(&s, s.manager_user);
        s.book.compute(&principal, &[s.employee_target]).unwrap();

        let other = s.book.target(s.other_target).unwrap().employee_id;
        s.book.directory_mut().set_manager(s.department, Some(other)).unwrap();

        let err = s.book.compute(&principal, &[s.employee_target]).unwrap_err();
        match err {
            DomainError::Forbidden(msg) if msg.contains("outside the user's commission scope") => {}
            other => panic!("Expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn manager_without_team_permission_only_sees_own_targets() {
        let s = setup(&[("0", "0.5")]);
        let principal = seller(&s, s.manager_user);
        let visible: Vec<TargetId> = s.book.visible_targets(&principal).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![s.manager_target]);
    }

    #[test]
    fn security_scope_returns_own_and_team_targets() {
        let s = setup(&[("0", "0.5")]);
        let principal = team_manager(&s, s.manager_user);

        let mut visible: Vec<TargetId> = s.book.visible_targets(&principal).unwrap().iter().map(|t| t.id).collect();
        visible.sort();
        let mut expected = vec![s.employee_target, s.manager_target];
        expected.sort();
        assert_eq!(visible, expected);

        match s.book.security_scope(&principal).unwrap() {
            TargetFilter::Employees(employees) => assert!(employees.contains(&s.manager)),
            other => panic!("Expected employee scope, got {other:?}"),
        }
    }

    #[test]
    fn other_tenant_or_missing_permission_is_denied() {
        let s = setup(&[("0", "0.5")]);

        let stranger = Principal::with_permissions(s.manager_user, TenantId::new(), vec![Permission::COMMISSION_ADMIN]);
        assert!(s.book.security_scope(&stranger).unwrap_err().is_access_error());

        let no_perms = Principal::with_permissions(s.other_user, s.tenant_id, vec![]);
        match s.book.security_scope(&no_perms).unwrap_err() {
            DomainError::Forbidden(msg) if msg.contains("commission.compute") => {}
            other => panic!("Expected missing permission error, got {other:?}"),
        }
    }

    #[test]
    fn view_child_targets_filter_yields_children() {
        let s = setup(&[("0", "0.5")]);
        let principal = team_manager(&s, s.manager_user);

        let filter = s.book.view_child_targets(&principal, s.manager_target).unwrap();
        let found: Vec<TargetId> = s.book.search(&filter).iter().map(|t| t.id).collect();
        assert_eq!(found, vec![s.employee_target]);
    }

    #[test]
    fn applying_a_category_copies_its_rates() {
        let mut s = setup(&[("0.5", "1"), ("0", "0.5")]);
        let target = s.book.target(s.manager_target).unwrap();
        assert_eq!(target.rates.len(), 2);
        assert_eq!(target.rates[0].slice_from, Decimal::ZERO);
        assert_eq!(target.rates[1].slice_from, dec("0.5"));

        s.book.apply_category(s.manager_target, s.seller_category).unwrap();
        assert!(s.book.target(s.manager_target).unwrap().rates.is_empty());
    }

    #[test]
    fn target_filter_serializes_with_kind_tag() {
        let json = serde_json::to_value(TargetFilter::All).unwrap();
        assert_eq!(json["kind"], "all");
    }
}
