//! In-memory organization directory.

use std::collections::{BTreeMap, BTreeSet};

use erpkit_auth::PrincipalId;
use erpkit_core::{DomainError, DomainResult};

use crate::department::{Department, DepartmentId};
use crate::employee::{Employee, EmployeeId};

/// Employees and departments of a tenant, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct OrgDirectory {
    employees: BTreeMap<EmployeeId, Employee>,
    departments: BTreeMap<DepartmentId, Department>,
}

impl OrgDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_employee(&mut self, employee: Employee) -> DomainResult<EmployeeId> {
        if self.employees.contains_key(&employee.id) {
            return Err(DomainError::conflict("employee already exists"));
        }
        if let Some(department_id) = employee.department_id {
            if !self.departments.contains_key(&department_id) {
                return Err(DomainError::validation(format!(
                    "unknown department {department_id}"
                )));
            }
        }
        let id = employee.id;
        self.employees.insert(id, employee);
        Ok(id)
    }

    pub fn add_department(&mut self, department: Department) -> DomainResult<DepartmentId> {
        if self.departments.contains_key(&department.id) {
            return Err(DomainError::conflict("department already exists"));
        }
        if let Some(parent_id) = department.parent_id {
            if !self.departments.contains_key(&parent_id) {
                return Err(DomainError::validation(format!(
                    "unknown parent department {parent_id}"
                )));
            }
        }
        let id = department.id;
        self.departments.insert(id, department);
        Ok(id)
    }

    /// Move an employee into a department.
    pub fn assign_department(
        &mut self,
        employee_id: EmployeeId,
        department_id: DepartmentId,
    ) -> DomainResult<()> {
        if !self.departments.contains_key(&department_id) {
            return Err(DomainError::validation(format!(
                "unknown department {department_id}"
            )));
        }
        let employee = self
            .employees
            .get_mut(&employee_id)
            .ok_or_else(DomainError::not_found)?;
        employee.department_id = Some(department_id);
        Ok(())
    }

    /// Replace (or clear) the manager of a department.
    pub fn set_manager(
        &mut self,
        department_id: DepartmentId,
        manager_id: Option<EmployeeId>,
    ) -> DomainResult<()> {
        if let Some(manager_id) = manager_id {
            if !self.employees.contains_key(&manager_id) {
                return Err(DomainError::validation(format!(
                    "unknown employee {manager_id}"
                )));
            }
        }
        let department = self
            .departments
            .get_mut(&department_id)
            .ok_or_else(DomainError::not_found)?;
        department.manager_id = manager_id;
        Ok(())
    }

    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    pub fn department(&self, id: DepartmentId) -> Option<&Department> {
        self.departments.get(&id)
    }

    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.employees.values()
    }

    /// Employee record linked to a principal.
    pub fn employee_for_user(&self, user: PrincipalId) -> Option<&Employee> {
        self.employees.values().find(|e| e.user == Some(user))
    }

    /// Departments whose manager is `manager_id`.
    pub fn managed_departments(&self, manager_id: EmployeeId) -> Vec<DepartmentId> {
        self.departments
            .values()
            .filter(|d| d.manager_id == Some(manager_id))
            .map(|d| d.id)
            .collect()
    }

    /// `root` and its sub-departments, at most `max_depth` levels down.
    pub fn department_tree(&self, root: DepartmentId, max_depth: usize) -> BTreeSet<DepartmentId> {
        let mut found = BTreeSet::from([root]);
        let mut frontier = vec![root];

        for _ in 0..max_depth {
            let next: Vec<DepartmentId> = self
                .departments
                .values()
                .filter(|d| d.parent_id.is_some_and(|p| frontier.contains(&p)))
                .map(|d| d.id)
                .filter(|id| found.insert(*id))
                .collect();
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        found
    }

    /// Employees of the departments `manager_id` manages directly.
    pub fn direct_team(&self, manager_id: EmployeeId) -> BTreeSet<EmployeeId> {
        let departments = self.managed_departments(manager_id);
        self.members_of(|d| departments.contains(&d))
    }

    /// Employees of every department managed by `manager_id`, including
    /// sub-departments up to `max_depth` levels below them.
    pub fn team(&self, manager_id: EmployeeId, max_depth: usize) -> BTreeSet<EmployeeId> {
        let departments: BTreeSet<DepartmentId> = self
            .managed_departments(manager_id)
            .into_iter()
            .flat_map(|d| self.department_tree(d, max_depth))
            .collect();
        self.members_of(|d| departments.contains(&d))
    }

    pub fn manages(&self, manager_id: EmployeeId, employee_id: EmployeeId, max_depth: usize) -> bool {
        self.team(manager_id, max_depth).contains(&employee_id)
    }

    fn members_of(&self, in_scope: impl Fn(DepartmentId) -> bool) -> BTreeSet<EmployeeId> {
        self.employees
            .values()
            .filter(|e| e.department_id.is_some_and(&in_scope))
            .map(|e| e.id)
            .collect()
    }
}
