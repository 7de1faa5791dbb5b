use serde::{Deserialize, Serialize};

use erpkit_core::{CompanyId, Entity};

use crate::employee::EmployeeId;

erpkit_core::typed_id!(DepartmentId);

/// Department with an optional manager and parent department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub manager_id: Option<EmployeeId>,
    pub parent_id: Option<DepartmentId>,
    pub company_id: CompanyId,
}

impl Department {
    pub fn new(name: impl Into<String>, company_id: CompanyId) -> Self {
        Self {
            id: DepartmentId::generate(),
            name: name.into(),
            manager_id: None,
            parent_id: None,
            company_id,
        }
    }

    pub fn managed_by(mut self, manager_id: EmployeeId) -> Self {
        self.manager_id = Some(manager_id);
        self
    }

    pub fn under(mut self, parent_id: DepartmentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

impl Entity for Department {
    type Id = DepartmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
