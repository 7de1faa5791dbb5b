use serde::{Deserialize, Serialize};

use erpkit_auth::PrincipalId;
use erpkit_core::{CompanyId, Entity};

use crate::department::DepartmentId;

erpkit_core::typed_id!(EmployeeId);

/// Employee record; `user` links it to the principal acting in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub user: Option<PrincipalId>,
    pub department_id: Option<DepartmentId>,
    pub company_id: CompanyId,
}

impl Employee {
    pub fn new(name: impl Into<String>, company_id: CompanyId) -> Self {
        Self {
            id: EmployeeId::generate(),
            name: name.into(),
            user: None,
            department_id: None,
            company_id,
        }
    }

    pub fn with_user(mut self, user: PrincipalId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn in_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
