use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use erpkit_auth::PrincipalId;
use erpkit_core::Entity;

use crate::territory::{SalespersonChange, TerritoryId, track_salesperson};

erpkit_core::typed_id!(LeadId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub territory_id: Option<TerritoryId>,
    salesperson: Option<PrincipalId>,
    history: Vec<SalespersonChange>,
}

impl Lead {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LeadId::generate(),
            name: name.into(),
            territory_id: None,
            salesperson: None,
            history: Vec::new(),
        }
    }

    pub fn in_territory(mut self, territory_id: TerritoryId) -> Self {
        self.territory_id = Some(territory_id);
        self
    }

    pub fn salesperson(&self) -> Option<PrincipalId> {
        self.salesperson
    }

    pub fn history(&self) -> &[SalespersonChange] {
        &self.history
    }

    pub fn set_salesperson(
        &mut self,
        salesperson: Option<PrincipalId>,
        at: DateTime<Utc>,
    ) -> Option<SalespersonChange> {
        track_salesperson(&mut self.salesperson, &mut self.history, salesperson, at)
    }
}

impl Entity for Lead {
    type Id = LeadId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
