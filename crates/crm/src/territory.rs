use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use erpkit_auth::PrincipalId;
use erpkit_core::{DomainError, DomainResult, Entity};

erpkit_core::typed_id!(TerritoryId);

/// Tracked change of a record's salesperson (old -> new).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalespersonChange {
    pub old: Option<PrincipalId>,
    pub new: Option<PrincipalId>,
    pub changed_at: DateTime<Utc>,
}

pub(crate) fn track_salesperson(
    slot: &mut Option<PrincipalId>,
    history: &mut Vec<SalespersonChange>,
    salesperson: Option<PrincipalId>,
    at: DateTime<Utc>,
) -> Option<SalespersonChange> {
    if *slot == salesperson {
        return None;
    }
    let change = SalespersonChange {
        old: *slot,
        new: salesperson,
        changed_at: at,
    };
    *slot = salesperson;
    history.push(change.clone());
    Some(change)
}

/// Sales area, optionally staffed by a salesperson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    salesperson: Option<PrincipalId>,
    history: Vec<SalespersonChange>,
}

impl Territory {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("territory name cannot be empty"));
        }
        Ok(Self {
            id: TerritoryId::generate(),
            name,
            salesperson: None,
            history: Vec::new(),
        })
    }

    pub fn salesperson(&self) -> Option<PrincipalId> {
        self.salesperson
    }

    /// Salesperson changes, oldest first.
    pub fn history(&self) -> &[SalespersonChange] {
        &self.history
    }

    /// Set the salesperson; returns the tracked change, or `None` when the
    /// salesperson is unchanged.
    pub fn set_salesperson(
        &mut self,
        salesperson: Option<PrincipalId>,
        at: DateTime<Utc>,
    ) -> Option<SalespersonChange> {
        track_salesperson(&mut self.salesperson, &mut self.history, salesperson, at)
    }
}

impl Entity for Territory {
    type Id = TerritoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
