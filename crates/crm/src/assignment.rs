//! Lead assignment by area.

use chrono::{DateTime, Utc};

use crate::lead::{Lead, LeadId};
use crate::territory::{SalespersonChange, Territory};

/// Give each lead the salesperson of its territory.
///
/// Leads without a territory, or whose territory has no salesperson, keep
/// their current salesperson. Returns the changes actually made.
pub fn assign_by_area(
    leads: &mut [Lead],
    territories: &[Territory],
    at: DateTime<Utc>,
) -> Vec<(LeadId, SalespersonChange)> {
    let mut changes = Vec::new();

    for lead in leads.iter_mut() {
        let Some(territory) = lead
            .territory_id
            .and_then(|id| territories.iter().find(|t| t.id == id))
        else {
            continue;
        };
        let Some(salesperson) = territory.salesperson() else {
            continue;
        };
        if let Some(change) = lead.set_salesperson(Some(salesperson), at) {
            tracing::info!(
                lead_id = %lead.id,
                territory = %territory.name,
                salesperson = %salesperson,
                "lead assigned by area"
            );
            changes.push((lead.id, change));
        }
    }

    changes
}
