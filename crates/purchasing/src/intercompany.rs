//! Inter-company routing.
//!
//! When one company of the group buys from another, the supplying company
//! gets a draft sale mirroring the purchase. Its lines ship through the
//! group's inter-company route and picking type.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_core::{CompanyId, DomainError, DomainResult};
use erpkit_products::ProductId;

use crate::order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus};

/// Route and picking type used by inter-company sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterCompanyRouteConfig {
    pub route: String,
    pub picking_type: String,
}

impl Default for InterCompanyRouteConfig {
    fn default() -> Self {
        Self {
            route: "Inter-Company".to_string(),
            picking_type: "Inter-Company Delivery".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePlanLine {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub route: String,
    pub picking_type: String,
}

/// Draft sale order to create in the supplying company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePlan {
    pub purchase_order_id: PurchaseOrderId,
    /// Company that sells (the purchase's supplier).
    pub seller_company_id: CompanyId,
    /// Company that buys (the purchase's owner).
    pub customer_company_id: CompanyId,
    pub lines: Vec<SalePlanLine>,
}

/// Plan the sale mirroring an approved purchase order.
///
/// Returns `Ok(None)` when the supplier is not a company of the group.
pub fn plan_inter_company_sale(
    order: &PurchaseOrder,
    config: &InterCompanyRouteConfig,
) -> DomainResult<Option<SalePlan>> {
    if !order.is_created() {
        return Err(DomainError::not_found());
    }
    if order.status() == PurchaseOrderStatus::Draft {
        return Err(DomainError::invariant(
            "only approved purchase orders are mirrored",
        ));
    }

    let Some(seller_company_id) = order.supplier().and_then(|s| s.company_id) else {
        return Ok(None);
    };
    let customer_company_id = order
        .company_id()
        .ok_or_else(|| DomainError::invariant("purchase order has no company"))?;

    let lines: Vec<SalePlanLine> = order
        .lines()
        .iter()
        .map(|line| SalePlanLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            route: config.route.clone(),
            picking_type: config.picking_type.clone(),
        })
        .collect();

    tracing::info!(
        purchase_order_id = %order.id_typed(),
        seller_company_id = %seller_company_id,
        customer_company_id = %customer_company_id,
        lines = lines.len(),
        route = %config.route,
        "planned inter-company sale"
    );

    Ok(Some(SalePlan {
        purchase_order_id: order.id_typed(),
        seller_company_id,
        customer_company_id,
        lines,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use erpkit_core::{Aggregate, TenantId};

    use crate::order::{AddLine, Approve, CreatePurchaseOrder, PurchaseOrderCommand, Supplier};

    fn approved_order(supplier: Supplier, approve: bool) -> PurchaseOrder {
        let tenant_id = TenantId::new();
        let order_id = PurchaseOrderId::generate();
        let mut order = PurchaseOrder::empty(order_id);
        order
            .execute(&PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                tenant_id,
                order_id,
                company_id: CompanyId::new(),
                supplier,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for quantity in [3, 5] {
            order
                .execute(&PurchaseOrderCommand::AddLine(AddLine {
                    tenant_id,
                    order_id,
                    product_id: ProductId::generate(),
                    quantity: Decimal::from(quantity),
                    unit_price: Decimal::from(20),
                    occurred_at: Utc::now(),
                }))
                .unwrap();
        }
        if approve {
            order
                .execute(&PurchaseOrderCommand::Approve(Approve {
                    tenant_id,
                    order_id,
                    occurred_at: Utc::now(),
                }))
                .unwrap();
        }
        order
    }

    #[test]
    fn purchase_from_group_company_is_mirrored_with_route() {
        let seller = CompanyId::new();
        let order = approved_order(Supplier::group_company("Sister Co", seller), true);
        let config = InterCompanyRouteConfig::default();

        let plan = plan_inter_company_sale(&order, &config).unwrap().unwrap();
        assert_eq!(plan.seller_company_id, seller);
        assert_eq!(Some(plan.customer_company_id), order.company_id());
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[1].quantity, Decimal::from(5));
        assert!(plan.lines.iter().all(|l| l.route == config.route));
        assert!(plan.lines.iter().all(|l| l.picking_type == config.picking_type));
    }

    #[test]
    fn external_supplier_produces_no_plan() {
        let order = approved_order(Supplier::external("Acme"), true);
        let plan = plan_inter_company_sale(&order, &InterCompanyRouteConfig::default()).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn draft_purchase_is_not_mirrored() {
        let order = approved_order(Supplier::group_company("Sister Co", CompanyId::new()), false);
        let err = plan_inter_company_sale(&order, &InterCompanyRouteConfig::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn route_config_deserializes() {
        let config: InterCompanyRouteConfig =
            serde_json::from_str(r#"{"route": "Group", "picking_type": "Group Out"}"#).unwrap();
        assert_eq!(config.route, "Group");
        assert_eq!(config.picking_type, "Group Out");
    }
}
