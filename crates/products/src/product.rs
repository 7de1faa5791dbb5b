use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_core::{Aggregate, AggregateRoot, DomainError, TenantId};
use erpkit_events::Event;

use crate::kit::{KitDefinition, ProductSnapshot, Uom};

erpkit_core::typed_id!(
    /// Product identifier (tenant-scoped via `tenant_id` fields in events/commands).
    ProductId
);

/// Product type (decides how deliveries are tracked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Tracked in stock.
    Stockable,
    /// Delivered through stock moves but not tracked.
    Consumable,
    /// Never moves through stock.
    Service,
}

impl ProductType {
    /// Whether deliveries of this product go through stock moves.
    pub fn is_storable(self) -> bool {
        matches!(self, ProductType::Stockable | ProductType::Consumable)
    }
}

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    tenant_id: Option<TenantId>,
    sku: String,
    name: String,
    product_type: ProductType,
    list_price: Decimal,
    uom: Uom,
    status: ProductStatus,
    kit: Option<KitDefinition>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            sku: String::new(),
            name: String::new(),
            product_type: ProductType::Consumable,
            list_price: Decimal::ZERO,
            uom: Uom::unit(),
            status: ProductStatus::Draft,
            kit: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product_type(&self) -> ProductType {
        self.product_type
    }

    pub fn list_price(&self) -> Decimal {
        self.list_price
    }

    pub fn uom(&self) -> &Uom {
        &self.uom
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn is_kit(&self) -> bool {
        self.kit.is_some()
    }

    pub fn kit(&self) -> Option<&KitDefinition> {
        self.kit.as_ref()
    }

    /// Check if product can be sold (must be Active, not Archived).
    pub fn can_be_sold(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Frozen view used by sales and kit lines.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id,
            name: self.name.clone(),
            product_type: self.product_type,
            list_price: self.list_price,
            uom: self.uom.clone(),
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub product_type: ProductType,
    pub list_price: Decimal,
    pub uom: Uom,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DefineKit (turns the product into a kit, or replaces its kit lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineKit {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub kit: KitDefinition,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveKit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveKit {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ActivateProduct(ActivateProduct),
    ArchiveProduct(ArchiveProduct),
    DefineKit(DefineKit),
    RemoveKit(RemoveKit),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub product_type: ProductType,
    pub list_price: Decimal,
    pub uom: Uom,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArchived {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: KitDefined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitDefined {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub kit: KitDefinition,
    pub occurred_at: DateTime<Utc>,
}

/// Event: KitRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitRemoved {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductActivated(ProductActivated),
    ProductArchived(ProductArchived),
    KitDefined(KitDefined),
    KitRemoved(KitRemoved),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductActivated(_) => "products.product.activated",
            ProductEvent::ProductArchived(_) => "products.product.archived",
            ProductEvent::KitDefined(_) => "products.product.kit_defined",
            ProductEvent::KitRemoved(_) => "products.product.kit_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductActivated(e) => e.occurred_at,
            ProductEvent::ProductArchived(e) => e.occurred_at,
            ProductEvent::KitDefined(e) => e.occurred_at,
            ProductEvent::KitRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.tenant_id = Some(e.tenant_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.product_type = e.product_type;
                self.list_price = e.list_price;
                self.uom = e.uom.clone();
                self.status = ProductStatus::Draft;
                self.kit = None;
                self.created = true;
            }
            ProductEvent::ProductActivated(_) => {
                self.status = ProductStatus::Active;
            }
            ProductEvent::ProductArchived(_) => {
                self.status = ProductStatus::Archived;
            }
            ProductEvent::KitDefined(e) => {
                self.kit = Some(e.kit.clone());
            }
            ProductEvent::KitRemoved(_) => {
                self.kit = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ActivateProduct(cmd) => self.handle_activate(cmd),
            ProductCommand::ArchiveProduct(cmd) => self.handle_archive(cmd),
            ProductCommand::DefineKit(cmd) => self.handle_define_kit(cmd),
            ProductCommand::RemoveKit(cmd) => self.handle_remove_kit(cmd),
        }
    }
}

impl Product {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_product_id(product_id)
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        if cmd.list_price < Decimal::ZERO {
            return Err(DomainError::validation("list price cannot be negative"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            sku: cmd.sku.clone(),
            name: cmd.name.clone(),
            product_type: cmd.product_type,
            list_price: cmd.list_price,
            uom: cmd.uom.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.product_id)?;

        if self.status == ProductStatus::Active {
            return Err(DomainError::conflict("product is already active"));
        }

        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot be activated"));
        }

        Ok(vec![ProductEvent::ProductActivated(ProductActivated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.product_id)?;

        if self.status == ProductStatus::Archived {
            return Err(DomainError::conflict("product is already archived"));
        }

        Ok(vec![ProductEvent::ProductArchived(ProductArchived {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_define_kit(&self, cmd: &DefineKit) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.product_id)?;

        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot become kits"));
        }

        cmd.kit.validate(self.id)?;

        Ok(vec![ProductEvent::KitDefined(KitDefined {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            kit: cmd.kit.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_kit(&self, cmd: &RemoveKit) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.product_id)?;

        if self.kit.is_none() {
            return Err(DomainError::conflict("product is not a kit"));
        }

        Ok(vec![ProductEvent::KitRemoved(KitRemoved {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::KitLine;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_product_id() -> ProductId {
        ProductId::generate()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(tenant_id: TenantId, product_id: ProductId) -> CreateProduct {
        CreateProduct {
            tenant_id,
            product_id,
            sku: "SKU-001".to_string(),
            name: "Test Product".to_string(),
            product_type: ProductType::Service,
            list_price: Decimal::new(1000, 2),
            uom: Uom::unit(),
            occurred_at: test_time(),
        }
    }

    fn created_product(tenant_id: TenantId, product_id: ProductId) -> Product {
        let mut product = Product::empty(product_id);
        product
            .execute(&ProductCommand::CreateProduct(create_cmd(tenant_id, product_id)))
            .unwrap();
        product
    }

    fn component(name: &str) -> ProductSnapshot {
        ProductSnapshot {
            product_id: test_product_id(),
            name: name.to_string(),
            product_type: ProductType::Stockable,
            list_price: Decimal::new(500, 2),
            uom: Uom::unit(),
        }
    }

    #[test]
    fn create_product_emits_product_created_event() {
        let product = Product::empty(test_product_id());
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();

        let events = product
            .handle(&ProductCommand::CreateProduct(create_cmd(tenant_id, product_id)))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            ProductEvent::ProductCreated(e) => {
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.product_id, product_id);
                assert_eq!(e.sku, "SKU-001");
                assert_eq!(e.product_type, ProductType::Service);
            }
            _ => panic!("Expected ProductCreated event"),
        }
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let product = Product::empty(test_product_id());
        let mut cmd = create_cmd(test_tenant_id(), test_product_id());
        cmd.name = "   ".to_string();

        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn create_product_rejects_duplicate_creation() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let err = product
            .handle(&ProductCommand::CreateProduct(create_cmd(tenant_id, product_id)))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for duplicate creation"),
        }
    }

    #[test]
    fn archived_products_cannot_be_activated() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);

        product
            .execute(&ProductCommand::ArchiveProduct(ArchiveProduct {
                tenant_id,
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap();

        let err = product
            .handle(&ProductCommand::ActivateProduct(ActivateProduct {
                tenant_id,
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(!product.can_be_sold());
    }

    #[test]
    fn define_kit_makes_product_a_kit() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let mut product = created_product(tenant_id, product_id);

        let kit = KitDefinition::new(vec![
            KitLine::section("Hardware"),
            KitLine::component(component("Frame"), Decimal::ONE, true),
            KitLine::component(component("Manual"), Decimal::from(2), false),
        ])
        .with_discount(Decimal::new(2, 1));

        product
            .execute(&ProductCommand::DefineKit(DefineKit {
                tenant_id,
                product_id,
                kit: kit.clone(),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert!(product.is_kit());
        assert_eq!(product.kit(), Some(&kit));
        assert_eq!(product.kit().unwrap().components().count(), 2);
    }

    #[test]
    fn define_kit_rejects_self_reference() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let kit = KitDefinition::new(vec![KitLine::component(product.snapshot(), Decimal::ONE, true)]);
        let err = product
            .handle(&ProductCommand::DefineKit(DefineKit {
                tenant_id,
                product_id,
                kit,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("cannot contain itself") => {}
            other => panic!("Expected self-reference violation, got {other:?}"),
        }
    }

    #[test]
    fn define_kit_rejects_discount_out_of_range() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let kit = KitDefinition::new(vec![KitLine::component(component("A"), Decimal::ONE, true)])
            .with_discount(Decimal::from(20));
        let err = product
            .handle(&ProductCommand::DefineKit(DefineKit {
                tenant_id,
                product_id,
                kit,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn define_kit_rejects_nameless_section_and_zero_quantity() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        for kit in [
            KitDefinition::new(vec![KitLine::section("  ")]),
            KitDefinition::new(vec![KitLine::component(component("A"), Decimal::ZERO, false)]),
            KitDefinition::new(vec![]),
        ] {
            let err = product
                .handle(&ProductCommand::DefineKit(DefineKit {
                    tenant_id,
                    product_id,
                    kit,
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn remove_kit_requires_a_kit() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let err = product
            .handle(&ProductCommand::RemoveKit(RemoveKit {
                tenant_id,
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn commands_on_missing_product_are_not_found() {
        let product = Product::empty(test_product_id());
        let err = product
            .handle(&ProductCommand::ActivateProduct(ActivateProduct {
                tenant_id: test_tenant_id(),
                product_id: test_product_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let tenant_id = test_tenant_id();
        let product_id = test_product_id();
        let product = created_product(tenant_id, product_id);

        let snapshot = product.snapshot();
        assert_eq!(snapshot.product_id, product_id);
        assert_eq!(snapshot.name, "Test Product");
        assert_eq!(snapshot.list_price, Decimal::new(1000, 2));
        assert!(!snapshot.product_type.is_storable());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: Handle is deterministic and does not mutate state.
            #[test]
            fn handle_is_deterministic(
                sku in "[A-Z0-9]{1,20}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,99}"
            ) {
                let tenant_id = test_tenant_id();
                let product_id = test_product_id();
                let mut product = Product::empty(product_id);
                let mut cmd = create_cmd(tenant_id, product_id);
                cmd.sku = sku;
                cmd.name = name;
                product.execute(&ProductCommand::CreateProduct(cmd)).unwrap();

                let state_before = product.clone();
                let activate = ProductCommand::ActivateProduct(ActivateProduct {
                    tenant_id,
                    product_id,
                    occurred_at: Utc::now(),
                });

                let events1 = product.handle(&activate);
                let events2 = product.handle(&activate);

                prop_assert_eq!(&state_before, &product);
                prop_assert_eq!(events1, events2);
            }
        }
    }
}
