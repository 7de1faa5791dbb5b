use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use erpkit_core::{Aggregate, AggregateRoot, DomainError, TenantId};
use erpkit_events::Event;
use erpkit_products::{KitDefinition, ProductSnapshot};

use crate::delivery::{self, DeliveryCarrier};
use crate::kit;
use crate::line::{DeliveredMethod, OrderLine};
use crate::payment::{AutoConfirmAction, PaymentAcquirer};

erpkit_core::typed_id!(
    /// Sales order identifier (tenant-scoped via `tenant_id` fields in events/commands).
    SalesOrderId
);

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Draft,
    /// Quotation sent to the customer, still editable.
    Sent,
    Confirmed,
    Invoiced,
}

/// Payment transaction registered against the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub reference: String,
    pub acquirer: String,
    pub amount: Decimal,
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesOrder {
    id: SalesOrderId,
    tenant_id: Option<TenantId>,
    status: SalesOrderStatus,
    lines: Vec<OrderLine>,
    transactions: Vec<PaymentTransaction>,
    confirmation_email_requested: bool,
    version: u64,
    created: bool,
}

impl SalesOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SalesOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            status: SalesOrderStatus::Draft,
            lines: Vec::new(),
            transactions: Vec::new(),
            confirmation_email_requested: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn transactions(&self) -> &[PaymentTransaction] {
        &self.transactions
    }

    /// Whether the last confirmation asked for the confirmation e-mail.
    pub fn confirmation_email_requested(&self) -> bool {
        self.confirmation_email_requested
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, SalesOrderStatus::Draft | SalesOrderStatus::Sent)
    }

    pub fn is_invoice_allowed(&self) -> bool {
        matches!(self.status, SalesOrderStatus::Confirmed)
    }

    pub fn next_kit_reference(&self) -> String {
        kit::next_kit_reference(&self.lines)
    }

    pub fn available_kit_references(&self) -> String {
        kit::available_kit_references(&self.lines)
    }

    /// Delivered quantity of a line (derived for kits delivered through components).
    pub fn qty_delivered(&self, line_no: u32) -> Option<Decimal> {
        let line = self.line(line_no)?;
        match line.delivered_method {
            DeliveredMethod::Kit => Some(kit::kit_qty_delivered(&self.lines, line)),
            _ => Some(line.qty_delivered),
        }
    }

    pub fn amount_untaxed(&self) -> Decimal {
        delivery::amount_untaxed(&self.lines)
    }

    pub fn amount_total_without_delivery(&self) -> Decimal {
        delivery::amount_total_without_delivery(&self.lines)
    }

    fn next_line_no(&self) -> u32 {
        self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1
    }

    fn next_sequence(&self) -> u32 {
        self.lines.iter().map(|l| l.sequence).max().unwrap_or(0) + 1
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (plain product line at list price).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub product: ProductSnapshot,
    pub quantity: Decimal,
    /// Percent.
    pub discount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddKit (kit line + one line per kit definition line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddKit {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub kit_product: ProductSnapshot,
    pub kit: KitDefinition,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddDeliveryLine (replaces existing delivery lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDeliveryLine {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub carrier: DeliveryCarrier,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeLineQuantity (kit lines rescale their components).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLineQuantity {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateKitComponentQuantities (rescale every kit of the order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateKitComponentQuantities {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLine (removing a kit removes its components).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLine {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveDanglingKitComponents (drop components whose kit line is gone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveDanglingKitComponents {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordDelivery (delivered quantity reported by stock or by hand).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDelivery {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub qty_delivered: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RegisterPaymentTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPaymentTransaction {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub acquirer: PaymentAcquirer,
    pub reference: String,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendQuotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendQuotation {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkInvoiced {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    CreateSalesOrder(CreateSalesOrder),
    AddLine(AddLine),
    AddKit(AddKit),
    AddDeliveryLine(AddDeliveryLine),
    ChangeLineQuantity(ChangeLineQuantity),
    UpdateKitComponentQuantities(UpdateKitComponentQuantities),
    RemoveLine(RemoveLine),
    RemoveDanglingKitComponents(RemoveDanglingKitComponents),
    RecordDelivery(RecordDelivery),
    RegisterPaymentTransaction(RegisterPaymentTransaction),
    SendQuotation(SendQuotation),
    ConfirmOrder(ConfirmOrder),
    MarkInvoiced(MarkInvoiced),
}

/// Event: SalesOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderCreated {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line: OrderLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: KitAdded (kit line first, then its components).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitAdded {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub reference: String,
    pub lines: Vec<OrderLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineQuantityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantityChanged {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: KitComponentsRescaled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitComponentsRescaled {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub reference: String,
    pub factor: Decimal,
    /// `(line_no, quantity)` of the rescaled components.
    pub quantities: Vec<(u32, Decimal)>,
    pub previous_quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecorded {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub qty_delivered: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentTransactionCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransactionCreated {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub transaction: PaymentTransaction,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuotationSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationSent {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    /// The customer should receive the confirmation e-mail.
    pub send_email: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInvoiced {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    SalesOrderCreated(SalesOrderCreated),
    LineAdded(LineAdded),
    KitAdded(KitAdded),
    LineQuantityChanged(LineQuantityChanged),
    KitComponentsRescaled(KitComponentsRescaled),
    LineRemoved(LineRemoved),
    DeliveryRecorded(DeliveryRecorded),
    PaymentTransactionCreated(PaymentTransactionCreated),
    QuotationSent(QuotationSent),
    OrderConfirmed(OrderConfirmed),
    OrderInvoiced(OrderInvoiced),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::SalesOrderCreated(_) => "sales.order.created",
            SalesOrderEvent::LineAdded(_) => "sales.order.line_added",
            SalesOrderEvent::KitAdded(_) => "sales.order.kit_added",
            SalesOrderEvent::LineQuantityChanged(_) => "sales.order.line_quantity_changed",
            SalesOrderEvent::KitComponentsRescaled(_) => "sales.order.kit_components_rescaled",
            SalesOrderEvent::LineRemoved(_) => "sales.order.line_removed",
            SalesOrderEvent::DeliveryRecorded(_) => "sales.order.delivery_recorded",
            SalesOrderEvent::PaymentTransactionCreated(_) => "sales.order.payment_transaction_created",
            SalesOrderEvent::QuotationSent(_) => "sales.order.quotation_sent",
            SalesOrderEvent::OrderConfirmed(_) => "sales.order.confirmed",
            SalesOrderEvent::OrderInvoiced(_) => "sales.order.invoiced",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::SalesOrderCreated(e) => e.occurred_at,
            SalesOrderEvent::LineAdded(e) => e.occurred_at,
            SalesOrderEvent::KitAdded(e) => e.occurred_at,
            SalesOrderEvent::LineQuantityChanged(e) => e.occurred_at,
            SalesOrderEvent::KitComponentsRescaled(e) => e.occurred_at,
            SalesOrderEvent::LineRemoved(e) => e.occurred_at,
            SalesOrderEvent::DeliveryRecorded(e) => e.occurred_at,
            SalesOrderEvent::PaymentTransactionCreated(e) => e.occurred_at,
            SalesOrderEvent::QuotationSent(e) => e.occurred_at,
            SalesOrderEvent::OrderConfirmed(e) => e.occurred_at,
            SalesOrderEvent::OrderInvoiced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::SalesOrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.status = SalesOrderStatus::Draft;
                self.lines.clear();
                self.transactions.clear();
                self.created = true;
            }
            SalesOrderEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
                kit::resequence(&mut self.lines);
            }
            SalesOrderEvent::KitAdded(e) => {
                self.lines.extend(e.lines.iter().cloned());
                kit::resequence(&mut self.lines);
            }
            SalesOrderEvent::LineQuantityChanged(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.quantity = e.quantity;
                }
            }
            SalesOrderEvent::KitComponentsRescaled(e) => {
                for (line_no, quantity) in &e.quantities {
                    if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == *line_no) {
                        line.quantity = *quantity;
                    }
                }
                if let Some(kit_line) = self
                    .lines
                    .iter_mut()
                    .find(|l| l.is_kit() && l.kit_reference() == Some(e.reference.as_str()))
                {
                    kit_line.set_kit_previous_quantity(e.previous_quantity);
                }
            }
            SalesOrderEvent::LineRemoved(e) => {
                self.lines.retain(|l| l.line_no != e.line_no);
                kit::resequence(&mut self.lines);
            }
            SalesOrderEvent::DeliveryRecorded(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.qty_delivered = e.qty_delivered;
                }
            }
            SalesOrderEvent::PaymentTransactionCreated(e) => {
                self.transactions.push(e.transaction.clone());
            }
            SalesOrderEvent::QuotationSent(_) => {
                self.status = SalesOrderStatus::Sent;
            }
            SalesOrderEvent::OrderConfirmed(e) => {
                self.status = SalesOrderStatus::Confirmed;
                self.confirmation_email_requested = e.send_email;
            }
            SalesOrderEvent::OrderInvoiced(_) => {
                self.status = SalesOrderStatus::Invoiced;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SalesOrderCommand::CreateSalesOrder(cmd) => self.handle_create(cmd),
            SalesOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            SalesOrderCommand::AddKit(cmd) => self.handle_add_kit(cmd),
            SalesOrderCommand::AddDeliveryLine(cmd) => self.handle_add_delivery_line(cmd),
            SalesOrderCommand::ChangeLineQuantity(cmd) => self.handle_change_quantity(cmd),
            SalesOrderCommand::UpdateKitComponentQuantities(cmd) => {
                self.handle_update_kit_quantities(cmd)
            }
            SalesOrderCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            SalesOrderCommand::RemoveDanglingKitComponents(cmd) => {
                self.handle_remove_dangling(cmd)
            }
            SalesOrderCommand::RecordDelivery(cmd) => self.handle_record_delivery(cmd),
            SalesOrderCommand::RegisterPaymentTransaction(cmd) => self.handle_payment(cmd),
            SalesOrderCommand::SendQuotation(cmd) => self.handle_send_quotation(cmd),
            SalesOrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            SalesOrderCommand::MarkInvoiced(cmd) => self.handle_mark_invoiced(cmd),
        }
    }
}

impl SalesOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: SalesOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, order_id: SalesOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_order_id(order_id)
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify order once it is confirmed or invoiced",
            ));
        }
        Ok(())
    }

    fn existing_line(&self, line_no: u32) -> Result<&OrderLine, DomainError> {
        self.line(line_no)
            .ok_or_else(|| DomainError::validation(format!("line {line_no} does not exist")))
    }

    fn handle_create(
        &self,
        cmd: &CreateSalesOrder,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sales order already exists"));
        }

        Ok(vec![SalesOrderEvent::SalesOrderCreated(SalesOrderCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity must be positive"));
        }

        if cmd.discount < Decimal::ZERO || cmd.discount > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation("discount must be between 0 and 100"));
        }

        let mut line = OrderLine::for_product(self.next_line_no(), cmd.product.clone(), cmd.quantity);
        line.sequence = self.next_sequence();
        line.discount = cmd.discount;

        Ok(vec![SalesOrderEvent::LineAdded(LineAdded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_kit(&self, cmd: &AddKit) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity must be positive"));
        }

        if cmd.kit.lines.is_empty() {
            return Err(DomainError::validation("kit has no lines"));
        }

        let reference = self.next_kit_reference();
        let mut lines = kit::initialize_kit(
            &cmd.kit_product,
            &cmd.kit,
            cmd.quantity,
            &reference,
            self.next_line_no(),
        );
        let sequence = self.next_sequence();
        for line in &mut lines {
            line.sequence = sequence;
        }

        Ok(vec![SalesOrderEvent::KitAdded(KitAdded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            reference,
            lines,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_delivery_line(
        &self,
        cmd: &AddDeliveryLine,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        let mut events: Vec<SalesOrderEvent> = self
            .lines
            .iter()
            .filter(|l| l.is_delivery)
            .map(|l| {
                SalesOrderEvent::LineRemoved(LineRemoved {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    line_no: l.line_no,
                    occurred_at: cmd.occurred_at,
                })
            })
            .collect();

        let mut line = OrderLine::for_product(self.next_line_no(), cmd.carrier.product.clone(), Decimal::ONE);
        line.sequence = self.next_sequence();
        line.name = cmd.carrier.name.clone();
        line.unit_price = cmd.carrier.rate_for(&self.lines);
        line.is_delivery = true;

        events.push(SalesOrderEvent::LineAdded(LineAdded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line,
            occurred_at: cmd.occurred_at,
        }));
        Ok(events)
    }

    fn handle_change_quantity(
        &self,
        cmd: &ChangeLineQuantity,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        let line = self.existing_line(cmd.line_no)?;

        if line.is_layout() {
            return Err(DomainError::validation("sections and notes have no quantity"));
        }

        if line.edit_policy.quantity_readonly {
            return Err(DomainError::validation(format!(
                "quantity of line {} is read-only",
                cmd.line_no
            )));
        }

        if cmd.quantity < Decimal::ZERO {
            return Err(DomainError::validation("quantity cannot be negative"));
        }

        let mut events = vec![SalesOrderEvent::LineQuantityChanged(LineQuantityChanged {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })];

        if line.is_kit() {
            let mut updated = line.clone();
            updated.quantity = cmd.quantity;
            if let Some(rescale) = kit::rescale_kit_components(&self.lines, &updated) {
                events.push(rescaled_event(cmd.tenant_id, cmd.order_id, rescale, cmd.occurred_at));
            }
        }

        Ok(events)
    }

    fn handle_update_kit_quantities(
        &self,
        cmd: &UpdateKitComponentQuantities,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        Ok(self
            .lines
            .iter()
            .filter(|l| l.is_kit())
            .filter_map(|kit_line| kit::rescale_kit_components(&self.lines, kit_line))
            .map(|rescale| rescaled_event(cmd.tenant_id, cmd.order_id, rescale, cmd.occurred_at))
            .collect())
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        let line = self.existing_line(cmd.line_no)?;

        if !line.edit_policy.is_deletable() {
            return Err(DomainError::validation(format!(
                "line {} cannot be deleted",
                cmd.line_no
            )));
        }

        let remaining: Vec<OrderLine> = self
            .lines
            .iter()
            .filter(|l| l.line_no != cmd.line_no)
            .cloned()
            .collect();

        let removed = std::iter::once(cmd.line_no).chain(kit::dangling_kit_components(&remaining));

        Ok(removed
            .map(|line_no| {
                SalesOrderEvent::LineRemoved(LineRemoved {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    line_no,
                    occurred_at: cmd.occurred_at,
                })
            })
            .collect())
    }

    fn handle_remove_dangling(
        &self,
        cmd: &RemoveDanglingKitComponents,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        Ok(kit::dangling_kit_components(&self.lines)
            .into_iter()
            .map(|line_no| {
                SalesOrderEvent::LineRemoved(LineRemoved {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    line_no,
                    occurred_at: cmd.occurred_at,
                })
            })
            .collect())
    }

    fn handle_record_delivery(
        &self,
        cmd: &RecordDelivery,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if !matches!(
            self.status,
            SalesOrderStatus::Confirmed | SalesOrderStatus::Invoiced
        ) {
            return Err(DomainError::invariant("only confirmed orders can be delivered"));
        }

        let line = self.existing_line(cmd.line_no)?;

        if line.delivered_method == DeliveredMethod::Kit {
            return Err(DomainError::validation(
                "delivered quantity of a kit is derived from its components",
            ));
        }

        if cmd.qty_delivered < Decimal::ZERO {
            return Err(DomainError::validation("delivered quantity cannot be negative"));
        }

        Ok(vec![SalesOrderEvent::DeliveryRecorded(DeliveryRecorded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            qty_delivered: cmd.qty_delivered,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Record the transaction, then apply the acquirer's auto-confirm action.
    ///
    /// `ConfirmOrder` is skipped on orders without lines or past confirmation,
    /// and `SendQuotation` only acts on drafts; the transaction is kept either way.
    fn handle_payment(
        &self,
        cmd: &RegisterPaymentTransaction,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if cmd.amount <= Decimal::ZERO {
            return Err(DomainError::validation("transaction amount must be positive"));
        }

        let mut events = vec![SalesOrderEvent::PaymentTransactionCreated(
            PaymentTransactionCreated {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                transaction: PaymentTransaction {
                    reference: cmd.reference.clone(),
                    acquirer: cmd.acquirer.name.clone(),
                    amount: cmd.amount,
                },
                occurred_at: cmd.occurred_at,
            },
        )];

        match cmd.acquirer.auto_confirm {
            AutoConfirmAction::ConfirmOrder if self.is_modifiable() && !self.lines.is_empty() => {
                events.push(SalesOrderEvent::OrderConfirmed(OrderConfirmed {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    send_email: true,
                    occurred_at: cmd.occurred_at,
                }));
            }
            AutoConfirmAction::SendQuotation if self.status == SalesOrderStatus::Draft => {
                events.push(SalesOrderEvent::QuotationSent(QuotationSent {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                }));
            }
            _ => {}
        }

        Ok(events)
    }

    fn handle_send_quotation(
        &self,
        cmd: &SendQuotation,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status != SalesOrderStatus::Draft {
            return Err(DomainError::invariant("only draft quotations can be sent"));
        }

        Ok(vec![SalesOrderEvent::QuotationSent(QuotationSent {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(
        &self,
        cmd: &ConfirmOrder,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "only draft or sent orders can be confirmed",
            ));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot confirm order without lines",
            ));
        }

        Ok(vec![SalesOrderEvent::OrderConfirmed(OrderConfirmed {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            send_email: false,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_invoiced(
        &self,
        cmd: &MarkInvoiced,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if !self.is_invoice_allowed() {
            return Err(DomainError::invariant(
                "cannot invoice order that is not confirmed",
            ));
        }

        Ok(vec![SalesOrderEvent::OrderInvoiced(OrderInvoiced {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn rescaled_event(
    tenant_id: TenantId,
    order_id: SalesOrderId,
    rescale: kit::KitRescale,
    occurred_at: DateTime<Utc>,
) -> SalesOrderEvent {
    SalesOrderEvent::KitComponentsRescaled(KitComponentsRescaled {
        tenant_id,
        order_id,
        reference: rescale.reference,
        factor: rescale.factor,
        quantities: rescale.quantities,
        previous_quantity: rescale.previous_quantity,
        occurred_at,
    })
}
