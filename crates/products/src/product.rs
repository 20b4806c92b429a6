use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockwise_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, SaleUnit, ShopId,
    ensure_non_negative,
};
use stockwise_events::Event;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Whether the sale price is typed in by a manager or derived from restock costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingMode {
    Manual,
    #[default]
    Automatic,
}

impl core::fmt::Display for PricingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PricingMode::Manual => f.write_str("manual"),
            PricingMode::Automatic => f.write_str("automatic"),
        }
    }
}

/// Aggregate root: Product.
///
/// Catalog management owns every field except `correcting_factor`, which only the
/// calibration loop writes (through [`RecalibrateCorrectingFactor`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    shop_id: Option<ShopId>,
    name: String,
    sale_unit: SaleUnit,
    pricing_mode: PricingMode,
    manual_price: Decimal,
    correcting_factor: Decimal,
    factor_counted_at: Option<DateTime<Utc>>,
    is_active: bool,
    is_removed: bool,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            shop_id: None,
            name: String::new(),
            sale_unit: SaleUnit::Item,
            pricing_mode: PricingMode::Automatic,
            manual_price: Decimal::ZERO,
            correcting_factor: Decimal::ONE,
            factor_counted_at: None,
            is_active: false,
            is_removed: false,
            version: 0,
            created: false,
        }
    }

    /// Run `CreateProduct` against an empty aggregate.
    pub fn create(cmd: CreateProduct) -> DomainResult<Self> {
        let mut product = Self::empty(cmd.product_id);
        product.execute(&ProductCommand::CreateProduct(cmd))?;
        Ok(product)
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn shop_id(&self) -> Option<ShopId> {
        self.shop_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sale_unit(&self) -> SaleUnit {
        self.sale_unit
    }

    pub fn pricing_mode(&self) -> PricingMode {
        self.pricing_mode
    }

    pub fn manual_price(&self) -> Decimal {
        self.manual_price
    }

    /// Multiplier turning registered sale quantities into estimated real consumption.
    pub fn correcting_factor(&self) -> Decimal {
        self.correcting_factor
    }

    /// Time of the count the current factor was calibrated on, `None` while it is
    /// still the initial `1`.
    pub fn factor_counted_at(&self) -> Option<DateTime<Utc>> {
        self.factor_counted_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_removed(&self) -> bool {
        self.is_removed
    }

    /// Active and not removed from the catalog.
    pub fn is_sellable(&self) -> bool {
        self.is_active && !self.is_removed
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
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub name: String,
    pub sale_unit: SaleUnit,
    pub pricing_mode: PricingMode,
    pub manual_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangePricing (catalog side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePricing {
    pub product_id: ProductId,
    pub pricing_mode: PricingMode,
    pub manual_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveProduct. Products are never deleted; removal hides them for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecalibrateCorrectingFactor (issued by the calibrator only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalibrateCorrectingFactor {
    pub product_id: ProductId,
    pub factor: Decimal,
    /// Time of the count the factor was derived from.
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ChangePricing(ChangePricing),
    DeactivateProduct(DeactivateProduct),
    RemoveProduct(RemoveProduct),
    RecalibrateCorrectingFactor(RecalibrateCorrectingFactor),
}

impl ProductCommand {
    /// The product the command targets.
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductCommand::CreateProduct(cmd) => cmd.product_id,
            ProductCommand::ChangePricing(cmd) => cmd.product_id,
            ProductCommand::DeactivateProduct(cmd) => cmd.product_id,
            ProductCommand::RemoveProduct(cmd) => cmd.product_id,
            ProductCommand::RecalibrateCorrectingFactor(cmd) => cmd.product_id,
        }
    }
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub name: String,
    pub sale_unit: SaleUnit,
    pub pricing_mode: PricingMode,
    pub manual_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PricingChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingChanged {
    pub product_id: ProductId,
    pub pricing_mode: PricingMode,
    pub manual_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeactivated {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRemoved {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CorrectingFactorRecalibrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectingFactorRecalibrated {
    pub product_id: ProductId,
    pub previous: Decimal,
    pub factor: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    PricingChanged(PricingChanged),
    ProductDeactivated(ProductDeactivated),
    ProductRemoved(ProductRemoved),
    CorrectingFactorRecalibrated(CorrectingFactorRecalibrated),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "catalog.product.created",
            ProductEvent::PricingChanged(_) => "catalog.product.pricing_changed",
            ProductEvent::ProductDeactivated(_) => "catalog.product.deactivated",
            ProductEvent::ProductRemoved(_) => "catalog.product.removed",
            ProductEvent::CorrectingFactorRecalibrated(_) => {
                "catalog.product.correcting_factor_recalibrated"
            }
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::PricingChanged(e) => e.occurred_at,
            ProductEvent::ProductDeactivated(e) => e.occurred_at,
            ProductEvent::ProductRemoved(e) => e.occurred_at,
            ProductEvent::CorrectingFactorRecalibrated(e) => e.occurred_at,
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
                self.shop_id = Some(e.shop_id);
                self.name = e.name.clone();
                self.sale_unit = e.sale_unit;
                self.pricing_mode = e.pricing_mode;
                self.manual_price = e.manual_price;
                self.correcting_factor = Decimal::ONE;
                self.factor_counted_at = None;
                self.is_active = true;
                self.is_removed = false;
                self.created = true;
            }
            ProductEvent::PricingChanged(e) => {
                self.pricing_mode = e.pricing_mode;
                self.manual_price = e.manual_price;
            }
            ProductEvent::ProductDeactivated(_) => {
                self.is_active = false;
            }
            ProductEvent::ProductRemoved(_) => {
                self.is_active = false;
                self.is_removed = true;
            }
            ProductEvent::CorrectingFactorRecalibrated(e) => {
                self.correcting_factor = e.factor;
                self.factor_counted_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ChangePricing(cmd) => self.handle_change_pricing(cmd),
            ProductCommand::DeactivateProduct(cmd) => self.handle_deactivate(cmd),
            ProductCommand::RemoveProduct(cmd) => self.handle_remove(cmd),
            ProductCommand::RecalibrateCorrectingFactor(cmd) => self.handle_recalibrate(cmd),
        }
    }
}

impl Product {
    fn ensure_created(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        ensure_non_negative("manual_price", cmd.manual_price)?;

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            shop_id: cmd.shop_id,
            product_id: cmd.product_id,
            name: cmd.name.clone(),
            sale_unit: cmd.sale_unit,
            pricing_mode: cmd.pricing_mode,
            manual_price: cmd.manual_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_pricing(&self, cmd: &ChangePricing) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created(cmd.product_id)?;
        ensure_non_negative("manual_price", cmd.manual_price)?;

        Ok(vec![ProductEvent::PricingChanged(PricingChanged {
            product_id: cmd.product_id,
            pricing_mode: cmd.pricing_mode,
            manual_price: cmd.manual_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created(cmd.product_id)?;
        if !self.is_active {
            return Err(DomainError::conflict("product is already inactive"));
        }

        Ok(vec![ProductEvent::ProductDeactivated(ProductDeactivated {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created(cmd.product_id)?;
        if self.is_removed {
            return Err(DomainError::conflict("product is already removed"));
        }

        Ok(vec![ProductEvent::ProductRemoved(ProductRemoved {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_recalibrate(
        &self,
        cmd: &RecalibrateCorrectingFactor,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created(cmd.product_id)?;
        ensure_non_negative("correcting_factor", cmd.factor)?;

        Ok(vec![ProductEvent::CorrectingFactorRecalibrated(
            CorrectingFactorRecalibrated {
                product_id: cmd.product_id,
                previous: self.correcting_factor,
                factor: cmd.factor,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
