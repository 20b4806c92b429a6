//! In-memory fakes for the engine's ports.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use stockwise_core::{Aggregate, AggregateId, DomainError, DomainResult, OperatorId, SaleUnit, ShopId};
use stockwise_inventory::{
    CountEntry, CountHistory, CountSpan, InventoryCount, InventoryCountId, InventoryCountLine,
};
use stockwise_products::{
    CreateProduct, PricingMode, Product, ProductCommand, ProductEvent, ProductId,
    RecalibrateCorrectingFactor,
};
use stockwise_purchasing::{StockBatchId, StockBatchLine};

use crate::ports::{
    BatchLineRecord, InventoryCountLog, ProductCatalog, SaleLineSource, StockBatchLog, Window,
};

/// `t(m)` is `m` minutes after a fixed origin.
pub fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn product(sale_unit: SaleUnit, pricing_mode: PricingMode, manual_price: Decimal) -> Product {
    Product::create(CreateProduct {
        shop_id: ShopId::new(),
        product_id: ProductId::new(AggregateId::new()),
        name: "Test product".to_string(),
        sale_unit,
        pricing_mode,
        manual_price,
        occurred_at: t(0),
    })
    .unwrap()
}

pub fn with_factor(mut product: Product, factor: Decimal) -> Product {
    let product_id = product.id_typed();
    product
        .execute(&ProductCommand::RecalibrateCorrectingFactor(
            RecalibrateCorrectingFactor {
                product_id,
                factor,
                occurred_at: t(0),
            },
        ))
        .unwrap();
    product
}

pub fn count(at: DateTime<Utc>, lines: &[(ProductId, Decimal)]) -> InventoryCount {
    InventoryCount::new(
        InventoryCountId::new(AggregateId::new()),
        ShopId::new(),
        OperatorId::new(),
        at,
        lines
            .iter()
            .map(|(product_id, quantity)| InventoryCountLine::new(*product_id, *quantity).unwrap())
            .collect(),
    )
    .unwrap()
}

#[derive(Debug, Default)]
pub struct FakeCatalog {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl FakeCatalog {
    pub fn with(products: &[&Product]) -> Self {
        let catalog = Self::default();
        {
            let mut stored = catalog.products.lock().unwrap();
            for product in products {
                stored.insert(product.id_typed(), (*product).clone());
            }
        }
        catalog
    }

    pub fn factor(&self, product_id: ProductId) -> Decimal {
        self.product(product_id).unwrap().correcting_factor()
    }
}

impl ProductCatalog for FakeCatalog {
    fn product(&self, product_id: ProductId) -> Option<Product> {
        self.products.lock().unwrap().get(&product_id).cloned()
    }

    fn execute(&self, command: &ProductCommand) -> DomainResult<Vec<ProductEvent>> {
        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&command.product_id())
            .ok_or_else(DomainError::not_found)?;
        product.execute(command)
    }
}

#[derive(Debug, Default)]
pub struct FakeBatchLog {
    records: Mutex<Vec<BatchLineRecord>>,
}

impl FakeBatchLog {
    pub fn receive(&self, product_id: ProductId, at: DateTime<Utc>, quantity: Decimal, cost: Decimal) {
        let mut records = self.records.lock().unwrap();
        let sequence = records.len() as u64;
        records.push(BatchLineRecord {
            batch_id: StockBatchId::new(AggregateId::new()),
            received_at: at,
            sequence,
            line: StockBatchLine::new(product_id, quantity, cost).unwrap(),
        });
    }
}

impl StockBatchLog for FakeBatchLog {
    fn latest_line(&self, product_id: ProductId) -> Option<BatchLineRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.line.product_id() == product_id)
            .max_by_key(|r| (r.received_at, r.sequence))
            .cloned()
    }

    fn received_in(&self, product_id: ProductId, window: Window) -> Decimal {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.line.product_id() == product_id && window.contains(r.received_at))
            .map(|r| r.line.quantity_received())
            .sum()
    }
}

#[derive(Debug, Default)]
pub struct FakeCountLog {
    history: Mutex<CountHistory>,
}

impl FakeCountLog {
    pub fn record(&self, count: &InventoryCount) {
        self.history.lock().unwrap().record(count);
    }

    /// Record a single-product count.
    pub fn counted(&self, product_id: ProductId, at: DateTime<Utc>, quantity: Decimal) -> InventoryCount {
        let count = count(at, &[(product_id, quantity)]);
        self.record(&count);
        count
    }
}

impl InventoryCountLog for FakeCountLog {
    fn nth_most_recent(&self, product_id: ProductId, n: usize) -> Option<CountEntry> {
        self.history.lock().unwrap().nth_most_recent(product_id, n).copied()
    }

    fn span_closed_by(&self, product_id: ProductId, count_id: InventoryCountId) -> Option<CountSpan> {
        self.history.lock().unwrap().span_closed_by(product_id, count_id)
    }
}

#[derive(Debug, Default)]
pub struct FakeSales {
    lines: Mutex<Vec<(ProductId, DateTime<Utc>, Decimal)>>,
}

impl FakeSales {
    pub fn sell(&self, product_id: ProductId, at: DateTime<Utc>, quantity: Decimal) {
        self.lines.lock().unwrap().push((product_id, at, quantity));
    }
}

impl SaleLineSource for FakeSales {
    fn sold_in(&self, product_id: ProductId, window: Window) -> Decimal {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, at, _)| *p == product_id && window.contains(*at))
            .map(|(_, _, quantity)| *quantity)
            .sum()
    }
}
