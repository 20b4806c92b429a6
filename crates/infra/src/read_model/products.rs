use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use stockwise_core::{Aggregate, DomainResult, ShopId};
use stockwise_engine::ProductCatalog;
use stockwise_products::{Product, ProductCommand, ProductEvent, ProductId};

/// In-memory product catalog for tests/dev.
///
/// Commands run against a copy of the stored product under the write lock; the copy
/// replaces the stored one only when the command succeeds.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Products of `shop_id` that can still be sold, by name.
    pub fn sellable(&self, shop_id: ShopId) -> Vec<Product> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut products: Vec<Product> = map
            .values()
            .filter(|p| p.shop_id() == Some(shop_id) && p.is_sellable())
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name().cmp(b.name()));
        products
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn product(&self, product_id: ProductId) -> Option<Product> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&product_id).cloned()
    }

    fn execute(&self, command: &ProductCommand) -> DomainResult<Vec<ProductEvent>> {
        let product_id = command.product_id();
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let mut product = map
            .get(&product_id)
            .cloned()
            .unwrap_or_else(|| Product::empty(product_id));
        let events = product.execute(command)?;
        map.insert(product_id, product);

        for event in &events {
            tracing::debug!(%product_id, event = ?event, "product event applied");
        }
        Ok(events)
    }
}
