use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use stockwise_products::ProductId;

/// One mutual-exclusion scope per product.
///
/// Recalibrations of the same product serialize; different products never contend
/// beyond the short lookup of their lock.
#[derive(Debug, Default)]
pub struct ProductLocks {
    inner: Mutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding `product_id`'s lock.
    ///
    /// A lock poisoned by a panicking holder is taken over: the guarded sections only
    /// read logs and write one field through the catalog, so there is no torn state.
    pub fn with_lock<R>(&self, product_id: ProductId, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(product_id).or_default())
        };

        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}
