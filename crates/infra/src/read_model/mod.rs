//! In-memory stores implementing the engine's ports.
//!
//! Each log keeps its entries per product, sorted by `(timestamp, sequence)` where
//! `sequence` is the store's insertion counter. Appends in time order are pushes;
//! back-dated documents are inserted at their sorted position.

pub mod inventory_counts;
pub mod products;
pub mod sales;
pub mod stock_batches;

pub use inventory_counts::InMemoryInventoryCountLog;
pub use products::InMemoryProductCatalog;
pub use sales::InMemorySalesLedger;
pub use stock_batches::InMemoryStockBatchLog;
