//! Purchasing domain module.
//!
//! Restock batches (what was received, and what it cost) and the normalisation of
//! stock-entry form input into base-unit quantities and whole-line costs.

pub mod batch;
pub mod entry;

pub use batch::{StockBatch, StockBatchId, StockBatchLine};
pub use entry::{
    COUNT_AFTER_BATCH, CostBasis, EntryUnit, StockEntry, StockEntryLine, normalize_cost,
    normalize_quantity,
};
