//! Inventory domain module.
//!
//! Physical stock counts: the documents recorded by the inventory workflow and the
//! per-product ordered history the stock estimator and calibrator read from. Pure
//! domain logic (no IO, no storage).

pub mod count;
pub mod history;

pub use count::{
    InventoryCount, InventoryCountId, InventoryCountLine, InventoryCountRecorded, InventoryEvent,
};
pub use history::{CountEntry, CountHistory, CountSpan};
