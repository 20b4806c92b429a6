//! `stockwise-engine`: inventory-driven pricing and stock reconciliation.
//!
//! - [`PricingLedger`]: sale price from the latest restock cost, the margin and the
//!   product's correcting factor.
//! - [`StockEstimator`]: remaining stock from the last count plus recorded movements.
//! - [`Calibrator`]: re-derives the correcting factor whenever a count is recorded.
//!
//! The engine reads its collaborators through the traits in [`ports`] and never
//! fails a caller for lack of history; missing data degrades to documented
//! fallbacks (a `0` price, a `0` deviation, an unchanged factor).

pub mod calibrator;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod handler;
pub mod ledger;
pub mod locks;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use calibrator::{BatchCalibrationReport, CalibrationOutcome, Calibrator};
pub use config::{EngineConfig, MarginSource, NegativeFactorPolicy, SharedMargin};
pub use conversion::{sale_line_price, unit_price};
pub use engine::PricingEngine;
pub use error::EngineError;
pub use estimator::{StockEstimator, StockInterval};
pub use handler::{CountRecalibration, InventoryCountHandler};
pub use ledger::PricingLedger;
pub use locks::ProductLocks;
pub use ports::{
    BatchLineRecord, InventoryCountLog, ProductCatalog, SaleLineSource, StockBatchLog, Window,
};
