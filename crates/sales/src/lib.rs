//! Sales domain module.
//!
//! Sales are recorded by the shop's sale modules and are read-only to the pricing
//! engine, which only aggregates the quantities they moved.

pub mod sale;

pub use sale::{Sale, SaleId, SaleLine, SaleModule};
