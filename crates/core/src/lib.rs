//! `stockwise-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, aggregate/entity traits and the sale-unit
//! vocabulary shared by purchasing, inventory, sales and the pricing engine.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod unit;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, OperatorId, ShopId};
pub use unit::{QuantityDisplay, SaleUnit, ensure_non_negative};
