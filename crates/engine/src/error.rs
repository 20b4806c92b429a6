//! Engine error model.

use thiserror::Error;

use stockwise_core::DomainError;
use stockwise_inventory::InventoryCountId;
use stockwise_products::ProductId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A ratio with a zero (or unrepresentable) denominator, e.g. the unit price of a
    /// batch line that received nothing.
    #[error("division undefined: {0}")]
    DivisionUndefined(&'static str),

    /// A sum or difference of quantities left the `Decimal` range.
    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Recalibration was asked for a count whose line is not in the count log.
    #[error("count {count_id} has no recorded line for product {product_id}")]
    CountNotRecorded {
        count_id: InventoryCountId,
        product_id: ProductId,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
