//! Products domain module.
//!
//! The catalog side of a product (unit, pricing mode, manual price, activity flags)
//! plus the one field the pricing engine owns: the correcting factor.

pub mod product;

pub use product::{
    ChangePricing, CorrectingFactorRecalibrated, CreateProduct, DeactivateProduct, PricingChanged,
    PricingMode, Product, ProductCommand, ProductCreated, ProductDeactivated, ProductEvent,
    ProductId, ProductRemoved, RecalibrateCorrectingFactor, RemoveProduct,
};
