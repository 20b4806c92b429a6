//! Sale units and human-scale quantity formatting.
//!
//! Every quantity stored by purchasing, inventory and sales is expressed in the
//! product's *base unit*: grams for [`SaleUnit::Mass`], centiliters for
//! [`SaleUnit::Volume`] and whole items for [`SaleUnit::Item`]. Catalog prices are
//! quoted per *large unit* (kilogram, liter, item).

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// How a product is measured when bought, counted and sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleUnit {
    /// Discrete product, counted in items.
    #[default]
    Item,
    /// Liquid product, measured in centiliters.
    Volume,
    /// Bulk product, measured in grams.
    Mass,
}

impl SaleUnit {
    /// Number of base units in one large unit (1 item, 100 cl, 1000 g).
    pub fn base_units_per_large_unit(self) -> Decimal {
        match self {
            SaleUnit::Item => Decimal::ONE,
            SaleUnit::Volume => Decimal::ONE_HUNDRED,
            SaleUnit::Mass => Decimal::ONE_THOUSAND,
        }
    }

    pub fn base_unit_label(self) -> &'static str {
        match self {
            SaleUnit::Item => "unit",
            SaleUnit::Volume => "cl",
            SaleUnit::Mass => "g",
        }
    }

    pub fn large_unit_label(self) -> &'static str {
        match self {
            SaleUnit::Item => "Unit",
            SaleUnit::Volume => "L",
            SaleUnit::Mass => "Kg",
        }
    }

    /// Format a base-unit quantity for people: grams become kilograms from 1000 g,
    /// centiliters become liters from 100 cl, items stay items.
    pub fn display(self, quantity: Decimal) -> QuantityDisplay {
        match self {
            SaleUnit::Volume if quantity >= Decimal::ONE_HUNDRED => {
                QuantityDisplay::new(quantity / Decimal::ONE_HUNDRED, 2, "L")
            }
            SaleUnit::Volume => QuantityDisplay::new(quantity, 0, "cl"),
            SaleUnit::Mass if quantity >= Decimal::ONE_THOUSAND => {
                QuantityDisplay::new(quantity / Decimal::ONE_THOUSAND, 2, "kg")
            }
            SaleUnit::Mass => QuantityDisplay::new(quantity, 0, "g"),
            SaleUnit::Item if quantity > Decimal::ONE => QuantityDisplay::new(quantity, 0, " items"),
            SaleUnit::Item => QuantityDisplay::new(quantity, 0, " item"),
        }
    }
}

impl fmt::Display for SaleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_unit_label())
    }
}

/// A quantity rounded and labelled for presentation (e.g. `2.5kg`, `40cl`, `3 items`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityDisplay {
    value: Decimal,
    suffix: &'static str,
}

impl QuantityDisplay {
    fn new(value: Decimal, dp: u32, suffix: &'static str) -> Self {
        Self {
            value: value.round_dp(dp).normalize(),
            suffix,
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn suffix(&self) -> &'static str {
        self.suffix
    }
}

impl fmt::Display for QuantityDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.suffix)
    }
}

/// Reject negative quantities and amounts at a write boundary.
pub fn ensure_non_negative(field: &str, value: Decimal) -> DomainResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::validation(format!(
            "{field} cannot be negative (got {value})"
        )));
    }
    Ok(value)
}
