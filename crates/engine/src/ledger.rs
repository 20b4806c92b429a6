//! Product pricing ledger.
//!
//! Automatic prices follow the most recent restock: the cost per large unit of the
//! latest batch line, scaled by the product's correcting factor and the margin.

use rust_decimal::Decimal;

use stockwise_products::{PricingMode, Product, ProductId};

use crate::conversion::unit_price;
use crate::ports::{BatchLineRecord, StockBatchLog};

/// Decimal places kept on prices and deviations.
pub const PRICE_SCALE: u32 = 4;

#[derive(Debug, Clone)]
pub struct PricingLedger<B> {
    batches: B,
}

impl<B> PricingLedger<B>
where
    B: StockBatchLog,
{
    pub fn new(batches: B) -> Self {
        Self { batches }
    }

    /// The line of the most recent batch containing `product_id`.
    pub fn latest_batch_line(&self, product_id: ProductId) -> Option<BatchLineRecord> {
        self.batches.latest_line(product_id)
    }

    /// Price derived from the latest restock, rounded to four places.
    ///
    /// `0` when the product was never restocked or its latest line received nothing.
    pub fn automatic_price(&self, product: &Product, margin_percent: Decimal) -> Decimal {
        let Some(record) = self.latest_batch_line(product.id_typed()) else {
            return Decimal::ZERO;
        };

        let per_unit = match unit_price(product.sale_unit(), &record.line) {
            Ok(price) => price,
            Err(e) => {
                tracing::debug!(
                    product_id = %product.id_typed(),
                    batch_id = %record.batch_id,
                    "no automatic price: {e}"
                );
                return Decimal::ZERO;
            }
        };

        let markup = Decimal::ONE + margin_percent / Decimal::ONE_HUNDRED;
        per_unit
            .checked_mul(product.correcting_factor())
            .and_then(|price| price.checked_mul(markup))
            .map(|price| price.round_dp(PRICE_SCALE))
            .unwrap_or(Decimal::ZERO)
    }

    /// The price a sale is charged: the manual price for manually priced products,
    /// the automatic price otherwise.
    pub fn effective_price(&self, product: &Product, margin_percent: Decimal) -> Decimal {
        match product.pricing_mode() {
            PricingMode::Manual => product.manual_price(),
            PricingMode::Automatic => self.automatic_price(product, margin_percent),
        }
    }

    /// How far the manual price sits from the automatic one, in percent.
    ///
    /// `0` when there is no automatic price to compare against.
    pub fn deviation_from_automatic(&self, product: &Product, margin_percent: Decimal) -> Decimal {
        let automatic = self.automatic_price(product, margin_percent);
        if automatic.is_zero() {
            return Decimal::ZERO;
        }

        (product.manual_price() - automatic)
            .checked_div(automatic)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|deviation| deviation.round_dp(PRICE_SCALE))
            .unwrap_or(Decimal::ZERO)
    }
}
