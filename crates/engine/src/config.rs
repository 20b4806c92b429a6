//! Engine configuration.
//!
//! Resolved once at process start:
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `STOCKWISE_MARGIN_PERCENT` | `5` | profit margin applied to automatic prices, in percent |
//! | `STOCKWISE_NEGATIVE_FACTOR` | `clamp` | `clamp` or `reject` a calibrated factor below zero |
//!
//! The margin is handed to the engine as a [`MarginSource`] so that an operator can
//! change it at runtime ([`SharedMargin::set`]); every pricing call reads it afresh.

use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;

pub const MARGIN_PERCENT_VAR: &str = "STOCKWISE_MARGIN_PERCENT";
pub const NEGATIVE_FACTOR_VAR: &str = "STOCKWISE_NEGATIVE_FACTOR";

pub const DEFAULT_MARGIN_PERCENT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// What to do when calibration yields a factor below zero (a count higher than the
/// previous count plus everything received).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeFactorPolicy {
    /// Store `0` instead.
    #[default]
    Clamp,
    /// Leave the factor unchanged.
    Reject,
}

impl FromStr for NegativeFactorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown negative factor policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub margin_percent: Decimal,
    pub negative_factor_policy: NegativeFactorPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            margin_percent: DEFAULT_MARGIN_PERCENT,
            negative_factor_policy: NegativeFactorPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Malformed values fall back to their
    /// default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let margin_percent = match lookup(MARGIN_PERCENT_VAR) {
            None => defaults.margin_percent,
            Some(raw) => Decimal::from_str(raw.trim()).unwrap_or_else(|e| {
                tracing::warn!(
                    "{MARGIN_PERCENT_VAR}={raw:?} is not a decimal ({e}); using {}",
                    defaults.margin_percent
                );
                defaults.margin_percent
            }),
        };

        let negative_factor_policy = match lookup(NEGATIVE_FACTOR_VAR) {
            None => defaults.negative_factor_policy,
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{NEGATIVE_FACTOR_VAR}: {e}; using clamp");
                defaults.negative_factor_policy
            }),
        };

        Self {
            margin_percent,
            negative_factor_policy,
        }
    }

    /// A hot-reloadable margin seeded from this configuration.
    pub fn shared_margin(&self) -> SharedMargin {
        SharedMargin::new(self.margin_percent)
    }
}

/// Where pricing calls read the global margin from.
pub trait MarginSource: Send + Sync {
    fn margin_percent(&self) -> Decimal;
}

impl MarginSource for Decimal {
    fn margin_percent(&self) -> Decimal {
        *self
    }
}

impl<T> MarginSource for Arc<T>
where
    T: MarginSource + ?Sized,
{
    fn margin_percent(&self) -> Decimal {
        (**self).margin_percent()
    }
}

/// Margin shared between the engine and whoever administers it.
#[derive(Debug, Clone)]
pub struct SharedMargin {
    inner: Arc<RwLock<Decimal>>,
}

impl SharedMargin {
    pub fn new(margin_percent: Decimal) -> Self {
        Self {
            inner: Arc::new(RwLock::new(margin_percent)),
        }
    }

    pub fn set(&self, margin_percent: Decimal) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = margin_percent;
        tracing::info!(%margin_percent, "margin updated");
    }
}

impl MarginSource for SharedMargin {
    fn margin_percent(&self) -> Decimal {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
