use std::{env, fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::checkout::OrderWriteMode;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {key} value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShopConfig {
    pub tax_rate: Decimal,
    /// Attempts per transaction before contention is reported.
    pub tx_max_attempts: u32,
    pub order_write_mode: OrderWriteMode,
    pub channel_buffer: usize,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(16, 2),
            tx_max_attempts: 5,
            order_write_mode: OrderWriteMode::Atomic,
            channel_buffer: 100,
        }
    }
}

impl ShopConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| env::var(key).ok())
    }

    /// Load from any key lookup. Unset keys fall back to their defaults.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            tax_rate: try_load(&lookup, "SHOP_TAX_RATE", "0.16")?,
            tx_max_attempts: try_load(&lookup, "SHOP_TX_MAX_ATTEMPTS", "5")?,
            order_write_mode: try_load(&lookup, "SHOP_ORDER_WRITE_MODE", "atomic")?,
            channel_buffer: try_load(&lookup, "SHOP_CHANNEL_BUFFER", "100")?,
        };

        if config.tax_rate < Decimal::ZERO {
            return Err(invalid("SHOP_TAX_RATE", config.tax_rate, "must not be negative"));
        }
        if config.tx_max_attempts == 0 {
            return Err(invalid("SHOP_TX_MAX_ATTEMPTS", 0, "must be at least 1"));
        }
        if config.channel_buffer == 0 {
            return Err(invalid("SHOP_CHANNEL_BUFFER", 0, "must be at least 1"));
        }
        Ok(config)
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        invalid(key, &value, e)
    })
}

fn invalid(key: &str, value: impl Display, reason: impl Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
