use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// A line the advisory pre-check found short.
#[derive(Debug, Clone, PartialEq)]
pub struct Shortage {
    pub product: String,
    pub requested: Decimal,
    pub available: Decimal,
}

/// Errors that can occur while submitting an order.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Not enough stock for: {}", describe(.shortages))]
    StockShort { shortages: Vec<Shortage> },
    #[error("Insufficient stock for {product}: {available} available")]
    InsufficientStock { product: String, available: Decimal },
    #[error("Could not validate stock for {product}")]
    InventoryMissing { product: String },
    #[error("Could not complete the order after {attempts} attempts, please try again")]
    Contention { attempts: u32 },
    #[error("Stock was reserved but the order was not saved (stock restored: {compensated}): {reason}")]
    OrderWriteFailed { compensated: bool, reason: String },
    #[error("Order store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for OrderError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ContentionExhausted { attempts } => OrderError::Contention { attempts },
            other => OrderError::Store(other),
        }
    }
}

fn describe(shortages: &[Shortage]) -> String {
    shortages
        .iter()
        .map(|s| format!("{} ({} requested, {} available)", s.product, s.requested, s.available))
        .collect::<Vec<_>>()
        .join(", ")
}
