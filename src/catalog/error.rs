use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by catalog administration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Product validation error: {0}")]
    ValidationError(String),
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Stock cannot go below zero for {product}: available {available}")]
    NegativeStock { product: String, available: Decimal },
    #[error("Catalog store error: {0}")]
    Store(#[from] StoreError),
}
