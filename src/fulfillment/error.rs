use thiserror::Error;

use crate::domain::{OrderStatus, TransitionError};
use crate::store::StoreError;

/// Errors that can occur while moving an order through fulfillment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LifecycleError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order cannot go from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order was being changed concurrently ({attempts} attempts), please try again")]
    Contention { attempts: u32 },
    #[error("Order store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ContentionExhausted { attempts } => LifecycleError::Contention { attempts },
            other => LifecycleError::Store(other),
        }
    }
}

impl From<TransitionError> for LifecycleError {
    fn from(error: TransitionError) -> Self {
        LifecycleError::InvalidTransition {
            from: error.from,
            to: error.to,
        }
    }
}
