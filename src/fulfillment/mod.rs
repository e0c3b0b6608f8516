//! Staff side of orders: the three queues and the two allowed transitions.

pub mod error;
pub mod lifecycle;
pub mod queues;

pub use error::LifecycleError;
pub use lifecycle::OrderLifecycle;
pub use queues::{FulfillmentQueues, FulfillmentView};
