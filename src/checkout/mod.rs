//! Order submission: advisory pre-check, then an authoritative stock reservation.

pub mod error;
pub mod reserve;
pub mod submit;

pub use error::{OrderError, Shortage};
pub use submit::{OrderSubmitter, OrderWriteMode, SubmittedOrder};
