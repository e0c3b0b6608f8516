//! Catalog and inventory: the advisory live view and the admin operations.

pub mod admin;
pub mod error;
pub mod view;

pub use admin::CatalogAdmin;
pub use error::CatalogError;
pub use view::{CatalogSnapshot, CatalogView, StockEntry, StockLevels};
