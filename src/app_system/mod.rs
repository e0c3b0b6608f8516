//! System orchestration, startup, and shutdown logic.

pub mod logging;
pub mod shop_system;

pub use logging::setup_tracing;
pub use shop_system::ShopSystem;
