//! Order lifecycle and inventory reservation for a butcher shop point of sale.
//!
//! Everything talks to one document [`store`] through cloneable client handles. Stock
//! shown to customers comes from a push-driven [`catalog`] view and is only advisory;
//! [`checkout`] re-reads and decrements it inside a store transaction, so concurrent
//! submissions never oversell. Staff work through the [`fulfillment`] queues.

pub mod app_system;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod fulfillment;
pub mod live_view;
pub mod store;

#[cfg(test)]
mod mock_framework;

pub use app_system::{setup_tracing, ShopSystem};
pub use config::ShopConfig;
