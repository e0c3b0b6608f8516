use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use super::error::{OrderError, Shortage};
use super::reserve::{Decrement, Reservation, ReserveStock, Restock};
use crate::auth::Identity;
use crate::cart::Cart;
use crate::catalog::{CatalogView, StockLevels};
use crate::config::ShopConfig;
use crate::domain::{folio_for, NewOrder, OrderTotals};
use crate::store::{run_transaction, StoreClient, ORDERS};

/// How the order document is written relative to the stock reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderWriteMode {
    /// Order created in the same commit as the decrements.
    #[default]
    Atomic,
    /// Order created after the reservation commits. A failed write leaves the stock taken.
    FollowUp,
    /// Like `FollowUp`, but a failed write gives the stock back.
    FollowUpCompensated,
}

impl FromStr for OrderWriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atomic" => Ok(OrderWriteMode::Atomic),
            "follow_up" => Ok(OrderWriteMode::FollowUp),
            "follow_up_compensated" => Ok(OrderWriteMode::FollowUpCompensated),
            other => Err(format!(
                "unknown order write mode '{other}', expected atomic, follow_up or follow_up_compensated"
            )),
        }
    }
}

impl fmt::Display for OrderWriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderWriteMode::Atomic => "atomic",
            OrderWriteMode::FollowUp => "follow_up",
            OrderWriteMode::FollowUpCompensated => "follow_up_compensated",
        })
    }
}

/// Confirmation returned for a saved order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub order_id: String,
    pub folio: String,
    pub subtotal: Decimal,
    pub totals: OrderTotals,
}

/// Turns carts into orders without ever overselling.
///
/// The catalog view is only used for the fast pre-check and to find legacy inventory
/// rows. Stock itself is re-read and decremented inside a store transaction.
#[derive(Clone)]
pub struct OrderSubmitter {
    store: StoreClient,
    catalog: Arc<CatalogView>,
    tax_rate: Decimal,
    max_attempts: u32,
    write_mode: OrderWriteMode,
}

impl OrderSubmitter {
    pub fn new(store: StoreClient, catalog: Arc<CatalogView>, config: &ShopConfig) -> Self {
        Self {
            store,
            catalog,
            tax_rate: config.tax_rate,
            max_attempts: config.tx_max_attempts,
            write_mode: config.order_write_mode,
        }
    }

    /// Submit `cart` for `customer_name`. The cart is cleared only when the order is saved.
    #[instrument(skip(self, identity, cart), fields(user_id = ?identity.user_id, lines = cart.lines().len(), mode = %self.write_mode))]
    pub async fn submit(
        &self,
        identity: &Identity,
        customer_name: &str,
        cart: &mut Cart,
    ) -> Result<SubmittedOrder, OrderError> {
        let customer_name = customer_name.trim();
        if customer_name.is_empty() {
            return Err(OrderError::ValidationError("Customer name is required".to_string()));
        }
        if cart.is_empty() {
            return Err(OrderError::ValidationError("Cart is empty".to_string()));
        }

        let catalog = self.catalog.current();
        let shortages: Vec<Shortage> = cart
            .lines()
            .iter()
            .filter_map(|line| {
                let available = catalog.current_stock(&line.product_id);
                (available < line.quantity).then(|| Shortage {
                    product: line.name.clone(),
                    requested: line.quantity,
                    available,
                })
            })
            .collect();
        if !shortages.is_empty() {
            warn!(count = shortages.len(), "Pre-check found short lines");
            return Err(OrderError::StockShort { shortages });
        }

        let reservations = cart
            .lines()
            .iter()
            .map(|line| Reservation {
                product_id: line.product_id.clone(),
                product_name: line.name.clone(),
                inventory_id: catalog
                    .stock_entry(&line.product_id)
                    .map_or_else(|| line.product_id.clone(), |entry| entry.inventory_id.clone()),
                quantity: line.quantity,
            })
            .collect();
        let new_order = NewOrder {
            customer_name: customer_name.to_string(),
            user_id: identity.user_id.clone(),
            lines: cart.lines().iter().map(|line| line.to_order_line()).collect(),
            created_at: Utc::now(),
        };

        let order_id = match self.write_mode {
            OrderWriteMode::Atomic => self.reserve_with_order(reservations, &new_order).await?,
            OrderWriteMode::FollowUp | OrderWriteMode::FollowUpCompensated => {
                self.reserve_then_write(reservations, &new_order).await?
            }
        };

        let subtotal = new_order.subtotal();
        let submitted = SubmittedOrder {
            folio: folio_for(&order_id),
            totals: OrderTotals::compute(subtotal, self.tax_rate, new_order.lines.len()),
            order_id,
            subtotal,
        };
        cart.clear();
        info!(order_id = %submitted.order_id, folio = %submitted.folio, subtotal = %subtotal, "Order submitted");
        Ok(submitted)
    }

    async fn reserve_with_order(&self, reservations: Vec<Reservation>, order: &NewOrder) -> Result<String, OrderError> {
        let body = ReserveStock {
            reservations,
            order: Some(order.to_fields()),
        };
        let (_, receipt) = run_transaction(&self.store, self.max_attempts, &body)
            .await
            .inspect_err(|e| error!(error = %e, "Stock reservation failed"))?;
        receipt
            .created
            .into_iter()
            .next()
            .ok_or_else(|| OrderError::OrderWriteFailed {
                compensated: false,
                reason: "store did not report the new order id".to_string(),
            })
    }

    async fn reserve_then_write(&self, reservations: Vec<Reservation>, order: &NewOrder) -> Result<String, OrderError> {
        let body = ReserveStock {
            reservations,
            order: None,
        };
        let (decrements, _) = run_transaction(&self.store, self.max_attempts, &body)
            .await
            .inspect_err(|e| error!(error = %e, "Stock reservation failed"))?;

        match self.store.create(ORDERS, order.to_fields()).await {
            Ok(order_id) => Ok(order_id),
            Err(e) => {
                error!(error = %e, "Order write failed after stock was reserved");
                let compensated = match self.write_mode {
                    OrderWriteMode::FollowUpCompensated => self.restock(decrements).await,
                    _ => false,
                };
                Err(OrderError::OrderWriteFailed {
                    compensated,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn restock(&self, decrements: Vec<Decrement>) -> bool {
        match run_transaction(&self.store, self.max_attempts, &Restock { decrements }).await {
            Ok((restocked, _)) => {
                info!(restocked, "Reserved stock returned");
                true
            }
            Err(e) => {
                error!(error = %e, "Could not return reserved stock");
                false
            }
        }
    }
}
