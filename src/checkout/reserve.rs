//! Transaction bodies that move stock: the reservation made at checkout and the
//! compensating restock used when a follow-up order write fails.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::error::OrderError;
use crate::domain::{is_stock_quantity, InventoryRecord, Record, STOCK_SCALE};
use crate::store::{Fields, StoreError, Transaction, TransactionBody, INVENTORY, ORDERS};

/// One cart line to take out of stock.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub product_id: String,
    pub product_name: String,
    /// Designated inventory row as last seen by the catalog, or the product id itself,
    /// which is where new rows are kept.
    pub inventory_id: String,
    /// Already at stock precision; the same figure is recorded on the order line.
    pub quantity: Decimal,
}

/// Stock taken from one inventory row by a committed reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decrement {
    pub inventory_id: String,
    pub quantity: Decimal,
}

/// Reads every row first, checks all of them, and only then queues the decrements.
/// With `order` set, the order document is created in the same commit.
pub struct ReserveStock {
    pub reservations: Vec<Reservation>,
    pub order: Option<Fields>,
}

#[async_trait]
impl TransactionBody for ReserveStock {
    type Output = Vec<Decrement>;
    type Error = OrderError;

    async fn run(&self, tx: &mut Transaction) -> Result<Vec<Decrement>, OrderError> {
        let mut checked = Vec::with_capacity(self.reservations.len());
        for reservation in &self.reservations {
            if !is_stock_quantity(reservation.quantity) {
                return Err(OrderError::ValidationError(format!(
                    "Quantity {} of {} is not a positive amount with at most {STOCK_SCALE} decimals",
                    reservation.quantity, reservation.product_name
                )));
            }
            let missing = || OrderError::InventoryMissing {
                product: reservation.product_name.clone(),
            };
            let record = tx
                .get(INVENTORY, &reservation.inventory_id)
                .await?
                .as_ref()
                .and_then(InventoryRecord::from_document)
                .filter(|record| record.product_id == reservation.product_id)
                .ok_or_else(missing)?;

            if record.stock_quantity < reservation.quantity {
                debug!(
                    product_id = %reservation.product_id,
                    available = %record.stock_quantity,
                    requested = %reservation.quantity,
                    "Reservation rejected"
                );
                return Err(OrderError::InsufficientStock {
                    product: reservation.product_name.clone(),
                    available: record.stock_quantity,
                });
            }
            checked.push((record, reservation.quantity));
        }

        let mut decrements = Vec::with_capacity(checked.len());
        for (record, quantity) in checked {
            tx.update(
                INVENTORY,
                record.id(),
                InventoryRecord::stock_fields(record.stock_quantity - quantity),
            );
            decrements.push(Decrement {
                inventory_id: record.id,
                quantity,
            });
        }
        if let Some(order) = &self.order {
            tx.create(ORDERS, order.clone());
        }
        Ok(decrements)
    }
}

/// Gives back the stock of a reservation whose order could not be saved. Rows deleted
/// in the meantime are skipped.
pub struct Restock {
    pub decrements: Vec<Decrement>,
}

#[async_trait]
impl TransactionBody for Restock {
    type Output = usize;
    type Error = StoreError;

    async fn run(&self, tx: &mut Transaction) -> Result<usize, StoreError> {
        let mut restocked = 0;
        for decrement in &self.decrements {
            let current = tx
                .get(INVENTORY, &decrement.inventory_id)
                .await?
                .as_ref()
                .and_then(InventoryRecord::from_document);
            let Some(record) = current else {
                warn!(inventory_id = %decrement.inventory_id, "Inventory row vanished, cannot restock");
                continue;
            };
            tx.update(
                INVENTORY,
                record.id(),
                InventoryRecord::stock_fields(record.stock_quantity + decrement.quantity),
            );
            restocked += 1;
        }
        Ok(restocked)
    }
}
