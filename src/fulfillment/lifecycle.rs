use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::error::LifecycleError;
use crate::domain::record::timestamp_to_value;
use crate::domain::{Order, OrderStatus, PaymentMethod, Record};
use crate::store::document::fields;
use crate::store::{run_transaction, StoreClient, Transaction, TransactionBody, ORDERS};

/// Moves orders forward. Each transition re-reads the order and only writes if it is
/// still in the expected prior status, so two staff devices cannot both apply it.
#[derive(Clone)]
pub struct OrderLifecycle {
    store: StoreClient,
    max_attempts: u32,
}

impl OrderLifecycle {
    pub fn new(store: StoreClient, max_attempts: u32) -> Self {
        Self { store, max_attempts }
    }

    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: &str, method: PaymentMethod) -> Result<Order, LifecycleError> {
        self.transition(Transition {
            order_id: order_id.to_string(),
            to: OrderStatus::Paid,
            method: Some(method),
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn mark_completed(&self, order_id: &str) -> Result<Order, LifecycleError> {
        self.transition(Transition {
            order_id: order_id.to_string(),
            to: OrderStatus::Completed,
            method: None,
        })
        .await
    }

    async fn transition(&self, body: Transition) -> Result<Order, LifecycleError> {
        match run_transaction(&self.store, self.max_attempts, &body).await {
            Ok((order, _)) => {
                info!(order_id = %order.id, status = %order.status, "Order status changed");
                Ok(order)
            }
            Err(e) => {
                warn!(order_id = %body.order_id, error = %e, "Order transition rejected");
                Err(e)
            }
        }
    }
}

struct Transition {
    order_id: String,
    to: OrderStatus,
    method: Option<PaymentMethod>,
}

#[async_trait]
impl TransactionBody for Transition {
    type Output = Order;
    type Error = LifecycleError;

    async fn run(&self, tx: &mut Transaction) -> Result<Order, LifecycleError> {
        let mut order = tx
            .get(ORDERS, &self.order_id)
            .await?
            .as_ref()
            .and_then(Order::from_document)
            .ok_or_else(|| LifecycleError::NotFound(self.order_id.clone()))?;

        order.status = order.status.advance(self.to)?;
        let now = Utc::now();
        let mut update = fields([("status", json!(order.status.as_str()))]);
        match self.to {
            OrderStatus::Paid => {
                order.paid_at = Some(now);
                order.payment_method = self.method;
                update.insert("paidAt".into(), timestamp_to_value(now));
                if let Some(method) = self.method {
                    update.insert("paymentMethod".into(), json!(method.as_str()));
                }
            }
            OrderStatus::Completed => {
                order.completed_at = Some(now);
                update.insert("completedAt".into(), timestamp_to_value(now));
            }
            OrderStatus::Pending => {}
        }

        tx.update(ORDERS, order.id(), update);
        Ok(order)
    }
}
