use std::cmp::Ordering;
use std::sync::Arc;

use crate::domain::{Order, OrderStatus, Record};
use crate::live_view::{LiveView, Projection};
use crate::store::{Snapshot, ORDERS};

/// Orders split by status, newest first. Orders without a creation time go last, in
/// the order the store lists them.
#[derive(Debug, Clone, Default)]
pub struct FulfillmentQueues {
    pending: Vec<Order>,
    paid: Vec<Order>,
    completed: Vec<Order>,
}

impl FulfillmentQueues {
    pub fn from_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let mut queues = Self::default();
        for order in orders {
            match order.status {
                OrderStatus::Pending => queues.pending.push(order),
                OrderStatus::Paid => queues.paid.push(order),
                OrderStatus::Completed => queues.completed.push(order),
            }
        }
        for queue in [&mut queues.pending, &mut queues.paid, &mut queues.completed] {
            queue.sort_by(newest_first);
        }
        queues
    }

    pub fn pending(&self) -> &[Order] {
        &self.pending
    }

    pub fn paid(&self) -> &[Order] {
        &self.paid
    }

    pub fn completed(&self) -> &[Order] {
        &self.completed
    }

    pub fn queue(&self, status: OrderStatus) -> &[Order] {
        match status {
            OrderStatus::Pending => self.pending(),
            OrderStatus::Paid => self.paid(),
            OrderStatus::Completed => self.completed(),
        }
    }

    pub fn find(&self, order_id: &str) -> Option<&Order> {
        self.pending
            .iter()
            .chain(&self.paid)
            .chain(&self.completed)
            .find(|order| order.id == order_id)
    }
}

fn newest_first(a: &Order, b: &Order) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Projection for FulfillmentQueues {
    const COLLECTIONS: &'static [&'static str] = &[ORDERS];

    fn project(snapshots: &[Arc<Snapshot>]) -> Self {
        let orders = snapshots
            .iter()
            .flat_map(|snapshot| snapshot.documents.iter())
            .filter_map(Order::from_document);
        Self::from_orders(orders)
    }
}

/// Live fulfillment queues.
pub type FulfillmentView = LiveView<FulfillmentQueues>;
