use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::document::Snapshot;
use super::error::StoreError;

/// Live query over one collection. Holds the latest snapshot; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    collection: String,
    receiver: watch::Receiver<Arc<Snapshot>>,
}

impl Subscription {
    pub fn new(collection: impl Into<String>, receiver: watch::Receiver<Arc<Snapshot>>) -> Self {
        Self {
            collection: collection.into(),
            receiver,
        }
    }

    /// Latest delivered snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait until a newer snapshot than the last one observed through `changed` is published.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.receiver.changed().await.map_err(|_| {
            StoreError::ActorCommunicationError(format!("Subscription to {} closed", self.collection))
        })
    }

    pub fn unsubscribe(self) {
        debug!(collection = %self.collection, "Unsubscribed");
    }
}
