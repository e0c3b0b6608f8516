//! Push-driven projections over store subscriptions.
//!
//! A [`LiveView`] owns one subscription per collection its projection needs and a
//! background task that rebuilds the projection whenever any of them publishes. Every
//! rebuild starts from full snapshots, so a redelivered snapshot just produces an equal
//! projection again. Collections carry no ordering guarantee relative to each other.

use std::sync::Arc;

use futures::future::select_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::store::{Snapshot, StoreClient, StoreError, Subscription};

/// Read model rebuilt from the snapshots of `COLLECTIONS` (same order).
pub trait Projection: Send + Sync + Sized + 'static {
    const COLLECTIONS: &'static [&'static str];

    fn project(snapshots: &[Arc<Snapshot>]) -> Self;
}

pub struct LiveView<P: Projection> {
    receiver: watch::Receiver<Arc<P>>,
    handle: JoinHandle<()>,
}

impl<P: Projection> LiveView<P> {
    #[instrument(name = "live_view", skip(store), fields(collections = ?P::COLLECTIONS))]
    pub async fn start(store: &StoreClient) -> Result<Self, StoreError> {
        let mut subscriptions = Vec::with_capacity(P::COLLECTIONS.len());
        for collection in P::COLLECTIONS {
            subscriptions.push(store.subscribe(collection).await?);
        }

        let initial = P::project(&current_snapshots(&subscriptions));
        let (sender, receiver) = watch::channel(Arc::new(initial));
        let handle = tokio::spawn(refresh_loop(subscriptions, sender));
        info!("Live view started");

        Ok(Self { receiver, handle })
    }

    pub fn current(&self) -> Arc<P> {
        self.receiver.borrow().clone()
    }

    /// Wait until the projection satisfies `predicate`, returning that state.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&P) -> bool) -> Result<Arc<P>, StoreError> {
        let mut receiver = self.receiver.clone();
        let state = receiver
            .wait_for(|p| predicate(p.as_ref()))
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Live view stopped".to_string()))?;
        Ok(state.clone())
    }

    pub fn unsubscribe(self) {
        debug!(collections = ?P::COLLECTIONS, "Live view released");
    }
}

impl<P: Projection> Drop for LiveView<P> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn current_snapshots(subscriptions: &[Subscription]) -> Vec<Arc<Snapshot>> {
    subscriptions.iter().map(Subscription::current).collect()
}

async fn refresh_loop<P: Projection>(mut subscriptions: Vec<Subscription>, sender: watch::Sender<Arc<P>>) {
    loop {
        let changed = {
            let pending = subscriptions.iter_mut().map(|s| Box::pin(s.changed()));
            select_all(pending).await.0
        };
        if let Err(e) = changed {
            debug!(error = %e, "Live view source closed");
            break;
        }
        let projection = P::project(&current_snapshots(&subscriptions));
        sender.send_replace(Arc::new(projection));
    }
}
