use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::catalog::{CatalogAdmin, CatalogView};
use crate::checkout::OrderSubmitter;
use crate::config::ShopConfig;
use crate::fulfillment::{FulfillmentView, OrderLifecycle};
use crate::store::{StoreActor, StoreClient, StoreError};

/// The running shop: the store actor, the two live views and the services built on them.
///
/// Responsible for starting everything in dependency order, wiring the handles together,
/// and shutting down.
pub struct ShopSystem {
    pub config: ShopConfig,
    pub store: StoreClient,
    pub catalog: Arc<CatalogView>,
    pub fulfillment: Arc<FulfillmentView>,
    pub admin: CatalogAdmin,
    pub checkout: OrderSubmitter,
    pub lifecycle: OrderLifecycle,
    handles: Vec<JoinHandle<()>>,
}

impl ShopSystem {
    #[instrument(skip(config), fields(write_mode = %config.order_write_mode))]
    pub async fn start(config: ShopConfig) -> Result<Self, StoreError> {
        let (store_actor, store) = StoreActor::with_random_ids(config.channel_buffer);
        let store_handle = tokio::spawn(store_actor.run());

        let catalog = Arc::new(CatalogView::start(&store).await?);
        let fulfillment = Arc::new(FulfillmentView::start(&store).await?);

        let admin = CatalogAdmin::new(store.clone(), catalog.clone(), config.tx_max_attempts);
        let checkout = OrderSubmitter::new(store.clone(), catalog.clone(), &config);
        let lifecycle = OrderLifecycle::new(store.clone(), config.tx_max_attempts);

        info!("Shop system started");
        Ok(Self {
            config,
            store,
            catalog,
            fulfillment,
            admin,
            checkout,
            lifecycle,
            handles: vec![store_handle],
        })
    }

    pub async fn shutdown(self) -> Result<(), StoreError> {
        info!("Shutting down system...");

        // Views first, so nothing reacts to the store going away.
        drop(self.checkout);
        drop(self.admin);
        drop(self.catalog);
        drop(self.fulfillment);

        self.store.shutdown().await?;
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(StoreError::ActorCommunicationError(format!(
                    "Actor task failed: {e}"
                )));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
