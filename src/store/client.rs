use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, instrument};

use super::actor::StoreRequest;
use super::document::{CommitReceipt, Document, Fields, ReadStamp, Snapshot, WriteOp};
use super::error::StoreError;
use super::subscription::Subscription;

/// Generate client methods with oneshot channel boilerplate and automatic tracing.
macro_rules! client_method {
    (fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as StoreRequest::$variant:ident) => {
        #[instrument(skip(self))]
        pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, StoreError> {
            debug!("Sending request");
            let (respond_to, response) = oneshot::channel();
            self.sender
                .send(StoreRequest::$variant {
                    $($param: $param.into(),)*
                    respond_to,
                })
                .await
                .map_err(|_| StoreError::ActorCommunicationError("Store closed".to_string()))?;
            response
                .await
                .map_err(|_| StoreError::ActorCommunicationError("Store dropped".to_string()))?
        }
    };
}

/// Cloneable handle to a [`StoreActor`](super::StoreActor).
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    client_method!(fn get(collection: &str, id: &str) -> Option<Document> as StoreRequest::Get);
    client_method!(fn create(collection: &str, fields: Fields) -> String as StoreRequest::Create);
    client_method!(fn delete(collection: &str, id: &str) -> () as StoreRequest::Delete);
    client_method!(fn commit(reads: Vec<ReadStamp>, writes: Vec<WriteOp>) -> CommitReceipt as StoreRequest::Commit);

    /// Merge `fields` into an existing document.
    #[instrument(skip(self, fields))]
    pub async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<Document, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Store closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Store dropped".to_string()))?
    }

    /// Live query over a whole collection. The returned subscription already holds the
    /// current contents.
    #[instrument(skip(self))]
    pub async fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel::<Result<watch::Receiver<Arc<Snapshot>>, StoreError>>();
        self.sender
            .send(StoreRequest::Subscribe {
                collection: collection.to_string(),
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Store closed".to_string()))?;
        let receiver = response
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Store dropped".to_string()))??;
        Ok(Subscription::new(collection, receiver))
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Store closed".to_string()))
    }
}
