//! # Mock Framework
//!
//! Utilities for testing store-backed services in isolation.
//!
//! Use [`create_mock_store`] to get a client and a receiver.
//! Then use helpers like [`expect_get`] or [`expect_commit`] to assert behavior.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::store::{
    CommitReceipt, Document, Fields, ReadStamp, Response, Snapshot, StoreClient, StoreRequest,
    WriteOp,
};

/// Creates a store client whose requests land on a receiver the test controls.
///
/// The test plays the part of the store actor: it inspects each request and answers
/// through the oneshot responder, which makes failures and races deterministic.
pub fn create_mock_store(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, String, Response<Option<Document>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { collection, id, respond_to }) => Some((collection, id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, Fields, Response<String>)> {
    match receiver.recv().await {
        Some(StoreRequest::Create { collection, fields, respond_to }) => {
            Some((collection, fields, respond_to))
        }
        _ => None,
    }
}

/// Helper to verify that the next message is a Commit request
pub async fn expect_commit(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Vec<ReadStamp>, Vec<WriteOp>, Response<CommitReceipt>)> {
    match receiver.recv().await {
        Some(StoreRequest::Commit { reads, writes, respond_to }) => Some((reads, writes, respond_to)),
        _ => None,
    }
}

/// Answer the next Subscribe request with a fixed snapshot. The returned sender lets the
/// test publish further snapshots.
pub async fn answer_subscribe(
    receiver: &mut mpsc::Receiver<StoreRequest>,
    snapshot: Snapshot,
) -> Option<watch::Sender<Arc<Snapshot>>> {
    match receiver.recv().await {
        Some(StoreRequest::Subscribe { respond_to, .. }) => {
            let (sender, rx) = watch::channel(Arc::new(snapshot));
            let _ = respond_to.send(Ok(rx));
            Some(sender)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::fields;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_store() {
        let (client, mut receiver) = create_mock_store(10);

        let create_task = tokio::spawn(async move {
            client.create("products", fields([("name", json!("Chorizo"))])).await
        });

        let (collection, payload, responder) =
            expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(collection, "products");
        assert_eq!(payload.get("name"), Some(&json!("Chorizo")));
        responder.send(Ok("product_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("product_1".to_string()));
    }
}
