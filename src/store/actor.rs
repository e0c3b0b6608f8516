use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use super::client::StoreClient;
use super::document::{CommitReceipt, Document, Fields, ReadStamp, Snapshot, WriteOp};
use super::error::StoreError;

pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Requests understood by [`StoreActor`].
#[derive(Debug)]
pub enum StoreRequest {
    Subscribe {
        collection: String,
        respond_to: Response<watch::Receiver<Arc<Snapshot>>>,
    },
    Get {
        collection: String,
        id: String,
        respond_to: Response<Option<Document>>,
    },
    Create {
        collection: String,
        fields: Fields,
        respond_to: Response<String>,
    },
    Update {
        collection: String,
        id: String,
        fields: Fields,
        respond_to: Response<Document>,
    },
    Delete {
        collection: String,
        id: String,
        respond_to: Response<()>,
    },
    Commit {
        reads: Vec<ReadStamp>,
        writes: Vec<WriteOp>,
        respond_to: Response<CommitReceipt>,
    },
    Shutdown,
}

struct Stored {
    fields: Fields,
    version: u64,
    seq: u64,
}

struct Collection {
    name: String,
    docs: HashMap<String, Stored>,
    revision: u64,
    publisher: watch::Sender<Arc<Snapshot>>,
}

impl Collection {
    fn new(name: &str) -> Self {
        let (publisher, _) = watch::channel(Arc::new(Snapshot::empty(name)));
        Self {
            name: name.to_string(),
            docs: HashMap::new(),
            revision: 0,
            publisher,
        }
    }

    fn version_of(&self, id: &str) -> Option<u64> {
        self.docs.get(id).map(|doc| doc.version)
    }

    fn document(&self, id: &str) -> Option<Document> {
        self.docs.get(id).map(|doc| Document {
            id: id.to_string(),
            fields: doc.fields.clone(),
            version: doc.version,
        })
    }

    fn publish(&mut self) {
        self.revision += 1;
        let mut entries: Vec<(&String, &Stored)> = self.docs.iter().collect();
        entries.sort_by_key(|(_, doc)| doc.seq);
        let documents = entries
            .into_iter()
            .map(|(id, doc)| Document {
                id: id.clone(),
                fields: doc.fields.clone(),
                version: doc.version,
            })
            .collect();
        self.publisher.send_replace(Arc::new(Snapshot {
            collection: self.name.clone(),
            revision: self.revision,
            documents,
        }));
    }
}

/// In-process document store. Owns every collection and serializes all access,
/// which is what makes [`StoreRequest::Commit`] atomic.
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    collections: HashMap<String, Collection>,
    next_seq: u64,
    next_id_fn: Box<dyn Fn() -> String + Send + Sync>,
}

impl StoreActor {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> String + Send + Sync + 'static,
    ) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            collections: HashMap::new(),
            next_seq: 1,
            next_id_fn: Box::new(next_id_fn),
        };
        (actor, StoreClient::new(sender))
    }

    /// Store with random document ids.
    pub fn with_random_ids(buffer_size: usize) -> (Self, StoreClient) {
        Self::new(buffer_size, || uuid::Uuid::new_v4().simple().to_string())
    }

    #[instrument(name = "store_actor", skip(self))]
    pub async fn run(mut self) {
        info!("StoreActor starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Subscribe { collection, respond_to } => {
                    let receiver = self.collection_mut(&collection).publisher.subscribe();
                    debug!(collection = %collection, "Subscriber attached");
                    let _ = respond_to.send(Ok(receiver));
                }
                StoreRequest::Get { collection, id, respond_to } => {
                    let doc = self
                        .collections
                        .get(&collection)
                        .and_then(|c| c.document(&id));
                    let _ = respond_to.send(Ok(doc));
                }
                StoreRequest::Create { collection, fields, respond_to } => {
                    let id = self.insert(&collection, fields);
                    self.collection_mut(&collection).publish();
                    debug!(collection = %collection, id = %id, "Document created");
                    let _ = respond_to.send(Ok(id));
                }
                StoreRequest::Update { collection, id, fields, respond_to } => {
                    let _ = respond_to.send(self.handle_update(&collection, &id, fields));
                }
                StoreRequest::Delete { collection, id, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(&collection, &id));
                }
                StoreRequest::Commit { reads, writes, respond_to } => {
                    let _ = respond_to.send(self.handle_commit(reads, writes));
                }
                StoreRequest::Shutdown => {
                    info!("StoreActor shutting down");
                    break;
                }
            }
        }

        info!("StoreActor stopped");
    }

    fn collection_mut(&mut self, name: &str) -> &mut Collection {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(name))
    }

    fn insert(&mut self, collection: &str, fields: Fields) -> String {
        let id = (self.next_id_fn)();
        self.insert_at(collection, id.clone(), fields);
        id
    }

    fn insert_at(&mut self, collection: &str, id: String, fields: Fields) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.collection_mut(collection).docs.insert(
            id,
            Stored {
                fields,
                version: 1,
                seq,
            },
        );
    }

    fn contains(&self, collection: &str, id: &str) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|c| c.docs.contains_key(id))
    }

    fn handle_update(
        &mut self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let target = self.collection_mut(collection);
        let doc = target
            .docs
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        doc.fields.extend(fields);
        doc.version += 1;
        target.publish();
        target
            .document(id)
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    fn handle_delete(&mut self, collection: &str, id: &str) -> Result<(), StoreError> {
        let target = self.collection_mut(collection);
        if target.docs.remove(id).is_none() {
            return Err(StoreError::not_found(collection, id));
        }
        target.publish();
        Ok(())
    }

    /// Validate every read stamp and write target first, then apply the whole write-set.
    #[instrument(skip(self, reads, writes), fields(reads = reads.len(), writes = writes.len()))]
    fn handle_commit(
        &mut self,
        reads: Vec<ReadStamp>,
        writes: Vec<WriteOp>,
    ) -> Result<CommitReceipt, StoreError> {
        for stamp in &reads {
            let current = self
                .collections
                .get(&stamp.collection)
                .and_then(|c| c.version_of(&stamp.id));
            if current != stamp.version {
                warn!(
                    collection = %stamp.collection,
                    id = %stamp.id,
                    observed = ?stamp.version,
                    current = ?current,
                    "Commit rejected: stale read"
                );
                return Err(StoreError::Conflict {
                    collection: stamp.collection.clone(),
                    id: stamp.id.clone(),
                });
            }
        }

        let mut inserted: Vec<(&str, &str)> = Vec::new();
        for write in &writes {
            match write {
                WriteOp::Update { collection, id, .. } => {
                    if !self.contains(collection, id) {
                        return Err(StoreError::not_found(collection, id));
                    }
                }
                WriteOp::Insert { collection, id, .. } => {
                    let key = (collection.as_str(), id.as_str());
                    if self.contains(collection, id) || inserted.contains(&key) {
                        return Err(StoreError::already_exists(collection, id));
                    }
                    inserted.push(key);
                }
                WriteOp::Create { .. } => {}
            }
        }

        let mut receipt = CommitReceipt::default();
        let mut touched: Vec<String> = Vec::new();
        for write in writes {
            let name = write.collection().to_string();
            match write {
                WriteOp::Create { collection, fields } => {
                    receipt.created.push(self.insert(&collection, fields));
                }
                WriteOp::Update { collection, id, fields } => {
                    if let Some(doc) = self.collection_mut(&collection).docs.get_mut(&id) {
                        doc.fields.extend(fields);
                        doc.version += 1;
                    }
                }
                WriteOp::Insert { collection, id, fields } => {
                    self.insert_at(&collection, id, fields);
                }
            }
            if !touched.contains(&name) {
                touched.push(name);
            }
        }

        for name in &touched {
            self.collection_mut(name).publish();
        }

        debug!(collections = ?touched, created = receipt.created.len(), "Commit applied");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::fields;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counting_store() -> StoreClient {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("doc_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = StoreActor::new(10, next_id);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = counting_store();

        let id = store
            .create("products", fields([("name", json!("Arrachera"))]))
            .await
            .unwrap();
        assert_eq!(id, "doc_1");

        let doc = store.get("products", &id).await.unwrap().unwrap();
        assert_eq!(doc.version, 1);

        store
            .update("products", &id, fields([("unitPrice", json!(320))]))
            .await
            .unwrap();
        let doc = store.get("products", &id).await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.fields.get("name"), Some(&json!("Arrachera")));
        assert_eq!(doc.fields.get("unitPrice"), Some(&json!(320)));

        store.delete("products", &id).await.unwrap();
        assert_eq!(store.get("products", &id).await.unwrap(), None);
        assert_eq!(
            store.delete("products", &id).await,
            Err(StoreError::not_found("products", &id))
        );
    }

    #[tokio::test]
    async fn test_commit_rejects_stale_reads_without_applying_anything() {
        let store = counting_store();
        let id = store
            .create("inventory", fields([("stockQuantity", json!(10))]))
            .await
            .unwrap();

        let stale = vec![ReadStamp {
            collection: "inventory".into(),
            id: id.clone(),
            version: Some(1),
        }];
        store
            .update("inventory", &id, fields([("stockQuantity", json!(9))]))
            .await
            .unwrap();

        let result = store
            .commit(
                stale,
                vec![
                    WriteOp::Update {
                        collection: "inventory".into(),
                        id: id.clone(),
                        fields: fields([("stockQuantity", json!(4))]),
                    },
                    WriteOp::Create {
                        collection: "orders".into(),
                        fields: fields([("status", json!("pending"))]),
                    },
                ],
            )
            .await;

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        let doc = store.get("inventory", &id).await.unwrap().unwrap();
        assert_eq!(doc.fields.get("stockQuantity"), Some(&json!(9)));
        let orders = store.subscribe("orders").await.unwrap();
        assert!(orders.current().is_empty());
    }

    #[tokio::test]
    async fn test_insert_at_taken_id_applies_nothing() {
        let store = counting_store();
        let insert = |id: &str, qty: i64| WriteOp::Insert {
            collection: "inventory".into(),
            id: id.into(),
            fields: fields([("stockQuantity", json!(qty))]),
        };

        store.commit(Vec::new(), vec![insert("p1", 0)]).await.unwrap();
        let doc = store.get("inventory", "p1").await.unwrap().unwrap();
        assert_eq!(doc.version, 1);

        let result = store
            .commit(
                Vec::new(),
                vec![
                    WriteOp::Update {
                        collection: "inventory".into(),
                        id: "p1".into(),
                        fields: fields([("stockQuantity", json!(5))]),
                    },
                    insert("p1", 10),
                ],
            )
            .await;
        assert_eq!(result, Err(StoreError::already_exists("inventory", "p1")));

        let twice = store.commit(Vec::new(), vec![insert("p2", 1), insert("p2", 2)]).await;
        assert_eq!(twice, Err(StoreError::already_exists("inventory", "p2")));

        let snapshot = store.subscribe("inventory").await.unwrap().current();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.documents[0].fields.get("stockQuantity"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_absent_read_conflicts_with_concurrent_insert() {
        let store = counting_store();
        let absent = vec![ReadStamp {
            collection: "inventory".into(),
            id: "p1".into(),
            version: None,
        }];
        store
            .commit(
                Vec::new(),
                vec![WriteOp::Insert {
                    collection: "inventory".into(),
                    id: "p1".into(),
                    fields: fields([("stockQuantity", json!(0))]),
                }],
            )
            .await
            .unwrap();

        let result = store
            .commit(
                absent,
                vec![WriteOp::Insert {
                    collection: "inventory".into(),
                    id: "p1".into(),
                    fields: fields([("stockQuantity", json!(10))]),
                }],
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_subscription_sees_commits_in_creation_order() {
        let store = counting_store();
        let mut orders = store.subscribe("orders").await.unwrap();
        assert_eq!(orders.current().revision, 0);

        let receipt = store
            .commit(
                Vec::new(),
                vec![
                    WriteOp::Create {
                        collection: "orders".into(),
                        fields: fields([("customerName", json!("Ana"))]),
                    },
                    WriteOp::Create {
                        collection: "orders".into(),
                        fields: fields([("customerName", json!("Luis"))]),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(receipt.created, vec!["doc_1".to_string(), "doc_2".to_string()]);

        orders.changed().await.unwrap();
        let snapshot = orders.current();
        assert_eq!(snapshot.revision, 1);
        let ids: Vec<&str> = snapshot.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc_1", "doc_2"]);
    }
}
