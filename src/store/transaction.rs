//! Optimistic multi-document transactions.
//!
//! A [`Transaction`] records the version of every document it reads and buffers its
//! writes. On commit the store re-checks those versions; if any document changed in the
//! meantime nothing is applied and [`run_transaction`] runs the body again from scratch.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::client::StoreClient;
use super::document::{CommitReceipt, Document, Fields, ReadStamp, WriteOp};
use super::error::StoreError;

pub struct Transaction {
    store: StoreClient,
    reads: Vec<ReadStamp>,
    writes: Vec<WriteOp>,
}

impl Transaction {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Authoritative read; the observed version becomes part of the commit precondition.
    pub async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let doc = self.store.get(collection, id).await?;
        let stamp = ReadStamp {
            collection: collection.to_string(),
            id: id.to_string(),
            version: doc.as_ref().map(|d| d.version),
        };
        if !self.reads.contains(&stamp) {
            self.reads.push(stamp);
        }
        Ok(doc)
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) {
        self.writes.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    /// Queue a new document; its id is reported in the [`CommitReceipt`] in queue order.
    pub fn create(&mut self, collection: &str, fields: Fields) -> usize {
        self.writes.push(WriteOp::Create {
            collection: collection.to_string(),
            fields,
        });
        self.writes
            .iter()
            .filter(|w| matches!(w, WriteOp::Create { .. }))
            .count()
            - 1
    }

    /// Queue a new document at `id`. Pair it with a [`get`](Self::get) of the same id so
    /// a concurrent insert shows up as a conflict rather than a failed commit.
    pub fn insert(&mut self, collection: &str, id: &str, fields: Fields) {
        self.writes.push(WriteOp::Insert {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub async fn commit(self) -> Result<CommitReceipt, StoreError> {
        self.store.commit(self.reads, self.writes).await
    }
}

/// Work executed inside [`run_transaction`]. It may run several times, so it must only
/// touch the store through the transaction it is handed.
#[async_trait]
pub trait TransactionBody: Send + Sync {
    type Output: Send;
    type Error: From<StoreError> + Send;

    async fn run(&self, tx: &mut Transaction) -> Result<Self::Output, Self::Error>;
}

/// Run `body` and commit its writes atomically, retrying on optimistic conflicts.
///
/// A body error aborts the attempt without committing anything. Running out of
/// attempts yields [`StoreError::ContentionExhausted`].
#[instrument(skip(store, body))]
pub async fn run_transaction<B: TransactionBody>(
    store: &StoreClient,
    max_attempts: u32,
    body: &B,
) -> Result<(B::Output, CommitReceipt), B::Error> {
    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let mut tx = Transaction::new(store.clone());
        let output = body.run(&mut tx).await?;
        match tx.commit().await {
            Ok(receipt) => {
                debug!(attempt, "Transaction committed");
                return Ok((output, receipt));
            }
            Err(e) if e.is_conflict() => {
                warn!(attempt, error = %e, "Transaction conflict, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::ContentionExhausted {
        attempts: max_attempts,
    }
    .into())
}
