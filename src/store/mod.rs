//! In-process document store: named collections, point reads and writes, live
//! snapshots and optimistic multi-document transactions.

mod actor;
mod client;
pub mod document;
pub mod error;
mod subscription;
pub mod transaction;

pub use actor::{Response, StoreActor, StoreRequest};
pub use client::StoreClient;
pub use document::{
    CommitReceipt, Document, Fields, ReadStamp, Snapshot, WriteOp, INVENTORY, ORDERS, PRODUCTS,
    USERS,
};
pub use error::StoreError;
pub use subscription::Subscription;
pub use transaction::{run_transaction, Transaction, TransactionBody};
