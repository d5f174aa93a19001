//! Storage abstraction for listing-watch.
//!
//! Two narrow traits cover everything the pipeline and the registration
//! flow need: [`RecordStore`] for the append-only set of seen listings and
//! [`SubscriberStore`] for the chat registry. Both are reached only through
//! find/insert operations; neither exposes update or delete.
//!
//! Implementations must be `Send + Sync` so they can be shared as
//! `Arc<dyn ...>` between the scheduler and the registration listener.

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Record, Subscriber};

/// Append-only store of every record the diff engine has accepted.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_all`](RecordStore::find_all) | All stored records, oldest first |
/// | [`find_all_ids`](RecordStore::find_all_ids) | Identity keys only, one bulk read |
/// | [`insert_many`](RecordStore::insert_many) | Batch insert of unseen records |
/// | [`count`](RecordStore::count) | Number of stored records |
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Record>>;

    async fn find_all_ids(&self) -> Result<HashSet<String>>;

    /// Insert records in one batch.
    ///
    /// Records whose `car_id` is already stored are ignored, never
    /// duplicated. Returns the number of rows actually written.
    async fn insert_many(&self, records: &[Record]) -> Result<u64>;

    async fn count(&self) -> Result<u64>;
}

/// Registry of chats that receive notifications.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_subscriber(&self, id: i64) -> Result<Option<Subscriber>>;

    /// Register a subscriber.
    ///
    /// Returns `false` without writing when the id is already registered.
    async fn insert_subscriber(&self, subscriber: Subscriber) -> Result<bool>;

    /// All subscribers in registration order.
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>>;
}

/// A store that backs both the record set and the subscriber registry.
pub trait Store: RecordStore + SubscriberStore {}

impl<T: RecordStore + SubscriberStore> Store for T {}
