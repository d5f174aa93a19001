//! In-memory store implementation for tests and dry runs.
//!
//! Uses `Vec` behind `std::sync::RwLock`. Insertion order is preserved so
//! `find_all` and `list_subscribers` behave like the SQLite store.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Record, Subscriber};

use super::{RecordStore, SubscriberStore};

/// In-memory record set and subscriber registry.
pub struct InMemoryStore {
    records: RwLock<Vec<Record>>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            subscribers: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Record>> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }

    async fn find_all_ids(&self) -> Result<HashSet<String>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().map(|r| r.car_id.clone()).collect())
    }

    async fn insert_many(&self, records: &[Record]) -> Result<u64> {
        let mut stored = self.records.write().map_err(poisoned)?;
        let mut seen: HashSet<String> = stored.iter().map(|r| r.car_id.clone()).collect();
        let mut written = 0;
        for record in records {
            if seen.insert(record.car_id.clone()) {
                stored.push(record.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().map_err(poisoned)?.len() as u64)
    }
}

#[async_trait]
impl SubscriberStore for InMemoryStore {
    async fn find_subscriber(&self, id: i64) -> Result<Option<Subscriber>> {
        let subs = self.subscribers.read().map_err(poisoned)?;
        Ok(subs.iter().find(|s| s.id == id).copied())
    }

    async fn insert_subscriber(&self, subscriber: Subscriber) -> Result<bool> {
        let mut subs = self.subscribers.write().map_err(poisoned)?;
        if subs.iter().any(|s| s.id == subscriber.id) {
            return Ok(false);
        }
        subs.push(subscriber);
        Ok(true)
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self.subscribers.read().map_err(poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record {
            car_id: id.to_string(),
            title: format!("Mazda CX-5 {id}"),
            year: 2022,
            mileage: None,
            price: None,
            credit: None,
            fuel: None,
            engine: None,
            drive: None,
            power: None,
            transmission: None,
            body: None,
            link: format!("https://dealer.example/{id}"),
        }
    }

    #[tokio::test]
    async fn test_insert_many_ignores_known_ids() {
        let store = InMemoryStore::new();
        assert_eq!(store.insert_many(&[record("a"), record("b")]).await.unwrap(), 2);
        assert_eq!(store.insert_many(&[record("b"), record("c"), record("c")]).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 3);
        let ids: Vec<String> = store.find_all().await.unwrap().into_iter().map(|r| r.car_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_subscriber_is_noop() {
        let store = InMemoryStore::new();
        assert!(store.insert_subscriber(Subscriber::new(7)).await.unwrap());
        assert!(!store.insert_subscriber(Subscriber::new(7)).await.unwrap());
        assert!(store.insert_subscriber(Subscriber::new(3)).await.unwrap());
        assert_eq!(
            store.list_subscribers().await.unwrap(),
            vec![Subscriber::new(7), Subscriber::new(3)]
        );
        assert_eq!(store.find_subscriber(3).await.unwrap(), Some(Subscriber::new(3)));
        assert_eq!(store.find_subscriber(4).await.unwrap(), None);
    }
}
