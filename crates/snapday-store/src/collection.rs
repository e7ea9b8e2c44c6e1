//! Typed JSON collections stored under a single key.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::kv::KvStore;
use crate::locks::KeyLocks;

/// A `Vec<T>` persisted as one JSON array under `key`.
///
/// Mutations go through [`update`](Self::update) / [`try_update`](Self::try_update),
/// which hold the key's lock from the read to the write so concurrent
/// writers in this process cannot lose each other's changes.
pub struct Collection<S, T> {
    kv: Arc<S>,
    locks: KeyLocks,
    key: String,
    _records: PhantomData<fn() -> T>,
}

impl<S, T> Clone for Collection<S, T> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            locks: self.locks.clone(),
            key: self.key.clone(),
            _records: PhantomData,
        }
    }
}

impl<S, T> Collection<S, T>
where
    S: KvStore,
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(kv: Arc<S>, locks: KeyLocks, key: impl Into<String>) -> Self {
        Self {
            kv,
            locks,
            key: key.into(),
            _records: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the whole collection. A missing key is an empty collection.
    pub async fn load(&self) -> Result<Vec<T>> {
        match self.kv.get(&self.key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Read-modify-write; always writes the result back.
    pub async fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> R + Send,
        R: Send,
    {
        let _guard = self.locks.lock(&self.key).await;
        let mut items = self.load().await?;
        let out = f(&mut items);
        self.store(&items).await?;
        Ok(out)
    }

    /// Read-modify-write that only writes back when `f` returns `Ok`.
    pub async fn try_update<R, E, F>(&self, f: F) -> Result<std::result::Result<R, E>>
    where
        F: FnOnce(&mut Vec<T>) -> std::result::Result<R, E> + Send,
        R: Send,
        E: Send,
    {
        let _guard = self.locks.lock(&self.key).await;
        let mut items = self.load().await?;
        match f(&mut items) {
            Ok(out) => {
                self.store(&items).await?;
                Ok(Ok(out))
            }
            Err(rejected) => Ok(Err(rejected)),
        }
    }

    /// Replace the record matching `same`, or append `item`.
    pub async fn upsert<F>(&self, item: T, same: F) -> Result<()>
    where
        F: Fn(&T) -> bool + Send,
    {
        self.update(move |items| match items.iter().position(|existing| same(existing)) {
            Some(index) => items[index] = item,
            None => items.push(item),
        })
        .await
    }

    async fn store(&self, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.kv.set(&self.key, raw).await.map_err(|e| {
            tracing::error!(key = %self.key, error = %e, "failed to write collection");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FlakyKv, MemoryKv};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
        label: String,
    }

    fn item(id: u32, label: &str) -> Item {
        Item {
            id,
            label: label.to_string(),
        }
    }

    #[tokio::test]
    async fn missing_key_is_empty() {
        let items: Collection<_, Item> =
            Collection::new(Arc::new(MemoryKv::new()), KeyLocks::new(), "items");
        assert!(items.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_by_identity() {
        let items = Collection::new(Arc::new(MemoryKv::new()), KeyLocks::new(), "items");
        items.upsert(item(1, "a"), |i: &Item| i.id == 1).await.unwrap();
        items.upsert(item(2, "b"), |i: &Item| i.id == 2).await.unwrap();
        items.upsert(item(1, "c"), |i: &Item| i.id == 1).await.unwrap();

        assert_eq!(items.load().await.unwrap(), vec![item(1, "c"), item(2, "b")]);
    }

    #[tokio::test]
    async fn rejected_try_update_does_not_write() {
        let kv = Arc::new(FlakyKv::new(MemoryKv::new()));
        let items: Collection<_, Item> = Collection::new(kv.clone(), KeyLocks::new(), "items");

        kv.fail_writes(true);
        let out = items
            .try_update(|_| Err::<(), _>("nope"))
            .await
            .expect("no write attempted");
        assert_eq!(out, Err("nope"));

        assert!(items.update(|list| list.push(item(1, "a"))).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let items: Collection<_, Item> =
            Collection::new(Arc::new(MemoryKv::new()), KeyLocks::new(), "items");

        let mut tasks = Vec::new();
        for id in 0..16 {
            let items = items.clone();
            tasks.push(tokio::spawn(async move {
                items.update(|list| list.push(item(id, "x"))).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(items.load().await.unwrap().len(), 16);
    }
}
