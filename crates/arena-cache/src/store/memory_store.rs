//! In-process store implementation.
//!
//! Backs unit tests and store-less development with the same primitive
//! semantics as Redis: lazy TTL expiry, `EXPIRE key 0` deletes, TTL of -1
//! for keys without expiry.

use super::{PresenceStore, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Value {
    Plain(String),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process implementation of [`PresenceStore`]
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries for a key and return a mutable map guard
    fn purge(map: &mut HashMap<String, Entry>, key: &str) {
        if map.get(key).is_some_and(Entry::expired) {
            map.remove(key);
        }
    }

    fn upsert<'a>(
        map: &'a mut HashMap<String, Entry>,
        key: &str,
        default: Value,
    ) -> &'a mut Entry {
        Self::purge(map, key);
        map.entry(key.to_string()).or_insert(Entry {
            value: default,
            expires_at: None,
        })
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, ttl: Option<u64>) -> StoreResult<()> {
        let mut map = self.entries.lock();
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Plain(value.to_string()),
                expires_at: ttl.map(|t| Instant::now() + Duration::from_secs(t)),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(match map.get(key).map(|e| &e.value) {
            Some(Value::Plain(v)) => Some(v.clone()),
            _ => None,
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(map.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(map.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl: u64) -> StoreResult<bool> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        if ttl == 0 {
            return Ok(map.remove(key).is_some());
        }
        match map.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<i64>> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(map.get(key).map(|entry| match entry.expires_at {
            Some(at) => {
                let remaining = at.saturating_duration_since(Instant::now());
                remaining.as_secs().max(1) as i64
            }
            None => -1,
        }))
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut map = self.entries.lock();
        let entry = Self::upsert(&mut map, key, Value::Set(HashSet::new()));
        if !matches!(entry.value, Value::Set(_)) {
            entry.value = Value::Set(HashSet::new());
        }
        let Value::Set(set) = &mut entry.value else {
            return Ok(false);
        };
        Ok(set.insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        let removed = match map.get_mut(key).map(|e| &mut e.value) {
            Some(Value::Set(set)) => set.remove(member),
            _ => false,
        };
        // Redis drops empty sets
        let now_empty = matches!(
            map.get(key).map(|e| &e.value),
            Some(Value::Set(set)) if set.is_empty()
        );
        if now_empty {
            map.remove(key);
        }
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(match map.get(key).map(|e| &e.value) {
            Some(Value::Set(set)) => set.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn set_size(&self, key: &str) -> StoreResult<u64> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(match map.get(key).map(|e| &e.value) {
            Some(Value::Set(set)) => set.len() as u64,
            _ => 0,
        })
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(match map.get(key).map(|e| &e.value) {
            Some(Value::Set(set)) => set.contains(member),
            _ => false,
        })
    }

    async fn hash_set_all(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        let mut map = self.entries.lock();
        let entry = Self::upsert(&mut map, key, Value::Hash(HashMap::new()));
        if !matches!(entry.value, Value::Hash(_)) {
            entry.value = Value::Hash(HashMap::new());
        }
        if let Value::Hash(hash) = &mut entry.value {
            for (field, value) in fields {
                hash.insert((*field).to_string(), value.clone());
            }
        }
        Ok(())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.hash_set_all(key, &[(field, value.to_string())]).await
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut map = self.entries.lock();
        Self::purge(&mut map, key);
        Ok(match map.get(key).map(|e| &e.value) {
            Some(Value::Hash(hash)) => hash.clone(),
            _ => HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_keys() {
        let store = MemoryStore::new();

        store.put("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert!(store.exists("k").await.unwrap());
        assert_eq!(store.ttl("k").await.unwrap(), Some(-1));

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_zero_deletes() {
        let store = MemoryStore::new();

        store.put("k", "v", Some(100)).await.unwrap();
        assert!(store.expire("k", 0).await.unwrap());
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.ttl("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_operations() {
        let store = MemoryStore::new();

        assert!(store.set_add("s", "a").await.unwrap());
        assert!(!store.set_add("s", "a").await.unwrap());
        assert!(store.set_add("s", "b").await.unwrap());

        assert_eq!(store.set_size("s").await.unwrap(), 2);
        assert!(store.set_contains("s", "a").await.unwrap());

        let mut members = store.set_members("s").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a", "b"]);

        assert!(store.set_remove("s", "a").await.unwrap());
        assert!(!store.set_remove("s", "a").await.unwrap());
        assert!(store.set_remove("s", "b").await.unwrap());

        // Empty sets disappear, like Redis
        assert!(!store.exists("s").await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_operations() {
        let store = MemoryStore::new();

        store
            .hash_set_all("h", &[("a", "1".to_string()), ("b", "2".to_string())])
            .await
            .unwrap();
        store.hash_set("h", "b", "3").await.unwrap();

        let fields = store.hash_get_all("h").await.unwrap();
        assert_eq!(fields.get("a").map(String::as_str), Some("1"));
        assert_eq!(fields.get("b").map(String::as_str), Some("3"));

        assert!(store.hash_get_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new();

        store.put("k", "v", Some(1)).await.unwrap();
        assert!(store.ttl("k").await.unwrap().unwrap() >= 1);

        // Force the entry past its deadline
        store.expire("k", 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
