use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{HashStore, KeyTtl};
use crate::error::CacheError;

#[derive(Debug)]
enum Value {
    Hash(HashMap<String, Vec<u8>>),
    Bytes(Vec<u8>),
}

#[derive(Debug)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// 进程内的 `HashStore` 实现
///
/// 过期的键在下次访问时才会被清理。
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前未过期的键数量
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.read().await.values().filter(|s| !s.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError(format!("WRONGTYPE: {}", key))
}

fn deadline(now: Instant, ttl: Duration) -> Result<Instant, CacheError> {
    now.checked_add(ttl).ok_or_else(|| CacheError(format!("过期时间超出范围: {:?}", ttl)))
}

impl HashStore for MemoryHashStore {
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, CacheError> {
        let slots = self.slots.read().await;
        match slots.get(key) {
            Some(slot) if !slot.is_expired(Instant::now()) => match &slot.value {
                Value::Hash(map) => Ok(map.clone()),
                Value::Bytes(_) => Err(wrong_type(key)),
            },
            _ => Ok(HashMap::new()),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut slots = self.slots.write().await;
        if slots.get(key).is_some_and(|s| s.is_expired(Instant::now())) {
            slots.remove(key);
        }
        let slot = slots
            .entry(key.to_owned())
            .or_insert_with(|| Slot { value: Value::Hash(HashMap::new()), expires_at: None });
        match &mut slot.value {
            Value::Hash(map) => {
                map.insert(field.to_owned(), value);
                Ok(())
            }
            Value::Bytes(_) => Err(wrong_type(key)),
        }
    }

    async fn hreplace(
        &self,
        key: &str,
        fields: Vec<(String, Vec<u8>)>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let expires_at = deadline(Instant::now(), ttl)?;
        let mut slots = self.slots.write().await;
        if fields.is_empty() {
            slots.remove(key);
            return Ok(());
        }
        let slot = Slot { value: Value::Hash(fields.into_iter().collect()), expires_at: Some(expires_at) };
        slots.insert(key.to_owned(), slot);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
        let now = Instant::now();
        let slots = self.slots.read().await;
        Ok(match slots.get(key) {
            Some(slot) if !slot.is_expired(now) => match slot.expires_at {
                Some(t) => KeyTtl::Expires(t - now),
                None => KeyTtl::Persistent,
            },
            _ => KeyTtl::Missing,
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let now = Instant::now();
        let expires_at = deadline(now, ttl)?;
        let mut slots = self.slots.write().await;
        match slots.get_mut(key) {
            Some(slot) if !slot.is_expired(now) => {
                slot.expires_at = Some(expires_at);
                Ok(true)
            }
            Some(_) => {
                slots.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let slots = self.slots.read().await;
        match slots.get(key) {
            Some(slot) if !slot.is_expired(Instant::now()) => match &slot.value {
                Value::Bytes(bytes) => Ok(Some(bytes.clone())),
                Value::Hash(_) => Err(wrong_type(key)),
            },
            _ => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = deadline(Instant::now(), ttl)?;
        let slot = Slot { value: Value::Bytes(value), expires_at: Some(expires_at) };
        self.slots.write().await.insert(key.to_owned(), slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn hash_expires() {
        let store = MemoryHashStore::new();
        store.hreplace("k", vec![("1".into(), vec![1])], HOUR).await.unwrap();
        assert_eq!(store.hgetall("k").await.unwrap().len(), 1);
        assert!(matches!(store.ttl("k").await.unwrap(), KeyTtl::Expires(_)));

        tokio::time::advance(HOUR).await;
        assert!(store.hgetall("k").await.unwrap().is_empty());
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
        assert!(store.is_empty().await);
    }

    #[rstest]
    #[tokio::test]
    async fn hset_creates_persistent_key() {
        let store = MemoryHashStore::new();
        store.hset("k", "a", vec![1]).await.unwrap();
        store.hset("k", "b", vec![2]).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Persistent);
        assert_eq!(store.hgetall("k").await.unwrap().len(), 2);

        assert!(store.expire("k", HOUR).await.unwrap());
        assert!(!store.expire("missing", HOUR).await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn hreplace_drops_old_fields() {
        let store = MemoryHashStore::new();
        store.hset("k", "old", vec![0]).await.unwrap();
        store.hreplace("k", vec![("new".into(), vec![1])], HOUR).await.unwrap();
        let map = store.hgetall("k").await.unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["new"]);

        store.hreplace("k", vec![], HOUR).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn string_values() {
        let store = MemoryHashStore::new();
        store.set_ex("s", b"v".to_vec(), HOUR).await.unwrap();
        assert_eq!(store.get("s").await.unwrap(), Some(b"v".to_vec()));
        assert!(store.hgetall("s").await.is_err());
        assert!(store.hset("s", "f", vec![]).await.is_err());

        tokio::time::advance(HOUR + Duration::from_secs(1)).await;
        assert_eq!(store.get("s").await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn out_of_range_ttl_is_an_error() {
        let store = MemoryHashStore::new();
        let forever = Duration::from_secs(u64::MAX);
        assert!(store.set_ex("s", vec![1], forever).await.is_err());
        assert!(store.hreplace("k", vec![("1".into(), vec![1])], forever).await.is_err());
        store.hset("k", "1", vec![1]).await.unwrap();
        assert!(store.expire("k", forever).await.is_err());

        // 失败时不修改已有的键
        assert_eq!(store.get("s").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Persistent);
    }
}
