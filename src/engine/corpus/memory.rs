// Meowkov Engine — In-memory corpus backend
//
// Ordered maps keep iteration stable, so with a fixed RNG seed every sample
// is reproducible. Used by tests, benches and `CorpusBackend = "memory"`.

use super::CorpusStore;
use crate::atoms::error::EngineResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

pub struct MemoryStore {
    data: Mutex<BTreeMap<String, BTreeSet<String>>>,
    rng: Mutex<StdRng>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic sampling for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self { data: Mutex::new(BTreeMap::new()), rng: Mutex::new(rng) }
    }

    /// Number of distinct chain keys.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

#[async_trait]
impl CorpusStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn add_member(&self, key: &str, value: &str) -> EngineResult<()> {
        self.data.lock().entry(key.to_string()).or_default().insert(value.to_string());
        Ok(())
    }

    async fn random_member(&self, key: &str) -> EngineResult<Option<String>> {
        let data = self.data.lock();
        let Some(set) = data.get(key).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let idx = self.rng.lock().gen_range(0..set.len());
        Ok(set.iter().nth(idx).cloned())
    }

    async fn random_key(&self) -> EngineResult<Option<String>> {
        let data = self.data.lock();
        if data.is_empty() {
            return Ok(None);
        }
        let idx = self.rng.lock().gen_range(0..data.len());
        Ok(data.keys().nth(idx).cloned())
    }

    async fn members(&self, key: &str) -> EngineResult<Vec<String>> {
        Ok(self.data.lock().get(key).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    async fn flush(&self) -> EngineResult<()> {
        self.data.lock().clear();
        Ok(())
    }

    async fn save(&self) -> EngineResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn membership_is_a_set() {
        let store = MemoryStore::with_seed(1);
        store.add_member("k", "v").await.unwrap();
        store.add_member("k", "v").await.unwrap();
        store.add_member("k", "w").await.unwrap();
        assert_eq!(store.members("k").await.unwrap(), vec!["v", "w"]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_key_has_no_member() {
        let store = MemoryStore::with_seed(1);
        assert_eq!(store.random_member("nope").await.unwrap(), None);
        assert_eq!(store.random_key().await.unwrap(), None);
    }

    #[tokio::test]
    async fn samples_only_stored_values() {
        let store = MemoryStore::with_seed(7);
        for v in ["a", "b", "c"] {
            store.add_member("k", v).await.unwrap();
        }
        for _ in 0..50 {
            let v = store.random_member("k").await.unwrap().unwrap();
            assert!(["a", "b", "c"].contains(&v.as_str()));
        }
    }

    #[tokio::test]
    async fn same_seed_same_samples() {
        let a = MemoryStore::with_seed(42);
        let b = MemoryStore::with_seed(42);
        for store in [&a, &b] {
            for v in ["1", "2", "3", "4", "5"] {
                store.add_member("k", v).await.unwrap();
            }
        }
        for _ in 0..20 {
            assert_eq!(a.random_member("k").await.unwrap(), b.random_member("k").await.unwrap());
        }
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let store = MemoryStore::with_seed(1);
        store.add_member("k", "v").await.unwrap();
        store.flush().await.unwrap();
        assert!(store.is_empty());
    }
}
