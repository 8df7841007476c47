// Meowkov Engine — Corpus
//
// The corpus maps a chain key (ChainLength tokens joined by SEPARATOR) to the
// set of words observed right after it. Storage is an injected capability:
//   - CorpusStore: the primitive set/key operations every backend provides
//   - Corpus: the adapter the engine talks to; it owns the key format
//     and turns store failures into "no data" during generation
//
// Backends: redis (networked, default), sqlite (local file), memory (tests).

mod memory;
mod redis;
pub mod resp;
mod sqlite;

pub use memory::MemoryStore;
pub use redis::{resolve_address, RedisStore};
pub use sqlite::SqliteStore;

use crate::atoms::constants::STOP;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{CorpusBackend, Seed, Token};
use crate::engine::config::BotConfig;
use crate::engine::seeds::{chain_key, split_key};
use async_trait::async_trait;
use log::{debug, error, log_enabled, Level};
use std::path::Path;
use std::sync::Arc;

/// Primitive operations of a set-valued key/value store.
///
/// No call is transactional with any other; learners may write while a
/// walk is reading.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Add `value` to the set at `key`. Idempotent.
    async fn add_member(&self, key: &str, value: &str) -> EngineResult<()>;

    /// One pseudo-random member of the set at `key`, `None` when absent.
    async fn random_member(&self, key: &str) -> EngineResult<Option<String>>;

    /// One pseudo-random existing key, `None` when the store is empty.
    async fn random_key(&self) -> EngineResult<Option<String>>;

    /// Every member of the set at `key` (diagnostics only).
    async fn members(&self, key: &str) -> EngineResult<Vec<String>>;

    /// Remove every key.
    async fn flush(&self) -> EngineResult<()>;

    /// Ask the store to persist a snapshot.
    async fn save(&self) -> EngineResult<()>;
}

/// Open the store selected in the configuration.
pub async fn open_store(config: &BotConfig) -> EngineResult<Arc<dyn CorpusStore>> {
    let store: Arc<dyn CorpusStore> = match config.corpus_backend {
        CorpusBackend::Redis => {
            let addr = resolve_address(&config.redis_server)?;
            Arc::new(RedisStore::connect(&addr).await?)
        }
        CorpusBackend::Sqlite => Arc::new(SqliteStore::open(Path::new(&config.corpus_path))?),
        CorpusBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

// ── Adapter ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Corpus {
    store: Arc<dyn CorpusStore>,
}

impl Corpus {
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// Persist every seed as `key(seed[..n-1]) → seed[n-1]`.
    ///
    /// A seed that fails to store is logged and skipped; the rest of the batch
    /// is still attempted. Returns how many seeds were stored.
    pub async fn learn(&self, seeds: &[Seed]) -> usize {
        let mut stored = 0;
        for (i, seed) in seeds.iter().enumerate() {
            let Some((value, chain)) = seed.split_last() else { continue };
            if chain.is_empty() {
                continue;
            }
            let key = chain_key(chain);

            if let Err(e) = self.store.add_member(&key, value).await {
                error!("[corpus] Failed to learn seed #{} {:?}: {}", i, seed, e);
                continue;
            }
            stored += 1;

            if log_enabled!(Level::Debug) {
                debug!("[corpus] seed #{}:\t{:?}", i, seed);
                match self.store.members(&key).await {
                    Ok(values) => debug!("[corpus] corpus #{}:\t{:?}", i, values),
                    Err(e) => error!("[corpus] Failed to read back {:?}: {}", key, e),
                }
            }
        }
        stored
    }

    /// Next word after `key`. Store failures read as end of utterance.
    pub async fn sample_next(&self, key: &str) -> Option<Token> {
        match self.store.random_member(key).await {
            Ok(word) => word,
            Err(e) => {
                error!("[corpus] {} error: {}", self.store.name(), e);
                Some(STOP.to_string())
            }
        }
    }

    /// A random existing chain key split back into tokens; empty when the
    /// corpus is empty or unreachable.
    pub async fn random_chain(&self) -> Vec<Token> {
        match self.store.random_key().await {
            Ok(Some(key)) => split_key(&key),
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("[corpus] {} error: {}", self.store.name(), e);
                Vec::new()
            }
        }
    }

    /// Current next-word set for a chain (diagnostics and tests).
    pub async fn members(&self, chain: &[Token]) -> EngineResult<Vec<Token>> {
        self.store.members(&chain_key(chain)).await
    }

    /// Drop the whole corpus. Administrative; never called by generation.
    pub async fn purge(&self) -> EngineResult<()> {
        self.store.flush().await
    }

    /// Snapshot the corpus to durable storage.
    pub async fn persist(&self) -> EngineResult<()> {
        self.store.save().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stores with scripted behaviour for exercising failure paths.

    use super::*;
    use crate::atoms::error::EngineError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Every call fails as if the server were down.
    pub struct DownStore;

    #[async_trait]
    impl CorpusStore for DownStore {
        fn name(&self) -> &str {
            "down"
        }
        async fn add_member(&self, _: &str, _: &str) -> EngineResult<()> {
            Err(EngineError::store("down", "connection refused"))
        }
        async fn random_member(&self, _: &str) -> EngineResult<Option<String>> {
            Err(EngineError::store("down", "connection refused"))
        }
        async fn random_key(&self) -> EngineResult<Option<String>> {
            Err(EngineError::store("down", "connection refused"))
        }
        async fn members(&self, _: &str) -> EngineResult<Vec<String>> {
            Err(EngineError::store("down", "connection refused"))
        }
        async fn flush(&self) -> EngineResult<()> {
            Err(EngineError::store("down", "connection refused"))
        }
        async fn save(&self) -> EngineResult<()> {
            Err(EngineError::store("down", "connection refused"))
        }
    }

    /// Never ends an utterance: every key continues with the same word.
    /// Counts `random_member` calls.
    #[derive(Default)]
    pub struct EndlessStore {
        pub samples: AtomicUsize,
    }

    #[async_trait]
    impl CorpusStore for EndlessStore {
        fn name(&self) -> &str {
            "endless"
        }
        async fn add_member(&self, _: &str, _: &str) -> EngineResult<()> {
            Ok(())
        }
        async fn random_member(&self, _: &str) -> EngineResult<Option<String>> {
            self.samples.fetch_add(1, Ordering::SeqCst);
            Ok(Some("meow".into()))
        }
        async fn random_key(&self) -> EngineResult<Option<String>> {
            Ok(Some("meow\x02meow".into()))
        }
        async fn members(&self, _: &str) -> EngineResult<Vec<String>> {
            Ok(vec!["meow".into()])
        }
        async fn flush(&self) -> EngineResult<()> {
            Ok(())
        }
        async fn save(&self) -> EngineResult<()> {
            Ok(())
        }
    }

    /// Delegates to a memory store and counts `random_key` calls.
    pub struct CountingStore {
        pub inner: MemoryStore,
        pub random_keys: AtomicUsize,
    }

    impl CountingStore {
        pub fn new(inner: MemoryStore) -> Self {
            Self { inner, random_keys: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl CorpusStore for CountingStore {
        fn name(&self) -> &str {
            "counting"
        }
        async fn add_member(&self, key: &str, value: &str) -> EngineResult<()> {
            self.inner.add_member(key, value).await
        }
        async fn random_member(&self, key: &str) -> EngineResult<Option<String>> {
            self.inner.random_member(key).await
        }
        async fn random_key(&self) -> EngineResult<Option<String>> {
            self.random_keys.fetch_add(1, Ordering::SeqCst);
            self.inner.random_key().await
        }
        async fn members(&self, key: &str) -> EngineResult<Vec<String>> {
            self.inner.members(key).await
        }
        async fn flush(&self) -> EngineResult<()> {
            self.inner.flush().await
        }
        async fn save(&self) -> EngineResult<()> {
            self.inner.save().await
        }
    }

    /// Fails `add_member` for one specific value, succeeds otherwise.
    pub struct FlakyStore {
        pub inner: MemoryStore,
        pub poison: String,
    }

    #[async_trait]
    impl CorpusStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn add_member(&self, key: &str, value: &str) -> EngineResult<()> {
            if value == self.poison {
                return Err(EngineError::store("flaky", "timeout"));
            }
            self.inner.add_member(key, value).await
        }
        async fn random_member(&self, key: &str) -> EngineResult<Option<String>> {
            self.inner.random_member(key).await
        }
        async fn random_key(&self) -> EngineResult<Option<String>> {
            self.inner.random_key().await
        }
        async fn members(&self, key: &str) -> EngineResult<Vec<String>> {
            self.inner.members(key).await
        }
        async fn flush(&self) -> EngineResult<()> {
            self.inner.flush().await
        }
        async fn save(&self) -> EngineResult<()> {
            self.inner.save().await
        }
    }
}
