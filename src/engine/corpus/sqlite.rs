// Meowkov Engine — SQLite corpus backend
//
// A local, durable alternative to Redis: one row per (chain key, next word)
// pair, the composite primary key doing the set semantics.

use super::CorpusStore;
use crate::atoms::error::{EngineError, EngineResult};
use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

const BACKEND: &str = "sqlite";

// `chain_keys` holds every key once with dense ids (keys are only ever removed
// all at once), so a random key is one index seek instead of a table scan.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS corpus (
        chain_key TEXT NOT NULL,
        next_word TEXT NOT NULL,
        PRIMARY KEY (chain_key, next_word)
    ) WITHOUT ROWID;

    CREATE TABLE IF NOT EXISTS chain_keys (
        id INTEGER PRIMARY KEY,
        chain_key TEXT NOT NULL UNIQUE
    );

    INSERT OR IGNORE INTO chain_keys (chain_key)
        SELECT DISTINCT chain_key FROM corpus
        WHERE NOT EXISTS (SELECT 1 FROM chain_keys);
";

/// Thread-safe corpus database wrapper. Queries run on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the corpus database and initialize the tables.
    pub fn open(path: &Path) -> EngineResult<Self> {
        info!("[corpus] Opening SQLite corpus at {:?}", path);
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch("PRAGMA synchronous=NORMAL;").ok();
        Self::init(conn)
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> EngineResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn blocking<T, F>(&self, f: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> EngineResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| EngineError::store(BACKEND, format!("query task failed: {}", e)))?
    }
}

#[async_trait]
impl CorpusStore for SqliteStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn add_member(&self, key: &str, value: &str) -> EngineResult<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.blocking(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO corpus (chain_key, next_word) VALUES (?1, ?2)",
                params![key, value],
            )?;
            if inserted > 0 {
                conn.execute("INSERT OR IGNORE INTO chain_keys (chain_key) VALUES (?1)", params![key])?;
            }
            Ok(())
        })
        .await
    }

    async fn random_member(&self, key: &str) -> EngineResult<Option<String>> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let word = conn
                .query_row(
                    "SELECT next_word FROM corpus WHERE chain_key = ?1 ORDER BY RANDOM() LIMIT 1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(word)
        })
        .await
    }

    async fn random_key(&self) -> EngineResult<Option<String>> {
        self.blocking(|conn| {
            // Uniform over keys, not over (key, word) rows.
            let key = conn
                .query_row(
                    "SELECT chain_key FROM chain_keys
                     WHERE id >= (SELECT (RANDOM() & 9223372036854775807) % MAX(id) + 1 FROM chain_keys)
                     ORDER BY id LIMIT 1",
                    [],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(key)
        })
        .await
    }

    async fn members(&self, key: &str) -> EngineResult<Vec<String>> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let mut stmt =
                conn.prepare("SELECT next_word FROM corpus WHERE chain_key = ?1 ORDER BY next_word")?;
            let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
    }

    async fn flush(&self) -> EngineResult<()> {
        self.blocking(|conn| {
            conn.execute_batch("DELETE FROM corpus; DELETE FROM chain_keys;")?;
            Ok(())
        })
        .await
    }

    async fn save(&self) -> EngineResult<()> {
        self.blocking(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
            Ok(())
        })
        .await?;
        info!("[corpus] SQLite checkpoint complete");
        Ok(())
    }
}
