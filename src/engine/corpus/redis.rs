// Meowkov Engine — Redis corpus backend
//
// Speaks RESP directly over tokio TCP, the same way the IRC bridge speaks its
// line protocol. Connections come from a small pool:
//   - at most REDIS_MAX_ACTIVE connections in use; callers wait for a slot
//   - at most REDIS_MAX_IDLE kept for reuse, discarded after the idle timeout
//   - a connection that hit an I/O or protocol error, or whose caller gave up
//     before the reply arrived, is never reused

use super::resp::{encode_command, read_value, RespValue};
use super::CorpusStore;
use crate::atoms::constants::{REDIS_IDLE_TIMEOUT_MS, REDIS_MAX_ACTIVE, REDIS_MAX_IDLE};
use crate::atoms::error::{EngineError, EngineResult};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::{Semaphore, SemaphorePermit};

const BACKEND: &str = "redis";

/// Resolve the Redis address, honouring Docker link variables
/// (`REDIS_PORT_<port>_TCP_ADDR` replaces the configured host).
pub fn resolve_address(server: &str) -> EngineResult<String> {
    resolve_address_with(server, |name| std::env::var(name).ok())
}

pub(crate) fn resolve_address_with(
    server: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> EngineResult<String> {
    let (host, port) = server
        .rsplit_once(':')
        .filter(|(h, p)| !h.is_empty() && p.parse::<u16>().is_ok())
        .ok_or_else(|| EngineError::Config(format!("RedisServer must be host:port, got {:?}", server)))?;

    let env = format!("REDIS_PORT_{}_TCP_ADDR", port);
    match lookup(&env).filter(|h| !h.is_empty()) {
        Some(docker_host) => {
            debug!("[corpus] Using Dockerized Redis: {}={}", env, docker_host);
            Ok(format!("{}:{}", docker_host, port))
        }
        None => Ok(format!("{}:{}", host, port)),
    }
}

// ── Connection ─────────────────────────────────────────────────────────

struct RedisConn {
    stream: BufStream<TcpStream>,
}

impl RedisConn {
    async fn connect(addr: &str) -> EngineResult<Self> {
        let tcp = TcpStream::connect(addr)
            .await
            .map_err(|e| EngineError::store(BACKEND, format!("connect to {} failed: {}", addr, e)))?;
        tcp.set_nodelay(true).ok();
        Ok(Self { stream: BufStream::new(tcp) })
    }

    async fn call(&mut self, args: &[&[u8]]) -> EngineResult<RespValue> {
        self.stream.write_all(&encode_command(args)).await?;
        self.stream.flush().await?;
        read_value(&mut self.stream).await
    }
}

struct IdleConn {
    conn: RedisConn,
    since: Instant,
}

/// A checked-out connection. Returned to the pool on drop unless it broke.
struct PooledConn<'a> {
    store: &'a RedisStore,
    conn: Option<RedisConn>,
    healthy: bool,
    _permit: SemaphorePermit<'a>,
}

impl PooledConn<'_> {
    async fn call(&mut self, args: &[&[u8]]) -> EngineResult<RespValue> {
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(EngineError::store(BACKEND, "connection already released")),
        };
        // Unhealthy until the reply is read, so a dropped call is never pooled.
        self.healthy = false;
        let value = conn.call(args).await.map_err(|e| EngineError::store(BACKEND, e.to_string()))?;
        self.healthy = true;
        match value {
            RespValue::Error(message) => Err(EngineError::store(BACKEND, message)),
            value => Ok(value),
        }
    }
}

impl Drop for PooledConn<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.healthy {
                self.store.release(conn);
            }
        }
    }
}

// ── Store ──────────────────────────────────────────────────────────────

pub struct RedisStore {
    addr: String,
    idle: Mutex<Vec<IdleConn>>,
    permits: Semaphore,
    idle_timeout: Duration,
}

impl RedisStore {
    /// Create the pool and verify the server answers `PING`.
    pub async fn connect(addr: &str) -> EngineResult<Self> {
        let store = Self::lazy(addr);
        let mut conn = store.get().await?;
        conn.call(&[b"PING"]).await?;
        drop(conn);
        info!("[corpus] Connected to Redis at {}", addr);
        Ok(store)
    }

    /// Create the pool without dialing; the first command connects.
    pub fn lazy(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            idle: Mutex::new(Vec::new()),
            permits: Semaphore::new(REDIS_MAX_ACTIVE),
            idle_timeout: Duration::from_millis(REDIS_IDLE_TIMEOUT_MS),
        }
    }

    async fn get(&self) -> EngineResult<PooledConn<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EngineError::store(BACKEND, "connection pool closed"))?;

        let reused = {
            let mut idle = self.idle.lock();
            let now = Instant::now();
            idle.retain(|c| now.duration_since(c.since) < self.idle_timeout);
            idle.pop()
        };

        let conn = match reused {
            Some(idle) => idle.conn,
            None => RedisConn::connect(&self.addr).await?,
        };

        Ok(PooledConn { store: self, conn: Some(conn), healthy: true, _permit: permit })
    }

    fn release(&self, conn: RedisConn) {
        let mut idle = self.idle.lock();
        if idle.len() < REDIS_MAX_IDLE {
            idle.push(IdleConn { conn, since: Instant::now() });
        }
    }

    async fn command(&self, args: &[&[u8]]) -> EngineResult<RespValue> {
        let mut conn = self.get().await?;
        conn.call(args).await
    }
}

#[async_trait]
impl CorpusStore for RedisStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn add_member(&self, key: &str, value: &str) -> EngineResult<()> {
        self.command(&[b"SADD", key.as_bytes(), value.as_bytes()]).await?;
        Ok(())
    }

    async fn random_member(&self, key: &str) -> EngineResult<Option<String>> {
        self.command(&[b"SRANDMEMBER", key.as_bytes()]).await?.into_string()
    }

    async fn random_key(&self) -> EngineResult<Option<String>> {
        self.command(&[b"RANDOMKEY"]).await?.into_string()
    }

    async fn members(&self, key: &str) -> EngineResult<Vec<String>> {
        match self.command(&[b"SMEMBERS", key.as_bytes()]).await? {
            RespValue::Array(Some(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(s) = item.into_string()? {
                        out.push(s);
                    }
                }
                Ok(out)
            }
            RespValue::Array(None) => Ok(Vec::new()),
            other => Err(EngineError::Protocol(format!("SMEMBERS returned {:?}", other))),
        }
    }

    async fn flush(&self) -> EngineResult<()> {
        self.command(&[b"FLUSHDB"]).await?;
        Ok(())
    }

    async fn save(&self) -> EngineResult<()> {
        self.command(&[b"SAVE"]).await?;
        info!("[corpus] Saved (dump.rdb)");
        Ok(())
    }
}
