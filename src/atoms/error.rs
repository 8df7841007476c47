// ── Meowkov Atoms: Error Types ─────────────────────────────────────────────
// Single canonical error enum for the bot, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, store, protocol, config…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • Generation never surfaces `Store` errors to its caller: the corpus
//     adapter degrades them to "no data" and logs. Only administrative paths
//     (purge, persist, startup) propagate them.
//   • No variant carries the IRC server password in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Filesystem, socket or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (config file) parse failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite corpus backend failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The corpus store could not be reached or rejected a command.
    #[error("Store unavailable: {backend}: {message}")]
    Store { backend: String, message: String },

    /// A peer sent bytes that do not follow the wire protocol (RESP, IRC).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport / bridge failure.
    #[error("Channel error: {channel}: {message}")]
    Channel { channel: String, message: String },

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a store error with backend name and message.
    pub fn store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store { backend: backend.into(), message: message.into() }
    }

    /// Create a channel error with name and message.
    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel { channel: channel.into(), message: message.into() }
    }

    /// True for errors that mean "the store is unreachable right now".
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Database(_))
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All fallible operations in the crate return this type.
pub type EngineResult<T> = Result<T, EngineError>;
