// Meowkov Engine — Configuration
//
// The bot is configured by one JSON file with PascalCase keys (the format of
// every meowkov.conf in the wild). Loading is a one-shot step:
//   1. parse into BotConfig (every field has a default)
//   2. migrate legacy fields (RoomName → Channels)
//   3. validate ranges so the engine can rely on them without checks
//
// Tunables the generator needs are copied into ChainSettings, which is what
// the engine modules take; they never see transport or store settings.

use crate::atoms::constants::{DEFAULT_CORPUS_PATH, STOP};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{CorpusBackend, GrowthLaw};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BotConfig {
    // ── IRC ──
    pub bot_name: String,
    pub channels: Vec<String>,
    /// `host:port`
    pub irc_server: String,
    pub irc_password: Option<String>,
    #[serde(rename = "UseTLS")]
    pub use_tls: bool,
    pub debug: bool,

    // ── Corpus store ──
    pub corpus_backend: CorpusBackend,
    /// `host:port` of the Redis server.
    pub redis_server: String,
    /// SQLite file used by the sqlite backend.
    pub corpus_path: String,

    // ── Generation ──
    pub chain_length: usize,
    pub max_chain_length: usize,
    pub chains_to_try: usize,
    pub min_response_pool: usize,
    pub max_response_tries: usize,
    pub growth_law: GrowthLaw,
    pub transliterate: bool,

    // ── Reaction policy ──
    pub default_chattiness: f64,
    /// Seconds.
    pub min_time_between_reactions: u64,
    pub words_per_minute: u64,

    // ── Vocabulary ──
    pub smileys: Vec<String>,
    pub dont_end_with: Vec<String>,
    pub blacklist: Vec<String>,
    /// Normalized input line → canned replies.
    pub predefined_responses: HashMap<String, Vec<String>>,

    /// Deprecated single-channel field, folded into `channels` at load time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            bot_name: "meowkov".into(),
            channels: vec![],
            irc_server: "irc.libera.chat:6697".into(),
            irc_password: None,
            use_tls: true,
            debug: false,
            corpus_backend: CorpusBackend::Redis,
            redis_server: "localhost:6379".into(),
            corpus_path: DEFAULT_CORPUS_PATH.into(),
            chain_length: 2,
            max_chain_length: 30,
            chains_to_try: 30,
            min_response_pool: 2,
            max_response_tries: 3,
            growth_law: GrowthLaw::Square,
            transliterate: true,
            default_chattiness: 0.01,
            min_time_between_reactions: 60,
            words_per_minute: 240,
            smileys: [":)", ":D", ":3", ":P", "^_^", "=^.^="].iter().map(|s| s.to_string()).collect(),
            dont_end_with: ["a", "the", "and", "or", "to", "of", "with"].iter().map(|s| s.to_string()).collect(),
            blacklist: vec![],
            predefined_responses: HashMap::new(),
            room_name: None,
        }
    }
}

impl BotConfig {
    /// Read, migrate and validate a config file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Read {}: {}", path.display(), e)))?;
        let config = Self::from_json(&raw)?;
        debug!("[config] Loaded {}: {:?}", path.display(), config.redacted());
        Ok(config)
    }

    /// Parse, migrate and validate JSON text.
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let mut config: BotConfig = serde_json::from_str(raw)
            .map_err(|e| EngineError::Config(format!("Parse config: {}", e)))?;
        config.migrate_legacy();
        config.validate()?;
        Ok(config)
    }

    fn migrate_legacy(&mut self) {
        if let Some(room) = self.room_name.take() {
            if self.channels.is_empty() && !room.is_empty() {
                warn!("[config] 'RoomName' is deprecated and will be removed in future. Use the 'Channels' list instead. Please update your config file.");
                self.channels = vec![room];
            }
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let fail = |msg: &str| Err(EngineError::Config(msg.to_string()));

        if self.bot_name.trim().is_empty() {
            return fail("BotName must not be empty");
        }
        if split_host_port(&self.irc_server).is_none() {
            return Err(EngineError::Config(format!(
                "IrcServer must be host:port, got {:?}",
                self.irc_server
            )));
        }
        if self.chain_length < 1 {
            return fail("ChainLength must be at least 1");
        }
        if self.max_chain_length < 1 {
            return fail("MaxChainLength must be at least 1");
        }
        if self.chains_to_try < 1 {
            return fail("ChainsToTry must be at least 1");
        }
        if self.min_response_pool < 1 {
            return fail("MinResponsePool must be at least 1");
        }
        if self.words_per_minute < 1 {
            return fail("WordsPerMinute must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.default_chattiness) {
            return fail("DefaultChattiness must be between 0 and 1");
        }
        if self.smileys.iter().all(|s| s.trim().is_empty()) {
            return fail("Smileys must contain at least one non-empty entry");
        }
        if self.blacklist.iter().chain(&self.dont_end_with).any(|w| w == STOP) {
            return fail("Blacklist and DontEndWith must not contain the end-of-utterance marker");
        }
        Ok(())
    }

    /// Copy with the IRC password masked, for logging.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.irc_password.is_some() {
            copy.irc_password = Some("********".into());
        }
        copy
    }

    /// `(host, port)` of the IRC server. Validated at load time.
    pub fn irc_host_port(&self) -> EngineResult<(String, u16)> {
        split_host_port(&self.irc_server)
            .ok_or_else(|| EngineError::Config(format!("IrcServer must be host:port, got {:?}", self.irc_server)))
    }

    pub fn chain_settings(&self) -> ChainSettings {
        ChainSettings {
            chain_length: self.chain_length,
            max_chain_length: self.max_chain_length,
            chains_to_try: self.chains_to_try,
            min_response_pool: self.min_response_pool,
            max_response_tries: self.max_response_tries,
            growth_law: self.growth_law,
            transliterate: self.transliterate,
            smileys: self.smileys.iter().filter(|s| !s.trim().is_empty()).cloned().collect(),
            blacklist: self.blacklist.clone(),
            dont_end_with: self.dont_end_with.clone(),
        }
    }
}

fn split_host_port(server: &str) -> Option<(String, u16)> {
    let (host, port) = server.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse::<u16>().ok()?;
    Some((host.to_string(), port))
}

/// Generation tunables, shared read-only by every walk.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub chain_length: usize,
    pub max_chain_length: usize,
    pub chains_to_try: usize,
    pub min_response_pool: usize,
    pub max_response_tries: usize,
    pub growth_law: GrowthLaw,
    pub transliterate: bool,
    pub smileys: Vec<String>,
    pub blacklist: Vec<String>,
    pub dont_end_with: Vec<String>,
}

impl Default for ChainSettings {
    fn default() -> Self {
        BotConfig::default().chain_settings()
    }
}
