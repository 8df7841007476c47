// ── Meowkov Atoms: Pure Data Types ────────────────────────────────────────────
// Plain struct/enum definitions shared across the engine.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A normalized unit of text.
pub type Token = String;

/// `ChainLength + 1` consecutive tokens: the chain key followed by the next word.
pub type Seed = Vec<Token>;

/// Which corpus store the bot talks to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorpusBackend {
    #[default]
    Redis,
    Sqlite,
    Memory,
}

/// How many corpus draws each escalation attempt makes per anchor word.
///
/// Attempt numbers start at 1, so the first retry always searches at least
/// one synthetic chain per anchor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GrowthLaw {
    Linear,
    #[default]
    Square,
    Cube,
    Quartic,
}

impl GrowthLaw {
    /// Fan-out for the given 1-based escalation attempt.
    pub fn power(self, attempt: usize) -> usize {
        let exponent = match self {
            GrowthLaw::Linear => 1,
            GrowthLaw::Square => 2,
            GrowthLaw::Cube => 3,
            GrowthLaw::Quartic => 4,
        };
        attempt.saturating_pow(exponent)
    }
}

/// One message as delivered by a transport.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub text: String,
    /// Nick of the author.
    pub sender: String,
    /// The bot's current nick (may differ from the configured one).
    pub own_nick: String,
    /// True for a private query, false for a channel message.
    pub private: bool,
}

/// What the responder wants the transport to send back.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Remaining simulated typing time before the reply should be sent.
    pub delay: Duration,
}
