// ── Meowkov Atoms: Constants ───────────────────────────────────────────────
// All named constants for the crate live here.
// Nothing in this file may depend on configuration; values that users can
// tune belong in engine/config.rs instead.

// ── Corpus encoding ───────────────────────────────────────────────────────
// Both bytes are control characters, which the normalizer never produces
// (IRC strips them or they arrive only as CTCP framing). Changing either value
// makes an existing corpus unreadable.

/// End-of-utterance sentinel appended to every normalized message.
pub const STOP: &str = "\x01";
/// Joins the tokens of a chain key.
pub const SEPARATOR: &str = "\x02";

// ── Reaction policy ───────────────────────────────────────────────────────

/// Chattiness value meaning "answer unconditionally".
pub const ALWAYS: f64 = 1.0;
/// Used when no configured smiley is usable.
pub const DEFAULT_SMILEY: &str = ":)";

// ── Build ───────────────────────────────────────────────────────────────────

/// Reported over CTCP VERSION. Set by build.rs.
pub const VERSION: &str = env!("MEOWKOV_VERSION");
pub const HOMEPAGE: &str = "https://github.com/lidel/meowkov";

// ── Defaults ──────────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "meowkov.conf";
pub const DEFAULT_CORPUS_PATH: &str = "meowkov.db";

// ── Redis pool limits ─────────────────────────────────────────────────────
pub(crate) const REDIS_MAX_IDLE: usize = 3;
pub(crate) const REDIS_MAX_ACTIVE: usize = 100;
pub(crate) const REDIS_IDLE_TIMEOUT_MS: u64 = 1_000;

// ── IRC ───────────────────────────────────────────────────────────────────
// IRC lines are capped at 512 bytes including the command; 400 leaves room
// for "PRIVMSG #channel :" and the CRLF.
pub(crate) const IRC_MAX_MESSAGE_LEN: usize = 400;
/// How long to wait for the server to close the connection after QUIT.
pub(crate) const IRC_QUIT_GRACE_SECS: u64 = 5;

// ── Import ────────────────────────────────────────────────────────────────
/// In-flight lines per available CPU during a stdin import.
pub(crate) const IMPORT_LINES_PER_CPU: usize = 1000;
/// Log a progress line every N imported lines.
pub(crate) const IMPORT_PROGRESS_EVERY: usize = 10_000;
