// Meowkov — Markov-chain IRC chat bot.
//
//   atoms/   constants, error type and plain data shared by everything
//   engine/  normalizer, corpus, walker, generator, responder and the IRC bridge

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use engine::config::BotConfig;
pub use engine::corpus::{open_store, Corpus, CorpusStore};
pub use engine::generator::Generator;
pub use engine::responder::Responder;
