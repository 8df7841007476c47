// Meowkov Engine — Responder
//
// The transport-facing half of the bot. A transport hands over one
// IncomingMessage and gets back at most one Reply:
//   learn (channel messages only) → decide whether to react → generate or
//   pick a canned answer → address the sender → compute the typing delay
//
// The reaction clock is the only state shared between messages; it is an
// atomic so concurrent handlers never block each other.

use crate::atoms::constants::{ALWAYS, STOP};
use crate::atoms::types::{IncomingMessage, Reply, Seed, Token};
use crate::engine::config::BotConfig;
use crate::engine::corpus::Corpus;
use crate::engine::generator::Generator;
use crate::engine::normalize::{normalize, MentionDetector};
use crate::engine::seeds::create_seeds;
use log::{debug, info};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

pub struct Responder {
    generator: Generator,
    chain_length: usize,
    default_chattiness: f64,
    min_time_between_reactions: Duration,
    words_per_minute: u64,
    /// Keyed by the normalized input, sentinel dropped.
    predefined: HashMap<String, Vec<String>>,
    /// Unix millis of the last reaction. Starts at construction time so the
    /// bot stays quiet for one reaction interval after connecting.
    last_reaction: AtomicI64,
    mention: Mutex<MentionDetector>,
    rng: Mutex<StdRng>,
}

impl Responder {
    pub fn new(config: &BotConfig, corpus: Corpus) -> Self {
        let generator = Generator::new(corpus, config.chain_settings());
        Self::with_generator(config, generator, StdRng::from_entropy())
    }

    /// Deterministic variant for tests: seeded generator and reaction dice.
    pub fn with_seed(config: &BotConfig, corpus: Corpus, seed: u64) -> Self {
        let generator = Generator::with_seed(corpus, config.chain_settings(), seed);
        Self::with_generator(config, generator, StdRng::seed_from_u64(seed))
    }

    fn with_generator(config: &BotConfig, generator: Generator, rng: StdRng) -> Self {
        let predefined = config
            .predefined_responses
            .iter()
            .filter(|(_, replies)| !replies.is_empty())
            .map(|(input, replies)| (predefined_key(&normalize(input)), replies.clone()))
            .collect();

        Responder {
            generator,
            chain_length: config.chain_length,
            default_chattiness: config.default_chattiness,
            min_time_between_reactions: Duration::from_secs(config.min_time_between_reactions),
            words_per_minute: config.words_per_minute.max(1),
            predefined,
            last_reaction: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
            mention: Mutex::new(MentionDetector::new(&config.bot_name)),
            rng: Mutex::new(rng),
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn corpus(&self) -> &Corpus {
        self.generator.corpus()
    }

    /// Normalize and seed a message; learn it when asked to and when it is
    /// long enough to form at least one full seed.
    pub async fn process_input(&self, message: &str, learning: bool) -> (Vec<Token>, Vec<Seed>) {
        let words = normalize(message);
        let seeds = create_seeds(&words, self.chain_length);
        if learning && self.chain_length < words.len() {
            self.generator.corpus().learn(&seeds).await;
        }
        (words, seeds)
    }

    /// [`ALWAYS`] for private queries and messages naming the bot, the
    /// configured default otherwise.
    pub fn chattiness(&self, message: &str, own_nick: &str, private: bool) -> f64 {
        if private || message.contains(own_nick) || self.is_mentioned(message, own_nick) {
            return ALWAYS;
        }
        self.default_chattiness
    }

    fn is_mentioned(&self, message: &str, own_nick: &str) -> bool {
        let mut mention = self.mention.lock();
        if mention.nick() != own_nick {
            *mention = MentionDetector::new(own_nick);
        }
        mention.is_mentioned(message)
    }

    /// Roll the dice. Always-chattiness bypasses both the dice and the rate limit.
    pub fn react(&self, chattiness: f64) -> bool {
        if chattiness == ALWAYS {
            return true;
        }
        let roll: f64 = self.rng.lock().gen();
        chattiness > roll && self.within_reaction_rate()
    }

    pub fn within_reaction_rate(&self) -> bool {
        let last = self.last_reaction.load(Ordering::SeqCst);
        let min = self.min_time_between_reactions.as_millis() as i64;
        chrono::Utc::now().timestamp_millis() - last >= min
    }

    pub fn bump_last_reaction(&self) {
        self.last_reaction.store(chrono::Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    /// Handle one message. `None` means stay quiet.
    pub async fn respond(&self, message: &IncomingMessage) -> Option<Reply> {
        let start = Instant::now();
        let (words, seeds) = self.process_input(&message.text, !message.private).await;
        let chattiness = self.chattiness(&message.text, &message.own_nick, message.private);

        if !self.react(chattiness) {
            return None;
        }
        self.bump_last_reaction();

        let mut text = match self.predefined_response(&words) {
            Some(canned) => canned,
            None => self.generator.respond(&words, seeds).await,
        };
        if chattiness == ALWAYS {
            text = format!("{}: {}", message.sender, text.trim());
        }

        let elapsed = start.elapsed();
        let delay = self.typing_delay(&text, elapsed);
        debug!("[responder] Calculating response took: {:?}", elapsed);
        debug!("[responder] Remaining typing delay: {:?}", delay);
        info!("[responder] → {}: {}", message.sender, text);
        Some(Reply { text, delay })
    }

    fn predefined_response(&self, words: &[Token]) -> Option<String> {
        let replies = self.predefined.get(&predefined_key(words))?;
        self.generator.choose(replies).cloned()
    }

    /// A smiley for someone joining, unless the bot spoke too recently.
    pub fn greeting(&self) -> Option<String> {
        if !self.within_reaction_rate() {
            return None;
        }
        self.bump_last_reaction();
        Some(self.generator.random_smiley())
    }

    /// Time a human would need to type `text` at the configured speed, minus
    /// what generation already took. Never negative.
    pub fn typing_delay(&self, text: &str, elapsed: Duration) -> Duration {
        // One "word" is five characters.
        let words = text.chars().count() as f64 / 5.0;
        let typing = Duration::from_secs_f64(words / self.words_per_minute as f64 * 60.0);
        typing.saturating_sub(elapsed)
    }
}

fn predefined_key(words: &[Token]) -> String {
    words
        .iter()
        .filter(|w| w.as_str() != STOP)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reply target and privacy of a raw `:nick!user@host PRIVMSG <target> :text`
/// line. Private queries are answered to the sender's nick.
pub fn input_source(raw: &str, own_nick: &str) -> Option<(String, bool)> {
    let target = raw.split(' ').nth(2)?;
    if target != own_nick {
        return Some((target.to_string(), false));
    }
    let sender = raw.strip_prefix(':')?.split('!').next()?;
    if sender.is_empty() {
        return None;
    }
    Some((sender.to_string(), true))
}
