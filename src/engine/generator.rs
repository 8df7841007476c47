// Meowkov Engine — Response Generator
//
// Turns input seeds into one reply:
//   1. run ChainsToTry walks per seed, every seed in its own task
//   2. dedupe into a pool and drop candidates shorter than the median length
//   3. enough candidates → pick one and add a smiley
//      too few → fabricate a larger synthetic seed set and try again
//      out of tries → a lone smiley
//
// The only shared mutable state inside one call is the candidate set, locked
// for the duration of a single insert.

use crate::atoms::constants::DEFAULT_SMILEY;
use crate::atoms::types::{Seed, Token};
use crate::engine::config::ChainSettings;
use crate::engine::corpus::Corpus;
use crate::engine::mutator::artificial_seed;
use crate::engine::seeds::{is_chain_empty, is_empty};
use crate::engine::transliterate::chain_transliterations;
use crate::engine::walker::random_branch;
use futures::future::BoxFuture;
use log::{debug, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Clone)]
pub struct Generator {
    corpus: Corpus,
    settings: Arc<ChainSettings>,
    rng: Arc<Mutex<StdRng>>,
}

impl Generator {
    pub fn new(corpus: Corpus, settings: ChainSettings) -> Self {
        Self::with_rng(corpus, settings, StdRng::from_entropy())
    }

    /// Reproducible choices (candidate and smiley picks) for tests.
    pub fn with_seed(corpus: Corpus, settings: ChainSettings, seed: u64) -> Self {
        Self::with_rng(corpus, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(corpus: Corpus, settings: ChainSettings, rng: StdRng) -> Self {
        Self { corpus, settings: Arc::new(settings), rng: Arc::new(Mutex::new(rng)) }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    /// Uniform pick from a slice.
    pub fn choose<'a>(&self, items: &'a [String]) -> Option<&'a String> {
        if items.is_empty() {
            return None;
        }
        let idx = self.rng.lock().gen_range(0..items.len());
        items.get(idx)
    }

    /// Never empty.
    pub fn random_smiley(&self) -> String {
        self.choose(&self.settings.smileys)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SMILEY.to_string())
    }

    /// Reply to `input` using its own `seeds`, with the configured retry budget.
    pub async fn respond(&self, input: &[Token], seeds: Vec<Seed>) -> String {
        self.generate(input, seeds, self.settings.max_response_tries).await
    }

    /// One generation attempt; recurses with synthetic seeds while
    /// `tries_left > 0` and the pool stays too small. Always non-empty.
    pub fn generate<'a>(&'a self, input: &'a [Token], seeds: Vec<Seed>, tries_left: usize) -> BoxFuture<'a, String> {
        Box::pin(async move {
            debug!("[generate] Generating response for input: {:?}", input);

            let mut seeds = seeds;
            if self.settings.transliterate {
                let variants = chain_transliterations(&seeds);
                seeds.extend(variants);
            }

            let pool = self.collect_responses(seeds).await;
            let responses = normalize_response_chains(pool);
            let count = responses.len();
            debug!("[generate] Found {} potential responses", count);
            if count > 0 {
                debug!("[generate] {:?}", responses);
            }

            if count > 0 && count >= self.settings.min_response_pool {
                if let Some(choice) = self.choose(&responses) {
                    return format!("{} {}", choice, self.random_smiley());
                }
            }

            if tries_left > 0 {
                let tries_left = tries_left - 1;
                let attempt = escalation_attempt(self.settings.max_response_tries, tries_left);
                let power = self.settings.growth_law.power(attempt);
                debug!(
                    "[generate] Pool of responses is too small, trying again with artificialSeed^{}",
                    power
                );
                let seeds = artificial_seed(&self.corpus, input, power, self.settings.chain_length).await;
                return self.generate(input, seeds, tries_left).await;
            }

            self.random_smiley()
        })
    }

    /// Run every walk and gather the distinct non-empty results.
    async fn collect_responses(&self, seeds: Vec<Seed>) -> HashSet<String> {
        let responses: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks = JoinSet::new();

        for seed in seeds {
            let corpus = self.corpus.clone();
            let settings = self.settings.clone();
            let responses = responses.clone();
            tasks.spawn(async move {
                for _ in 0..settings.chains_to_try {
                    let response = random_branch(&corpus, &seed, &settings).await;
                    // A walk that only echoes one seed word is not an answer.
                    if !is_empty(&response) && !seed.contains(&response) {
                        responses.lock().insert(response);
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("[generate] Walk task failed: {}", e);
            }
        }

        let pool = std::mem::take(&mut *responses.lock());
        pool
    }
}

/// 1-based number of the escalation about to run.
pub fn escalation_attempt(max_tries: usize, tries_left: usize) -> usize {
    max_tries.saturating_sub(tries_left).max(1)
}

/// Keep candidates at least as long (in characters) as the median of the
/// distinct lengths present. Output is sorted so a seeded pick is reproducible.
pub fn normalize_response_chains(texts: HashSet<String>) -> Vec<String> {
    if texts.is_empty() {
        return Vec::new();
    }
    debug!("[generate] Normalizing {} unique responses", texts.len());

    let lengths: Vec<usize> = texts
        .iter()
        .map(|t| t.chars().count())
        .collect::<BTreeSet<usize>>()
        .into_iter()
        .collect();

    let threshold = median(&lengths);
    let mut result: Vec<String> = texts.into_iter().filter(|t| t.chars().count() >= threshold).collect();
    result.sort();
    debug!("[generate] Discarded responses shorter than median of {} characters", threshold);

    if is_chain_empty(&result) {
        return Vec::new();
    }
    result
}

/// Median of a sorted slice; the integer mean of the middle pair for even
/// lengths. Zero for an empty slice.
pub fn median(sorted: &[usize]) -> usize {
    let length = sorted.len();
    if length == 0 {
        return 0;
    }
    let middle = length / 2;
    if length % 2 == 0 {
        (sorted[middle] + sorted[middle - 1]) / 2
    } else {
        sorted[middle]
    }
}
