// Meowkov Engine — Seed Mutator
//
// When the input's own seeds produce too few responses, fabricate new ones:
// take each input word as an anchor, draw unrelated chains from the corpus and
// weave the anchor between their words (A, [1 2]) → [A 1 A 2 A]. Seeding those
// mutations lets walks start next to the anchor from many directions.

use crate::atoms::constants::STOP;
use crate::atoms::types::{Seed, Token};
use crate::engine::corpus::Corpus;
use crate::engine::seeds::{create_seeds, is_chain_empty, mutate_chain};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinSet;

/// `power` random corpus draws per anchor word, all in parallel.
///
/// Chain-empty input (nothing but the sentinel) is replaced by the first word
/// of a random corpus chain, so there is always an anchor unless the corpus
/// itself is empty. Output order is unspecified.
pub async fn artificial_seed(corpus: &Corpus, input: &[Token], power: usize, chain_length: usize) -> Vec<Seed> {
    let anchors: Vec<Token> = if is_chain_empty(input) {
        match corpus.random_chain().await.into_iter().next() {
            Some(word) => vec![word],
            None => {
                warn!("[generate] Corpus is empty, no anchor for synthetic seeds");
                return Vec::new();
            }
        }
    } else {
        input
            .iter()
            .take_while(|w| w.as_str() != STOP)
            .filter(|w| !w.is_empty())
            .cloned()
            .collect()
    };

    let result: Arc<Mutex<Vec<Seed>>> = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = JoinSet::new();

    for word in &anchors {
        for _ in 0..power {
            let corpus = corpus.clone();
            let result = result.clone();
            let word = word.clone();
            tasks.spawn(async move {
                let chain = corpus.random_chain().await;
                if chain.is_empty() {
                    return;
                }
                for mutation in create_seeds(&mutate_chain(&word, &chain), chain_length) {
                    result.lock().push(mutation);
                }
            });
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!("[generate] Mutation task failed: {}", e);
        }
    }

    let seeds = std::mem::take(&mut *result.lock());
    debug!(
        "[generate] artificial_seed({:?}, {}) → {} seeds from {} anchors",
        input,
        power,
        seeds.len(),
        anchors.len()
    );
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::corpus::MemoryStore;

    fn words(list: &[&str]) -> Vec<Token> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn corpus_with(lines: &[&str]) -> Corpus {
        let corpus = Corpus::new(Arc::new(MemoryStore::with_seed(5)));
        for line in lines {
            corpus.learn(&create_seeds(&crate::engine::normalize::normalize(line), 2)).await;
        }
        corpus
    }

    #[tokio::test]
    async fn mutations_alternate_anchor() {
        let corpus = corpus_with(&["one two three", "four five six"]).await;
        let seeds = artificial_seed(&corpus, &words(&["cat", STOP]), 3, 2).await;

        // Each draw: key of 2 words → 5-token mutation → 3 seeds.
        assert_eq!(seeds.len(), 9);
        for seed in &seeds {
            assert_eq!(seed.len(), 3);
            let anchored = seed.iter().step_by(2).all(|w| w == "cat")
                || seed.iter().skip(1).step_by(2).all(|w| w == "cat");
            assert!(anchored, "{:?} does not alternate the anchor", seed);
        }
    }

    #[tokio::test]
    async fn fan_out_scales_with_anchors_and_power() {
        let corpus = corpus_with(&["one two three"]).await;
        let one = artificial_seed(&corpus, &words(&["a", STOP]), 2, 2).await;
        let two = artificial_seed(&corpus, &words(&["a", "b", STOP]), 2, 2).await;
        let more = artificial_seed(&corpus, &words(&["a", "b", STOP]), 4, 2).await;
        assert_eq!(two.len(), one.len() * 2);
        assert_eq!(more.len(), two.len() * 2);
    }

    #[tokio::test]
    async fn empty_input_borrows_anchor_from_corpus() {
        let corpus = corpus_with(&["one two three"]).await;
        let seeds = artificial_seed(&corpus, &words(&[STOP]), 1, 2).await;
        assert!(!seeds.is_empty());
        let anchor = &seeds[0][0];
        assert!(["one", "two", "three"].contains(&anchor.as_str()));
    }

    #[tokio::test]
    async fn empty_corpus_yields_nothing() {
        let corpus = corpus_with(&[]).await;
        assert!(artificial_seed(&corpus, &words(&[STOP]), 4, 2).await.is_empty());
        assert!(artificial_seed(&corpus, &words(&["a", STOP]), 4, 2).await.is_empty());
    }

    #[tokio::test]
    async fn zero_power_draws_nothing() {
        let corpus = corpus_with(&["one two three"]).await;
        assert!(artificial_seed(&corpus, &words(&["a", STOP]), 0, 2).await.is_empty());
    }
}
