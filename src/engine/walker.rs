// Meowkov Engine — Chain Walker
//
// One bounded random walk through the corpus. The walk keeps a window of
// ChainLength words, asks the corpus for a word that followed that window,
// slides, and repeats until the corpus has nothing more to say or the
// iteration cap is hit.

use crate::atoms::types::Token;
use crate::engine::config::ChainSettings;
use crate::engine::corpus::Corpus;
use crate::engine::seeds::{chain_key, is_empty};

/// Walk from `seed` and return the space-joined, filtered response.
/// An empty string means the walk produced nothing usable.
pub async fn random_branch(corpus: &Corpus, seed: &[Token], settings: &ChainSettings) -> String {
    let chain_length = settings.chain_length;
    if chain_length == 0 || seed.len() < chain_length {
        return String::new();
    }

    let mut chain: Vec<Token> = seed[..chain_length].to_vec();
    let mut response: Vec<Token> = vec![chain[0].clone()];

    for _ in 0..settings.max_chain_length {
        let word = match corpus.sample_next(&chain_key(&chain)).await {
            Some(word) if !is_empty(&word) => word,
            _ => break,
        };
        chain.remove(0);
        chain.push(word);
        response.push(chain[0].clone());
        tokio::task::yield_now().await;
    }

    remove_blacklisted_words(&mut response, &settings.blacklist, &settings.dont_end_with);
    response.join(" ")
}

/// Drop blacklisted words, then keep trimming the tail while it ends with a
/// word that must not end a response.
pub fn remove_blacklisted_words(words: &mut Vec<Token>, blacklist: &[String], dont_end_with: &[String]) {
    words.retain(|w| !blacklist.contains(w));
    while words.last().is_some_and(|last| dont_end_with.contains(last)) {
        words.pop();
    }
}
