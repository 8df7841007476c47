// Meowkov Engine — Seeds
//
// Sliding n-gram windows over a token sequence, plus the helpers that build
// synthetic chains for escalation.

use crate::atoms::constants::{SEPARATOR, STOP};
use crate::atoms::types::{Seed, Token};

/// `[1 2 3 4 STOP]` with chain length 2 → `[[1 2 3] [2 3 4] [3 4 STOP]]`.
///
/// Every window holds exactly `chain_length + 1` tokens; a short tail is
/// discarded rather than padded, so inputs of `chain_length` tokens or fewer
/// yield nothing.
pub fn create_seeds(words: &[Token], chain_length: usize) -> Vec<Seed> {
    words.windows(chain_length + 1).map(|w| w.to_vec()).collect()
}

/// `(A, [1 2])` → `[A 1 A 2 A]`
pub fn mutate_chain(word: &str, chain: &[Token]) -> Vec<Token> {
    let mut mutation = Vec::with_capacity(chain.len() * 2 + 1);
    mutation.push(word.to_string());
    for item in chain {
        mutation.push(item.clone());
        mutation.push(word.to_string());
    }
    mutation
}

/// Corpus key for a chain of tokens.
pub fn chain_key(chain: &[Token]) -> String {
    chain.join(SEPARATOR)
}

/// Inverse of [`chain_key`].
pub fn split_key(key: &str) -> Vec<Token> {
    key.split(SEPARATOR).map(str::to_string).collect()
}

/// Empty string or the sentinel: "no word here".
pub fn is_empty(text: &str) -> bool {
    text.is_empty() || text == STOP
}

/// No usable content: nothing at all, or a lone sentinel / empty token.
pub fn is_chain_empty(texts: &[Token]) -> bool {
    match texts {
        [] => true,
        [only] => is_empty(only),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<Token> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn seeds_of_six_words() {
        let input = words(&["1", "2", "3", "4", "5", "6"]);
        let expected = vec![
            words(&["1", "2", "3"]),
            words(&["2", "3", "4"]),
            words(&["3", "4", "5"]),
            words(&["4", "5", "6"]),
        ];
        assert_eq!(create_seeds(&input, 2), expected);
    }

    #[test]
    fn seeds_include_sentinel_window() {
        let input = words(&["1", "2", "3", "4", "5", "6", STOP]);
        let seeds = create_seeds(&input, 2);
        assert_eq!(seeds.len(), 5);
        assert_eq!(seeds[4], words(&["5", "6", STOP]));
    }

    #[test]
    fn short_input_has_no_seeds() {
        for chain_length in 1..5 {
            for len in 0..=chain_length {
                let input: Vec<Token> = (0..len).map(|i| i.to_string()).collect();
                assert!(create_seeds(&input, chain_length).is_empty());
            }
        }
    }

    #[test]
    fn seed_count_and_first_tokens() {
        for chain_length in 1..4 {
            for len in chain_length + 1..10 {
                let input: Vec<Token> = (0..len).map(|i| format!("w{}", i)).collect();
                let seeds = create_seeds(&input, chain_length);
                assert_eq!(seeds.len(), len - chain_length);
                assert!(seeds.iter().all(|s| s.len() == chain_length + 1));
                let firsts: Vec<Token> = seeds.iter().map(|s| s[0].clone()).collect();
                assert_eq!(firsts, input[..len - chain_length].to_vec());
            }
        }
    }

    #[test]
    fn mutate_interleaves_word() {
        assert_eq!(mutate_chain("A", &words(&["1", "2"])), words(&["A", "1", "A", "2", "A"]));
        assert_eq!(mutate_chain("A", &[]), words(&["A"]));
    }

    #[test]
    fn key_roundtrip() {
        let chain = words(&["a", "b"]);
        assert_eq!(chain_key(&chain), "a\x02b");
        assert_eq!(split_key("a\x02b"), chain);
    }

    #[test]
    fn emptiness() {
        assert!(is_empty(""));
        assert!(is_empty(STOP));
        assert!(!is_empty("a"));
        assert!(is_chain_empty(&[]));
        assert!(is_chain_empty(&words(&[STOP])));
        assert!(is_chain_empty(&words(&[""])));
        assert!(!is_chain_empty(&words(&["a"])));
        assert!(!is_chain_empty(&words(&["a", STOP])));
    }
}
