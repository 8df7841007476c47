// Meowkov Engine — Input Normalizer
//
// Turns one raw chat line into the token sequence the corpus is built from.
// The goal is a uniform corpus: "Foo", "foo?" and "(foo)" must all land on the
// same chain key instead of forming three sparse clusters.

use crate::atoms::constants::STOP;
use crate::atoms::types::Token;
use regex::Regex;
use std::sync::LazyLock;

/// "alice: …", "bob, …": a message addressed to someone at the very start.
static OTHER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\S+[:,]+\s+").expect("static regex"));

/// HTTP(S) links are stored verbatim.
static HTTP_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^/]").expect("static regex"));

/// Leading quotes/brackets and trailing quotes/brackets/?! around a core that
/// contains none of the closing characters. Semicolons and commas are kept.
static TEXT_CRUFT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^["'(\[“„”‘’«»]*([^"'?!)\]“„”‘’«»]+)["'?!)\]“„”‘’«»]*$"#).expect("static regex")
});

/// Emoticons such as `:-(((`, `;[[`, `:'d`, `:-pppp` (input is already lowercase).
static EMOTICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[:;=][-'"^o]*[()\[\]<>{}|\\/dpo3*@$x]+$"#).expect("static regex")
});

/// What is left of `:)`, `:-]` or `(:` once the brackets are stripped.
static EMOTICON_EYES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[:;=][-'"^o]*$"#).expect("static regex"));

/// Normalize a raw message into tokens terminated by the [`STOP`] sentinel.
///
/// A leading "nick: " / "nick, " prefix is dropped no matter whose nick it is,
/// so neither the bot's name nor anyone else's becomes part of the corpus when
/// used as an addressee. Names elsewhere in the line are ordinary words.
pub fn normalize(message: &str) -> Vec<Token> {
    let message = OTHER_MENTION.replace(message, "");

    let mut words: Vec<Token> = message
        .split(' ')
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect();

    words.push(STOP.to_string());
    words
}

/// Normalize a single whitespace-delimited token. May return an empty string.
pub fn normalize_word(word: &str) -> Token {
    let word = word.trim();
    if HTTP_LINK.is_match(word) {
        return word.to_string();
    }

    let lower = word.to_lowercase();
    if EMOTICON.is_match(&lower) {
        return String::new();
    }
    let stripped = TEXT_CRUFT.replace(&lower, "$1");
    if EMOTICON.is_match(&stripped) || EMOTICON_EYES.is_match(&stripped) {
        return String::new();
    }
    stripped.into_owned()
}

/// Detects the bot being addressed anywhere in a message, tolerating
/// decorations like `_nick_:` that some clients add.
#[derive(Debug, Clone)]
pub struct MentionDetector {
    nick: String,
    pattern: Regex,
}

impl MentionDetector {
    pub fn new(nick: &str) -> Self {
        let pattern = Regex::new(&format!(r"(?i)_*{}_*[:,]*\s*", regex::escape(nick)))
            .expect("escaped nick is a valid regex");
        Self { nick: nick.to_string(), pattern }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn is_mentioned(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<Token> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_message() {
        assert_eq!(normalize("1 2 3"), words(&["1", "2", "3", STOP]));
    }

    #[test]
    fn repeated_spaces_are_dropped() {
        assert_eq!(normalize("1  2   3"), words(&["1", "2", "3", STOP]));
    }

    #[test]
    fn empty_message_still_has_sentinel() {
        assert_eq!(normalize(""), words(&[STOP]));
        assert_eq!(normalize(":-( ;[["), words(&[STOP]));
    }

    #[test]
    fn leading_mention_is_removed() {
        assert_eq!(normalize("meowkov: 1 2 3"), words(&["1", "2", "3", STOP]));
        assert_eq!(normalize("meowkov, 1 2 3"), words(&["1", "2", "3", STOP]));
        assert_eq!(normalize("alice: hello"), words(&["hello", STOP]));
        assert_eq!(normalize("bot: hello there"), words(&["hello", "there", STOP]));
    }

    #[test]
    fn only_first_mention_is_removed() {
        assert_eq!(normalize("meowkov: look: 2 3"), words(&["look:", "2", "3", STOP]));
        assert_eq!(normalize("meowkov, look: 2 3"), words(&["look:", "2", "3", STOP]));
    }

    #[test]
    fn mention_in_the_middle_is_kept() {
        assert_eq!(normalize("1 meowkov 2 3"), words(&["1", "meowkov", "2", "3", STOP]));
    }

    #[test]
    fn urls_keep_case() {
        assert_eq!(
            normalize("PlAy PiAno https://yt.aergia.eu/#v=T0rs3R4E1Sk&t=23;30"),
            words(&["play", "piano", "https://yt.aergia.eu/#v=T0rs3R4E1Sk&t=23;30", STOP])
        );
        assert_eq!(
            normalize("HTTPS://Example.com/X?y=1"),
            words(&["HTTPS://Example.com/X?y=1", STOP])
        );
    }

    #[test]
    fn word_case_and_spaces() {
        assert_eq!(normalize_word(" CaSe "), "case");
        assert_eq!(
            normalize_word("  https://yt.aergia.eu/#v=T0rs3R4E1Sk&t=23;3 "),
            "https://yt.aergia.eu/#v=T0rs3R4E1Sk&t=23;3"
        );
    }

    #[test]
    fn word_quotes() {
        assert_eq!(normalize_word(" \"foo"), "foo");
        assert_eq!(normalize_word(" foo\" "), "foo");
        assert_eq!(normalize_word(" \"foo\" "), "foo");
        assert_eq!(normalize_word(" f\"oo "), "f\"oo");
        assert_eq!(normalize_word(" 'foo"), "foo");
        assert_eq!(normalize_word(" foo' "), "foo");
        assert_eq!(normalize_word(" 'foo' "), "foo");
        assert_eq!(normalize_word(" f'oo "), "f'oo");
        assert_eq!(normalize_word(" “foo” "), "foo");
        assert_eq!(normalize_word(" „foo” "), "foo");
    }

    #[test]
    fn word_brackets() {
        assert_eq!(normalize_word(" (foo)"), "foo");
        assert_eq!(normalize_word(" (foo "), "foo");
        assert_eq!(normalize_word(" foo) "), "foo");
        assert_eq!(normalize_word(" f(oo "), "f(oo");
        assert_eq!(normalize_word(" [foo]"), "foo");
        assert_eq!(normalize_word(" [foo "), "foo");
        assert_eq!(normalize_word(" foo] "), "foo");
        assert_eq!(normalize_word(" f[oo "), "f[oo");
    }

    #[test]
    fn word_trailing_punctuation() {
        assert_eq!(normalize_word(" foo? "), "foo");
        assert_eq!(normalize_word(" foo! "), "foo");
        assert_eq!(normalize_word(" foo!?!?!? "), "foo");
        assert_eq!(normalize_word(" foo!?bar "), "foo!?bar");
        assert_eq!(normalize_word("foo,"), "foo,");
        assert_eq!(normalize_word("foo;"), "foo;");
    }

    #[test]
    fn word_emoticons() {
        for e in [":-((((((", ":(((", ";[[", ":-^-<", ":\"<", ";'<", ":'D", ":-Pppp"] {
            assert_eq!(normalize_word(e), "", "emoticon {:?} survived", e);
        }
    }

    #[test]
    fn common_smileys_vanish() {
        for e in [":)", ":-)", ";)", ":]", ":-]", "(:", "=)", ":))"] {
            assert_eq!(normalize_word(e), "", "emoticon {:?} survived", e);
        }
        assert_eq!(normalize("hi :) there :-)"), words(&["hi", "there", STOP]));
        assert_eq!(normalize_word("look:"), "look:");
    }

    #[test]
    fn normalizing_twice_is_stable() {
        for w in ["case", "f\"oo", "foo!?bar", "look:", "zażółć", "foo,"] {
            assert_eq!(normalize_word(&normalize_word(w)), normalize_word(w));
        }
    }

    #[test]
    fn mention_detector() {
        let m = MentionDetector::new("meowkov");
        assert!(m.is_mentioned("hey meowkov what's up"));
        assert!(m.is_mentioned("_MEOWKOV_: hi"));
        assert!(!m.is_mentioned("hey there"));
        assert_eq!(m.nick(), "meowkov");
    }
}
