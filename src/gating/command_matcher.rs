//! Trigger-phrase detection.
//!
//! Matching is deliberately loose: after uppercasing and collapsing runs of
//! whitespace, the phrase may appear anywhere in the body.

use crate::constants::TRIGGER_PHRASE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatcher {
    phrase: String,
}

impl Default for CommandMatcher {
    fn default() -> Self {
        Self::new(TRIGGER_PHRASE)
    }
}

impl CommandMatcher {
    /// The phrase is normalized the same way message bodies are
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: normalize_command(phrase),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn matches(&self, text: &str) -> bool {
        !self.phrase.is_empty() && normalize_command(text).contains(&self.phrase)
    }
}

/// Uppercase and collapse consecutive whitespace into single spaces
pub fn normalize_command(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_phrase_matches() {
        assert!(CommandMatcher::default().matches("SEND DATA 9213"));
    }

    #[test]
    fn case_and_spacing_variants_match() {
        let matcher = CommandMatcher::default();
        assert!(matcher.matches("  send   DATA 9213 "));
        assert!(matcher.matches("send\tdata\n9213"));
    }

    #[test]
    fn surrounding_text_still_matches() {
        let matcher = CommandMatcher::default();
        assert!(matcher.matches("hey can you send data 9213 please"));
        assert!(matcher.matches("xSEND DATA 92130"));
    }

    #[test]
    fn partial_or_split_phrase_does_not_match() {
        let matcher = CommandMatcher::default();
        assert!(!matcher.matches("send data"));
        assert!(!matcher.matches("SEND DATA 921"));
        assert!(!matcher.matches("SENDDATA 9213"));
        assert!(!matcher.matches(""));
    }

    #[test]
    fn custom_phrase_is_normalized() {
        let matcher = CommandMatcher::new("  ping   me ");
        assert_eq!(matcher.phrase(), "PING ME");
        assert!(matcher.matches("please Ping  me now"));
    }
}
