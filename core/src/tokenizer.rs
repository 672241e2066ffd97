use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref SPLITTER: Regex = Regex::new(r"\W+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &["the", "of", "to", "and", "a", "in", "is", "it"];
        words.iter().copied().collect()
    };
}

/// True for words that are never written to the word-location table.
pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Split text on runs of non-word characters and lowercase each fragment.
///
/// Stop words are kept here; the indexer decides what to drop. There is no
/// length or plausibility filter, so `"zkjgowo2"` or `"2024"` come back as tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    SPLITTER
        .split(text)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Apple, banana; APPLE!");
        assert_eq!(t, vec!["apple", "banana", "apple"]);
    }

    #[test]
    fn stopwords_are_a_fixed_set() {
        for w in ["the", "of", "to", "and", "a", "in", "is", "it"] {
            assert!(is_stopword(w));
        }
        assert!(!is_stopword("apple"));
        assert!(!is_stopword("The"));
    }
}
