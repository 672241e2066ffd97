use serde::{Deserialize, Serialize};

pub type UrlId = u64;
pub type WordId = u64;
pub type LinkId = u64;

/// One occurrence of a word on a page. `location` is the ordinal of the word
/// among the page's indexed (non-stop-word) tokens, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordLocation {
    pub url_id: UrlId,
    pub word_id: WordId,
    pub location: u32,
}

/// A committed word-location fact as seen from the word side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub url_id: UrlId,
    pub location: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: UrlId,
    pub to: UrlId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMeta {
    pub created_at: String,
    pub tables: Vec<String>,
}
