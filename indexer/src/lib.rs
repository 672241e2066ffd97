//! Turns parsed pages into word-location facts.
//!
//! Positions count only the tokens that are written: stop words are dropped
//! before a position is assigned, so the first non-stop word of every page is
//! at location 0.

pub mod document;

pub use document::{Anchor, Document, ParseError};

use crawldex_core::tokenizer::{is_stopword, tokenize};
use crawldex_core::{IndexStore, StoreResult};
use tracing::{debug, info};

pub struct Indexer {
    store: IndexStore,
}

impl Indexer {
    pub fn new(store: IndexStore) -> Self { Self { store } }

    pub fn store(&self) -> &IndexStore { &self.store }

    pub fn into_store(self) -> IndexStore { self.store }

    /// Index `document` under `url` unless the url is already indexed.
    ///
    /// Returns `true` if facts were staged. A store failure part way through
    /// can leave ids and staged facts for this page behind; nothing is rolled back.
    pub fn index_page(&mut self, url: &str, document: &Document) -> StoreResult<bool> {
        if self.store.is_indexed(url)? {
            debug!(url, "already indexed");
            return Ok(false);
        }
        info!(url, "indexing");

        let words = tokenize(&document.text());
        let url_id = self.store.get_or_create_url_id(url)?;

        let mut location = 0u32;
        for word in words.iter().filter(|w| !is_stopword(w)) {
            let word_id = self.store.get_or_create_word_id(word)?;
            self.store.insert_word_location(url_id, word_id, location);
            location += 1;
        }
        Ok(location > 0)
    }

    /// Record a link and the non-stop words of its anchor text.
    pub fn add_link_ref(&mut self, from: &str, to: &str, link_text: &str) -> StoreResult<()> {
        let from_id = self.store.get_or_create_url_id(from)?;
        let to_id = self.store.get_or_create_url_id(to)?;
        let link_id = self.store.add_link(from_id, to_id)?;
        for word in tokenize(link_text).iter().filter(|w| !is_stopword(w)) {
            let word_id = self.store.get_or_create_word_id(word)?;
            self.store.add_link_word(link_id, word_id)?;
        }
        Ok(())
    }

    pub fn commit(&mut self) -> StoreResult<usize> { self.store.commit() }
}
