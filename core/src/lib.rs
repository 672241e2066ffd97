//! Word-location inverted index over sled, plus the tokenizer and the
//! frequency/location query engine that read and write it.

pub mod error;
pub mod index;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use error::{StoreError, StoreResult};
pub use index::{Link, LinkId, Posting, SchemaMeta, UrlId, WordId, WordLocation};
pub use search::{MatchRow, SearchHit, Searcher};
pub use store::IndexStore;
