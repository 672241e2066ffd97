use thiserror::Error;

use crate::UrlId;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence failures. These are never recovered inside the crate; they abort
/// the crawl, index or query call that hit them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store error: {0}")]
    Sled(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("schema record error: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("store at {0} has no schema; run `indexer init` first")]
    Uninitialized(String),

    #[error("store at {0} already has a schema")]
    AlreadyInitialized(String),

    #[error("no url with id {0}")]
    MissingUrl(UrlId),

    #[error("corrupt {tree} entry: {message}")]
    Corrupt { tree: &'static str, message: String },

    #[error("commit aborted")]
    Aborted,
}

impl StoreError {
    pub fn corrupt(tree: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupt { tree, message: message.into() }
    }
}
