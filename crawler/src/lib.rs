//! Breadth-first crawler feeding the word-location index.

pub mod crawl;
pub mod fetch;

pub use crawl::{candidate_link, CrawlConfig, CrawlStats, Crawler};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
