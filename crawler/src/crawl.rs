use crawldex_core::StoreResult;
use crawldex_indexer::{Document, Indexer};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};
use url::Url;

use crate::Fetcher;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_body_bytes: usize,
    pub max_redirects: usize,
    /// Write discovered links and their anchor words to the link tables.
    pub record_links: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: "crawldex-bot/0.1".to_string(),
            timeout_secs: 12,
            max_body_bytes: 2 * 1024 * 1024,
            max_redirects: 5,
            record_links: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    /// Depth levels processed.
    pub levels: usize,
    pub fetched: usize,
    /// Pages newly indexed during this crawl.
    pub indexed: usize,
    /// Fetch or parse failures.
    pub failed: usize,
    /// Urls queued for a following level.
    pub discovered: usize,
}

/// Breadth-first crawler. Fetches run one at a time; staged writes are
/// committed after every depth level.
pub struct Crawler<F: Fetcher> {
    indexer: Indexer,
    fetcher: F,
    config: CrawlConfig,
}

impl<F: Fetcher> Crawler<F> {
    pub fn new(indexer: Indexer, fetcher: F, config: CrawlConfig) -> Self { Self { indexer, fetcher, config } }

    pub fn indexer(&self) -> &Indexer { &self.indexer }

    pub fn fetcher(&self) -> &F { &self.fetcher }

    pub fn into_indexer(self) -> Indexer { self.indexer }

    /// Crawl outward from `seeds` for at most `max_depth` levels.
    ///
    /// Every url is fetched at most once per call: pages that fail to fetch or
    /// parse, or yield no indexable words, are not retried until a later crawl.
    /// Store failures abort the crawl; levels committed before the failure stay.
    pub async fn crawl(&mut self, seeds: &[String], max_depth: usize) -> StoreResult<CrawlStats> {
        let mut stats = CrawlStats::default();
        let mut frontier: BTreeSet<String> = seeds.iter().cloned().collect();
        let mut attempted: HashSet<String> = HashSet::new();

        for depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }
            // Claim the whole level up front so links to pages later in it are not requeued.
            attempted.extend(frontier.iter().cloned());
            let mut next: BTreeSet<String> = BTreeSet::new();
            for page in &frontier {
                let bytes = match self.fetcher.fetch(page).await {
                    Ok(b) => b,
                    Err(err) => {
                        warn!(url = %page, error = %err, "could not fetch page");
                        stats.failed += 1;
                        continue;
                    }
                };
                stats.fetched += 1;
                self.visit(page, &bytes, &attempted, &mut next, &mut stats)?;
            }

            let written = self.indexer.commit()?;
            stats.levels += 1;
            stats.discovered += next.len();
            info!(depth, pages = frontier.len(), facts = written, next = next.len(), "level committed");
            frontier = next;
        }
        Ok(stats)
    }

    fn visit(
        &mut self,
        page: &str,
        bytes: &[u8],
        attempted: &HashSet<String>,
        next: &mut BTreeSet<String>,
        stats: &mut CrawlStats,
    ) -> StoreResult<()> {
        let document = match Document::parse(bytes) {
            Ok(d) => d,
            Err(err) => {
                warn!(url = page, error = %err, "could not parse page");
                stats.failed += 1;
                return Ok(());
            }
        };
        if self.indexer.index_page(page, &document)? {
            stats.indexed += 1;
        }

        for anchor in document.anchors() {
            let Some(url) = candidate_link(page, &anchor.href) else {
                debug!(page, href = %anchor.href, "ignoring link");
                continue;
            };
            if !attempted.contains(&url) && !self.indexer.store().is_indexed(&url)? {
                next.insert(url.clone());
            }
            if self.config.record_links {
                self.indexer.add_link_ref(page, &url, &anchor.text)?;
            }
        }
        Ok(())
    }
}

/// Resolve `href` against `page` and decide whether it may be crawled.
///
/// The fragment is removed. Links containing a single quote and links that
/// do not start with `http` are rejected.
pub fn candidate_link(page: &str, href: &str) -> Option<String> {
    let base = Url::parse(page).ok()?;
    let mut resolved = base.join(href).ok()?;
    if href.contains('\'') || resolved.as_str().contains('\'') {
        return None;
    }
    resolved.set_fragment(None);
    let url = String::from(resolved);
    url.starts_with("http").then_some(url)
}
