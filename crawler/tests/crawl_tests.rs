use async_trait::async_trait;
use crawldex_core::{IndexStore, Searcher};
use crawldex_crawler::{CrawlConfig, Crawler, FetchError, Fetcher};
use crawldex_indexer::Indexer;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory web: url -> HTML body. Unknown urls answer 404.
#[derive(Default)]
struct StaticWeb {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl StaticWeb {
    fn with(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    fn fetch_count(&self, url: &str) -> usize { self.fetched.lock().iter().filter(|u| *u == url).count() }
}

#[async_trait]
impl Fetcher for StaticWeb {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetched.lock().push(url.to_string());
        self.pages
            .get(url)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| FetchError::Status { url: url.to_string(), status: 404 })
    }
}

fn crawler(web: StaticWeb) -> Crawler<StaticWeb> {
    Crawler::new(Indexer::new(IndexStore::temporary().unwrap()), web, CrawlConfig::default())
}

fn seeds(urls: &[&str]) -> Vec<String> { urls.iter().map(|u| u.to_string()).collect() }

const A: &str = "http://example.test/a";
const B: &str = "http://example.test/b";

#[tokio::test]
async fn single_page_is_indexed_and_searchable() {
    let web = StaticWeb::default().with(A, "<html><body>apple banana apple</body></html>");
    let mut c = crawler(web);
    let stats = c.crawl(&seeds(&[A]), 1).await.unwrap();
    assert_eq!(stats.levels, 1);
    assert_eq!(stats.indexed, 1);

    let store = c.into_indexer().into_store();
    let url_id = store.url_id(A).unwrap().unwrap();
    let apple = store.word_id("apple").unwrap().unwrap();
    let banana = store.word_id("banana").unwrap().unwrap();
    let mut facts: Vec<(u64, u32)> =
        store.locations_for_url(url_id).unwrap().into_iter().map(|f| (f.word_id, f.location)).collect();
    facts.sort_by_key(|f| f.1);
    assert_eq!(facts, vec![(apple, 0), (banana, 1), (apple, 2)]);

    let searcher = Searcher::new(store);
    let (rows, _) = searcher.match_rows("apple").unwrap();
    assert_eq!(rows.len(), 2);
    let hits = searcher.query("apple", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, A);
    assert!((hits[0].score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_words_give_empty_results() {
    let web = StaticWeb::default().with(A, "<p>apple</p>");
    let mut c = crawler(web);
    c.crawl(&seeds(&[A]), 1).await.unwrap();
    let searcher = Searcher::new(c.into_indexer().into_store());
    assert!(searcher.query("durian", 10).unwrap().is_empty());
    assert!(searcher.feeling_lucky("durian").unwrap().is_none());
}

#[tokio::test]
async fn pages_linking_to_each_other_are_indexed_once() {
    let web = StaticWeb::default()
        .with(A, r#"<body>alpha <a href="/b">to bravo</a></body>"#)
        .with(B, r#"<body>beta <a href="/a#top">to alpha</a></body>"#);
    let mut c = crawler(web);
    let stats = c.crawl(&seeds(&[A, B]), 2).await.unwrap();
    assert_eq!(stats.indexed, 2);
    assert_eq!(c.fetcher().fetch_count(A), 1);
    assert_eq!(c.fetcher().fetch_count(B), 1);

    let store = c.indexer().store();
    for url in [A, B] {
        let url_id = store.url_id(url).unwrap().unwrap();
        // page word plus anchor word; "to" is a stop word
        assert_eq!(store.locations_for_url(url_id).unwrap().len(), 2);
    }
    assert_eq!(store.location_count(), 4);
}

#[tokio::test]
async fn urls_are_tried_once_per_crawl() {
    let c_url = "http://example.test/c";
    let down = "http://example.test/down";
    let hollow = "http://example.test/hollow";
    let web = StaticWeb::default()
        .with(A, r#"<body>start <a href="/c">onward</a> <a href="/hollow">hollow</a></body>"#)
        .with(c_url, r#"<body>middle <a href="/down">down</a> <a href="/hollow">again</a></body>"#)
        .with(hollow, r#"<body>the <a href="/hollow">the</a></body>"#);
    let mut c = crawler(web);
    let stats = c.crawl(&seeds(&[A, down, hollow]), 3).await.unwrap();

    assert_eq!(c.fetcher().fetch_count(down), 1);
    assert_eq!(c.fetcher().fetch_count(hollow), 1);
    assert_eq!(c.fetcher().fetch_count(c_url), 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.indexed, 2);
    assert!(!c.indexer().store().is_indexed(hollow).unwrap());

    // a later crawl may try them again
    c.crawl(&seeds(&[hollow]), 1).await.unwrap();
    assert_eq!(c.fetcher().fetch_count(hollow), 2);
}

#[tokio::test]
async fn unparseable_pages_are_skipped() {
    let blank = "http://example.test/blank";
    let web = StaticWeb::default()
        .with(A, r#"<body>solid <a href="/blank">blank</a> <a href="/b">next</a></body>"#)
        .with(blank, "  \n ")
        .with(B, "<p>beta</p>");
    let mut c = crawler(web);
    let stats = c.crawl(&seeds(&[A]), 2).await.unwrap();

    assert_eq!(stats.fetched, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.indexed, 2);
    let store = c.indexer().store();
    assert!(store.is_indexed(A).unwrap());
    assert!(store.is_indexed(B).unwrap());
    assert!(!store.is_indexed(blank).unwrap());
}

#[tokio::test]
async fn quoted_hrefs_never_reach_the_frontier() {
    let quoted = "http://example.test/it's";
    let web = StaticWeb::default()
        .with(A, r#"<body>start <a href="/it's">quoted</a> <a href="/b">plain</a></body>"#)
        .with(quoted, "<p>never</p>")
        .with(B, "<p>beta</p>");
    let mut c = crawler(web);
    let stats = c.crawl(&seeds(&[A]), 3).await.unwrap();

    assert_eq!(c.fetcher().fetch_count(quoted), 0);
    assert_eq!(c.fetcher().fetch_count(B), 1);
    assert_eq!(stats.indexed, 2);
    assert!(c.indexer().store().word_id("never").unwrap().is_none());
}

#[tokio::test]
async fn depth_bounds_the_crawl() {
    let web = StaticWeb::default()
        .with(A, r#"<body>one <a href="/b">next</a></body>"#)
        .with(B, r#"<body>two <a href="/c">next</a></body>"#)
        .with("http://example.test/c", "<body>three</body>");

    let mut c = crawler(web);
    let stats = c.crawl(&seeds(&[A]), 0).await.unwrap();
    assert_eq!(stats, Default::default());
    assert_eq!(c.indexer().store().location_count(), 0);

    let stats = c.crawl(&seeds(&[A]), 2).await.unwrap();
    assert_eq!(stats.levels, 2);
    assert_eq!(stats.indexed, 2);
    assert_eq!(c.fetcher().fetch_count("http://example.test/c"), 0);
    assert!(c.indexer().store().is_indexed(B).unwrap());
    assert!(!c.indexer().store().is_indexed("http://example.test/c").unwrap());
}

#[tokio::test]
async fn fetch_failures_are_skipped() {
    let web = StaticWeb::default().with(A, r#"<body>alive <a href="/gone">gone</a></body>"#);
    let mut c = crawler(web);
    let stats = c.crawl(&seeds(&["http://example.test/missing", A]), 2).await.unwrap();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.indexed, 1);
    assert_eq!(c.fetcher().fetch_count("http://example.test/missing"), 1);
}

#[tokio::test]
async fn links_are_recorded_when_enabled() {
    let web = StaticWeb::default().with(A, r#"<body>home <a href="/b">beta page</a></body>"#);
    let config = CrawlConfig { record_links: true, ..CrawlConfig::default() };
    let mut c = Crawler::new(Indexer::new(IndexStore::temporary().unwrap()), web, config);
    c.crawl(&seeds(&[A]), 1).await.unwrap();

    let store = c.indexer().store();
    let a = store.url_id(A).unwrap().unwrap();
    let links = store.links_from(a).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(store.url_by_id(links[0].to).unwrap(), B);
    let page = store.word_id("page").unwrap().unwrap();
    assert_eq!(store.link_word_count(page).unwrap(), 1);
}
