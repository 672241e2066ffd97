use crate::{Link, LinkId, Posting, SchemaMeta, StoreError, StoreResult, UrlId, WordId, WordLocation};
use sled::transaction::{TransactionError, TransactionResult};
use sled::{Db, Transactional, Tree};
use std::collections::HashSet;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

const TABLES: &[&str] = &[
    "urllist",
    "url_ids",
    "wordlist",
    "word_ids",
    "wordlocation",
    "url_locations",
    "link",
    "link_from",
    "link_to",
    "linkwords",
];
const SCHEMA_KEY: &[u8] = b"schema";
const EMPTY: &[u8] = &[];

/// Handle over the sled database holding the index tables.
///
/// Url and word ids are written through immediately. Word-location facts are
/// staged in the handle and only become visible to readers on [`commit`],
/// which applies them to both location trees in one transaction.
///
/// [`commit`]: IndexStore::commit
pub struct IndexStore {
    db: Db,
    label: String,
    urls: Tree,
    url_ids: Tree,
    words: Tree,
    word_ids: Tree,
    locations: Tree,
    url_locations: Tree,
    links: Tree,
    links_from: Tree,
    links_to: Tree,
    link_words: Tree,
    meta: Tree,
    pending: Vec<WordLocation>,
    pending_urls: HashSet<UrlId>,
}

impl IndexStore {
    /// Create the schema in a fresh store at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let label = path.as_ref().display().to_string();
        let store = Self::with_db(sled::open(path)?, label)?;
        if store.schema()?.is_some() {
            return Err(StoreError::AlreadyInitialized(store.label));
        }
        store.create_schema()?;
        Ok(store)
    }

    /// Open a store previously initialized with [`IndexStore::create`].
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let label = path.as_ref().display().to_string();
        let store = Self::with_db(sled::open(path)?, label)?;
        if store.schema()?.is_none() {
            return Err(StoreError::Uninitialized(store.label));
        }
        Ok(store)
    }

    /// In-memory store with a fresh schema, removed when dropped.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let store = Self::with_db(db, "<temporary>".to_string())?;
        store.create_schema()?;
        Ok(store)
    }

    fn with_db(db: Db, label: String) -> StoreResult<Self> {
        Ok(Self {
            urls: db.open_tree("urllist")?,
            url_ids: db.open_tree("url_ids")?,
            words: db.open_tree("wordlist")?,
            word_ids: db.open_tree("word_ids")?,
            locations: db.open_tree("wordlocation")?,
            url_locations: db.open_tree("url_locations")?,
            links: db.open_tree("link")?,
            links_from: db.open_tree("link_from")?,
            links_to: db.open_tree("link_to")?,
            link_words: db.open_tree("linkwords")?,
            meta: db.open_tree("meta")?,
            db,
            label,
            pending: Vec::new(),
            pending_urls: HashSet::new(),
        })
    }

    fn create_schema(&self) -> StoreResult<()> {
        let meta = SchemaMeta {
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into()),
            tables: TABLES.iter().map(|t| t.to_string()).collect(),
        };
        self.meta.insert(SCHEMA_KEY, serde_json::to_vec(&meta)?)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn schema(&self) -> StoreResult<Option<SchemaMeta>> {
        match self.meta.get(SCHEMA_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_or_create_url_id(&self, url: &str) -> StoreResult<UrlId> {
        self.intern(&self.url_ids, &self.urls, "url_ids", url)
    }

    pub fn get_or_create_word_id(&self, word: &str) -> StoreResult<WordId> {
        self.intern(&self.word_ids, &self.words, "word_ids", word)
    }

    pub fn url_id(&self, url: &str) -> StoreResult<Option<UrlId>> {
        lookup_id(&self.url_ids, "url_ids", url)
    }

    /// `None` when the word has never been indexed.
    pub fn word_id(&self, word: &str) -> StoreResult<Option<WordId>> {
        lookup_id(&self.word_ids, "word_ids", word)
    }

    pub fn url_by_id(&self, id: UrlId) -> StoreResult<String> {
        let raw = self.urls.get(id.to_be_bytes())?.ok_or(StoreError::MissingUrl(id))?;
        String::from_utf8(raw.to_vec()).map_err(|e| StoreError::corrupt("urllist", e.to_string()))
    }

    /// A url counts as indexed only if it has an id and at least one
    /// word-location fact, committed or staged in this handle.
    pub fn is_indexed(&self, url: &str) -> StoreResult<bool> {
        let Some(url_id) = self.url_id(url)? else {
            return Ok(false);
        };
        if self.pending_urls.contains(&url_id) {
            return Ok(true);
        }
        Ok(self.url_locations.scan_prefix(url_id.to_be_bytes()).next().transpose()?.is_some())
    }

    pub fn insert_word_location(&mut self, url_id: UrlId, word_id: WordId, location: u32) {
        self.pending.push(WordLocation { url_id, word_id, location });
        self.pending_urls.insert(url_id);
    }

    pub fn pending_len(&self) -> usize { self.pending.len() }

    /// Committed occurrences of `word_id`, ordered by url id then location.
    pub fn postings(&self, word_id: WordId) -> StoreResult<Vec<Posting>> {
        let mut out = Vec::new();
        for item in self.locations.scan_prefix(word_id.to_be_bytes()) {
            let (key, _) = item?;
            out.push(Posting {
                url_id: read_u64("wordlocation", &key, 8)?,
                location: read_u32("wordlocation", &key, 16)?,
            });
        }
        Ok(out)
    }

    /// Committed facts for one page, ordered by word id then location.
    pub fn locations_for_url(&self, url_id: UrlId) -> StoreResult<Vec<WordLocation>> {
        let mut out = Vec::new();
        for item in self.url_locations.scan_prefix(url_id.to_be_bytes()) {
            let (key, _) = item?;
            out.push(WordLocation {
                url_id,
                word_id: read_u64("url_locations", &key, 8)?,
                location: read_u32("url_locations", &key, 16)?,
            });
        }
        Ok(out)
    }

    pub fn location_count(&self) -> usize { self.locations.len() }

    pub fn add_link(&self, from: UrlId, to: UrlId) -> StoreResult<LinkId> {
        let link_id = self.db.generate_id()?;
        self.links.insert(link_id.to_be_bytes(), bincode::serialize(&Link { from, to })?)?;
        self.links_from.insert(pair_key(from, link_id), EMPTY)?;
        self.links_to.insert(pair_key(to, link_id), EMPTY)?;
        Ok(link_id)
    }

    pub fn add_link_word(&self, link_id: LinkId, word_id: WordId) -> StoreResult<()> {
        self.link_words.insert(pair_key(word_id, link_id), EMPTY)?;
        Ok(())
    }

    pub fn links_from(&self, url_id: UrlId) -> StoreResult<Vec<Link>> {
        let mut out = Vec::new();
        for item in self.links_from.scan_prefix(url_id.to_be_bytes()) {
            let (key, _) = item?;
            let link_id = read_u64("link_from", &key, 8)?;
            let raw = self
                .links
                .get(link_id.to_be_bytes())?
                .ok_or_else(|| StoreError::corrupt("link", format!("dangling link id {link_id}")))?;
            out.push(bincode::deserialize(&raw)?);
        }
        Ok(out)
    }

    /// Number of recorded links whose anchor text contains `word_id`.
    pub fn link_word_count(&self, word_id: WordId) -> StoreResult<usize> {
        let mut n = 0;
        for item in self.link_words.scan_prefix(word_id.to_be_bytes()) {
            item?;
            n += 1;
        }
        Ok(n)
    }

    /// Apply staged word-location facts atomically and flush to disk.
    /// Returns the number of facts written.
    pub fn commit(&mut self) -> StoreResult<usize> {
        let pending = &self.pending;
        let applied: TransactionResult<(), ()> =
            (&self.locations, &self.url_locations).transaction(|(locations, url_locations)| {
                for fact in pending {
                    locations.insert(location_key(fact.word_id, fact.url_id, fact.location), EMPTY)?;
                    url_locations.insert(location_key(fact.url_id, fact.word_id, fact.location), EMPTY)?;
                }
                Ok(())
            });
        applied.map_err(|err| match err {
            TransactionError::Abort(()) => StoreError::Aborted,
            TransactionError::Storage(e) => StoreError::Sled(e),
        })?;
        self.db.flush()?;

        let written = self.pending.len();
        self.pending.clear();
        self.pending_urls.clear();
        debug!(store = %self.label, facts = written, "committed word locations");
        Ok(written)
    }

    /// Flush and release the store. Staged facts that were never committed are dropped.
    pub fn close(self) -> StoreResult<()> {
        if !self.pending.is_empty() {
            warn!(store = %self.label, facts = self.pending.len(), "closing with uncommitted word locations");
        }
        self.db.flush()?;
        Ok(())
    }

    fn intern(&self, ids: &Tree, rows: &Tree, tree: &'static str, value: &str) -> StoreResult<u64> {
        if let Some(id) = lookup_id(ids, tree, value)? {
            return Ok(id);
        }
        let id = self.db.generate_id()?;
        rows.insert(id.to_be_bytes(), value.as_bytes())?;
        ids.insert(value.as_bytes(), id.to_be_bytes().to_vec())?;
        Ok(id)
    }
}

fn lookup_id(ids: &Tree, tree: &'static str, value: &str) -> StoreResult<Option<u64>> {
    match ids.get(value.as_bytes())? {
        Some(raw) => Ok(Some(read_u64(tree, &raw, 0)?)),
        None => Ok(None),
    }
}

fn pair_key(first: u64, second: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&first.to_be_bytes());
    key.extend_from_slice(&second.to_be_bytes());
    key
}

fn location_key(first: u64, second: u64, location: u32) -> Vec<u8> {
    let mut key = pair_key(first, second);
    key.extend_from_slice(&location.to_be_bytes());
    key
}

fn read_u64(tree: &'static str, bytes: &[u8], at: usize) -> StoreResult<u64> {
    bytes
        .get(at..at + 8)
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| StoreError::corrupt(tree, format!("short key of {} bytes", bytes.len())))
}

fn read_u32(tree: &'static str, bytes: &[u8], at: usize) -> StoreResult<u32> {
    bytes
        .get(at..at + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| StoreError::corrupt(tree, format!("short key of {} bytes", bytes.len())))
}
