use crate::{IndexStore, StoreResult, UrlId, WordId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const FREQUENCY_WEIGHT: f64 = 1.0;
const LOCATION_WEIGHT: f64 = 1.5;
/// Floor for divisors when normalizing scores.
const VSMALL: f64 = 0.00001;

/// One combination of occurrence positions, one per surviving query term,
/// on a page that contains all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    pub url_id: UrlId,
    pub locations: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: f64,
    pub url: String,
}

/// Read side of the index: multi-word AND matching ranked by word frequency
/// and word position.
pub struct Searcher {
    store: IndexStore,
}

impl Searcher {
    pub fn new(store: IndexStore) -> Self { Self { store } }

    pub fn store(&self) -> &IndexStore { &self.store }

    pub fn into_store(self) -> IndexStore { self.store }

    /// Join the postings of every known query word on url.
    ///
    /// The query is split on single spaces. Words with no postings are dropped;
    /// a page with several occurrences of a word yields one row per combination.
    /// Rows are built in memory: a page contributes the product of its per-term
    /// occurrence counts, so long queries over repetitive pages grow quickly.
    pub fn match_rows(&self, query: &str) -> StoreResult<(Vec<MatchRow>, Vec<WordId>)> {
        let mut word_ids = Vec::new();
        let mut per_term: Vec<BTreeMap<UrlId, Vec<u32>>> = Vec::new();
        for term in query.split(' ') {
            let Some(word_id) = self.store.word_id(term)? else {
                debug!(term, "no rows for query term");
                continue;
            };
            let mut by_url: BTreeMap<UrlId, Vec<u32>> = BTreeMap::new();
            for p in self.store.postings(word_id)? {
                by_url.entry(p.url_id).or_default().push(p.location);
            }
            word_ids.push(word_id);
            per_term.push(by_url);
        }

        let Some((first, rest)) = per_term.split_first() else {
            return Ok((Vec::new(), word_ids));
        };

        let mut rows = Vec::new();
        for url_id in first.keys() {
            if !rest.iter().all(|t| t.contains_key(url_id)) {
                continue;
            }
            let mut combos: Vec<Vec<u32>> = vec![Vec::new()];
            for term in &per_term {
                let locs = &term[url_id];
                combos = combos
                    .iter()
                    .flat_map(|prefix| {
                        locs.iter().map(move |&l| {
                            let mut next = prefix.clone();
                            next.push(l);
                            next
                        })
                    })
                    .collect();
            }
            rows.extend(combos.into_iter().map(|locations| MatchRow { url_id: *url_id, locations }));
        }
        Ok((rows, word_ids))
    }

    /// Weighted sum of the normalized frequency and location scores per url.
    pub fn scored_list(&self, rows: &[MatchRow], _word_ids: &[WordId]) -> HashMap<UrlId, f64> {
        let mut total: HashMap<UrlId, f64> = rows.iter().map(|r| (r.url_id, 0.0)).collect();
        let weights = [
            (FREQUENCY_WEIGHT, frequency_score(rows)),
            (LOCATION_WEIGHT, location_score(rows)),
        ];
        for (weight, scores) in &weights {
            for (url_id, score) in total.iter_mut() {
                *score += weight * scores.get(url_id).copied().unwrap_or(0.0);
            }
        }
        total
    }

    /// Top `top_n` pages for `q`, best first. Equal scores fall back to url id order.
    pub fn query(&self, q: &str, top_n: usize) -> StoreResult<Vec<SearchHit>> {
        let (rows, word_ids) = self.match_rows(q)?;
        let scores = self.scored_list(&rows, &word_ids);

        let mut ranked: Vec<(UrlId, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });

        ranked
            .into_iter()
            .take(top_n)
            .map(|(url_id, score)| Ok(SearchHit { score, url: self.store.url_by_id(url_id)? }))
            .collect()
    }

    pub fn feeling_lucky(&self, q: &str) -> StoreResult<Option<SearchHit>> {
        Ok(self.query(q, 1)?.into_iter().next())
    }
}

/// Rows per url divided by the largest row count.
pub fn frequency_score(rows: &[MatchRow]) -> HashMap<UrlId, f64> {
    let mut counts: HashMap<UrlId, f64> = HashMap::new();
    for row in rows {
        *counts.entry(row.url_id).or_insert(0.0) += 1.0;
    }
    normalize_scores(counts, false)
}

/// Smallest sum of positions per url; earlier words score higher.
pub fn location_score(rows: &[MatchRow]) -> HashMap<UrlId, f64> {
    let mut best: HashMap<UrlId, f64> = HashMap::new();
    for row in rows {
        let sum: f64 = row.locations.iter().map(|&l| l as f64).sum();
        best.entry(row.url_id)
            .and_modify(|b| {
                if sum < *b {
                    *b = sum
                }
            })
            .or_insert(sum);
    }
    normalize_scores(best, true)
}

/// Map raw scores into [0, 1]. With `small_is_better` each url gets
/// `min / score`, otherwise `score / max`.
pub fn normalize_scores(scores: HashMap<UrlId, f64>, small_is_better: bool) -> HashMap<UrlId, f64> {
    if small_is_better {
        let min = scores.values().copied().fold(f64::INFINITY, f64::min);
        scores.into_iter().map(|(url, s)| (url, min / s.max(VSMALL))).collect()
    } else {
        let mut max = scores.values().copied().fold(0.0, f64::max);
        if max == 0.0 {
            max = VSMALL;
        }
        scores.into_iter().map(|(url, s)| (url, s / max)).collect()
    }
}
