//! In-process search backend.
//!
//! Evaluates the same typed query as the Elasticsearch adapter: weighted
//! best-field scoring with AUTO fuzziness over whitespace and punctuation
//! separated terms, required filter clauses matched like the lowercase
//! keyword normalizer, and the shared rank order.

use rapidfuzz::distance::levenshtein;
use std::sync::RwLock;
use std::time::Instant;
use tracing::debug;

use super::validate::same_name;
use super::{rank_order, FilterClause, Fuzziness, Hit, SearchBackend, SearchHits, SearchQuery};
use crate::error::{Error, Result};
use crate::models::{AdminLevel, SearchDocument};

#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: RwLock<Vec<SearchDocument>>,
}

impl MemoryIndex {
    pub fn with_documents(documents: Vec<SearchDocument>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    fn execute(&self, query: &SearchQuery) -> Result<SearchHits> {
        let start = Instant::now();
        let documents = self
            .documents
            .read()
            .map_err(|_| Error::Index("in-memory index lock poisoned".into()))?;

        let terms = tokenize(&query.text);
        let mut hits: Vec<Hit> = documents
            .iter()
            .filter(|doc| query.filters.iter().all(|clause| filter_matches(clause, doc)))
            .filter_map(|doc| {
                let score = score_document(query, &terms, doc);
                (score > 0.0).then(|| Hit {
                    score,
                    document: doc.clone(),
                })
            })
            .collect();

        hits.sort_by(rank_order);
        let total = hits.len() as u64;
        hits.truncate(query.size);

        debug!(
            "In-memory search '{}' matched {} of {} documents",
            query.text,
            total,
            documents.len()
        );

        Ok(SearchHits {
            hits,
            total,
            took: start.elapsed().as_millis() as u64,
        })
    }
}

impl SearchBackend for MemoryIndex {
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits> {
        self.execute(query)
    }

    async fn replace_all(&self, documents: Vec<SearchDocument>) -> Result<usize> {
        let mut stored = self
            .documents
            .write()
            .map_err(|_| Error::Index("in-memory index lock poisoned".into()))?;
        *stored = documents;
        Ok(stored.len())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Text indexed under a query field; `.fuzzy` subfields share their
/// parent's text.
fn field_text<'a>(doc: &'a SearchDocument, field: &str) -> Option<&'a str> {
    match field.strip_suffix(".fuzzy").unwrap_or(field) {
        "name" => Some(doc.name.as_str()),
        "name_ne" => doc.name_ne.as_deref(),
        "name_en" => doc.name_en.as_deref(),
        "search_text" => Some(doc.search_text.as_str()),
        _ => None,
    }
}

/// Exact term 1.0, within the edit budget 1/(1+edits), otherwise 0.
fn term_score(term: &str, token: &str, fuzziness: Fuzziness) -> f64 {
    if term == token {
        return 1.0;
    }
    let max_edits = fuzziness.max_edits(term);
    if max_edits == 0 {
        return 0.0;
    }
    let edits = levenshtein::distance(term.chars(), token.chars());
    if edits <= max_edits {
        1.0 / (1.0 + edits as f64)
    } else {
        0.0
    }
}

/// Best-field score: the highest weighted field score. A field scores the
/// sum over query terms of each term's best token match.
fn score_document(query: &SearchQuery, terms: &[String], doc: &SearchDocument) -> f64 {
    query
        .fields
        .iter()
        .filter_map(|fw| {
            let tokens = tokenize(field_text(doc, fw.field)?);
            let score: f64 = terms
                .iter()
                .map(|term| {
                    tokens
                        .iter()
                        .map(|token| term_score(term, token, query.fuzziness))
                        .fold(0.0, f64::max)
                })
                .sum();
            Some(score * fw.weight)
        })
        .fold(0.0, f64::max)
}

fn filter_matches(clause: &FilterClause, doc: &SearchDocument) -> bool {
    match clause {
        FilterClause::Ward(ward) => doc.ward == Some(*ward),
        FilterClause::Name { level, value } => {
            let (name, localized) = match level {
                AdminLevel::Province => (&doc.province, &doc.province_ne),
                AdminLevel::District => (&doc.district, &doc.district_ne),
                AdminLevel::Municipality => (&doc.municipality, &doc.municipality_ne),
                AdminLevel::Ward => return false,
            };
            [name, localized]
                .into_iter()
                .flatten()
                .any(|v| same_name(v, value))
        }
    }
}
