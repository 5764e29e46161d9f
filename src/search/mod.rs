//! Ranked fuzzy search with hierarchy filters and validation.

mod engine;
mod memory;
mod query;
mod validate;

use std::cmp::Ordering;
use std::future::Future;

use crate::error::Result;
use crate::models::SearchDocument;

pub use engine::{LocationResult, QueryEngine, SearchResponse};
pub use memory::MemoryIndex;
pub use query::{
    FieldWeight, FilterClause, Fuzziness, HierarchyFilters, SearchQuery, SearchRequest,
    NAME_FIELDS,
};
pub use validate::{validate_hierarchy, Mismatch, ValidationResult, UNRESOLVED};

/// A ranked hit with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub score: f64,
    pub document: SearchDocument,
}

/// Backend answer to one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub hits: Vec<Hit>,
    /// Total matches, not just the returned page
    pub total: u64,
    /// Elapsed milliseconds as reported by the backend
    pub took: u64,
}

/// Storage and execution of search documents.
pub trait SearchBackend: Send + Sync {
    /// Execute a query. Hits are ordered by score, then boost score, then
    /// document id.
    fn search(&self, query: &SearchQuery) -> impl Future<Output = Result<SearchHits>> + Send;

    /// Replace every stored document. Returns the number stored.
    fn replace_all(
        &self,
        documents: Vec<SearchDocument>,
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Whether the backend currently answers requests
    fn is_available(&self) -> impl Future<Output = bool> + Send;
}

/// Result ordering shared by every backend: relevance desc, boost desc,
/// id asc.
pub fn rank_order(a: &Hit, b: &Hit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.document.boost_score.total_cmp(&a.document.boost_score))
        .then_with(|| a.document.id.cmp(&b.document.id))
}
