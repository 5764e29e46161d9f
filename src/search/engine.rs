//! Request-time pipeline: build the query, execute it under a deadline,
//! map hits and validate the top result.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{validate_hierarchy, SearchBackend, SearchQuery, SearchRequest, ValidationResult};
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::models::{GeoPoint, PlaceCategory, SearchDocument};

/// One ranked location as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationResult {
    pub id: String,
    pub entity_type: PlaceCategory,
    pub name: String,
    pub name_ne: Option<String>,
    pub name_en: Option<String>,
    pub place_type: Option<String>,
    pub admin_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub ward: Option<u32>,
    pub municipality: Option<String>,
    pub municipality_ne: Option<String>,
    pub district: Option<String>,
    pub district_ne: Option<String>,
    pub province: Option<String>,
    pub province_ne: Option<String>,
    pub country: String,
    pub boost_score: f64,
    /// Relevance score from the index
    pub score: f64,
}

impl LocationResult {
    fn from_document(doc: SearchDocument, score: f64) -> Self {
        Self {
            id: doc.id,
            entity_type: doc.entity_type,
            name: doc.name,
            name_ne: doc.name_ne,
            name_en: doc.name_en,
            place_type: doc.place_type,
            admin_level: doc.admin_level,
            location: doc.location,
            ward: doc.ward,
            municipality: doc.municipality,
            municipality_ne: doc.municipality_ne,
            district: doc.district,
            district_ne: doc.district_ne,
            province: doc.province,
            province_ne: doc.province_ne,
            country: doc.country,
            boost_score: doc.boost_score,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<LocationResult>,
    pub total: u64,
    /// Milliseconds spent in the index
    pub took: u64,
    /// Absent when the request carried no hierarchy filter
    pub validation: Option<ValidationResult>,
}

/// Stateless per request; the backend is the only shared resource.
pub struct QueryEngine<B> {
    backend: B,
    config: SearchConfig,
}

impl<B: SearchBackend> QueryEngine<B> {
    pub fn new(backend: B, config: SearchConfig) -> Self {
        Self { backend, config }
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let query = SearchQuery::build(&request, &self.config)?;
        debug!(
            "Searching '{}' (size {}, {} filters)",
            query.text,
            query.size,
            query.filters.len()
        );

        let deadline = Duration::from_millis(query.timeout_ms);
        let hits = match tokio::time::timeout(deadline, self.backend.search(&query)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(Error::Timeout(_))) | Err(_) => return Err(Error::Timeout(query.timeout_ms)),
            Ok(Err(e)) => return Err(e),
        };

        let (documents, scores): (Vec<SearchDocument>, Vec<f64>) = hits
            .hits
            .into_iter()
            .map(|hit| (hit.document, hit.score))
            .unzip();

        let validation = validate_hierarchy(&request.filters, &documents);
        if let Some(v) = &validation {
            debug!("Validation for '{}': valid={} ({} mismatches)", query.text, v.valid, v.mismatches.len());
        }

        let results: Vec<LocationResult> = documents
            .into_iter()
            .zip(scores)
            .map(|(doc, score)| LocationResult::from_document(doc, score))
            .collect();

        info!(
            "Search '{}' returned {} of {} results in {}ms",
            query.text,
            results.len(),
            hits.total,
            hits.took
        );

        Ok(SearchResponse {
            results,
            total: hits.total,
            took: hits.took,
            validation,
        })
    }

    pub async fn is_healthy(&self) -> bool {
        self.backend.is_available().await
    }
}
