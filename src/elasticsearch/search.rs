//! Elasticsearch implementation of the search backend.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{create_index, BulkIndexer, EsClient};
use crate::error::{Error, Result};
use crate::models::SearchDocument;
use crate::search::{FilterClause, Hit, SearchBackend, SearchHits, SearchQuery};

/// Search backend over one Elasticsearch index
#[derive(Clone)]
pub struct EsBackend {
    client: EsClient,
    batch_size: usize,
}

impl EsBackend {
    pub fn new(client: EsClient, batch_size: usize) -> Self {
        Self { client, batch_size }
    }

    pub fn client(&self) -> &EsClient {
        &self.client
    }
}

/// Render the typed query as a search request body. `track_scores` keeps
/// hit scores populated under the explicit sort.
pub(crate) fn render_query(query: &SearchQuery) -> Value {
    let fields: Vec<String> = query.fields.iter().map(|f| f.boosted()).collect();

    let mut must = vec![json!({
        "multi_match": {
            "query": &query.text,
            "fields": fields,
            "type": "best_fields",
            "fuzziness": query.fuzziness.as_str()
        }
    })];

    for clause in &query.filters {
        must.push(match clause {
            FilterClause::Ward(ward) => json!({ "term": { "ward": ward } }),
            FilterClause::Name { level, value } => json!({
                "multi_match": {
                    "query": value,
                    "fields": FilterClause::keyword_fields(*level)
                }
            }),
        });
    }

    json!({
        "query": { "bool": { "must": must } },
        "sort": [
            { "_score": { "order": "desc" } },
            { "boost_score": { "order": "desc" } },
            { "id": { "order": "asc" } }
        ],
        "size": query.size,
        "track_scores": true,
        "track_total_hits": true,
        "timeout": format!("{}ms", query.timeout_ms)
    })
}

#[derive(Debug, Deserialize)]
struct EsSearchResponse {
    took: u64,
    #[serde(default)]
    timed_out: bool,
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    total: EsTotal,
    hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
struct EsTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: SearchDocument,
}

/// Parse a search response body. A partial (timed out) answer is an
/// error, never a short result list.
fn parse_response(body: Value, timeout_ms: u64) -> Result<SearchHits> {
    let response: EsSearchResponse = serde_json::from_value(body)
        .map_err(|e| Error::Index(format!("unexpected search response: {e}")))?;

    if response.timed_out {
        return Err(Error::Timeout(timeout_ms));
    }

    Ok(SearchHits {
        hits: response
            .hits
            .hits
            .into_iter()
            .map(|hit| Hit {
                score: hit.score.unwrap_or(0.0),
                document: hit.source,
            })
            .collect(),
        total: response.hits.total.value,
        took: response.took,
    })
}

impl SearchBackend for EsBackend {
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits> {
        let body = render_query(query);
        debug!("Search query: {}", body);

        let response = self
            .client
            .client()
            .search(elasticsearch::SearchParts::Index(&[&self.client.index_name]))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Index(format!("search returned {status}: {text}")));
        }

        parse_response(response.json::<Value>().await?, query.timeout_ms)
    }

    /// Drop and recreate the index, then bulk load every document.
    async fn replace_all(&self, documents: Vec<SearchDocument>) -> Result<usize> {
        create_index(&self.client, true).await?;

        let mut indexer = BulkIndexer::new(self.client.clone(), self.batch_size);
        for doc in documents {
            indexer.add(doc).await?;
        }
        let (indexed, errors) = indexer.finish().await?;

        if errors > 0 {
            warn!("{} documents were rejected by the index", errors);
        }
        info!("Indexed {} documents into {}", indexed, self.client.index_name);
        Ok(indexed)
    }

    async fn is_available(&self) -> bool {
        match self.client.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Elasticsearch health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::search::{HierarchyFilters, SearchRequest};

    fn query(filters: HierarchyFilters) -> SearchQuery {
        let request = SearchRequest::new(" Nepalgau ")
            .with_limit(3)
            .with_filters(filters);
        SearchQuery::build(&request, &SearchConfig::default()).unwrap()
    }

    #[test]
    fn test_render_without_filters() {
        let body = render_query(&query(HierarchyFilters::default()));
        let must = body["query"]["bool"]["must"].as_array().unwrap();

        assert_eq!(must.len(), 1);
        assert_eq!(must[0]["multi_match"]["query"], "Nepalgau");
        assert_eq!(must[0]["multi_match"]["fuzziness"], "AUTO");
        assert_eq!(must[0]["multi_match"]["fields"][0], "name^3");
        assert_eq!(must[0]["multi_match"]["fields"][6], "search_text");
        assert_eq!(body["size"], 3);
        assert_eq!(body["track_scores"], true);
        assert_eq!(body["track_total_hits"], true);
        assert_eq!(body["timeout"], "5000ms");
        assert_eq!(body["sort"][1]["boost_score"]["order"], "desc");
        assert_eq!(body["sort"][2]["id"]["order"], "asc");
    }

    #[test]
    fn test_render_filters_as_required_clauses() {
        let filters = HierarchyFilters::new(Some(4), None, Some("Banke".into()), None);
        let body = render_query(&query(filters));
        let must = body["query"]["bool"]["must"].as_array().unwrap();

        assert_eq!(must.len(), 3);
        assert_eq!(must[1], json!({ "term": { "ward": 4 } }));
        assert_eq!(
            must[2],
            json!({
                "multi_match": {
                    "query": "Banke",
                    "fields": ["district.keyword", "district_ne.keyword"]
                }
            })
        );
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "took": 7,
            "timed_out": false,
            "hits": {
                "total": { "value": 12, "relation": "eq" },
                "hits": [{
                    "_index": "nepal_locations",
                    "_id": "place_1",
                    "_score": 8.5,
                    "_source": {
                        "id": "place_1",
                        "entity_type": "place",
                        "name": "Kathmandu",
                        "place_type": "city",
                        "location": { "lat": 27.71, "lon": 85.32 },
                        "ward": null,
                        "district": "Kathmandu",
                        "country": "Nepal",
                        "boost_score": 2.0,
                        "search_text": "Kathmandu"
                    }
                }]
            }
        });

        let hits = parse_response(body, 5000).unwrap();
        assert_eq!(hits.total, 12);
        assert_eq!(hits.took, 7);
        assert_eq!(hits.hits[0].score, 8.5);
        assert_eq!(hits.hits[0].document.district.as_deref(), Some("Kathmandu"));
        assert_eq!(hits.hits[0].document.province, None);
    }

    #[test]
    fn test_timed_out_response_is_error() {
        let body = json!({
            "took": 5001,
            "timed_out": true,
            "hits": { "total": { "value": 0 }, "hits": [] }
        });
        assert!(matches!(parse_response(body, 5000), Err(Error::Timeout(5000))));
    }
}
