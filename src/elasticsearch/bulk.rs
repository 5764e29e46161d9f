//! Bulk indexing operations for Elasticsearch.

use elasticsearch::http::request::JsonBody;
use elasticsearch::indices::IndicesRefreshParts;
use elasticsearch::BulkParts;
use tracing::{debug, warn};

use super::EsClient;
use crate::error::Result;
use crate::models::SearchDocument;

/// Bulk indexer for efficient document insertion
pub struct BulkIndexer {
    client: EsClient,
    batch_size: usize,
    buffer: Vec<SearchDocument>,
    total_indexed: usize,
    total_errors: usize,
}

impl BulkIndexer {
    /// Create a new bulk indexer
    pub fn new(client: EsClient, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            client,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            total_indexed: 0,
            total_errors: 0,
        }
    }

    /// Add a document to the buffer, flushing if batch is full
    pub async fn add(&mut self, doc: SearchDocument) -> Result<()> {
        self.buffer.push(doc);

        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }

        Ok(())
    }

    /// Flush the buffer to Elasticsearch
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let docs = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let count = docs.len();

        debug!("Flushing {} documents to Elasticsearch", count);

        let mut body: Vec<JsonBody<serde_json::Value>> = Vec::with_capacity(count * 2);
        for doc in &docs {
            body.push(serde_json::json!({ "index": { "_id": &doc.id } }).into());
            body.push(serde_json::to_value(doc)?.into());
        }

        let response = self
            .client
            .client()
            .bulk(BulkParts::Index(&self.client.index_name))
            .body(body)
            .send()
            .await?
            .error_for_status_code()?;

        let response_body = response.json::<serde_json::Value>().await?;
        let errors = count_item_errors(&response_body);
        if errors > 0 {
            warn!(
                "Bulk request had {} errors out of {} documents",
                errors, count
            );
        }

        self.total_errors += errors;
        self.total_indexed += count - errors;

        Ok(())
    }

    /// Flush, make the documents searchable and return (indexed, errors)
    pub async fn finish(mut self) -> Result<(usize, usize)> {
        self.flush().await?;
        self.client
            .client()
            .indices()
            .refresh(IndicesRefreshParts::Index(&[&self.client.index_name]))
            .send()
            .await?
            .error_for_status_code()?;
        Ok((self.total_indexed, self.total_errors))
    }
}

/// Failed items in a bulk response
fn count_item_errors(body: &serde_json::Value) -> usize {
    if !body["errors"].as_bool().unwrap_or(false) {
        return 0;
    }
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|item| item["index"]["error"].is_object())
                .count()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_item_errors() {
        let ok = json!({ "errors": false, "items": [{ "index": { "status": 201 } }] });
        assert_eq!(count_item_errors(&ok), 0);

        let partial = json!({
            "errors": true,
            "items": [
                { "index": { "status": 201 } },
                { "index": { "status": 400, "error": { "type": "mapper_parsing_exception" } } },
                { "index": { "status": 400, "error": { "type": "strict_dynamic_mapping_exception" } } }
            ]
        });
        assert_eq!(count_item_errors(&partial), 2);
    }
}
