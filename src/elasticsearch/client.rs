//! Elasticsearch client wrapper.

use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch,
};
use std::time::Duration;
use url::Url;

use crate::config::EsConfig;
use crate::error::{Error, Result};

/// Elasticsearch client wrapper with connection configuration
#[derive(Clone)]
pub struct EsClient {
    client: Elasticsearch,
    pub index_name: String,
}

impl EsClient {
    /// Create a new Elasticsearch client
    pub fn new(es_url: &str, index_name: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(es_url)
            .map_err(|e| Error::Config(format!("invalid Elasticsearch URL '{es_url}': {e}")))?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool)
            .timeout(timeout)
            .disable_proxy()
            .build()
            .map_err(|e| Error::Config(format!("failed to build transport: {e}")))?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index_name: index_name.to_string(),
        })
    }

    pub fn from_config(config: &EsConfig) -> Result<Self> {
        Self::new(
            &config.url,
            &config.index,
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Get the underlying Elasticsearch client
    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Check if cluster is healthy
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await?;

        Ok(response.status_code().is_success())
    }

    /// Get document count in index
    pub async fn doc_count(&self) -> Result<u64> {
        let response = self
            .client
            .count(elasticsearch::CountParts::Index(&[&self.index_name]))
            .send()
            .await?
            .error_for_status_code()?;

        let body = response.json::<serde_json::Value>().await?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        let err = EsClient::new("not a url", "nepal_locations", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_config() {
        let client = EsClient::from_config(&EsConfig::default()).unwrap();
        assert_eq!(client.index_name, "nepal_locations");
    }
}
