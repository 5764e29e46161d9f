//! Elasticsearch index schema management.

use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts};
use tracing::info;

use super::EsClient;
use crate::error::{Error, Result};

/// Schema JSON embedded at compile time
const LOCATIONS_MAPPING: &str = include_str!("../../schema/locations_mapping.json");

pub(crate) fn mapping() -> Result<serde_json::Value> {
    Ok(serde_json::from_str(LOCATIONS_MAPPING)?)
}

/// Create the locations index with its mapping
pub async fn create_index(client: &EsClient, delete_existing: bool) -> Result<()> {
    let es = client.client();
    let index_name = &client.index_name;

    let exists = es
        .indices()
        .exists(IndicesExistsParts::Index(&[index_name]))
        .send()
        .await?
        .status_code()
        .is_success();

    if exists {
        if delete_existing {
            info!("Deleting existing index: {}", index_name);
            es.indices()
                .delete(IndicesDeleteParts::Index(&[index_name]))
                .send()
                .await?
                .error_for_status_code()?;
        } else {
            info!("Index {} already exists, skipping creation", index_name);
            return Ok(());
        }
    }

    info!("Creating index: {}", index_name);
    let response = es
        .indices()
        .create(IndicesCreateParts::Index(index_name))
        .body(mapping()?)
        .send()
        .await?;

    if !response.status_code().is_success() {
        let error_body = response.text().await?;
        return Err(Error::Index(format!(
            "failed to create index {index_name}: {error_body}"
        )));
    }

    info!("Index {} created successfully", index_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_covers_query_fields() {
        let mapping = mapping().unwrap();
        let props = &mapping["mappings"]["properties"];

        for field in ["name", "name_ne", "name_en"] {
            assert_eq!(props[field]["fields"]["fuzzy"]["type"], "text");
        }
        for field in ["municipality", "district", "province", "district_ne"] {
            assert_eq!(
                props[field]["fields"]["keyword"]["normalizer"],
                "keyword_lowercase"
            );
        }
        assert_eq!(props["ward"]["type"], "integer");
        assert_eq!(props["location"]["type"], "geo_point");
        assert_eq!(props["id"]["type"], "keyword");
    }
}
