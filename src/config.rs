//! TOML configuration shared by the `resolve` and `query` binaries.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::BoostTable;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub elasticsearch: EsConfig,
    pub resolve: ResolveConfig,
    pub search: SearchConfig,
    pub document: DocumentConfig,
    pub boost: BoostTable,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EsConfig {
    pub url: String,
    pub index: String,
    /// Transport timeout for every request to the cluster
    pub timeout_ms: u64,
}

impl Default for EsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "nepal_locations".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ResolveConfig {
    /// Worker threads for hierarchy resolution
    pub workers: usize,
    /// Documents per bulk request
    pub batch_size: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            batch_size: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Per-request deadline passed through to the index
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DocumentConfig {
    /// Value of the `country` field on every document
    pub country: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            country: "Nepal".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file when given, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolve.workers == 0 {
            return Err(Error::Config("resolve.workers must be at least 1".into()));
        }
        if self.resolve.batch_size == 0 {
            return Err(Error::Config("resolve.batch_size must be at least 1".into()));
        }
        if self.search.max_limit == 0 || self.search.default_limit == 0 {
            return Err(Error::Config("search limits must be at least 1".into()));
        }
        if self.search.default_limit > self.search.max_limit {
            return Err(Error::Config(
                "search.default_limit exceeds search.max_limit".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [elasticsearch]
            index = "locations_v2"

            [boost]
            road = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.elasticsearch.index, "locations_v2");
        assert_eq!(config.elasticsearch.url, "http://localhost:9200");
        assert_eq!(config.boost.road, 0.1);
        assert_eq!(config.boost.city_town, 2.0);
        assert_eq!(config.search.max_limit, 50);
        assert_eq!(config.document.country, "Nepal");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.resolve.workers = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[search]\ntimeout_ms = 250\n").unwrap();
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.search.timeout_ms, 250);

        std::fs::write(file.path(), "[search\n").unwrap();
        assert!(matches!(
            Config::load_from_file(file.path()),
            Err(Error::Config(_))
        ));
    }
}
