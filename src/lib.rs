//! Thegana - administrative hierarchy resolution and hierarchy-validated
//! location search over Elasticsearch.
//!
//! This library provides shared types and modules for the resolve and query binaries.

pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod models;
pub mod pip;
pub mod search;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{AdminLevel, Place, PlaceCategory, SearchDocument};
