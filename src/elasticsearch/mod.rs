//! Elasticsearch client and operations.

mod bulk;
mod client;
mod schema;
mod search;

pub use bulk::BulkIndexer;
pub use client::EsClient;
pub use schema::create_index;
pub use search::EsBackend;
