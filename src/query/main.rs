//! Query server for hierarchy-validated location search.
//!
//! Provides an HTTP API over the Elasticsearch index built by `resolve`:
//! ranked fuzzy search with optional province, district, municipality and
//! ward filters, and validation of the top match against those filters.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use thegana::elasticsearch::{EsBackend, EsClient};
use thegana::search::{HierarchyFilters, QueryEngine, SearchRequest, SearchResponse};
use thegana::{Config, Error};

const VERSION: &str = "1.0.0";

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Location search server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Elasticsearch URL (overrides config)
    #[arg(long)]
    es_url: Option<String>,

    /// Elasticsearch index name (overrides config)
    #[arg(long)]
    index: Option<String>,
}

/// Application state shared across handlers
struct AppState {
    engine: QueryEngine<EsBackend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config =
        Config::load_or_default(args.config.as_ref()).context("Failed to load configuration")?;
    if let Some(url) = args.es_url {
        config.elasticsearch.url = url;
    }
    if let Some(index) = args.index {
        config.elasticsearch.index = index;
    }

    info!("Thegana Query Server");
    info!("Connecting to Elasticsearch at {}", config.elasticsearch.url);

    let es_client = EsClient::from_config(&config.elasticsearch)?;

    // The server still starts when the cluster is down; /health reports it.
    match es_client.doc_count().await {
        Ok(doc_count) => info!(
            "Connected to index '{}' with {} documents",
            config.elasticsearch.index, doc_count
        ),
        Err(e) => warn!(
            "Index '{}' is not reachable yet: {}",
            config.elasticsearch.index, e
        ),
    }

    let backend = EsBackend::new(es_client, config.resolve.batch_size);
    let state = Arc::new(AppState {
        engine: QueryEngine::new(backend, config.search.clone()),
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/search", get(search_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    elasticsearch: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let healthy = state.engine.is_healthy().await;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        elasticsearch: if healthy { "connected" } else { "disconnected" },
        version: VERSION,
    })
}

/// Raw query string. Numbers arrive as text so that blank values can be
/// treated as absent.
#[derive(Deserialize)]
struct SearchQueryParams {
    /// Search text
    #[serde(default)]
    query: String,
    /// Number of results (default 10, clamped to 1..=50)
    limit: Option<String>,
    ward: Option<String>,
    municipality: Option<String>,
    district: Option<String>,
    province: Option<String>,
}

impl SearchQueryParams {
    fn into_request(self) -> Result<SearchRequest, Error> {
        Ok(SearchRequest {
            query: self.query,
            limit: parse_number("limit", self.limit)?,
            filters: HierarchyFilters::new(
                parse_number("ward", self.ward)?,
                self.municipality,
                self.district,
                self.province,
            ),
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>, Error> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidRequest(format!("{name} must be an integer, got '{value}'"))),
    }
}

/// Location search with optional hierarchy validation
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let response = state.engine.search(params.into_request()?).await?;
    Ok(Json(response))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    retryable: bool,
}

/// Maps library errors onto HTTP responses
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Search execution failed: {}", self.0);
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}
