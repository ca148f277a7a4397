//! REST API server for the clipshare catalog.
//!
//! Exposes the fetch-catalog operation and the observable catalog state to
//! the web client, plus single-video lookup. One `CatalogStore` instance
//! lives for the process lifetime and is shared across handlers.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use clap::Parser;
use clipshare_tools::{
    catalog::{CatalogState, CatalogStore},
    config,
    cursor::TokenCache,
    error::CatalogError,
    normalize::VideoSummary,
    provider::YouTubeProvider,
    query::{FetchRequest, SortKey},
};
use serde::Deserialize;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "backend", about = "Catalog API server for clipshare")]
struct Args {
    /// Path to the environment configuration file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Override the listen host from the configuration file.
    #[arg(long)]
    host: Option<String>,
    /// Override the listen port from the configuration file.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<CatalogStore>,
}

/// Query parameters of the fetch-catalog operation. Everything is optional;
/// omitted values degrade to the same defaults the client uses.
#[derive(Debug, Deserialize)]
struct CatalogParams {
    page: Option<u32>,
    category: Option<String>,
    sort: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn from_catalog(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::AccessDenied => StatusCode::FORBIDDEN,
            CatalogError::NotFound => StatusCode::NOT_FOUND,
            CatalogError::Provider { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            CatalogError::Network(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, headers, Json(body)).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut runtime = config::load_runtime_config_from(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;
    if let Some(host) = args.host {
        runtime.host = host;
    }
    if let Some(port) = args.port {
        runtime.port = port;
    }

    let provider = YouTubeProvider::new(runtime.youtube_api_key.clone())
        .context("initializing search provider")?;
    let tokens = TokenCache::open(runtime.token_db_path())
        .context("initializing pagination token cache")?;
    let catalog = Arc::new(CatalogStore::new(Arc::new(provider), tokens));

    let state = AppState { catalog };

    let app = Router::new()
        .route("/api/catalog", get(fetch_catalog))
        .route("/api/catalog/state", get(catalog_state))
        .route("/api/catalog/error", delete(clear_error))
        .route("/api/videos/{id}", get(get_video))
        .with_state(state);

    let addr = SocketAddr::new(
        runtime
            .host
            .parse()
            .with_context(|| format!("parsing listen host {}", runtime.host))?,
        runtime.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!(%addr, "catalog API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
    }
}

async fn fetch_catalog(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Json<CatalogState> {
    let request = FetchRequest::new(
        params.page.unwrap_or(1),
        params.category.unwrap_or_default(),
        SortKey::from_param(params.sort.as_deref().unwrap_or("date")),
    );
    Json(state.catalog.fetch_videos(request).await)
}

async fn catalog_state(State(state): State<AppState>) -> Json<CatalogState> {
    Json(state.catalog.snapshot())
}

async fn clear_error(State(state): State<AppState>) -> StatusCode {
    state.catalog.clear_error();
    StatusCode::NO_CONTENT
}

async fn get_video(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<VideoSummary>, ApiError> {
    let summary = state
        .catalog
        .fetch_video(&id)
        .await
        .map_err(ApiError::from_catalog)?;
    Ok(Json(summary))
}
