//! HTTP surface. Two routes: `/nodejs/query` answers a natural language
//! question with rendered chart tiles, `/nodejs/healthz` is the liveness
//! probe. Tile failures are absorbed per tile; only a failure before any
//! tile can start, like the query API being down, turns into a 500.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{ChartConfig, RuntimeConfig};
use crate::dc::{DataCommonsClient, DcError};
use crate::page::collect_tiles;
use crate::theme::Theme;
use crate::tiles::{render_tile, TileContext, TileResult};

pub struct AppState {
    pub config: RuntimeConfig,
    pub chart: ChartConfig,
    pub theme: Theme,
    pub client: DataCommonsClient,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> anyhow::Result<Self> {
        let client = DataCommonsClient::new(
            &config.api_root,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self {
            config,
            chart: ChartConfig::default(),
            theme: Theme::base(),
            client,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/nodejs/query", get(handle_query))
        .route("/nodejs/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct QueryParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    charts: Vec<TileResult>,
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("missing query parameter q")]
    MissingQuery,

    #[error(transparent)]
    Upstream(#[from] DcError),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            QueryError::MissingQuery => (StatusCode::BAD_REQUEST, self.to_string()),
            QueryError::Upstream(err) => {
                tracing::error!(error = %err, "query processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "query processing failed".to_string(),
                )
            }
        };
        (status, Json(json!({ "err": message }))).into_response()
    }
}

async fn handle_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, QueryError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(QueryError::MissingQuery);
    }
    tracing::info!(query, "answering query");

    let nl = state.client.nl_data(query).await?;
    if nl.place.dcid.is_empty() {
        tracing::info!(query, "no place detected, nothing to chart");
        return Ok(Json(QueryResponse { charts: Vec::new() }));
    }

    let jobs = collect_tiles(&nl.config);
    let child_type = nl
        .config
        .metadata
        .contained_place_types
        .get(&nl.place.place_type)
        .map(String::as_str);
    let ctx = TileContext {
        client: &state.client,
        theme: &state.theme,
        chart: &state.chart,
        place: &nl.place,
        child_type,
    };

    // Tiles run concurrently; the answer keeps their page order because
    // join_all preserves submission order.
    let renders = jobs.iter().map(|job| render_tile(&ctx, job));
    let charts: Vec<TileResult> = futures::future::join_all(renders)
        .await
        .into_iter()
        .flatten()
        .collect();
    tracing::info!(
        query,
        place = %nl.place.dcid,
        tiles = jobs.len(),
        charts = charts.len(),
        "query answered"
    );
    Ok(Json(QueryResponse { charts }))
}

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.addr();
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
