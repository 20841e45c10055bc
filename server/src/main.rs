mod api;
mod auth;
mod config;
mod db;
mod models;
mod rate_limit;
mod raw_sql;
mod schema;
mod store;
mod telemetry;

use anyhow::Context;
use axum::extract::{FromRef, MatchedPath};
use axum::http::Request;
use axum::middleware;
use axum::Router;
use matkon_core::llm::{create_provider_from_env, LlmProvider};
use matkon_core::{
    DisabledFrameExtractor, FrameExtractor, HttpClient, HttpFrameExtractor, Ingestor,
    ObjectStorage, SupabaseStorage, WebClient,
};
use std::env;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<db::DbPool>,
    pub ingestor: Arc<Ingestor>,
    pub rate_limits: Arc<rate_limit::RateLimits>,
}

impl FromRef<AppState> for Arc<db::DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Ingestor> {
    fn from_ref(state: &AppState) -> Self {
        state.ingestor.clone()
    }
}

impl FromRef<AppState> for Arc<rate_limit::RateLimits> {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limits.clone()
    }
}

fn build_ingestor(config: &config::Config, pool: Arc<db::DbPool>) -> anyhow::Result<Ingestor> {
    let client: Arc<dyn HttpClient> = Arc::new(
        WebClient::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client")?,
    );

    let provider: Arc<dyn LlmProvider> =
        Arc::from(create_provider_from_env().context("Failed to configure inference provider")?);
    tracing::info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        "inference provider ready"
    );

    let frames: Arc<dyn FrameExtractor> =
        match HttpFrameExtractor::from_env().context("Failed to configure frame extractor")? {
            Some(extractor) => Arc::new(extractor),
            None => {
                tracing::warn!(
                    "FRAME_EXTRACTOR_URL not set, video posts fall back to text extraction"
                );
                Arc::new(DisabledFrameExtractor)
            }
        };

    let storage: Arc<dyn ObjectStorage> =
        Arc::new(SupabaseStorage::from_env().context("Failed to configure object storage")?);

    let store = Arc::new(store::PgRecipeStore::new(pool));

    Ok(Ingestor::new(client, provider, frames, storage, store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        println!("{}", api::openapi().to_pretty_json()?);
        return Ok(());
    }

    telemetry::init_telemetry()?;

    let config = config::Config::from_env()?;

    let pool = Arc::new(db::create_pool(&config.database_url)?);
    let ingestor = Arc::new(build_ingestor(&config, pool.clone())?);
    let rate_limits = Arc::new(rate_limit::RateLimits::default());

    let pruned = rate_limits.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(rate_limit::PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            pruned.prune();
        }
    });

    let state = AppState {
        pool,
        ingestor,
        rate_limits,
    };

    // Every API route requires auth
    let protected_router = Router::new()
        .nest("/api/recipes", api::recipes::router())
        .nest("/api/ingredients", api::ingredients::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let app = Router::new()
        .merge(protected_router)
        .merge(swagger_ui)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", local_addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", local_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
