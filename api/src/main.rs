use std::sync::Arc;

use axum::Router;
use oilwatch_core::adjuster::ContextualAdjuster;
use oilwatch_core::history::{HistoryStore, InMemoryHistoryStore};
use oilwatch_core::pipeline::ScoringPipeline;
use oilwatch_core::seed;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod estimator;
mod extract;
mod reasoning;
mod routes;
mod state;
mod store;

use config::{HistoryBackend, ServerConfig};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Oilwatch API",
        version = "0.1.0",
        description = "Lubricant health scoring: base estimate, contextual adjustment and per-entity assessment history."
    ),
    paths(
        routes::health::health_check,
        routes::assessments::create_assessment,
        routes::assessments::list_assessments,
        routes::assessments::latest_assessment,
        routes::entities::list_entities,
    ),
    components(schemas(
        HealthResponse,
        oilwatch_core::error::ApiError,
        oilwatch_core::sample::Sample,
        oilwatch_core::assessment::Assessment,
        oilwatch_core::assessment::TrendLabel,
        oilwatch_core::assessment::Provenance,
        oilwatch_core::assessment::Confidence,
        oilwatch_core::band::StatusBand,
        oilwatch_core::history::EntitySummary,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "oilwatch_api=debug,oilwatch_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn HistoryStore> = match config.backend {
        HistoryBackend::Memory => {
            tracing::info!("Using in-memory history store");
            Arc::new(InMemoryHistoryStore::new())
        }
        HistoryBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set");

            let pool = PgPoolOptions::new()
                .max_connections(20)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            // Run migrations
            sqlx::migrate!("../migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Using Postgres history store");
            Arc::new(store::PgHistoryStore::new(pool))
        }
    };

    if let Some(path) = &config.seed_snapshot {
        let raw = tokio::fs::read_to_string(path)
            .await
            .unwrap_or_else(|e| panic!("Failed to read seed snapshot {path}: {e}"));
        let records = seed::parse_snapshot(&raw).expect("Seed snapshot is not valid");
        let report = seed::seed_history(store.as_ref(), records)
            .await
            .expect("Failed to seed history");
        tracing::info!(
            seeded = report.seeded_scopes.len(),
            skipped = report.skipped_scopes.len(),
            records = report.records,
            "Seed snapshot processed"
        );
    }

    let estimator =
        estimator::CommandEstimator::from_command_line(&config.estimator_command, config.estimator_timeout)
            .expect("ESTIMATOR_COMMAND must name a program");

    let adjuster = match &config.reasoning_url {
        Some(url) => ContextualAdjuster::new(
            Arc::new(reasoning::HttpReasoningService::new(
                url.clone(),
                config.reasoning_api_key.clone(),
                config.reasoning_timeout,
            )),
            config.reasoning_timeout,
        ),
        None => {
            tracing::warn!("REASONING_URL not set; every cycle uses the fallback classifier");
            ContextualAdjuster::fallback_only()
        }
    };

    let pipeline = ScoringPipeline::new(
        store,
        Arc::new(estimator),
        adjuster,
        config.history_window,
    );
    let app_state = state::AppState::new(pipeline);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Oilwatch API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
