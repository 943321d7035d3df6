//! Application setup and router wiring.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use scholarly::{
    sources::SourceExt, EngineConfig, EngineDeps, MemoryKnowledgeStore, OpenAlexSource,
    SemanticScholarSource, SessionManager, SourceRegistry, WorkflowEngine,
};

use crate::config::Config;
use crate::kernel::{create_synthesis_service, HttpExtractionBackend, ServerDeps};
use crate::server::routes::{
    clusters_handler, health_handler, research_results_handler, research_status_handler,
    search_handler, session_start_handler, session_validate_handler, statistics_handler,
    submit_research_handler, upload_handler,
};

/// Build the workflow engine and its collaborators from configuration.
pub fn build_deps(config: &Config) -> ServerDeps {
    // Discovery sources, each behind its own throttle. Budgets follow the
    // published per-client limits of the keyless tiers.
    let sources = SourceRegistry::new()
        .register(Arc::new(
            SemanticScholarSource::new(config.semantic_scholar_api_key.clone()).rate_limited(1),
        ))
        .register(Arc::new(
            OpenAlexSource::new(config.openalex_mailto.clone()).rate_limited(5),
        ));

    let knowledge: Arc<MemoryKnowledgeStore> = Arc::new(MemoryKnowledgeStore::new());
    let synthesis = create_synthesis_service(config.synthesis_service_url.clone());
    let extraction = Arc::new(HttpExtractionBackend::new(config.ocr_service_url.clone()));

    let engine_config = EngineConfig::default()
        .with_sufficiency_threshold(config.sufficiency_threshold)
        .with_min_relevance(config.min_relevance)
        .with_request_timeout(config.request_timeout)
        .with_result_ttl(config.result_ttl)
        .with_session_ttl(config.session_ttl);

    let engine = Arc::new(WorkflowEngine::new(
        EngineDeps {
            sources,
            knowledge: knowledge.clone(),
            synthesis,
            extraction,
        },
        engine_config,
    ));

    let sessions = Arc::new(SessionManager::new(config.session_ttl));

    ServerDeps::new(engine, knowledge, sessions)
}

/// Build the Axum application router over the shared deps.
pub fn build_app(deps: ServerDeps) -> Router {
    // CORS: permissive for the separate front-end service.
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    // Per-IP request limiting: 10/sec sustained with bursts of 20.
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .use_headers()
            .finish()
            .expect("rate limiter configuration is valid and should never fail"),
    );
    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    Router::new()
        // Research pipeline
        .route("/research", post(submit_research_handler))
        .route("/research/:id/status", get(research_status_handler))
        .route("/research/:id/results", get(research_results_handler))
        // Knowledge store
        .route("/search", get(search_handler))
        .route("/statistics", get(statistics_handler))
        .route("/clusters", get(clusters_handler))
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        // Sessions
        .route("/session/start", post(session_start_handler))
        .route("/session/validate", post(session_validate_handler))
        .layer(rate_limit_layer)
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        .layer(Extension(deps))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
