//! HTTP Server
//!
//! Router assembly and the serve loop. All routes live under `/api/v1`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use scribe_core::{ScribeConfigFile, WritingService};

use crate::handlers;

/// Route prefix
pub const API_PREFIX: &str = "/api/v1";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Writing operations
    pub service: Arc<WritingService>,
    /// Requests slower than this to produce headers are logged
    pub slow_request_warn: Duration,
}

impl AppState {
    /// State around a service
    pub fn new(service: WritingService, slow_request_warn: Duration) -> Self {
        Self {
            service: Arc::new(service),
            slow_request_warn,
        }
    }
}

/// Build the router with every endpoint
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/heartbeat", get(handlers::heartbeat))
        .route("/generate", post(handlers::generate))
        .route("/chapters/suggestions", post(handlers::chapter_suggestions))
        .route("/chapters/outlines", post(handlers::chapter_outlines))
        .route("/chapters/summary", post(handlers::section_summary))
        .route("/chapters/continue", post(handlers::continue_chapter))
        .route("/chapters/insert", post(handlers::insert_paragraphs))
        .route("/chapters/rewrite", post(handlers::rewrite_paragraph))
        .route("/chapters/rewrite/summary", post(handlers::summary_sentence))
        .route("/chapters/scene/new", post(handlers::new_scene))
        .route("/chapters/scene/rewrite", post(handlers::rewrite_scene))
        .route("/chapters/scene/continue", post(handlers::continue_scene))
        .route("/chapters/scene/paragraphs", post(handlers::scene_paragraphs))
        .route("/sentences/rewrite", post(handlers::sentence_rewrite))
        .route("/parameters/suggestions", post(handlers::parameter_suggestion))
        .route("/passages/rewrite", post(handlers::passage_rewrite))
        .route(
            "/mode/mature",
            get(handlers::mature_state).post(handlers::toggle_mature),
        )
        .route(
            "/history",
            get(handlers::load_history).post(handlers::save_history),
        )
        .route("/prompts/system", get(handlers::system_prompt));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            warn_slow_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Time to response headers; streamed bodies keep going after this
async fn warn_slow_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    if elapsed > state.slow_request_warn {
        warn!(
            %method,
            path = %path,
            elapsed_ms = elapsed.as_millis(),
            status = %response.status(),
            "Slow request"
        );
    }
    response
}

/// Bind and serve until interrupted
///
/// # Errors
///
/// Fails if providers cannot be set up or the address cannot be bound.
pub async fn serve(config: &ScribeConfigFile) -> anyhow::Result<()> {
    let service = WritingService::from_config(config)?;
    let state = AppState::new(service, config.server.slow_request_warn);
    let app = build_router(state);

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {address}: {e}"))?;
    info!(address = %address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
