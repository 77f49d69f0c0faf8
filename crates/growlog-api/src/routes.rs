//! Router setup with all API routes and middleware.
//!
//! Public routes (root, health, auth, reflections, docs) and routes gated
//! by [`crate::auth::require_auth`] (todos, emotions, daily) share one
//! ingress pipeline.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tokio::signal;
use tracing::{info, warn};

use growlog_core::config::GrowlogConfig;
use growlog_core::error::GrowlogError;

use crate::handlers;
use crate::ingress;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
///
/// Layers run outermost first: CORS, access log, JSON body check, then the
/// auth gate. The gate runs before routing and covers every path under the
/// protected prefixes, unmatched ones included. `/health` skips both.
pub fn create_router(state: AppState) -> Router {
    // Routes that do NOT require authentication.
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/me", get(handlers::me))
        .route(
            "/reflections",
            get(handlers::list_reflections).post(handlers::create_reflection),
        )
        .route(
            "/reflections/{id}",
            get(handlers::get_reflection).delete(handlers::delete_reflection),
        );

    // Everything under auth::PROTECTED_PREFIXES.
    let protected_routes = Router::new()
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/{id}",
            get(handlers::get_todo)
                .patch(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .route("/todos/{id}/toggle", patch(handlers::toggle_todo))
        .route(
            "/emotions",
            get(handlers::list_emotions).post(handlers::create_emotion),
        )
        .route(
            "/emotions/{id}",
            axum::routing::delete(handlers::delete_emotion),
        )
        .route("/daily", get(handlers::daily_range))
        .route("/daily/{date}", get(handlers::daily_log));

    let mut router = public_routes.merge(protected_routes);
    if state.config.docs_enabled() {
        router = router.merge(crate::docs::routes());
    } else {
        info!("API documentation disabled");
    }

    router
        // Set before the layers below so they wrap it.
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ))
        .layer(DefaultBodyLimit::max(ingress::MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(ingress::json_body))
        // Added after the body check so liveness never depends on the body.
        .route("/health", get(handlers::health))
        .layer(ingress::trace_layer())
        .layer(ingress::cors_layer())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Runs until Ctrl+C or SIGTERM, then drains in-flight requests.
pub async fn start_server(config: &GrowlogConfig, state: AppState) -> Result<(), GrowlogError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to bind {}", addr);
        GrowlogError::Io(e)
    })?;

    info!(
        "Growlog API listening on http://{} ({})",
        addr, config.server.environment
    );
    if config.docs_enabled() {
        info!("API docs at http://{}{}", addr, crate::docs::DOCS_PATH);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
