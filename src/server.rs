use std::any::Any;
use std::net::SocketAddr;

use axum::http::{header, HeaderValue};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as CorsAny, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ApiError;
use crate::handlers::{self, SharedState};
use crate::middleware::{rate_limit, request_logger};

/// Build the full application router for the given state.
///
/// Separated from [`Server`] so tests can drive the composed stack
/// without binding a socket.
pub fn create_app(state: SharedState) -> Router {
    let rate_limited = Router::new()
        .route("/api/sentiment", post(handlers::analyze_sentiment))
        .route(
            "/api/moods",
            post(handlers::create_mood).get(handlers::list_moods),
        )
        .route_layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        // health stays outside the admission-controlled routes so
        // liveness probes keep working under load
        .route("/api/health", get(handlers::health_check))
        .merge(rate_limited)
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config))
                .layer(from_fn(request_logger))
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}

pub struct Server {
    state: SharedState,
}

impl Server {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve until a termination signal arrives, then drain in-flight
    /// requests within the configured grace period. A clean drain
    /// returns Ok; a drain timeout or server fault returns Err so the
    /// process exits nonzero.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("moodlog server listening on {}", addr);

        spawn_rate_limit_sweeper(self.state.clone());

        let grace = self.state.config.shutdown_grace;
        let app = create_app(self.state);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let mut server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        });

        tokio::select! {
            result = &mut server => {
                return result
                    .map_err(|e| anyhow::anyhow!("server task panicked: {e}"))?
                    .map_err(Into::into);
            }
            _ = shutdown_signal() => {}
        }

        let _ = shutdown_tx.send(());
        tracing::info!("draining in-flight requests, up to {:?}", grace);

        match tokio::time::timeout(grace, server).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!("shutdown complete");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(anyhow::anyhow!("server error during drain: {e}")),
            Ok(Err(e)) => Err(anyhow::anyhow!("server task panicked: {e}")),
            Err(_) => Err(anyhow::anyhow!("drain timed out after {:?}", grace)),
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(CorsAny).allow_headers(CorsAny);

    if config.cors_origin == "*" {
        return cors.allow_origin(CorsAny);
    }

    match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %config.cors_origin, "invalid CORS origin, allowing any");
            cors.allow_origin(CorsAny)
        }
    }
}

// Last line of defense: a panicking handler becomes an Internal response
// instead of a dropped connection.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::internal(format!("request handler panicked: {detail}")).into_response()
}

fn spawn_rate_limit_sweeper(state: SharedState) {
    let period = state.config.cleanup_interval;
    if period.is_zero() {
        tracing::warn!("rate-limit sweep disabled (zero interval)");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.rate_limiter.purge_expired() {
                Ok(0) => {}
                Ok(purged) => {
                    tracing::debug!(purged, "purged expired rate-limit records");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rate-limit sweep failed");
                }
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, initiating graceful shutdown");
        },
    }
}
