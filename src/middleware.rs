use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::handlers::SharedState;
use crate::rate_limiter::Admission;

/// Request/response logging middleware. Records method, path and client
/// on arrival; status and duration on completion.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_key(&request);
    let started = Instant::now();

    info!(
        target: "moodlog::http",
        method = %method,
        path = %path,
        client = %client,
        "request received"
    );

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        error!(
            target: "moodlog::http",
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            "request failed"
        );
    } else {
        info!(
            target: "moodlog::http",
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            "request completed"
        );
    }

    response
}

/// Admission-control middleware. Denied requests fail fast with 429 and
/// never reach the wrapped route.
pub async fn rate_limit(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&request);

    match state.rate_limiter.admit(&key)? {
        Admission::Allowed { .. } => Ok(next.run(request).await),
        Admission::Denied { retry_after } => {
            warn!(
                target: "moodlog::http",
                client = %key,
                path = request.uri().path(),
                "rate limit exceeded"
            );
            Err(ApiError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            })
        }
    }
}

/// Resolve the client key used for rate limiting: proxy headers first,
/// then the peer address.
pub fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return first_ip.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return ip_str.to_string();
        }
    }

    if let Some(info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return info.0.ip().to_string();
    }

    "unknown".to_string()
}
