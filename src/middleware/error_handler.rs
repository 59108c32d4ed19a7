use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

const LOGGED_BODY_LIMIT: usize = 1024;

pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };
    let shown = &bytes[..bytes.len().min(LOGGED_BODY_LIMIT)];

    error!(
        method = %method,
        path = %path,
        "Server error occurred - Status: {}, Body: {}",
        parts.status,
        String::from_utf8_lossy(shown)
    );

    Response::from_parts(parts, Body::from(bytes))
}
