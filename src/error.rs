use axum::Json;
use axum::{
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::middleware::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use crate::utils::{ApiResponse, error_codes};

#[derive(Debug)]
pub enum AppError {
    /// 无法识别调用方
    IdentityUnresolvable,
    /// 访客表已满
    CapacityExceeded,
    RateLimited {
        limit: f64,
        retry_after: u64,
        reset_at: i64,
    },
    BadRequest(String),
    NotFound(String),
    Store(redis::RedisError),
    InternalServerError,
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Store(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            AppError::IdentityUnresolvable => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                "Unable to identify client IP".to_string(),
            ),
            AppError::CapacityExceeded => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::CAPACITY_EXCEEDED,
                "Too many users, please try again later".to_string(),
            ),
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::RATE_LIMIT,
                "Too Many Requests".to_string(),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg.clone()),
            AppError::Store(err) => {
                tracing::error!("Redis command failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let mut response = (status, Json(ApiResponse::error(code, msg))).into_response();

        if let AppError::RateLimited {
            limit,
            retry_after,
            reset_at,
        } = self
        {
            let headers = response.headers_mut();
            for (name, value) in [
                (header::RETRY_AFTER, retry_after.to_string()),
                (HeaderName::from_static(X_RATELIMIT_LIMIT), limit.to_string()),
                (HeaderName::from_static(X_RATELIMIT_REMAINING), "0".to_string()),
                (HeaderName::from_static(X_RATELIMIT_RESET), reset_at.to_string()),
            ] {
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(name, value);
                }
            }
        }

        response
    }
}
