use axum::Json;
use serde::{Deserialize, Serialize};

/// 错误响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i32,
    pub msg: String,
}

impl ApiResponse {
    pub fn error(code: i32, msg: String) -> Self {
        Self { code, msg }
    }
}

/// 成功响应体：`status`、`message` 和各接口自己的字段平铺在同一层
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub data: T,
}

pub fn success_json<T: Serialize>(message: &'static str, data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        status: "success",
        message,
        data,
    })
}

pub mod error_codes {
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const CAPACITY_EXCEEDED: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}
