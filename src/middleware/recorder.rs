use axum::{
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::cache::CacheEntry;

/// 完整缓冲下游响应，供缓存中间件检查、存储和原样回放
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedResponse {
    pub async fn capture(response: Response) -> Result<Self, axum::Error> {
        let (parts, body) = response.into_parts();
        let body = to_bytes(body, usize::MAX).await?;
        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    pub fn to_entry(&self) -> CacheEntry {
        CacheEntry {
            status: self.status.as_u16(),
            headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
                .collect(),
            body: self.body.to_vec(),
        }
    }

    /// 存储内容损坏时返回 `None`，调用方按未命中处理
    pub fn from_entry(entry: CacheEntry) -> Option<Self> {
        let status = StatusCode::from_u16(entry.status).ok()?;
        let mut headers = HeaderMap::with_capacity(entry.headers.len());
        for (name, value) in entry.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
            let value = HeaderValue::from_bytes(&value).ok()?;
            headers.append(name, value);
        }
        Some(Self {
            status,
            headers,
            body: Bytes::from(entry.body),
        })
    }
}

impl IntoResponse for RecordedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
