use axum::http::{HeaderName, Request, header};
use sha2::{Digest, Sha256};

pub const RESPONSE_CACHE_PREFIX: &str = "cache:";

/// 由 method、path、query、Accept、Accept-Language 生成缓存键
///
/// 每个字段带长度前缀写入摘要，避免 `/a?b` 与 `/ab` 这类拼接冲突。
pub fn response_cache_key<B>(req: &Request<B>) -> String {
    let fields: [&[u8]; 5] = [
        req.method().as_str().as_bytes(),
        req.uri().path().as_bytes(),
        req.uri().query().unwrap_or_default().as_bytes(),
        header_bytes(req, header::ACCEPT),
        header_bytes(req, header::ACCEPT_LANGUAGE),
    ];

    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    format!("{}{}", RESPONSE_CACHE_PREFIX, hex::encode(hasher.finalize()))
}

fn header_bytes<B>(req: &Request<B>, name: HeaderName) -> &[u8] {
    req.headers()
        .get(name)
        .map(|value| value.as_bytes())
        .unwrap_or_default()
}
