use std::time::Duration;

use tower_http::timeout::TimeoutLayer;

/// 超时返回 408。下游 future 在超时后被丢弃，不会在后台继续执行
pub fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::new(timeout)
}
