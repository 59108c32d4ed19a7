use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use leaderboard::{
    AppState, build_router,
    cache::{RedisCacheStore, RedisLeaderboardStore},
    config::Config,
    middleware::{RateLimiter, ResponseCache},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    match redis_client.get_multiplexed_async_connection().await {
        Ok(mut conn) => match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => tracing::info!("Connected to Redis"),
            Err(e) => tracing::warn!("Redis ping failed, cache will fail open: {}", e),
        },
        Err(e) => tracing::warn!("Redis unavailable at startup, cache will fail open: {}", e),
    }
    let redis_arc = Arc::new(redis_client);

    let state = AppState {
        config: config.clone(),
        scores: Arc::new(RedisLeaderboardStore::new(Arc::clone(&redis_arc))),
    };

    // 设置限流器和后台清理任务
    let rate_limiter = Arc::new(
        RateLimiter::new(config.rate_limit.clone()).expect("Invalid rate limit configuration"),
    );
    let sweeper = rate_limiter.spawn_sweeper();

    let response_cache = Arc::new(ResponseCache::new(
        Arc::new(RedisCacheStore::new(
            redis_arc,
            config.cache.store_timeout(),
        )),
        config.cache.clone(),
    ));

    let app = build_router(state, Arc::clone(&rate_limiter), response_cache);

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!(
        rps = config.rate_limit.requests_per_second,
        burst = config.rate_limit.burst,
        cache_ttl_secs = config.cache.default_ttl().as_secs(),
        "Server listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down");
    })
    .await
    .expect("Failed to start server");

    rate_limiter.stop();
    if let Err(e) = sweeper.await {
        tracing::warn!("Visitor sweeper ended abnormally: {}", e);
    }
}
