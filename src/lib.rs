use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use cache::LeaderboardStore;
use config::Config;

use middleware::{
    RateLimiter, ResponseCache, cors_layer, log_errors, rate_limit, response_cache, timeout_layer,
};

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub scores: Arc<dyn LeaderboardStore>,
}

/// 给路由套上限流和响应缓存：限流在外层，缓存在内层
pub fn with_admission_and_cache<S>(
    routes: Router<S>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .layer(from_fn_with_state(cache, response_cache))
        .layer(from_fn_with_state(limiter, rate_limit))
}

pub fn build_router(
    state: AppState,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
) -> Router {
    let api_routes = Router::new()
        .route(
            "/score",
            post(routes::score::submit_score).get(routes::score::get_score),
        )
        .route("/leaderboard/top", get(routes::leaderboard::top_players))
        .route("/leaderboard/player", get(routes::leaderboard::player_rank))
        .route(
            "/leaderboard/around/{player}",
            get(routes::leaderboard::around_player),
        );

    // /health 不经过限流和缓存
    Router::new()
        .route("/health", get(routes::health))
        .merge(with_admission_and_cache(api_routes, limiter, cache))
        .layer(from_fn(log_errors))
        .layer(timeout_layer(state.config.request_timeout()))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .with_state(state)
}
