use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::model::{
    AroundResponse, LeaderboardResponse, LimitQuery, PlayerQuery, PlayerRankResponse,
    around_limit, around_window, percentile, ranked_entries, top_limit,
};
use crate::{AppState, error::AppError, utils::success_json};

#[axum::debug_handler]
pub async fn top_players(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = top_limit(query.limit.as_deref());

    let rows = state.scores.range(0, limit - 1).await?;
    let total = state.scores.count().await?;

    Ok(success_json(
        "Top players retrieved successfully",
        LeaderboardResponse {
            data: ranked_entries(rows, 0),
            total,
            limit,
        },
    ))
}

#[axum::debug_handler]
pub async fn player_rank(
    State(state): State<AppState>,
    Query(query): Query<PlayerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let player = query
        .player
        .filter(|player| !player.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Player name is required".into()))?;

    let Some(rank) = state.scores.rank(&player).await? else {
        return Err(AppError::NotFound(format!("Player {} not found", player)));
    };
    let score = state.scores.score(&player).await?;
    let total = state.scores.count().await?;

    Ok(success_json(
        "Player rank retrieved successfully",
        PlayerRankResponse {
            player,
            score: score.unwrap_or_default(),
            rank: rank + 1,
            total,
            percentile: percentile(rank + 1, total),
        },
    ))
}

#[axum::debug_handler]
pub async fn around_player(
    State(state): State<AppState>,
    Path(player): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = around_limit(query.limit.as_deref());

    let Some(rank) = state.scores.rank(&player).await? else {
        return Err(AppError::NotFound(format!("Player {} not found", player)));
    };

    let (start, stop) = around_window(rank, limit);
    let rows = state.scores.range(start, stop).await?;
    let total = state.scores.count().await?;

    Ok(success_json(
        "Players around retrieved successfully",
        AroundResponse {
            player,
            rank: rank + 1,
            data: ranked_entries(rows, start),
            total,
        },
    ))
}
