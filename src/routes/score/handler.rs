use axum::{
    extract::{Json, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::model::{ScoreQuery, ScoreResponse, SubmitScoreRequest, SubmitScoreResponse};
use crate::{AppState, error::AppError, utils::success_json};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[axum::debug_handler]
pub async fn submit_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!("Rejected score body: {}", e);
        AppError::BadRequest("Invalid request body".into())
    })?;
    req.validate()?;

    let idem_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());

    if let Some(idem_key) = idem_key {
        // 重复提交只返回当前分数
        let claimed = state
            .scores
            .claim_idempotency_key(idem_key, state.config.idempotency_ttl())
            .await?;
        if !claimed {
            let score = state.scores.score(&req.player).await?;
            tracing::info!(player = %req.player, "idempotent replay, score unchanged");
            return Ok((
                StatusCode::OK,
                success_json(
                    "Idempotent replay; score unchanged",
                    SubmitScoreResponse {
                        player: req.player,
                        score: score.unwrap_or_default(),
                        idempotent_replay: true,
                    },
                ),
            ));
        }
    }

    let score = state.scores.increment(&req.player, req.score).await?;
    tracing::info!(player = %req.player, delta = req.score, total = score, "score updated");

    Ok((
        StatusCode::CREATED,
        success_json(
            "Score updated successfully",
            SubmitScoreResponse {
                player: req.player,
                score,
                idempotent_replay: false,
            },
        ),
    ))
}

#[axum::debug_handler]
pub async fn get_score(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
) -> Result<impl IntoResponse, AppError> {
    let player = query
        .player
        .filter(|player| !player.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Player name is required".into()))?;

    let score = state.scores.score(&player).await?;
    let message = if score.is_some() {
        "Score retrieved successfully"
    } else {
        "Player not found"
    };

    Ok(success_json(
        message,
        ScoreResponse {
            player,
            score: score.unwrap_or_default(),
        },
    ))
}
