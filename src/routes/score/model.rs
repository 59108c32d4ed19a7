use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub player: String,
    pub score: i64,
}

impl SubmitScoreRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.player.trim().is_empty() {
            return Err(AppError::BadRequest("Player name is required".into()));
        }
        if self.score <= 0 {
            return Err(AppError::BadRequest(
                "Score must be a positive number".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitScoreResponse {
    pub player: String,
    pub score: f64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub idempotent_replay: bool,
}

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    pub player: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub player: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_player_and_non_positive_score() {
        let blank = SubmitScoreRequest {
            player: "  ".into(),
            score: 5,
        };
        assert!(matches!(blank.validate(), Err(AppError::BadRequest(_))));

        let zero = SubmitScoreRequest {
            player: "alice".into(),
            score: 0,
        };
        assert!(matches!(zero.validate(), Err(AppError::BadRequest(_))));

        let ok = SubmitScoreRequest {
            player: "alice".into(),
            score: 10,
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn replay_flag_is_omitted_unless_set() {
        let fresh = SubmitScoreResponse {
            player: "alice".into(),
            score: 10.0,
            idempotent_replay: false,
        };
        let json = serde_json::to_value(&fresh).unwrap();
        assert!(json.get("idempotent_replay").is_none());
    }
}
