mod handler;
mod model;

pub use handler::{get_score, submit_score};
pub use model::{ScoreQuery, ScoreResponse, SubmitScoreRequest, SubmitScoreResponse};
