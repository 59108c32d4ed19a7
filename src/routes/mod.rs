pub mod leaderboard;
pub mod score;

pub async fn health() -> &'static str {
    "OK"
}
