/// 排行榜有序集合
pub const LEADERBOARD_KEY: &str = "scores";

const IDEMPOTENCY_PREFIX: &str = "idem:score:";

pub fn idempotency_key(key: &str) -> String {
    format!("{}{}", IDEMPOTENCY_PREFIX, key)
}
