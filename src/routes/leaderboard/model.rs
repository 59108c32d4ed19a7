use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const MAX_TOP_LIMIT: usize = 100;
pub const DEFAULT_AROUND_LIMIT: usize = 5;
pub const MAX_AROUND_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    pub player: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub data: Vec<LeaderboardEntry>,
    pub total: u64,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct PlayerRankResponse {
    pub player: String,
    pub score: f64,
    pub rank: usize,
    pub total: u64,
    pub percentile: f64,
}

#[derive(Debug, Serialize)]
pub struct AroundResponse {
    pub player: String,
    pub rank: usize,
    pub data: Vec<LeaderboardEntry>,
    pub total: u64,
}

/// 无法解析或非正数时取默认值 10，最大 100
pub fn top_limit(raw: Option<&str>) -> usize {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(n) if n > 0 => (n as u64).min(MAX_TOP_LIMIT as u64) as usize,
        _ => DEFAULT_TOP_LIMIT,
    }
}

pub fn around_limit(raw: Option<&str>) -> usize {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(n) if n > 0 => (n as u64).min(MAX_AROUND_LIMIT as u64) as usize,
        _ => DEFAULT_AROUND_LIMIT,
    }
}

/// 以 0 开始的名次为中心，两侧各取 `limit` 个，返回闭区间
pub fn around_window(rank: usize, limit: usize) -> (usize, usize) {
    (rank.saturating_sub(limit), rank.saturating_add(limit))
}

/// 排在该玩家之后的玩家比例，`rank` 从 1 开始
pub fn percentile(rank: usize, total: u64) -> f64 {
    if total <= 1 {
        return 100.0;
    }
    let below = total.saturating_sub(rank as u64) as f64;
    (below / total as f64 * 100.0 * 100.0).round() / 100.0
}

/// 把 ZREVRANGE WITHSCORES 的结果编号，`offset` 为起始位置
pub fn ranked_entries(rows: Vec<(String, f64)>, offset: usize) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, (player, score))| LeaderboardEntry {
            rank: offset + i + 1,
            player,
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_limit_defaults_and_clamps() {
        assert_eq!(top_limit(None), 10);
        assert_eq!(top_limit(Some("abc")), 10);
        assert_eq!(top_limit(Some("0")), 10);
        assert_eq!(top_limit(Some("-4")), 10);
        assert_eq!(top_limit(Some("5")), 5);
        assert_eq!(top_limit(Some("1000")), 100);
    }

    #[test]
    fn around_limit_defaults_and_clamps() {
        assert_eq!(around_limit(None), 5);
        assert_eq!(around_limit(Some("3")), 3);
        assert_eq!(around_limit(Some("99")), 50);
    }

    #[test]
    fn window_is_clamped_at_the_top() {
        assert_eq!(around_window(0, 5), (0, 5));
        assert_eq!(around_window(3, 5), (0, 8));
        assert_eq!(around_window(20, 5), (15, 25));
    }

    #[test]
    fn percentile_of_rank() {
        assert_eq!(percentile(1, 1), 100.0);
        assert_eq!(percentile(1, 4), 75.0);
        assert_eq!(percentile(4, 4), 0.0);
        assert_eq!(percentile(1, 3), 66.67);
    }

    #[test]
    fn entries_are_ranked_from_offset() {
        let rows = vec![("a".to_string(), 30.0), ("b".to_string(), 20.0)];
        let entries = ranked_entries(rows, 4);
        assert_eq!(entries[0].rank, 5);
        assert_eq!(entries[1].player, "b");
        assert_eq!(entries[1].rank, 6);
    }
}
