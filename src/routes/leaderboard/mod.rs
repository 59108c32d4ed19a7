mod handler;
mod model;

pub use handler::{around_player, player_rank, top_players};
pub use model::{
    AroundResponse, LeaderboardEntry, LeaderboardResponse, PlayerRankResponse, around_limit,
    around_window, percentile, top_limit,
};
