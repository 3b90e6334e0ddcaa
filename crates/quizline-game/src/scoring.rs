//! Points and rankings.

use tokio::time::Instant;

use crate::Player;

/// Points for an instant, correct answer.
pub const MAX_POINTS: u32 = 1000;

/// Points a submission is worth if it turns out to be correct.
///
/// Decays linearly from [`MAX_POINTS`] at the moment answering opened to
/// 0 at the time limit, rounded to the nearest integer. Returns 0 when
/// answering never opened or the limit is 0.
///
/// ```
/// use std::time::Duration;
/// use quizline_game::scoring::time_based_points;
/// use tokio::time::Instant;
///
/// let opened = Instant::now();
/// assert_eq!(time_based_points(Some(opened), 20, opened), 1000);
/// assert_eq!(time_based_points(Some(opened), 20, opened + Duration::from_secs(5)), 750);
/// assert_eq!(time_based_points(None, 20, opened), 0);
/// ```
pub fn time_based_points(opened_at: Option<Instant>, time_limit: u32, answered_at: Instant) -> u32 {
    let Some(opened_at) = opened_at else {
        return 0;
    };
    if time_limit == 0 {
        return 0;
    }
    let elapsed = answered_at.saturating_duration_since(opened_at).as_secs_f64();
    let max = f64::from(MAX_POINTS);
    let points = max - (max / f64::from(time_limit)) * elapsed;
    points.clamp(0.0, max).round() as u32
}

/// A player's place on the leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    /// 1-based.
    pub rank: usize,
    /// Username of the player directly above, `None` at rank 1.
    pub ahead_of_me: Option<String>,
}

/// Ranks players by points, best first.
///
/// The result is aligned with `players`: `placements[i]` belongs to
/// `players[i]`. Ties keep the input order, so equal scores still get
/// distinct consecutive ranks.
pub fn rank_players(players: &[Player]) -> Vec<Placement> {
    let mut order: Vec<usize> = (0..players.len()).collect();
    order.sort_by(|&a, &b| players[b].points.cmp(&players[a].points));

    let mut placements = vec![Placement::default(); players.len()];
    for (position, &index) in order.iter().enumerate() {
        placements[index] = Placement {
            rank: position + 1,
            ahead_of_me: position
                .checked_sub(1)
                .map(|above| players[order[above]].username.clone()),
        };
    }
    placements
}
