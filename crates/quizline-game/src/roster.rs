//! The players of one session, in join order.

use quizline_protocol::{ChannelId, PlayerId, PlayerSummary};

/// One joined player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    /// The connection the player joined from.
    pub channel: ChannelId,
    /// Cumulative points.
    pub points: u32,
}

impl Player {
    pub fn new(id: PlayerId, username: impl Into<String>, channel: ChannelId) -> Self {
        Self {
            id,
            username: username.into(),
            channel,
            points: 0,
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            username: self.username.clone(),
            points: self.points,
        }
    }
}

/// Ordered set of players.
///
/// Join order is kept; it breaks ties on every leaderboard.
#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn as_slice(&self) -> &[Player] {
        &self.players
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn by_channel(&self, channel: ChannelId) -> Option<&Player> {
        self.players.iter().find(|p| p.channel == channel)
    }

    /// Exact, case-sensitive match.
    pub fn has_username(&self, username: &str) -> bool {
        self.players.iter().any(|p| p.username == username)
    }

    pub fn add(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    pub fn remove_by_channel(&mut self, channel: ChannelId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.channel == channel)?;
        Some(self.players.remove(index))
    }

    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.players.iter().map(|p| p.channel)
    }

    /// Every player, best first. Ties keep join order.
    pub fn leaderboard(&self) -> Vec<PlayerSummary> {
        let mut ordered: Vec<&Player> = self.players.iter().collect();
        ordered.sort_by(|a, b| b.points.cmp(&a.points));
        ordered.into_iter().map(Player::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_of(points: &[(&str, u32)]) -> Roster {
        let mut roster = Roster::new();
        for (i, (name, pts)) in points.iter().enumerate() {
            let mut player = Player::new(PlayerId(i as u64 + 1), *name, ChannelId::new(i as u64 + 10));
            player.points = *pts;
            roster.add(player);
        }
        roster
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut roster = roster_of(&[("a", 0), ("b", 0), ("c", 0)]);
        let removed = roster.remove(PlayerId(2)).unwrap();
        assert_eq!(removed.username, "b");

        let names: Vec<_> = roster.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert!(roster.remove(PlayerId(2)).is_none());
    }

    #[test]
    fn test_lookup_by_channel() {
        let mut roster = roster_of(&[("a", 0), ("b", 0)]);
        assert_eq!(roster.by_channel(ChannelId::new(11)).unwrap().username, "b");

        let removed = roster.remove_by_channel(ChannelId::new(10)).unwrap();
        assert_eq!(removed.id, PlayerId(1));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_username_match_is_case_sensitive() {
        let roster = roster_of(&[("Ada", 0)]);
        assert!(roster.has_username("Ada"));
        assert!(!roster.has_username("ada"));
    }

    #[test]
    fn test_leaderboard_ties_keep_join_order() {
        let roster = roster_of(&[("a", 50), ("b", 80), ("c", 50)]);
        let names: Vec<_> = roster
            .leaderboard()
            .into_iter()
            .map(|p| p.username)
            .collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}
