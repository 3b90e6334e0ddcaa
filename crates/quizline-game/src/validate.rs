//! Input validation for player-supplied values.

use crate::{GameConfig, GameError};

/// Checks a username against the configured length bounds.
///
/// Length is counted in characters after trimming surrounding
/// whitespace. Returns the trimmed name on success.
pub fn validate_username(username: &str, config: &GameConfig) -> Result<String, GameError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(GameError::InvalidUsername("Username is required".to_owned()));
    }
    let len = trimmed.chars().count();
    if len < config.username_min_len {
        return Err(GameError::InvalidUsername(format!(
            "Username cannot be less than {} characters",
            config.username_min_len
        )));
    }
    if len > config.username_max_len {
        return Err(GameError::InvalidUsername(format!(
            "Username cannot exceed {} characters",
            config.username_max_len
        )));
    }
    Ok(trimmed.to_owned())
}
