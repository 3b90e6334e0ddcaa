//! Server settings, read from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quizline_game::{BankQuestion, GameConfig};

use crate::QuizlineError;

/// Question bank used when no file is configured.
const SAMPLE_BANK: &str = include_str!("../assets/questions.json");

/// Connection-level settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,

    /// How often the server pings an idle connection.
    pub ping_interval: Duration,

    /// A connection that sends nothing (not even a pong) for this long is
    /// dropped.
    pub idle_timeout: Duration,

    /// JSON file holding the question bank. The built-in sample deck is
    /// used when unset.
    pub questions_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".to_owned(),
            ping_interval: Duration::from_secs(25),
            idle_timeout: Duration::from_secs(60),
            questions_path: None,
        }
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub game: GameConfig,
}

impl Settings {
    /// Reads `QUIZLINE_BIND`, `QUIZLINE_PASSWORD`, `QUIZLINE_SUBJECT`, and
    /// `QUIZLINE_QUESTIONS`, falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(bind) = lookup("QUIZLINE_BIND") {
            settings.server.bind_addr = bind;
        }
        if let Some(path) = lookup("QUIZLINE_QUESTIONS") {
            settings.server.questions_path = Some(PathBuf::from(path));
        }
        if let Some(password) = lookup("QUIZLINE_PASSWORD") {
            settings.game.password = password;
        }
        if let Some(subject) = lookup("QUIZLINE_SUBJECT") {
            settings.game.subject = subject;
        }
        settings
    }
}

/// Loads the question bank from `path`, or the built-in sample deck.
pub fn load_question_bank(path: Option<&Path>) -> Result<Vec<BankQuestion>, QuizlineError> {
    let Some(path) = path else {
        return parse_bank(SAMPLE_BANK);
    };
    let text = std::fs::read_to_string(path).map_err(|source| QuizlineError::BankIo {
        path: path.display().to_string(),
        source,
    })?;
    let bank = parse_bank(&text)?;
    tracing::info!(path = %path.display(), questions = bank.len(), "question bank loaded");
    Ok(bank)
}

fn parse_bank(text: &str) -> Result<Vec<BankQuestion>, QuizlineError> {
    serde_json::from_str(text).map_err(QuizlineError::BankFormat)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults_without_environment() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings.server.bind_addr, "127.0.0.1:3100");
        assert_eq!(settings.server.ping_interval, Duration::from_secs(25));
        assert_eq!(settings.server.idle_timeout, Duration::from_secs(60));
        assert_eq!(settings.game.password, "PASSWORD");
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = [
            ("QUIZLINE_BIND", "0.0.0.0:9000"),
            ("QUIZLINE_PASSWORD", "hunter2"),
            ("QUIZLINE_SUBJECT", "Geography"),
            ("QUIZLINE_QUESTIONS", "/tmp/bank.json"),
        ]
        .into_iter()
        .collect();

        let settings = Settings::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(settings.game.password, "hunter2");
        assert_eq!(settings.game.subject, "Geography");
        assert_eq!(settings.server.questions_path, Some(PathBuf::from("/tmp/bank.json")));
    }

    #[test]
    fn test_sample_bank_is_playable() {
        let bank = load_question_bank(None).unwrap();
        assert!(!bank.is_empty());
        assert!(bank.iter().all(BankQuestion::is_playable));
    }

    #[test]
    fn test_missing_bank_file_is_reported() {
        let result = load_question_bank(Some(Path::new("/nonexistent/quizline/bank.json")));
        assert!(matches!(result, Err(QuizlineError::BankIo { .. })));
    }

    #[test]
    fn test_malformed_bank_is_reported() {
        assert!(matches!(parse_bank("{\"not\": \"a list\"}"), Err(QuizlineError::BankFormat(_))));
    }

    #[test]
    fn test_bank_time_is_optional() {
        let bank = parse_bank(
            r#"[{ "question": "1 + 1?", "answers": ["1", "2"], "solution": 1 }]"#,
        )
        .unwrap();
        assert_eq!(bank[0].time, None);
        assert_eq!(bank[0].image, None);
    }
}
