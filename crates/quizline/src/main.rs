use quizline::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), QuizlineError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();
    let bank = load_question_bank(settings.server.questions_path.as_deref())?;

    let server = QuizServer::builder()
        .server_config(settings.server)
        .game_config(settings.game)
        .build(MemoryStore::new(bank))
        .await?;
    tracing::info!(addr = %server.local_addr().map_err(TransportError::AcceptFailed)?, "listening");
    server.run().await
}
