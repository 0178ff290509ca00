use std::sync::Arc;

use anyhow::Context;

use food_match::channels::CliChannel;
use food_match::config::{BotConfig, ValidationMode};
use food_match::flow::{FlowManager, Question};
use food_match::store::{Database, LibSqlBackend, MemoryBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the transcript on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = BotConfig::from_env().context("Failed to load configuration")?;

    let db: Arc<dyn Database> = match &config.db_path {
        Some(path) => Arc::new(
            LibSqlBackend::new_local(path)
                .await
                .with_context(|| format!("Failed to open database at {}", path.display()))?,
        ),
        None => Arc::new(MemoryBackend::new()),
    };

    eprintln!("🍽  FoodMatch v{}", env!("CARGO_PKG_VERSION"));
    match &config.db_path {
        Some(path) => eprintln!("   Database: {}", path.display()),
        None => eprintln!("   Database: in-memory"),
    }
    eprintln!("   Conversation: {}", config.conversation_id);
    if config.validation == ValidationMode::Strict {
        eprintln!("   Strict answers: on");
    }

    let manager = FlowManager::from_config(db, &config);
    match manager.status(&config.conversation_id, &config.user_id).await {
        Ok(status) if status.question != Question::None => {
            eprintln!("   Resuming at: {}", status.question);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Stored state unreadable: {e}"),
    }
    eprintln!("   Type anything to start. /quit to exit.\n");
    let channel = CliChannel::new(config.user_id.clone(), config.conversation_id.clone());
    manager.run(&channel).await?;

    Ok(())
}
