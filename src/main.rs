//! relaybot binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use relaybot::backend::{Backend, OpenAiBackend};
use relaybot::cache::ResponseCache;
use relaybot::config::Config;
use relaybot::logging::init_logging;
use relaybot::pipeline::MessagePipeline;
use relaybot::transcript::{MemoryTranscriptStore, PgTranscriptStore, TranscriptStore};
use relaybot::transport::telegram::run_polling;
use relaybot::transport::TelegramTransport;

#[derive(Parser)]
#[command(name = "relaybot", version, about = "Telegram to LLM relay bot")]
struct Cli {
    /// Config file (default: ~/.relaybot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the bot with long polling (default)
    Run,
    /// Create the transcript table and exit
    InitDb,
    /// Send one prompt to the backend and print the reply
    Ask {
        /// Prompt text
        text: String,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => cmd_run(config).await,
        Command::InitDb => cmd_init_db(config).await,
        Command::Ask { text } => cmd_ask(config, &text).await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(())
        }
    }
}

async fn cmd_run(config: Config) -> Result<()> {
    config.validate_for_run()?;
    info!("Bot is initializing");

    let transcripts = open_transcripts(&config).await?;
    let backend: Arc<dyn Backend> = Arc::new(OpenAiBackend::from_config(&config.backend)?);
    let token = config
        .telegram_token()
        .context("telegram token missing after validation")?;
    let transport = TelegramTransport::from_token(token);
    let bot = transport.bot().clone();

    let pipeline = Arc::new(MessagePipeline::new(
        Arc::new(ResponseCache::new(
            config.cache.limits(),
            config.cache.read_policy,
        )),
        backend,
        transcripts,
        Arc::new(transport),
        config.presence.interval(),
    ));

    run_polling(bot, Arc::clone(&pipeline)).await;

    let stats = pipeline.cache().stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        stores = stats.stores,
        "Bot shutdown complete"
    );
    Ok(())
}

async fn open_transcripts(config: &Config) -> Result<Arc<dyn TranscriptStore>> {
    if config.database.url.is_none() {
        warn!("database.url is not set; transcript is kept in memory only");
        return Ok(Arc::new(MemoryTranscriptStore::new()));
    }
    let store = PgTranscriptStore::connect(&config.database)
        .await
        .context("Failed to connect to transcript database")?;
    store
        .ensure_schema()
        .await
        .context("Failed to create messages table")?;
    Ok(Arc::new(store))
}

async fn cmd_init_db(config: Config) -> Result<()> {
    let store = PgTranscriptStore::connect(&config.database)
        .await
        .context("Failed to connect to transcript database")?;
    store
        .ensure_schema()
        .await
        .context("Failed to create messages table")?;
    store.close().await;
    println!("messages table ready.");
    Ok(())
}

async fn cmd_ask(config: Config, text: &str) -> Result<()> {
    config.validate_backend()?;
    let backend = OpenAiBackend::from_config(&config.backend)?;
    let reply = backend.generate(text).await?;
    println!("{}", reply);
    Ok(())
}
