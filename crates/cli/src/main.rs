//! Valet CLI: the main entry point.
//!
//! Commands:
//! - `turn`  : Process one message and stream progress as NDJSON
//! - `doctor`: Check configuration and model endpoint reachability

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use valet_agent::{TurnRequest, TurnRunner};
use valet_config::AppConfig;
use valet_core::history::HistoryStore;
use valet_core::message::SessionId;
use valet_core::model::ModelClient;
use valet_providers::ChatCompletionsClient;
use valet_storage::{InMemoryHistory, InMemoryMemory, SqliteHistory};
use valet_tools::default_dispatcher;

/// The default system prompt. Keeps the tool library in sync with the
/// executors registered by `default_dispatcher`.
const SYSTEM_PROMPT: &str = r#"You are Valet, a personal assistant. You help with everyday tasks: reminders, calculations, research, planning, and organization.

Rules:
- Use tools immediately. Do not announce them; output only the JSON action.
- Be concise and direct in final answers.

Tool call format: {"tool": "name", "parameter_key": "value", "private": false}
Root-level parameters only, no nesting under 'param'.

Tools:
1. search: {"query": "..."} - Web search
2. scrape: {"url": "..."} - Extract text from a URL
3. sandbox: {"code": "..."} - Execute Python; use print() for output
4. command: {"command": "..."} - Shell commands
5. manage_notes: {"action": "create|search|update|delete|categories", "title": "...", "content": "...", "category": "General"}
6. manage_calendar: {"action": "add|list|remove|update", "title": "...", "start": "YYYY-MM-DD HH:MM"}
7. manage_wallet: {"action": "balance|history|prepare_transfer", ...}
8. image_search: {"query": "..."} - Find images
9. vision_analyze: {"image_path": "...", "image_url": "...", "prompt": "..."} - Analyze images
10. osint_lookup: {"target": "...", "type": "username|domain|email"}
11. get_time: {} - Current time
12. get_weather: {"city": "..."} - Weather info

When you have the answer, reply with plain text and no JSON object."#;

#[derive(Parser)]
#[command(
    name = "valet",
    about = "Valet: personal assistant agent runtime",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one message and stream progress events as NDJSON
    Turn {
        /// The user message
        message: String,

        /// Session id for durable history across invocations
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Check configuration and model endpoint reachability
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the NDJSON stream on stdout stays clean
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::Turn { message, session } => run_turn(config, message, session).await,
        Commands::Doctor => doctor(config).await,
    }
}

async fn run_turn(
    config: AppConfig,
    message: String,
    session: Option<String>,
) -> anyhow::Result<()> {
    let Some(api_key) = config.api_key.clone() else {
        bail!("No API key configured. Set VALET_API_KEY or api_key in config.toml");
    };

    let model = Arc::new(ChatCompletionsClient::new(
        "valet",
        &config.api_url,
        api_key,
    )?);

    let memory = Arc::new(InMemoryMemory::new());
    let dispatcher = Arc::new(default_dispatcher(Some(memory.clone())));

    let history: Arc<dyn HistoryStore> = match config.history.backend.as_str() {
        "sqlite" => {
            let path = expand_home(&config.history.sqlite_path);
            Arc::new(
                SqliteHistory::new(&path)
                    .await
                    .context("Failed to open history database")?,
            )
        }
        _ => Arc::new(InMemoryHistory::new()),
    };

    let runner = TurnRunner::new(
        model,
        config.model.clone(),
        dispatcher,
        config.agent.clone(),
    )
    .with_history(history)
    .with_memory(memory);

    let mut request = TurnRequest::new(message, SYSTEM_PROMPT);
    if let Some(id) = session {
        request = request.with_session(SessionId::from(&id));
    }

    let mut rx = runner.run(request);
    let mut stdout = std::io::stdout().lock();
    while let Some(event) = rx.recv().await {
        stdout.write_all(event.to_ndjson().as_bytes())?;
        stdout.flush()?;
    }

    Ok(())
}

async fn doctor(config: AppConfig) -> anyhow::Result<()> {
    println!("Valet doctor");
    println!("  endpoint: {}", config.api_url);
    println!("  model:    {}", config.model);
    println!(
        "  api key:  {}",
        if config.has_api_key() {
            "configured"
        } else {
            "MISSING (set VALET_API_KEY)"
        }
    );

    let Some(api_key) = config.api_key.clone() else {
        return Ok(());
    };

    let client = ChatCompletionsClient::new("valet", &config.api_url, api_key)?;
    match client.health_check().await {
        Ok(true) => println!("  endpoint reachable: yes"),
        Ok(false) => println!("  endpoint reachable: no (non-success status)"),
        Err(e) => println!("  endpoint reachable: no ({e})"),
    }

    Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            format!("{home}/{rest}")
        }
        None => path.to_string(),
    }
}
