use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use writer_assist::config::{load_config, AssistConfig};
use writer_assist::replay::{run_script, ReplayScript};

#[derive(Parser)]
#[command(name = "writer-assist", about = "Speculative assistant edits for a live document")]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scripted session against an in-memory document
    Replay {
        script: PathBuf,

        /// Config file; defaults to WRITER_ASSIST_CONFIG_PATH or the repo config
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "writer_assist=info".into());
    let json_layer = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// `.env` from the working directory or its nearest ancestor, if any.
fn load_env_file() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment from .env"),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    // Before config loading so WRITER_ASSIST_CONFIG_PATH can come from .env
    load_env_file();

    match cli.command {
        Command::Replay { script, config } => {
            let config = match config {
                Some(path) => AssistConfig::from_path(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => load_config(),
            };
            let script = ReplayScript::from_path(&script)?;

            tracing::info!(
                steps = script.steps.len(),
                policy = ?config.compensation_policy,
                "Starting replay"
            );
            let outcome = run_script(&script, config);
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
