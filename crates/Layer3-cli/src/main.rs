//! PlugForge CLI - Main entry point

use clap::{Parser, Subcommand};
use plugforge_core::engine::EngineConfig;
use plugforge_core::{Command as EngineCommand, DirHost, HttpTransport, PackageEngine};
use plugforge_foundation::JsonStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PlugForge - transactional plugin package manager
#[derive(Parser, Debug)]
#[command(name = "plugforge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration directory (defaults to the per-user config dir)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Plugin install directory
    #[arg(long, default_value = "plugins")]
    plugin_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install a plugin (and its required dependencies)
    Install {
        /// Plugin name, optionally `category/name`
        name: String,

        /// Pinned version ("*" = latest)
        #[arg(default_value = "*")]
        version: String,
    },
    /// Update installed plugins (all required plugins when no names given)
    Update {
        names: Vec<String>,

        /// Pin the update to a specific version instead of latest
        #[arg(long)]
        version: Option<String>,
    },
    /// Remove plugins
    Remove { names: Vec<String> },
    /// Validate the dependency graph of all required plugins
    Validate,
    /// Search configured sources
    Search { terms: String },
    /// Report drift for all required plugins
    Status,
    /// Report drift for specific plugins
    Check { names: Vec<String> },
    /// Register loaded-but-unrequired plugins
    Sync,
    /// Show a plugin's descriptor
    Info { name: String },
    /// List sources, or toggle one on/off
    Source { url: Option<String> },
    /// Toggle or set the persisted debug flag
    Debug {
        #[arg(value_parser = clap::value_parser!(bool))]
        enabled: Option<bool>,
    },
}

impl Command {
    fn into_engine_command(self) -> EngineCommand {
        match self {
            Command::Install { name, version } => EngineCommand::Install { name, version },
            Command::Update { names, version } => EngineCommand::Update { names, version },
            Command::Remove { names } => EngineCommand::Remove { names },
            Command::Validate => EngineCommand::Validate,
            Command::Search { terms } => EngineCommand::Search { terms },
            Command::Status => EngineCommand::Status,
            Command::Check { names } => EngineCommand::Check { names },
            Command::Sync => EngineCommand::Sync,
            Command::Info { name } => EngineCommand::Info { name },
            Command::Source { url } => EngineCommand::Source { url },
            Command::Debug { enabled } => EngineCommand::Debug { enabled },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_store = match args.config_dir {
        Some(dir) => JsonStore::new(dir),
        None => JsonStore::global()?,
    };

    let transport = Arc::new(HttpTransport::new()?);
    let host = Arc::new(DirHost::new(&args.plugin_dir));
    let config = EngineConfig {
        plugin_dir: args.plugin_dir,
        ..EngineConfig::default()
    };

    let engine = PackageEngine::new(config_store, transport, host, config)?;
    engine.initialize().await?;

    // 단일 워커가 커맨드를 처리하고, 큐가 닫히면 소진 후 종료한다
    let (queue, worker) = plugforge_core::queue::spawn(engine);
    if !queue.enqueue(args.command.into_engine_command()) {
        anyhow::bail!("command worker is not running");
    }
    drop(queue);
    worker.join().await?;
    debug!("Command worker finished");

    Ok(())
}
