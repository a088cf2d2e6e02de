use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    stickybot_config::{StickyBotConfig, apply_env_overrides, default_data_file, discover_and_load},
    stickybot_discord::{BotOptions, DiscordPlatform},
    stickybot_sticky::{
        EngineSettings, SchedulerState, StickyEngine, StickyRegistry, store_file::FileStore,
    },
};

const PREVIEW_CHARS: usize = 50;

#[derive(Parser)]
#[command(
    name = "stickybot",
    about = "Keeps a sticky message at the bottom of Discord channels"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (skips discovery in ./ and ~/.config/stickybot/).
    #[arg(long, global = true, env = "STICKYBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Sticky data file (overrides config and STICKYBOT_DATA_FILE).
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and maintain sticky messages (default).
    Run,
    /// Print the persisted sticky configurations and exit.
    List,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StickyBotConfig> {
    let mut config = discover_and_load(cli.config.as_deref())?;
    apply_env_overrides(&mut config);
    if let Some(path) = &cli.data_file {
        config.storage.data_file = Some(path.clone());
    }
    Ok(config)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn engine_settings(config: &StickyBotConfig) -> EngineSettings {
    let timing = &config.timing;
    let scan = &config.scan;
    EngineSettings {
        settle: ms(timing.settle_ms),
        refresh_scan_limit: scan.refresh_limit,
        startup_scan_limit: scan.startup_limit,
        force_cleanup_scan_limit: scan.force_cleanup_limit,
        refresh_delete_spacing: ms(timing.refresh_delete_spacing_ms),
        startup_delete_spacing: ms(timing.startup_delete_spacing_ms),
        startup_grace: ms(timing.startup_grace_ms),
        post_sweep_grace: ms(timing.post_sweep_grace_ms),
        channel_spacing: ms(timing.channel_spacing_ms),
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received"),
        _ = terminate => info!("SIGTERM received"),
    }
}

async fn run(config: StickyBotConfig) -> anyhow::Result<()> {
    if !config.discord.has_token() {
        anyhow::bail!("no discord token configured (set DISCORD_TOKEN or discord.token)");
    }

    let data_file = default_data_file(&config);
    let registry = Arc::new(StickyRegistry::load(Arc::new(FileStore::new(&data_file))).await?);
    info!(
        path = %data_file.display(),
        configs = registry.len(),
        "loaded sticky data"
    );

    let platform = DiscordPlatform::new();
    let engine = StickyEngine::new(
        platform.clone(),
        registry,
        Arc::new(SchedulerState::new()),
        engine_settings(&config),
    );
    let options = BotOptions {
        token: config.discord.token.clone(),
        debounce: ms(config.timing.debounce_ms),
        debounce_max_wait: config.timing.debounce_max_wait_ms.map(ms),
    };

    stickybot_discord::run(options, platform, engine, shutdown_signal()).await?;
    Ok(())
}

async fn list(config: StickyBotConfig) -> anyhow::Result<()> {
    let data_file = default_data_file(&config);
    let registry = StickyRegistry::load(Arc::new(FileStore::new(&data_file))).await?;

    if registry.is_empty() {
        println!("No sticky messages in {}", data_file.display());
        return Ok(());
    }

    println!("{} sticky message(s) in {}", registry.len(), data_file.display());
    for config in registry.list() {
        let kind = if config.render_as_rich_card {
            "embed"
        } else {
            "text"
        };
        let mut preview: String = config.content.chars().take(PREVIEW_CHARS).collect();
        if config.content.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        println!(
            "  {}  {:<5}  {}  last={}  {}",
            config.channel_id,
            kind,
            config.card_color,
            config.last_message_id.as_deref().unwrap_or("-"),
            preview.replace('\n', " "),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = load_config(&cli)?;
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::List => list(config).await,
    }
}
