use std::{future::Future, sync::Arc, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serenity::Client,
    tracing::info,
};

use stickybot_sticky::{DebounceScheduler, StickyEngine};

use crate::{
    Error, Result,
    handler::StickyHandler,
    platform::DiscordPlatform,
};

pub struct BotOptions {
    pub token: Secret<String>,
    /// Quiet period after the last message before a refresh.
    pub debounce: Duration,
    /// Upper bound on how long a burst can postpone a refresh.
    pub debounce_max_wait: Option<Duration>,
}

/// Connect to the gateway and serve until `shutdown` resolves.
///
/// On shutdown every pending debounce timer is cancelled before the shards
/// are closed, so no refresh starts after the signal.
pub async fn run<F>(
    options: BotOptions,
    platform: Arc<DiscordPlatform>,
    engine: Arc<StickyEngine>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = options.token.expose_secret();
    if token.trim().is_empty() {
        return Err(Error::message("discord token is not configured"));
    }

    let scheduler = Arc::new(DebounceScheduler::new(
        Arc::clone(&engine),
        options.debounce,
        options.debounce_max_wait,
    ));
    let handler = StickyHandler::new(platform, engine, Arc::clone(&scheduler));

    let mut client = Client::builder(token, StickyHandler::intents())
        .event_handler(handler)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        shutdown.await;
        let cancelled = scheduler.shutdown();
        info!(cancelled, "shutting down discord client");
        shard_manager.shutdown_all().await;
    });

    info!("connecting to discord gateway");
    client.start().await?;
    info!("discord client stopped");
    Ok(())
}
