//! Discord event handler for serenity.
//!
//! Feeds channel activity into the debounce scheduler and routes slash
//! commands to the sticky command surface.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    serenity::{
        all::{
            ActivityData, Command, CommandInteraction, Context, EditInteractionResponse,
            EventHandler, GatewayIntents, Interaction, Message, Ready,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use stickybot_sticky::{
    CommandReply, CommandSurface, DebounceScheduler, Invoker, StickyEngine,
};

use crate::{
    commands::{self, option_values},
    platform::{DiscordPlatform, create_embed},
};

const PRESENCE: &str = "Sticky Messages";

/// Handler for Discord gateway events.
pub struct StickyHandler {
    platform: Arc<DiscordPlatform>,
    engine: Arc<StickyEngine>,
    scheduler: Arc<DebounceScheduler>,
    commands: CommandSurface,
    started: AtomicBool,
}

impl StickyHandler {
    pub fn new(
        platform: Arc<DiscordPlatform>,
        engine: Arc<StickyEngine>,
        scheduler: Arc<DebounceScheduler>,
    ) -> Self {
        Self {
            platform,
            commands: CommandSurface::new(Arc::clone(&engine)),
            engine,
            scheduler,
            started: AtomicBool::new(false),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    async fn handle_command(&self, ctx: &Context, interaction: CommandInteraction) {
        let name = interaction.data.name.as_str();
        let options = option_values(&interaction.data.options);
        let Some(command) = commands::parse(name, &options) else {
            warn!(command = name, "unknown slash command");
            return;
        };

        let invoker = Invoker {
            user_id: interaction.user.id.to_string(),
            guild_id: interaction.guild_id.map(|id| id.to_string()),
            channel_id: interaction.channel_id.to_string(),
            can_manage_messages: interaction
                .member
                .as_ref()
                .and_then(|member| member.permissions)
                .is_some_and(|permissions| permissions.manage_messages()),
        };

        if let Err(e) = interaction.defer_ephemeral(&ctx.http).await {
            warn!(command = name, error = %e, "failed to acknowledge slash command");
            return;
        }

        let response = match self.commands.dispatch(&invoker, command).await {
            CommandReply::Text(text) => EditInteractionResponse::new().content(text),
            CommandReply::Card(card) => EditInteractionResponse::new().embed(create_embed(card)),
        };
        if let Err(e) = interaction.edit_response(&ctx.http, response).await {
            warn!(command = name, error = %e, "failed to send command response");
        }
    }
}

#[async_trait]
impl EventHandler for StickyHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        self.platform
            .attach(ctx.http.clone(), ctx.cache.clone(), ready.user.id);
        ctx.set_activity(Some(ActivityData::watching(PRESENCE)));

        match Command::set_global_commands(&ctx.http, commands::definitions()).await {
            Ok(registered) => info!(count = registered.len(), "registered slash commands"),
            Err(e) => warn!(error = %e, "failed to register slash commands"),
        }

        // Gateway reconnects fire `ready` again; the startup pass runs once.
        if !self.started.swap(true, Ordering::SeqCst) {
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                engine.run_startup().await;
            });
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        // Skip bot messages, our own sticky posts included.
        if msg.author.bot {
            return;
        }

        let channel_id = msg.channel_id.to_string();
        if self.scheduler.on_activity(&channel_id) {
            debug!(channel_id, "scheduled sticky refresh");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            self.handle_command(&ctx, command).await;
        }
    }
}
