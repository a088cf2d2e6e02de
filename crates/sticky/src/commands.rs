//! User-facing sticky operations: set, remove, list, help, force-cleanup.
//!
//! Every command needs the Manage Messages permission. Errors never escape
//! [`CommandSurface::dispatch`]; they become a reply for the caller.

use std::sync::Arc;

use {
    chrono::Utc,
    tracing::{debug, error, info, warn},
};

use crate::{
    Error, Result,
    color::resolve_color,
    engine::{RefreshOutcome, StickyEngine},
    platform::{CardField, RichCard},
    types::{DEFAULT_COLOR, StickyConfig},
};

const PREVIEW_CHARS: usize = 50;
const LIST_COLOR: &str = "#00D4FF";
const HELP_COLOR: &str = "#7289DA";
const MANAGE_MESSAGES: &str = "Manage Messages";

/// Who invoked a command, and where.
#[derive(Debug, Clone)]
pub struct Invoker {
    pub user_id: String,
    pub guild_id: Option<String>,
    /// Channel the command was issued in; the default target.
    pub channel_id: String,
    pub can_manage_messages: bool,
}

/// Options for `set`. Unset options take their defaults.
#[derive(Debug, Clone, Default)]
pub struct SetRequest {
    pub content: String,
    pub channel_id: Option<String>,
    pub render_as_rich_card: Option<bool>,
    pub footer: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StickyCommand {
    Set(SetRequest),
    Remove { channel_id: Option<String> },
    List,
    Help,
    ForceCleanup { channel_id: Option<String> },
}

impl StickyCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set(_) => "set",
            Self::Remove { .. } => "remove",
            Self::List => "list",
            Self::Help => "help",
            Self::ForceCleanup { .. } => "force-cleanup",
        }
    }
}

/// What to show the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Text(String),
    Card(RichCard),
}

impl CommandReply {
    /// The reply's main text, for logs and tests.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Card(card) => &card.description,
        }
    }
}

pub struct CommandSurface {
    engine: Arc<StickyEngine>,
}

impl CommandSurface {
    pub fn new(engine: Arc<StickyEngine>) -> Self {
        Self { engine }
    }

    /// Run `command` for `invoker` and turn any failure into a reply.
    pub async fn dispatch(&self, invoker: &Invoker, command: StickyCommand) -> CommandReply {
        let name = command.name();
        debug!(command = name, user_id = %invoker.user_id, "handling sticky command");
        match self.execute(invoker, command).await {
            Ok(reply) => reply,
            Err(e) => error_reply(name, e),
        }
    }

    async fn execute(&self, invoker: &Invoker, command: StickyCommand) -> Result<CommandReply> {
        if !invoker.can_manage_messages {
            return Err(Error::permission_denied(MANAGE_MESSAGES));
        }
        match command {
            StickyCommand::Set(request) => self.set(invoker, request).await,
            StickyCommand::Remove { channel_id } => {
                self.remove(target(invoker, channel_id)).await
            },
            StickyCommand::List => self.list(invoker).await,
            StickyCommand::Help => Ok(CommandReply::Card(help_card())),
            StickyCommand::ForceCleanup { channel_id } => {
                self.force_cleanup(target(invoker, channel_id)).await
            },
        }
    }

    async fn set(&self, invoker: &Invoker, request: SetRequest) -> Result<CommandReply> {
        if request.content.trim().is_empty() {
            return Err(Error::invalid_input("Sticky content cannot be empty."));
        }
        let channel_id = target(invoker, request.channel_id);

        let mut config = StickyConfig::new(&channel_id, request.content, &invoker.user_id);
        config.render_as_rich_card = request.render_as_rich_card.unwrap_or(true);
        config.custom_footer_template = request.footer.filter(|f| !f.trim().is_empty());
        config.card_color = resolve_color(request.color.as_deref());

        self.engine.registry().upsert(config).await?;
        info!(channel_id, user_id = %invoker.user_id, "sticky message set");

        match self.engine.refresh_latest(&channel_id).await {
            RefreshOutcome::Posted { .. } | RefreshOutcome::Queued => Ok(CommandReply::Text(
                format!("✅ Sticky message set in <#{channel_id}>!"),
            )),
            outcome => {
                warn!(channel_id, ?outcome, "sticky set did not post");
                Ok(CommandReply::Text(
                    "❌ Failed to set sticky message. Please try again.".into(),
                ))
            },
        }
    }

    async fn remove(&self, channel_id: String) -> Result<CommandReply> {
        let Some(config) = self.engine.registry().get(&channel_id) else {
            return Err(Error::config_absent(channel_id));
        };

        if let Some(message_id) = config.last_message_id.as_deref() {
            let platform = self.engine.external();
            match platform.fetch_message(&channel_id, message_id).await {
                Ok(Some(_)) => {
                    if let Err(e) = platform.delete_message(&channel_id, message_id).await {
                        debug!(channel_id, message_id, error = %e, "could not delete sticky message");
                    }
                },
                Ok(None) => {},
                Err(e) => {
                    debug!(channel_id, message_id, error = %e, "could not fetch sticky message");
                },
            }
        }

        let state = self.engine.state();
        state.cancel_timer(&channel_id);
        state.evict_in_flight(&channel_id);
        self.engine.registry().remove(&channel_id).await?;

        info!(channel_id, "sticky message removed");
        Ok(CommandReply::Text(format!(
            "✅ Sticky message removed from <#{channel_id}>!"
        )))
    }

    async fn list(&self, invoker: &Invoker) -> Result<CommandReply> {
        let platform = self.engine.external();
        let mut lines = Vec::new();

        for config in self.engine.registry().list() {
            let channel = match platform.channel_info(&config.channel_id).await {
                Ok(channel) => channel,
                Err(e) => {
                    debug!(channel_id = %config.channel_id, error = %e, "skipping unlisted channel");
                    continue;
                },
            };
            if invoker.guild_id.is_none() || channel.guild_id != invoker.guild_id {
                continue;
            }
            lines.push(list_line(&channel.name, &config));
        }

        if lines.is_empty() {
            return Ok(CommandReply::Text(
                "📋 No sticky messages found in this server.".into(),
            ));
        }

        let mut card = RichCard::new(lines.join("\n"), LIST_COLOR);
        card.title = Some("📌 Sticky Messages in this Server".into());
        card.timestamp = Some(Utc::now());
        Ok(CommandReply::Card(card))
    }

    async fn force_cleanup(&self, channel_id: String) -> Result<CommandReply> {
        let deleted = self.engine.force_cleanup(&channel_id).await?;
        Ok(CommandReply::Text(format!(
            "✅ Force cleanup complete in <#{channel_id}>: deleted {deleted} bot message(s)."
        )))
    }
}

fn target(invoker: &Invoker, channel_id: Option<String>) -> String {
    channel_id.unwrap_or_else(|| invoker.channel_id.clone())
}

fn list_line(channel_name: &str, config: &StickyConfig) -> String {
    let preview = if config.content.chars().count() > PREVIEW_CHARS {
        let head: String = config.content.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        config.content.clone()
    };
    let kind = if config.render_as_rich_card {
        "📋 Embed"
    } else {
        "💬 Text"
    };
    let footer = if config.custom_footer_template.is_some() {
        " (Custom footer)"
    } else {
        ""
    };
    let color = if config.card_color != DEFAULT_COLOR {
        format!(" ({})", config.card_color)
    } else {
        String::new()
    };
    format!("**{channel_name}** {kind}{footer}{color}: {preview}")
}

fn error_reply(command: &str, err: Error) -> CommandReply {
    let text = match &err {
        Error::PermissionDenied { permission } => {
            format!("❌ You need the \"{permission}\" permission to use this command.")
        },
        Error::ConfigAbsent { channel_id } => {
            format!("❌ No sticky message found in <#{channel_id}>.")
        },
        Error::InvalidInput { message } => format!("❌ {message}"),
        _ => {
            error!(command, error = %err, "sticky command failed");
            "❌ An error occurred while processing the command.".to_string()
        },
    };
    CommandReply::Text(text)
}

fn help_card() -> RichCard {
    let field = |name: &str, value: &str| CardField {
        name: name.to_string(),
        value: value.to_string(),
    };
    let mut card = RichCard::new(
        "A bot that creates sticky messages that reappear at the bottom of a channel when new messages are sent.",
        HELP_COLOR,
    );
    card.title = Some("📌 Sticky Bot Help".into());
    card.footer = Some("Note: You need \"Manage Messages\" permission to use this bot".into());
    card.timestamp = Some(Utc::now());
    card.fields = vec![
        field(
            "/sticky-set",
            "Set a sticky message in a channel\n\
             `content`: The message content (supports Discord formatting)\n\
             `channel`: Target channel (optional)\n\
             `embed`: Display as embed (true/false, default: true)\n\
             `footer`: Custom footer text (optional)\n\
             `color`: Embed color (optional, default: yellow)",
        ),
        field(
            "📝 Supported Variables",
            "`{server_name}` - Server name\n\
             `{time}` - Current time\n\
             `{date}` - Current date\n\
             `{datetime}` - Date and time\n\
             `{channel_name}` - Channel name\n\
             `{member_count}` - Server member count",
        ),
        field(
            "🎨 Color Options",
            "Color names: `Red`, `Blue`, `Green`, `Purple`, `Orange`, `Pink`, `Discord`, `Blurple`\n\
             Hex codes: `#FF0000`, `#00FF00`, `#0000FF`\n\
             Default: `Yellow` (#FFFF00)",
        ),
        field(
            "/sticky-remove",
            "Remove a sticky message from a channel\n`channel`: Target channel (optional)",
        ),
        field("/sticky-list", "List all sticky messages in the server"),
        field("/sticky-help", "Show this help message"),
        field(
            "/sticky-force-cleanup",
            "Force cleanup ALL bot messages in a channel\n`channel`: Target channel (optional)",
        ),
    ];
    card
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            engine::EngineSettings,
            platform::MessagePayload,
            scheduler::DebounceScheduler,
            state::SchedulerState,
            store_memory::InMemoryStore,
            test_support::{BOT_ID, FakePlatform, GUILD_ID, registry_with},
        },
        std::time::Duration,
    };

    struct Harness {
        platform: Arc<FakePlatform>,
        store: Arc<InMemoryStore>,
        engine: Arc<StickyEngine>,
        commands: CommandSurface,
    }

    async fn harness(configs: Vec<StickyConfig>) -> Harness {
        let platform = FakePlatform::new();
        platform.add_channel("c1", "general");
        platform.add_channel("c2", "rules");
        platform.add_channel_in("x1", "elsewhere", "g2");
        let (store, registry) = registry_with(configs).await;
        let engine = StickyEngine::new(
            platform.clone(),
            registry,
            Arc::new(SchedulerState::new()),
            EngineSettings::default(),
        );
        Harness {
            platform,
            store,
            commands: CommandSurface::new(Arc::clone(&engine)),
            engine,
        }
    }

    fn admin() -> Invoker {
        Invoker {
            user_id: "u1".into(),
            guild_id: Some(GUILD_ID.into()),
            channel_id: "c1".into(),
            can_manage_messages: true,
        }
    }

    fn set(content: &str) -> StickyCommand {
        StickyCommand::Set(SetRequest {
            content: content.into(),
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn set_posts_once_and_tracks_the_post() {
        let h = harness(Vec::new()).await;

        let reply = h.commands.dispatch(&admin(), set("Welcome!")).await;

        assert_eq!(reply.text(), "✅ Sticky message set in <#c1>!");
        let sent = h.platform.sent();
        assert_eq!(sent.len(), 1);
        let MessagePayload::Card(card) = &sent[0].1 else {
            panic!("default is a card");
        };
        assert_eq!(card.description, "Welcome!");
        assert_eq!(card.color, DEFAULT_COLOR);

        let posted = h.platform.message_ids("c1");
        assert_eq!(posted.len(), 1);
        let stored = &h.store.snapshot()["c1"];
        assert_eq!(stored.last_message_id.as_deref(), Some(posted[0].as_str()));
        assert_eq!(stored.author_id, "u1");
    }

    #[tokio::test(start_paused = true)]
    async fn set_applies_options() {
        let h = harness(Vec::new()).await;
        let command = StickyCommand::Set(SetRequest {
            content: "Read {channel_name}".into(),
            channel_id: Some("c2".into()),
            render_as_rich_card: Some(false),
            footer: Some("Thanks!".into()),
            color: Some("blue".into()),
        });

        h.commands.dispatch(&admin(), command).await;

        let config = h.engine.registry().get("c2").unwrap();
        assert!(!config.render_as_rich_card);
        assert_eq!(config.card_color, "#0000FF");
        assert_eq!(
            h.platform.sent()[0].1,
            MessagePayload::Text("Read rules\n\n*Thanks!*".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_replaces_previous_post() {
        let h = harness(Vec::new()).await;
        h.commands.dispatch(&admin(), set("first")).await;
        h.commands.dispatch(&admin(), set("second")).await;

        assert_eq!(h.engine.registry().get("c1").unwrap().content, "second");
        assert_eq!(h.platform.history("c1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn set_reports_failed_post() {
        let h = harness(Vec::new()).await;
        h.platform.set_fail_sends(true);

        let reply = h.commands.dispatch(&admin(), set("Welcome!")).await;
        assert_eq!(
            reply.text(),
            "❌ Failed to set sticky message. Please try again."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn commands_require_manage_messages() {
        let h = harness(Vec::new()).await;
        let mut invoker = admin();
        invoker.can_manage_messages = false;

        let reply = h.commands.dispatch(&invoker, set("Welcome!")).await;

        assert_eq!(
            reply.text(),
            "❌ You need the \"Manage Messages\" permission to use this command."
        );
        assert!(h.engine.registry().is_empty());
        assert!(h.platform.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_content_is_rejected() {
        let h = harness(Vec::new()).await;
        let reply = h.commands.dispatch(&admin(), set("   ")).await;
        assert_eq!(reply.text(), "❌ Sticky content cannot be empty.");
        assert!(h.engine.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn remove_deletes_post_config_and_timer() {
        let h = harness(Vec::new()).await;
        h.commands.dispatch(&admin(), set("Welcome!")).await;
        let scheduler = DebounceScheduler::new(Arc::clone(&h.engine), Duration::from_secs(2), None);
        h.platform.push_message("c1", "alice", "hi");
        assert!(scheduler.on_activity("c1"));

        let reply = h
            .commands
            .dispatch(&admin(), StickyCommand::Remove { channel_id: None })
            .await;

        assert_eq!(reply.text(), "✅ Sticky message removed from <#c1>!");
        assert_eq!(h.platform.history("c1").len(), 1);
        assert!(!h.store.snapshot().contains_key("c1"));
        assert!(!h.engine.state().has_pending_timer("c1"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.platform.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_then_set_during_refresh_leaves_one_sticky() {
        let h = harness(vec![StickyConfig::new("c1", "old", "u")]).await;
        let first = {
            let engine = Arc::clone(&h.engine);
            tokio::spawn(async move { engine.refresh("c1").await })
        };
        // Inside the first refresh's settle delay.
        tokio::time::sleep(Duration::from_millis(100)).await;

        h.commands
            .dispatch(&admin(), StickyCommand::Remove { channel_id: None })
            .await;
        let reply = h.commands.dispatch(&admin(), set("new")).await;

        assert_eq!(reply.text(), "✅ Sticky message set in <#c1>!");
        assert_eq!(first.await.unwrap(), RefreshOutcome::Abandoned);

        let live = h.platform.history("c1");
        assert_eq!(live.len(), 1);
        assert_eq!(h.platform.sent().len(), 1);
        let MessagePayload::Card(card) = &h.platform.sent()[0].1 else {
            panic!("expected card");
        };
        assert_eq!(card.description, "new");
        assert_eq!(
            h.store.snapshot()["c1"].last_message_id.as_deref(),
            Some(live[0].id.as_str())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn set_during_send_is_posted_by_follow_up_pass() {
        let h = harness(vec![StickyConfig::new("c1", "old", "u")]).await;
        h.platform.set_send_delay(Duration::from_secs(1));
        let running = {
            let engine = Arc::clone(&h.engine);
            tokio::spawn(async move { engine.refresh("c1").await })
        };
        // Past settle: the running refresh is sending "old".
        tokio::time::sleep(Duration::from_millis(700)).await;

        let reply = h.commands.dispatch(&admin(), set("new")).await;
        assert_eq!(reply.text(), "✅ Sticky message set in <#c1>!");

        assert!(matches!(
            running.await.unwrap(),
            RefreshOutcome::Posted { .. }
        ));
        let live = h.platform.history("c1");
        assert_eq!(live.len(), 1);
        let sent = h.platform.sent();
        let MessagePayload::Card(card) = &sent.last().unwrap().1 else {
            panic!("expected card");
        };
        assert_eq!(card.description, "new");
        assert_eq!(
            h.store.snapshot()["c1"].last_message_id.as_deref(),
            Some(live[0].id.as_str())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remove_without_config_is_reported() {
        let h = harness(Vec::new()).await;
        let reply = h
            .commands
            .dispatch(&admin(), StickyCommand::Remove {
                channel_id: Some("c2".into()),
            })
            .await;
        assert_eq!(reply.text(), "❌ No sticky message found in <#c2>.");
    }

    #[tokio::test(start_paused = true)]
    async fn list_shows_only_this_server() {
        let mut custom = StickyConfig::new("c2", &"x".repeat(60), "u");
        custom.render_as_rich_card = false;
        custom.custom_footer_template = Some("f".into());
        custom.card_color = "#FF0000".into();
        let h = harness(vec![
            StickyConfig::new("c1", "Welcome!", "u"),
            custom,
            StickyConfig::new("x1", "other server", "u"),
            StickyConfig::new("deleted", "gone", "u"),
        ])
        .await;

        let CommandReply::Card(card) = h.commands.dispatch(&admin(), StickyCommand::List).await
        else {
            panic!("expected card");
        };

        let expected = format!(
            "**general** 📋 Embed: Welcome!\n**rules** 💬 Text (Custom footer) (#FF0000): {}...",
            "x".repeat(50)
        );
        assert_eq!(card.description, expected);
        assert_eq!(card.title.as_deref(), Some("📌 Sticky Messages in this Server"));
    }

    #[tokio::test(start_paused = true)]
    async fn list_empty_server() {
        let h = harness(vec![StickyConfig::new("x1", "other", "u")]).await;
        let reply = h.commands.dispatch(&admin(), StickyCommand::List).await;
        assert_eq!(reply.text(), "📋 No sticky messages found in this server.");
    }

    #[tokio::test(start_paused = true)]
    async fn help_is_static_card() {
        let h = harness(Vec::new()).await;
        let CommandReply::Card(card) = h.commands.dispatch(&admin(), StickyCommand::Help).await
        else {
            panic!("expected card");
        };
        assert!(card.fields.iter().any(|f| f.name == "/sticky-set"));
        assert!(card.fields.iter().any(|f| f.value.contains("{member_count}")));
        assert!(h.store.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn force_cleanup_counts_deleted_messages() {
        let h = harness(Vec::new()).await;
        h.platform.push_message("c1", BOT_ID, "old reply");
        h.platform.push_message("c1", BOT_ID, "another");
        h.platform.push_message("c1", "alice", "hi");

        let reply = h
            .commands
            .dispatch(&admin(), StickyCommand::ForceCleanup { channel_id: None })
            .await;

        assert_eq!(
            reply.text(),
            "✅ Force cleanup complete in <#c1>: deleted 2 bot message(s)."
        );
        assert_eq!(h.platform.history("c1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn platform_errors_become_generic_reply() {
        let h = harness(Vec::new()).await;
        h.platform.set_fail_history(true);

        let reply = h
            .commands
            .dispatch(&admin(), StickyCommand::ForceCleanup { channel_id: None })
            .await;
        assert_eq!(
            reply.text(),
            "❌ An error occurred while processing the command."
        );
    }
}
