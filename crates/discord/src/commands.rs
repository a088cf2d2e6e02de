//! Slash command definitions and option parsing.

use serenity::all::{
    ChannelType, CommandDataOption, CommandDataOptionValue, CommandOptionType, CreateCommand,
    CreateCommandOption, Permissions,
};

use stickybot_sticky::{SetRequest, StickyCommand};

pub const SET: &str = "sticky-set";
pub const REMOVE: &str = "sticky-remove";
pub const LIST: &str = "sticky-list";
pub const HELP: &str = "sticky-help";
pub const FORCE_CLEANUP: &str = "sticky-force-cleanup";

/// A slash command option value, detached from serenity's types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Flag(bool),
    Channel(String),
}

/// Commands registered globally at startup.
pub fn definitions() -> Vec<CreateCommand> {
    let channel_option = |description: &str| {
        CreateCommandOption::new(CommandOptionType::Channel, "channel", description)
            .channel_types(vec![ChannelType::Text, ChannelType::News])
            .required(false)
    };
    let manage = |command: CreateCommand| {
        command.default_member_permissions(Permissions::MANAGE_MESSAGES)
    };

    vec![
        manage(
            CreateCommand::new(SET)
                .description("Set a sticky message in a channel")
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "content",
                        "The message content (supports Discord formatting and variables)",
                    )
                    .required(true),
                )
                .add_option(channel_option(
                    "Channel to set the sticky message in (defaults to current channel)",
                ))
                .add_option(CreateCommandOption::new(
                    CommandOptionType::Boolean,
                    "embed",
                    "Display as embed (default: true)",
                ))
                .add_option(CreateCommandOption::new(
                    CommandOptionType::String,
                    "footer",
                    "Custom footer text (supports variables)",
                ))
                .add_option(CreateCommandOption::new(
                    CommandOptionType::String,
                    "color",
                    "Embed color (hex code or color name, default: yellow)",
                )),
        ),
        manage(
            CreateCommand::new(REMOVE)
                .description("Remove a sticky message from a channel")
                .add_option(channel_option(
                    "Channel to remove the sticky message from (defaults to current channel)",
                )),
        ),
        manage(CreateCommand::new(LIST).description("List all sticky messages in this server")),
        manage(CreateCommand::new(HELP).description("Show help for the sticky bot")),
        manage(
            CreateCommand::new(FORCE_CLEANUP)
                .description("Delete all bot messages in a channel")
                .add_option(channel_option(
                    "Channel to clean up (defaults to current channel)",
                )),
        ),
    ]
}

/// Flatten serenity's option tree into name/value pairs. Unsupported kinds are dropped.
pub fn option_values(options: &[CommandDataOption]) -> Vec<(String, OptionValue)> {
    options
        .iter()
        .filter_map(|option| {
            let value = match &option.value {
                CommandDataOptionValue::String(text) => OptionValue::Text(text.clone()),
                CommandDataOptionValue::Boolean(flag) => OptionValue::Flag(*flag),
                CommandDataOptionValue::Channel(id) => OptionValue::Channel(id.to_string()),
                _ => return None,
            };
            Some((option.name.clone(), value))
        })
        .collect()
}

/// Translate a slash command into a [`StickyCommand`]. `None` for unknown names
/// or a `set` without content.
pub fn parse(name: &str, options: &[(String, OptionValue)]) -> Option<StickyCommand> {
    let text = |key: &str| {
        options.iter().find_map(|(name, value)| match value {
            OptionValue::Text(text) if name == key => Some(text.clone()),
            _ => None,
        })
    };
    let flag = |key: &str| {
        options.iter().find_map(|(name, value)| match value {
            OptionValue::Flag(flag) if name == key => Some(*flag),
            _ => None,
        })
    };
    let channel = || {
        options.iter().find_map(|(name, value)| match value {
            OptionValue::Channel(id) if name == "channel" => Some(id.clone()),
            _ => None,
        })
    };

    match name {
        SET => Some(StickyCommand::Set(SetRequest {
            content: text("content")?,
            channel_id: channel(),
            render_as_rich_card: flag("embed"),
            footer: text("footer"),
            color: text("color"),
        })),
        REMOVE => Some(StickyCommand::Remove {
            channel_id: channel(),
        }),
        LIST => Some(StickyCommand::List),
        HELP => Some(StickyCommand::Help),
        FORCE_CLEANUP => Some(StickyCommand::ForceCleanup {
            channel_id: channel(),
        }),
        _ => None,
    }
}
