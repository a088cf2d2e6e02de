//! Discord adapter for the sticky engine.
//!
//! Wraps serenity: the gateway client, the REST-backed
//! [`stickybot_sticky::MessagingPlatform`] and the slash command surface.

pub mod bot;
pub mod commands;
pub mod error;
pub mod handler;
pub mod platform;

pub use {
    bot::{BotOptions, run},
    error::{Error, Result},
    handler::StickyHandler,
    platform::DiscordPlatform,
};
