//! Sticky message engine.
//!
//! Keeps one designated message at the bottom of each configured channel by
//! deleting and re-posting it after channel activity settles. Persistent
//! state lives in a single JSON snapshot (`sticky-data.json`); the messaging
//! platform is reached only through [`platform::MessagingPlatform`].

pub mod color;
pub mod commands;
pub mod engine;
pub mod error;
pub mod heuristic;
pub mod platform;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    commands::{CommandReply, CommandSurface, Invoker, SetRequest, StickyCommand},
    engine::{EngineSettings, RefreshOutcome, StickyEngine},
    error::{Error, Result},
    platform::MessagingPlatform,
    registry::StickyRegistry,
    scheduler::DebounceScheduler,
    state::SchedulerState,
    types::StickyConfig,
};
