//! Re-posts sticky messages: reconcile, render, send, record.

use std::{sync::Arc, time::Duration};

use {
    chrono::Utc,
    tracing::{debug, error, info, warn},
};

use crate::{
    Error, Result,
    platform::{MessagePayload, MessagingPlatform, RichCard},
    reconcile::{purge_own_messages, reconcile},
    registry::StickyRegistry,
    render::{RenderContext, render},
    state::{FlightGuard, SchedulerState},
    types::{DEFAULT_FOOTER, StickyConfig},
};

/// Pacing and scan windows for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Pause between clearing old posts and sending the new one.
    pub settle: Duration,
    pub refresh_scan_limit: u8,
    pub startup_scan_limit: u8,
    pub force_cleanup_scan_limit: u8,
    pub refresh_delete_spacing: Duration,
    pub startup_delete_spacing: Duration,
    pub startup_grace: Duration,
    pub post_sweep_grace: Duration,
    pub channel_spacing: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(500),
            refresh_scan_limit: 50,
            startup_scan_limit: 100,
            force_cleanup_scan_limit: 100,
            refresh_delete_spacing: Duration::from_millis(100),
            startup_delete_spacing: Duration::from_millis(150),
            startup_grace: Duration::from_secs(5),
            post_sweep_grace: Duration::from_secs(3),
            channel_spacing: Duration::from_secs(1),
        }
    }
}

/// Result of one [`StickyEngine::refresh`] call. Refresh never fails outward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Posted { message_id: String },
    /// Another refresh for the channel is in flight; nothing was done.
    Busy,
    /// Another refresh for the channel is in flight and will run once more
    /// before it finishes, picking up the current config.
    Queued,
    /// The channel has no sticky configured.
    NoConfig,
    /// The channel no longer exists; its config was dropped.
    ChannelGone,
    /// The config was removed, or the channel's in-flight mark evicted, while
    /// the refresh ran. Any fresh post was withdrawn.
    Abandoned,
    Failed { error: String },
}

/// Counts from the startup sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub reconciled: usize,
    pub evicted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub deleted: usize,
}

/// Orchestrates reconciliation, rendering and posting for every channel.
pub struct StickyEngine {
    platform: Arc<dyn MessagingPlatform>,
    registry: Arc<StickyRegistry>,
    state: Arc<SchedulerState>,
    settings: EngineSettings,
}

impl StickyEngine {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        registry: Arc<StickyRegistry>,
        state: Arc<SchedulerState>,
        settings: EngineSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            platform,
            registry,
            state,
            settings,
        })
    }

    pub fn external(&self) -> &Arc<dyn MessagingPlatform> {
        &self.platform
    }

    pub fn registry(&self) -> &Arc<StickyRegistry> {
        &self.registry
    }

    pub fn state(&self) -> &Arc<SchedulerState> {
        &self.state
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Clear old sticky posts in `channel_id` and post the current one.
    ///
    /// Single-flight per channel: returns [`RefreshOutcome::Busy`] at once
    /// when another refresh for the same channel is running. Errors are
    /// logged and reported in the outcome, never propagated.
    pub async fn refresh(&self, channel_id: &str) -> RefreshOutcome {
        let Some(flight) = self.state.try_begin(channel_id) else {
            debug!(channel_id, "sticky refresh already in flight, skipping");
            return RefreshOutcome::Busy;
        };
        self.run_flight(&flight).await
    }

    /// Refresh after a config change.
    ///
    /// When a refresh is already in flight it may have read the old config,
    /// so instead of skipping, it is asked to run one more pass and
    /// [`RefreshOutcome::Queued`] is returned.
    pub async fn refresh_latest(&self, channel_id: &str) -> RefreshOutcome {
        let Some(flight) = self.state.try_begin_or_rerun(channel_id) else {
            debug!(channel_id, "sticky refresh in flight, queued another pass");
            return RefreshOutcome::Queued;
        };
        self.run_flight(&flight).await
    }

    async fn run_flight(&self, flight: &FlightGuard) -> RefreshOutcome {
        loop {
            let outcome = self.refresh_pass(flight).await;
            if !flight.take_rerun_or_release() {
                return outcome;
            }
            debug!(
                channel_id = flight.channel_id(),
                "sticky config changed mid-refresh, refreshing again"
            );
        }
    }

    async fn refresh_pass(&self, flight: &FlightGuard) -> RefreshOutcome {
        let channel_id = flight.channel_id();
        match self.refresh_locked(flight).await {
            Ok(outcome) => outcome,
            Err(Error::ChannelNotFound { .. }) => {
                warn!(channel_id, "channel no longer exists, dropping sticky config");
                if let Err(e) = self.registry.remove(channel_id).await {
                    error!(channel_id, error = %e, "failed to persist sticky removal");
                }
                RefreshOutcome::ChannelGone
            },
            Err(e) => {
                error!(channel_id, error = %e, "sticky refresh failed");
                RefreshOutcome::Failed {
                    error: e.to_string(),
                }
            },
        }
    }

    async fn refresh_locked(&self, flight: &FlightGuard) -> Result<RefreshOutcome> {
        let channel_id = flight.channel_id();
        let Some(config) = self.registry.get(channel_id) else {
            return Ok(RefreshOutcome::NoConfig);
        };
        let channel = self.platform.channel_info(channel_id).await?;

        let report = reconcile(
            self.platform.as_ref(),
            channel_id,
            &config,
            self.settings.refresh_scan_limit,
            self.settings.refresh_delete_spacing,
        )
        .await?;
        if report.deleted > 0 || report.tracked_deleted {
            debug!(
                channel_id,
                deleted = report.deleted + usize::from(report.tracked_deleted),
                "cleared previous sticky posts"
            );
        }
        self.registry.clear_last_message(channel_id).await?;

        tokio::time::sleep(self.settings.settle).await;

        // An evicted mark means a newer flight may own the channel now.
        if !flight.is_current() {
            debug!(channel_id, "in-flight mark evicted during settle, abandoning refresh");
            return Ok(RefreshOutcome::Abandoned);
        }
        // Re-read: "set" may have replaced the template, or "remove" dropped it.
        let Some(config) = self.registry.get(channel_id) else {
            return Ok(RefreshOutcome::Abandoned);
        };
        let payload = build_payload(&config, &RenderContext::for_channel(&channel));
        let message = self.platform.send_message(channel_id, payload).await?;

        if flight.is_current() && self.registry.record_post(channel_id, &message.id).await? {
            info!(channel_id, message_id = %message.id, "posted sticky message");
            return Ok(RefreshOutcome::Posted {
                message_id: message.id,
            });
        }

        info!(channel_id, message_id = %message.id, "sticky removed or superseded mid-refresh, withdrawing post");
        if let Err(e) = self.platform.delete_message(channel_id, &message.id).await {
            warn!(channel_id, message_id = %message.id, error = %e, "failed to withdraw sticky post");
        }
        Ok(RefreshOutcome::Abandoned)
    }

    /// Startup cleanup over every configured channel.
    ///
    /// Channels that no longer exist lose their config. Any other failure is
    /// logged and the sweep moves on to the next channel. The store is
    /// written once at the end.
    pub async fn startup_sweep(&self) -> SweepReport {
        info!(channels = self.registry.len(), "starting sticky cleanup sweep");
        let mut report = SweepReport::default();

        for channel_id in self.registry.channel_ids() {
            let Some(_flight) = self.state.try_begin(&channel_id) else {
                report.skipped += 1;
                continue;
            };
            let Some(config) = self.registry.get(&channel_id) else {
                continue;
            };

            match self.sweep_channel(&config).await {
                Ok(deleted) => {
                    report.reconciled += 1;
                    report.deleted += deleted;
                    self.registry.forget_last_message(&channel_id);
                },
                Err(Error::ChannelNotFound { .. }) => {
                    info!(channel_id, "channel not found, removing sticky config");
                    self.registry.evict(&channel_id);
                    report.evicted += 1;
                },
                Err(e) => {
                    error!(channel_id, error = %e, "sticky cleanup failed for channel");
                    report.failed += 1;
                },
            }
        }

        if let Err(e) = self.registry.persist().await {
            error!(error = %e, "failed to persist sticky configs after sweep");
        }
        info!(
            reconciled = report.reconciled,
            evicted = report.evicted,
            failed = report.failed,
            deleted = report.deleted,
            "sticky cleanup sweep complete"
        );
        report
    }

    async fn sweep_channel(&self, config: &StickyConfig) -> Result<usize> {
        let channel = self.platform.channel_info(&config.channel_id).await?;
        debug!(channel_id = %channel.id, channel = %channel.name, "cleaning up sticky messages");
        let report = reconcile(
            self.platform.as_ref(),
            &config.channel_id,
            config,
            self.settings.startup_scan_limit,
            self.settings.startup_delete_spacing,
        )
        .await?;
        Ok(report.deleted + usize::from(report.tracked_deleted))
    }

    /// Refresh every configured channel, one at a time, spaced by
    /// `channel_spacing`.
    pub async fn refresh_all(&self) -> Vec<(String, RefreshOutcome)> {
        info!(channels = self.registry.len(), "refreshing all sticky messages");
        let mut outcomes = Vec::new();

        for channel_id in self.registry.channel_ids() {
            let outcome = self.refresh(&channel_id).await;
            let paced = !matches!(
                outcome,
                RefreshOutcome::NoConfig | RefreshOutcome::ChannelGone
            );
            outcomes.push((channel_id, outcome));
            if paced {
                tokio::time::sleep(self.settings.channel_spacing).await;
            }
        }

        info!("all sticky messages refreshed");
        outcomes
    }

    /// One-time startup sequence, run after the platform connection is up
    /// and commands are registered: grace period, cleanup sweep, second
    /// grace period, refresh of every channel.
    pub async fn run_startup(&self) {
        tokio::time::sleep(self.settings.startup_grace).await;
        self.startup_sweep().await;
        tokio::time::sleep(self.settings.post_sweep_grace).await;
        self.refresh_all().await;
    }

    /// Delete every recent message the bot authored in `channel_id`.
    ///
    /// The tracked sticky post is among them, so the channel's tracked ID is
    /// cleared as well.
    pub async fn force_cleanup(&self, channel_id: &str) -> Result<usize> {
        let deleted = purge_own_messages(
            self.platform.as_ref(),
            channel_id,
            self.settings.force_cleanup_scan_limit,
            self.settings.refresh_delete_spacing,
        )
        .await?;
        self.registry.clear_last_message(channel_id).await?;
        Ok(deleted)
    }
}

/// Build the message for `config`, rendering body and footer with `ctx`.
///
/// Cards carry the body as description plus footer, color and timestamp.
/// Plain text gets the footer appended as an italic trailing line.
pub fn build_payload(config: &StickyConfig, ctx: &RenderContext) -> MessagePayload {
    let body = render(&config.content, ctx);
    let footer = config
        .custom_footer_template
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| render(t, ctx))
        .unwrap_or_else(|| DEFAULT_FOOTER.to_string());

    if config.render_as_rich_card {
        let mut card = RichCard::new(body, config.card_color.clone());
        card.footer = Some(footer);
        card.timestamp = Some(Utc::now());
        MessagePayload::Card(card)
    } else {
        MessagePayload::Text(format!("{body}\n\n*{footer}*"))
    }
}
