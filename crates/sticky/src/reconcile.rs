//! Clears earlier sticky posts from a channel before a re-post.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    Error, Result, heuristic::is_sticky_like, platform::MessagingPlatform, types::StickyConfig,
};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// The tracked `last_message_id` was found and deleted.
    pub tracked_deleted: bool,
    /// Self-authored messages inspected in the bulk scan.
    pub scanned: usize,
    /// Sticky-like messages deleted by the bulk scan.
    pub deleted: usize,
    /// Sticky-like messages that could not be deleted.
    pub failed: usize,
}

/// Delete every earlier sticky post in `channel_id`.
///
/// First deletes the tracked message (if any), tolerating its absence. Then
/// scans up to `scan_limit` recent messages and deletes each self-authored
/// one that [`is_sticky_like`] accepts, pausing `delete_spacing` after every
/// deletion. Individual delete failures are logged and skipped; a failure to
/// read the history aborts the pass.
pub async fn reconcile(
    platform: &dyn MessagingPlatform,
    channel_id: &str,
    config: &StickyConfig,
    scan_limit: u8,
    delete_spacing: Duration,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport {
        tracked_deleted: delete_tracked(platform, channel_id, config).await,
        ..Default::default()
    };

    let self_id = self_id(platform)?;
    let recent = platform.fetch_recent_messages(channel_id, scan_limit).await?;
    let own: Vec<_> = recent
        .into_iter()
        .filter(|m| m.author_id == self_id)
        .collect();
    report.scanned = own.len();

    for message in own.iter().filter(|m| is_sticky_like(m, config)) {
        match platform.delete_message(channel_id, &message.id).await {
            Ok(()) => {
                report.deleted += 1;
                debug!(channel_id, message_id = %message.id, "deleted sticky-like message");
                tokio::time::sleep(delete_spacing).await;
            },
            Err(e) if e.is_not_found() => {
                debug!(channel_id, message_id = %message.id, "sticky-like message already gone");
            },
            Err(e) => {
                report.failed += 1;
                warn!(channel_id, message_id = %message.id, error = %e, "could not delete sticky-like message");
            },
        }
    }

    debug!(
        channel_id,
        scanned = report.scanned,
        deleted = report.deleted,
        failed = report.failed,
        tracked_deleted = report.tracked_deleted,
        "reconciled channel"
    );
    Ok(report)
}

/// Delete every self-authored message among the `scan_limit` most recent,
/// whether or not it looks like a sticky post. Returns how many were deleted.
pub async fn purge_own_messages(
    platform: &dyn MessagingPlatform,
    channel_id: &str,
    scan_limit: u8,
    delete_spacing: Duration,
) -> Result<usize> {
    let self_id = self_id(platform)?;
    let recent = platform.fetch_recent_messages(channel_id, scan_limit).await?;

    let mut deleted = 0;
    for message in recent.iter().filter(|m| m.author_id == self_id) {
        match platform.delete_message(channel_id, &message.id).await {
            Ok(()) => {
                deleted += 1;
                tokio::time::sleep(delete_spacing).await;
            },
            Err(e) => {
                warn!(channel_id, message_id = %message.id, error = %e, "could not delete message");
            },
        }
    }

    info!(channel_id, deleted, "purged own messages");
    Ok(deleted)
}

async fn delete_tracked(
    platform: &dyn MessagingPlatform,
    channel_id: &str,
    config: &StickyConfig,
) -> bool {
    let Some(message_id) = config.last_message_id.as_deref() else {
        return false;
    };

    let outcome = match platform.fetch_message(channel_id, message_id).await {
        Ok(Some(message)) => platform.delete_message(channel_id, &message.id).await,
        Ok(None) => Err(Error::message_not_found(message_id)),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => {
            debug!(channel_id, message_id, "deleted tracked sticky message");
            true
        },
        Err(e) => {
            debug!(channel_id, message_id, error = %e, "tracked sticky message not found or not deletable");
            false
        },
    }
}

fn self_id(platform: &dyn MessagingPlatform) -> Result<String> {
    platform
        .self_user_id()
        .ok_or_else(|| Error::unavailable("bot user is not known yet"))
}
