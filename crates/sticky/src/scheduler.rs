//! Trailing debounce of channel activity into sticky refreshes.

use std::{sync::Arc, time::Duration};

use {tokio::time::Instant, tracing::debug};

use crate::engine::StickyEngine;

/// Coalesces bursts of activity per channel into a single refresh fired
/// `delay` after the last event of the burst.
///
/// Without `max_wait` a steady stream of activity postpones the refresh
/// indefinitely. With it, a refresh fires no later than `max_wait` after
/// the first event of the burst.
pub struct DebounceScheduler {
    engine: Arc<StickyEngine>,
    delay: Duration,
    max_wait: Option<Duration>,
}

impl DebounceScheduler {
    pub fn new(engine: Arc<StickyEngine>, delay: Duration, max_wait: Option<Duration>) -> Self {
        Self {
            engine,
            delay,
            max_wait,
        }
    }

    pub fn engine(&self) -> &Arc<StickyEngine> {
        &self.engine
    }

    /// Record one qualifying event (a non-bot message) in `channel_id`.
    ///
    /// Restarts the channel's timer. Returns `false` and schedules nothing
    /// when the channel has no sticky configured.
    pub fn on_activity(&self, channel_id: &str) -> bool {
        if !self.engine.registry().contains(channel_id) {
            return false;
        }

        let state = self.engine.state();
        state.arm_timer(channel_id, |token, burst_start| {
            let deadline = self.deadline(burst_start);
            let engine = Arc::clone(&self.engine);
            let channel_id = channel_id.to_string();
            tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                if !engine.state().disarm_timer(&channel_id, token) {
                    return;
                }
                if engine.state().is_in_flight(&channel_id) {
                    debug!(channel_id, "sticky refresh in flight, dropping debounce fire");
                    return;
                }
                engine.refresh(&channel_id).await;
            })
        });
        true
    }

    /// Cancel the pending timer for `channel_id`, if any.
    pub fn cancel(&self, channel_id: &str) -> bool {
        self.engine.state().cancel_timer(channel_id)
    }

    /// Cancel every pending timer.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.engine.state().cancel_all_timers();
        debug!(cancelled, "debounce scheduler stopped");
        cancelled
    }

    fn deadline(&self, burst_start: Instant) -> Instant {
        let trailing = Instant::now() + self.delay;
        match self.max_wait {
            Some(max_wait) => trailing.min(burst_start + max_wait),
            None => trailing,
        }
    }
}
