//! Process-wide transient scheduling state.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::{task::JoinHandle, time::Instant};

/// Pending debounce timers and in-flight refreshes, keyed by channel ID.
///
/// Lives from process start to process stop and is never persisted. Both
/// maps use `std::sync::Mutex` and are never locked across an `.await`.
#[derive(Default)]
pub struct SchedulerState {
    pending: Mutex<HashMap<String, PendingTimer>>,
    in_flight: Mutex<HashMap<String, Flight>>,
    next_token: AtomicU64,
}

struct Flight {
    token: u64,
    /// Another caller asked for one more pass once this one finishes.
    rerun: bool,
}

pub(crate) struct PendingTimer {
    token: u64,
    /// When the burst this timer belongs to started.
    first_activity: Instant,
    handle: JoinHandle<()>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingTimer>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, Flight>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed) + 1
    }

    // ── Single-flight ───────────────────────────────────────────────────

    /// Mark `channel_id` as in flight. `None` when another operation holds it.
    ///
    /// The mark is released when the returned guard drops, on every exit path.
    pub fn try_begin(self: &Arc<Self>, channel_id: &str) -> Option<FlightGuard> {
        let mut in_flight = self.in_flight();
        if in_flight.contains_key(channel_id) {
            return None;
        }
        Some(self.begin_locked(&mut in_flight, channel_id))
    }

    /// Like [`Self::try_begin`], but when the channel is busy the running
    /// flight is asked to make one more pass before it releases the mark.
    pub fn try_begin_or_rerun(self: &Arc<Self>, channel_id: &str) -> Option<FlightGuard> {
        let mut in_flight = self.in_flight();
        if let Some(flight) = in_flight.get_mut(channel_id) {
            flight.rerun = true;
            return None;
        }
        Some(self.begin_locked(&mut in_flight, channel_id))
    }

    fn begin_locked(
        self: &Arc<Self>,
        in_flight: &mut HashMap<String, Flight>,
        channel_id: &str,
    ) -> FlightGuard {
        let token = self.next_token();
        in_flight.insert(channel_id.to_string(), Flight {
            token,
            rerun: false,
        });
        FlightGuard {
            state: Arc::clone(self),
            channel_id: channel_id.to_string(),
            token,
        }
    }

    pub fn is_in_flight(&self, channel_id: &str) -> bool {
        self.in_flight().contains_key(channel_id)
    }

    /// Forget an in-flight mark without waiting for its guard. The stale
    /// guard will not clear a newer mark for the same channel.
    pub fn evict_in_flight(&self, channel_id: &str) -> bool {
        self.in_flight().remove(channel_id).is_some()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight().len()
    }

    // ── Debounce timers ─────────────────────────────────────────────────

    /// Replace the pending timer for `channel_id`, aborting any previous one.
    ///
    /// `spawn` receives the new timer's token and the start of the current
    /// burst (carried over from the replaced timer) and returns its task.
    pub(crate) fn arm_timer(
        &self,
        channel_id: &str,
        spawn: impl FnOnce(u64, Instant) -> JoinHandle<()>,
    ) {
        let mut pending = self.pending();
        let first_activity = match pending.remove(channel_id) {
            Some(previous) => {
                previous.handle.abort();
                previous.first_activity
            },
            None => Instant::now(),
        };
        let token = self.next_token();
        let handle = spawn(token, first_activity);
        pending.insert(channel_id.to_string(), PendingTimer {
            token,
            first_activity,
            handle,
        });
    }

    /// Called by a firing timer. Removes its own entry and returns `true`;
    /// returns `false` when it has been superseded or cancelled.
    pub(crate) fn disarm_timer(&self, channel_id: &str, token: u64) -> bool {
        let mut pending = self.pending();
        match pending.get(channel_id) {
            Some(timer) if timer.token == token => {
                pending.remove(channel_id);
                true
            },
            _ => false,
        }
    }

    /// Cancel the pending timer for `channel_id`. Returns whether one existed.
    pub fn cancel_timer(&self, channel_id: &str) -> bool {
        match self.pending().remove(channel_id) {
            Some(timer) => {
                timer.handle.abort();
                true
            },
            None => false,
        }
    }

    /// Cancel every pending timer. Returns how many were cancelled.
    pub fn cancel_all_timers(&self) -> usize {
        let drained: Vec<PendingTimer> = self.pending().drain().map(|(_, t)| t).collect();
        for timer in &drained {
            timer.handle.abort();
        }
        drained.len()
    }

    pub fn has_pending_timer(&self, channel_id: &str) -> bool {
        self.pending().contains_key(channel_id)
    }

    pub fn pending_timer_count(&self) -> usize {
        self.pending().len()
    }
}

/// In-flight mark for one channel; released on drop.
pub struct FlightGuard {
    state: Arc<SchedulerState>,
    channel_id: String,
    token: u64,
}

impl FlightGuard {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Whether this guard still owns the channel's mark. `false` once the
    /// mark was evicted, even if a newer flight has since started.
    pub fn is_current(&self) -> bool {
        self.state
            .in_flight()
            .get(&self.channel_id)
            .is_some_and(|flight| flight.token == self.token)
    }

    /// Finish one pass. Returns `true` (keeping the mark) when a rerun was
    /// requested meanwhile; otherwise releases the mark and returns `false`.
    ///
    /// Check and release happen under one lock, so a request is either seen
    /// here or starts its own flight.
    pub fn take_rerun_or_release(&self) -> bool {
        let mut in_flight = self.state.in_flight();
        match in_flight.get_mut(&self.channel_id) {
            Some(flight) if flight.token == self.token => {
                if flight.rerun {
                    flight.rerun = false;
                    true
                } else {
                    in_flight.remove(&self.channel_id);
                    false
                }
            },
            _ => false,
        }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.state.in_flight();
        if in_flight
            .get(&self.channel_id)
            .is_some_and(|flight| flight.token == self.token)
        {
            in_flight.remove(&self.channel_id);
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_flight_per_channel() {
        let state = Arc::new(SchedulerState::new());
        let first = state.try_begin("1");
        assert!(first.is_some());
        assert!(state.try_begin("1").is_none());
        assert!(state.try_begin("2").is_some());

        drop(first);
        assert!(!state.is_in_flight("1"));
        assert!(state.try_begin("1").is_some());
    }

    #[test]
    fn stale_guard_keeps_newer_mark() {
        let state = Arc::new(SchedulerState::new());
        let stale = state.try_begin("1");
        assert!(state.evict_in_flight("1"));

        let fresh = state.try_begin("1");
        assert!(fresh.is_some());
        drop(stale);
        assert!(state.is_in_flight("1"));

        drop(fresh);
        assert_eq!(state.in_flight_count(), 0);
    }

    #[test]
    fn evicted_guard_is_no_longer_current() {
        let state = Arc::new(SchedulerState::new());
        let stale = state.try_begin("1").unwrap();
        assert!(stale.is_current());

        state.evict_in_flight("1");
        let fresh = state.try_begin("1").unwrap();
        assert!(!stale.is_current());
        assert!(fresh.is_current());
        assert!(!stale.take_rerun_or_release());
        assert!(state.is_in_flight("1"));
    }

    #[test]
    fn rerun_request_keeps_the_mark_for_one_more_pass() {
        let state = Arc::new(SchedulerState::new());
        let flight = state.try_begin("1").unwrap();

        assert!(state.try_begin_or_rerun("1").is_none());
        assert!(flight.take_rerun_or_release());
        assert!(state.is_in_flight("1"));

        assert!(!flight.take_rerun_or_release());
        assert!(!state.is_in_flight("1"));
        assert!(state.try_begin_or_rerun("1").is_some());
    }

    #[test]
    fn plain_busy_does_not_request_rerun() {
        let state = Arc::new(SchedulerState::new());
        let flight = state.try_begin("1").unwrap();
        assert!(state.try_begin("1").is_none());
        assert!(!flight.take_rerun_or_release());
    }

    #[tokio::test]
    async fn arming_replaces_previous_timer() {
        let state = SchedulerState::new();
        let mut tokens = Vec::new();
        for _ in 0..3 {
            state.arm_timer("1", |token, _| {
                tokens.push(token);
                tokio::spawn(std::future::pending())
            });
        }
        assert_eq!(state.pending_timer_count(), 1);

        assert!(!state.disarm_timer("1", tokens[0]));
        assert!(state.disarm_timer("1", tokens[2]));
        assert!(!state.has_pending_timer("1"));
    }

    #[tokio::test]
    async fn burst_start_carries_over() {
        let state = SchedulerState::new();
        let mut starts = Vec::new();
        state.arm_timer("1", |_, first| {
            starts.push(first);
            tokio::spawn(std::future::pending())
        });
        state.arm_timer("1", |_, first| {
            starts.push(first);
            tokio::spawn(std::future::pending())
        });
        assert_eq!(starts[0], starts[1]);
    }

    #[tokio::test]
    async fn cancel_timers() {
        let state = SchedulerState::new();
        state.arm_timer("1", |_, _| tokio::spawn(std::future::pending()));
        state.arm_timer("2", |_, _| tokio::spawn(std::future::pending()));

        assert!(state.cancel_timer("1"));
        assert!(!state.cancel_timer("1"));
        assert_eq!(state.cancel_all_timers(), 1);
        assert_eq!(state.pending_timer_count(), 0);
    }
}
