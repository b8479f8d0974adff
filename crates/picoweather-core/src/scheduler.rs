//! Refresh scheduling for the control loop.
//!
//! Two independent timers decide when to fetch a forecast and when to repaint
//! the matrix. Each timer also has a one-shot force flag; both flags start
//! set so the first tick always fetches and repaints.
//!
//! A failed fetch changes nothing, so the same conditions that made the
//! fetch due still hold on the next tick and it is simply tried again. There
//! is no backoff: while the force flag is set that means one attempt per
//! tick.
//!
//! Fetches are counted per calendar day and stop once the daily cap is
//! reached. The count resets the first time a different day is observed,
//! either by a successful fetch or by the loop's per-iteration day check.

use chrono::NaiveDate;
use std::time::{Duration, Instant};

use crate::config::ScheduleConfig;

/// Timer settings for [`RefreshScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub forecast_period: Duration,
    pub display_period: Duration,
    pub daily_call_cap: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}

impl From<&ScheduleConfig> for SchedulerConfig {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            forecast_period: config.forecast_period(),
            display_period: config.display_period(),
            daily_call_cap: config.daily_call_cap,
        }
    }
}

/// What the caller should do on this iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduledActions {
    pub should_fetch: bool,
    pub should_display: bool,
}

#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    config: SchedulerConfig,
    last_tick: Instant,
    last_fetch_tick: Instant,
    last_display_tick: Instant,
    force_fetch: bool,
    force_display: bool,
    daily_call_count: u32,
    last_seen_day: NaiveDate,
}

impl RefreshScheduler {
    /// Create a scheduler whose timers start at `now`.
    ///
    /// Both force flags start set, so the first tick fetches and repaints
    /// whatever the timers say.
    pub fn new(config: SchedulerConfig, now: Instant, today: NaiveDate) -> Self {
        Self {
            config,
            last_tick: now,
            last_fetch_tick: now,
            last_display_tick: now,
            force_fetch: true,
            force_display: true,
            daily_call_count: 0,
            last_seen_day: today,
        }
    }

    /// Decide what is due at `now`.
    pub fn tick(&mut self, now: Instant) -> ScheduledActions {
        self.last_tick = now;

        let actions = ScheduledActions {
            should_fetch: self.fetch_due(now),
            should_display: self.display_due(now),
        };

        if actions.should_fetch || actions.should_display {
            tracing::trace!(
                fetch = actions.should_fetch,
                display = actions.should_display,
                "Scheduler tick"
            );
        }

        actions
    }

    /// True when a fetch is due and the daily cap still allows one
    pub fn fetch_due(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_fetch_tick);
        (elapsed > self.config.forecast_period || self.force_fetch) && !self.cap_reached()
    }

    /// True when the display period has elapsed or a repaint was forced
    pub fn display_due(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_display_tick);
        elapsed > self.config.display_period || self.force_display
    }

    /// Report how the fetch requested by the last tick went.
    ///
    /// On success the fetch timer restarts from that tick, the next tick
    /// repaints, and the call is counted against `day`. On failure nothing
    /// changes.
    pub fn record_fetch_result(&mut self, success: bool, day: NaiveDate) {
        if !success {
            tracing::debug!("Fetch failed, will retry on the next tick");
            return;
        }

        self.last_fetch_tick = self.last_tick;
        self.force_fetch = false;
        self.force_display = true;

        self.observe_day(day);
        self.daily_call_count = (self.daily_call_count + 1).min(self.config.daily_call_cap);

        tracing::debug!("Day: {} API call count: {}", day, self.daily_call_count);
        if self.cap_reached() {
            tracing::warn!(
                "Daily API call cap of {} reached, fetching paused until tomorrow",
                self.config.daily_call_cap
            );
        }
    }

    /// Reset the call count if `day` differs from the last day seen.
    ///
    /// Successful fetches call this themselves. The control loop also calls
    /// it every iteration so that a capped scheduler notices midnight
    /// without needing a fetch to get through.
    pub fn observe_day(&mut self, day: NaiveDate) {
        if day == self.last_seen_day {
            return;
        }
        tracing::info!(
            "New day {} (was {}), resetting API call count from {}",
            day,
            self.last_seen_day,
            self.daily_call_count
        );
        self.daily_call_count = 0;
        self.last_seen_day = day;
    }

    /// Report that the matrix was repainted at `now`
    pub fn record_display(&mut self, now: Instant) {
        self.last_display_tick = now;
        self.force_display = false;
    }

    /// Fetch on the next tick regardless of the forecast timer
    pub fn request_fetch(&mut self) {
        self.force_fetch = true;
    }

    /// Repaint on the next tick regardless of the display timer
    pub fn request_display(&mut self) {
        self.force_display = true;
    }

    pub fn cap_reached(&self) -> bool {
        self.daily_call_count >= self.config.daily_call_cap
    }

    pub fn daily_call_count(&self) -> u32 {
        self.daily_call_count
    }

    pub fn last_seen_day(&self) -> NaiveDate {
        self.last_seen_day
    }

    pub fn last_fetch_tick(&self) -> Instant {
        self.last_fetch_tick
    }

    pub fn last_display_tick(&self) -> Instant {
        self.last_display_tick
    }

    pub fn is_fetch_forced(&self) -> bool {
        self.force_fetch
    }

    pub fn is_display_forced(&self) -> bool {
        self.force_display
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: Duration = Duration::from_secs(900);
    const DISPLAY: Duration = Duration::from_secs(20);
    const SECOND: Duration = Duration::from_secs(1);

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn scheduler_with_cap(cap: u32) -> (RefreshScheduler, Instant) {
        let t0 = Instant::now();
        let config = SchedulerConfig {
            forecast_period: FORECAST,
            display_period: DISPLAY,
            daily_call_cap: cap,
        };
        (RefreshScheduler::new(config, t0, day(1)), t0)
    }

    fn scheduler() -> (RefreshScheduler, Instant) {
        scheduler_with_cap(990)
    }

    /// Tick, report a successful fetch and a repaint at `now`
    fn fetch_and_show(s: &mut RefreshScheduler, now: Instant, today: NaiveDate) {
        let actions = s.tick(now);
        assert!(actions.should_fetch);
        s.record_fetch_result(true, today);
        s.record_display(now);
    }

    #[test]
    fn test_first_tick_fetches_and_displays() {
        let (mut s, t0) = scheduler();
        let actions = s.tick(t0);
        assert!(actions.should_fetch);
        assert!(actions.should_display);
    }

    #[test]
    fn test_forecast_interval_after_success() {
        let (mut s, t0) = scheduler();
        let t = t0 + 5 * SECOND;
        fetch_and_show(&mut s, t, day(1));

        assert!(!s.tick(t + FORECAST - SECOND).should_fetch);
        assert!(!s.tick(t + FORECAST).should_fetch);
        assert!(s.tick(t + FORECAST + SECOND).should_fetch);
    }

    #[test]
    fn test_successful_fetch_forces_repaint() {
        let (mut s, t0) = scheduler();
        s.tick(t0);
        s.record_display(t0);
        assert!(!s.display_due(t0 + SECOND));

        s.record_fetch_result(true, day(1));
        assert!(s.is_display_forced());
        assert!(s.tick(t0 + SECOND).should_display);
    }

    #[test]
    fn test_display_interval() {
        let (mut s, t0) = scheduler();
        fetch_and_show(&mut s, t0, day(1));

        assert!(!s.tick(t0 + DISPLAY).should_display);
        assert!(s.tick(t0 + DISPLAY + SECOND).should_display);

        s.record_display(t0 + DISPLAY + SECOND);
        assert!(!s.tick(t0 + DISPLAY + 2 * SECOND).should_display);
    }

    #[test]
    fn test_failed_fetch_retries_next_tick() {
        let (mut s, t0) = scheduler();
        assert!(s.tick(t0).should_fetch);
        s.record_fetch_result(false, day(1));

        assert!(s.is_fetch_forced());
        assert_eq!(s.daily_call_count(), 0);
        assert_eq!(s.last_fetch_tick(), t0);
        assert!(s.tick(t0 + Duration::from_millis(250)).should_fetch);
    }

    #[test]
    fn test_failed_fetch_after_interval_keeps_retrying() {
        let (mut s, t0) = scheduler();
        fetch_and_show(&mut s, t0, day(1));

        let due = t0 + FORECAST + SECOND;
        assert!(s.tick(due).should_fetch);
        s.record_fetch_result(false, day(1));
        assert!(!s.is_fetch_forced());
        assert!(s.tick(due + SECOND).should_fetch);
        assert_eq!(s.daily_call_count(), 1);
    }

    #[test]
    fn test_fetch_timer_restarts_from_tick_that_fetched() {
        let (mut s, t0) = scheduler();
        let t = t0 + 30 * SECOND;
        s.tick(t);
        s.record_fetch_result(true, day(1));
        assert_eq!(s.last_fetch_tick(), t);
    }

    #[test]
    fn test_call_count_increments() {
        let (mut s, t0) = scheduler();
        fetch_and_show(&mut s, t0, day(1));
        fetch_and_show(&mut s, t0 + FORECAST + SECOND, day(1));
        assert_eq!(s.daily_call_count(), 2);
        assert_eq!(s.last_seen_day(), day(1));
    }

    #[test]
    fn test_call_count_resets_on_new_day() {
        let (mut s, t0) = scheduler();
        let mut now = t0;
        for _ in 0..3 {
            fetch_and_show(&mut s, now, day(1));
            now += FORECAST + SECOND;
        }
        assert_eq!(s.daily_call_count(), 3);

        fetch_and_show(&mut s, now, day(2));
        assert_eq!(s.daily_call_count(), 1);
        assert_eq!(s.last_seen_day(), day(2));

        now += FORECAST + SECOND;
        fetch_and_show(&mut s, now, day(2));
        assert_eq!(s.daily_call_count(), 2);
    }

    #[test]
    fn test_failed_fetch_does_not_observe_new_day() {
        let (mut s, t0) = scheduler();
        fetch_and_show(&mut s, t0, day(1));
        s.tick(t0 + FORECAST + SECOND);
        s.record_fetch_result(false, day(2));
        assert_eq!(s.last_seen_day(), day(1));
        assert_eq!(s.daily_call_count(), 1);
    }

    #[test]
    fn test_cap_blocks_fetch_until_rollover() {
        let (mut s, t0) = scheduler_with_cap(2);
        let mut now = t0;
        for _ in 0..2 {
            fetch_and_show(&mut s, now, day(1));
            now += FORECAST + SECOND;
        }
        assert!(s.cap_reached());

        // Interval elapsed and forced, still blocked
        s.request_fetch();
        assert!(!s.tick(now).should_fetch);
        assert!(!s.tick(now + 10 * FORECAST).should_fetch);
        assert_eq!(s.daily_call_count(), 2);

        // Display keeps running while fetching is paused
        assert!(s.tick(now + 10 * FORECAST).should_display);
    }

    #[test]
    fn test_rollover_after_cap_reached() {
        let (mut s, t0) = scheduler_with_cap(1);
        fetch_and_show(&mut s, t0, day(1));
        assert!(s.cap_reached());

        s.observe_day(day(1));
        assert!(!s.tick(t0 + 2 * FORECAST).should_fetch);

        s.observe_day(day(2));
        assert_eq!(s.daily_call_count(), 0);
        assert!(s.tick(t0 + 2 * FORECAST).should_fetch);
        s.record_fetch_result(true, day(2));
        assert_eq!(s.daily_call_count(), 1);
    }

    #[test]
    fn test_observe_same_day_keeps_count() {
        let (mut s, t0) = scheduler();
        fetch_and_show(&mut s, t0, day(1));
        s.observe_day(day(1));
        assert_eq!(s.daily_call_count(), 1);
    }

    #[test]
    fn test_zero_cap_never_fetches() {
        let (mut s, t0) = scheduler_with_cap(0);
        let actions = s.tick(t0);
        assert!(!actions.should_fetch);
        assert!(actions.should_display);
    }

    #[test]
    fn test_count_never_exceeds_cap() {
        let (mut s, t0) = scheduler_with_cap(1);
        s.tick(t0);
        s.record_fetch_result(true, day(1));
        s.record_fetch_result(true, day(1));
        assert_eq!(s.daily_call_count(), 1);
    }

    #[test]
    fn test_manual_triggers() {
        let (mut s, t0) = scheduler();
        fetch_and_show(&mut s, t0, day(1));

        let t = t0 + SECOND;
        assert_eq!(s.tick(t), ScheduledActions::default());

        s.request_fetch();
        s.request_display();
        let actions = s.tick(t);
        assert!(actions.should_fetch);
        assert!(actions.should_display);
    }

    #[test]
    fn test_config_from_schedule() {
        let config = SchedulerConfig::default();
        assert_eq!(config.forecast_period, FORECAST);
        assert_eq!(config.display_period, DISPLAY);
        assert_eq!(config.daily_call_cap, 990);
    }
}
