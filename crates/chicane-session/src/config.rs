//! Timing configuration for login and session custody.
//!
//! Production values are the defaults. Tests and demos shrink them —
//! every duration here is plumbed through rather than hardcoded at the
//! use site, so a paused-time test can walk a 15-minute idle flow in
//! milliseconds of wall clock.

use std::time::Duration;

use tracing::warn;

// ---------------------------------------------------------------------------
// CoordinatorConfig
// ---------------------------------------------------------------------------

/// Timing for the holding side of a session.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// User inactivity after which the warning is raised.
    /// Default: 15 minutes.
    pub idle_timeout: Duration,
    /// How long the inactivity warning stays up before forced logout.
    /// Default: 60 seconds.
    pub warning_grace: Duration,
    /// Minimum gap between heartbeat writes. Activity inside the gap
    /// is coalesced into the next heartbeat. Default: 10 seconds.
    pub heartbeat_throttle: Duration,
    /// Cadence of countdown updates while a warning is showing.
    /// Default: 1 second.
    pub countdown_tick: Duration,
}

impl CoordinatorConfig {
    pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);
    pub const WARNING_GRACE: Duration = Duration::from_secs(60);
    pub const HEARTBEAT_THROTTLE: Duration = Duration::from_secs(10);
    pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

    /// Fix any unusable values so the config is safe to run with.
    ///
    /// Called by [`spawn_coordinator`](crate::spawn_coordinator). A zero
    /// `countdown_tick` would spin the coordinator's timer loop, so it
    /// is raised to one second.
    pub fn validated(mut self) -> Self {
        if self.countdown_tick.is_zero() {
            warn!("countdown_tick of zero would busy-loop — raising to 1s");
            self.countdown_tick = Duration::from_secs(1);
        }
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Self::IDLE_TIMEOUT,
            warning_grace: Self::WARNING_GRACE,
            heartbeat_throttle: Self::HEARTBEAT_THROTTLE,
            countdown_tick: Self::COUNTDOWN_TICK,
        }
    }
}

// ---------------------------------------------------------------------------
// LoginConfig
// ---------------------------------------------------------------------------

/// Timing for the acquiring side of a session.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Total budget to wait for a held profile. Default: 60 seconds —
    /// matched to the holder's warning grace, so a silent holder is
    /// replaced just as the budget ends.
    pub wait_budget: Duration,
    /// Gap between resolve polls. Default: 3 seconds.
    pub poll_interval: Duration,
    /// Extra slack past the budget before giving up, covering the
    /// store's own deadline check racing the final poll.
    /// Default: 5 seconds.
    pub resolve_slack: Duration,
}

impl LoginConfig {
    pub const WAIT_BUDGET: Duration = Duration::from_secs(60);
    pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
    pub const RESOLVE_SLACK: Duration = Duration::from_secs(5);

    /// Fix any unusable values so the config is safe to run with.
    ///
    /// Called by [`acquire_session`](crate::acquire_session). A zero
    /// `poll_interval` would hammer the store, so it is raised to one
    /// second.
    pub fn validated(mut self) -> Self {
        if self.poll_interval.is_zero() {
            warn!("poll_interval of zero would hammer the store — raising to 1s");
            self.poll_interval = Duration::from_secs(1);
        }
        self
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            wait_budget: Self::WAIT_BUDGET,
            poll_interval: Self::POLL_INTERVAL,
            resolve_slack: Self::RESOLVE_SLACK,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
