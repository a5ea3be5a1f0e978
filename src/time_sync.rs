//! Time reliability tracking and the local wall clock.
//!
//! The controller only trusts its schedules while the clock has been synced
//! recently.  [`TimeTracker`] classifies the last sync attempt and measures
//! staleness from the last *successful* sync; [`WallClock`] turns the last
//! synced UTC instant plus monotonic elapsed time into a local time of day.
//!
//! All `now_ms` arguments are milliseconds on the monotonic clock since boot.

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, TimeDelta, Timelike, Utc};
use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::SyncError;
use crate::faults::{FaultCode, FaultSet};
use crate::schedule::TimeOfDay;

// ───────────────────────────────────────────────────────────────
// Reliability tracker
// ───────────────────────────────────────────────────────────────

/// Outcome class of the most recent sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeReliability {
    /// No attempt completed since boot or since the time server changed.
    #[default]
    Uninitialized,
    /// The time source could not be routed to.
    NoNetwork,
    Ok,
    /// The time source did not answer within the bounded wait.
    Error,
}

impl TimeReliability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::NoNetwork => "no network",
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Tracks sync outcomes and the age of the last good sync.
#[derive(Debug, Clone, Default)]
pub struct TimeTracker {
    state: TimeReliability,
    /// Monotonic time of the last success; boot counts as the baseline.
    last_success_ms: u64,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimeReliability {
        self.state
    }

    /// Whether a sync should be attempted this tick.  While the clock is
    /// trusted, at most once per sync interval; otherwise every tick.
    pub fn should_attempt(&self, now_ms: u64, config: &ControllerConfig) -> bool {
        self.state != TimeReliability::Ok
            || now_ms.saturating_sub(self.last_success_ms) >= config.sync_interval_ms()
    }

    /// Record the outcome of one sync attempt and update the time faults.
    /// Returns `true` if the reliability state changed.
    pub fn record(
        &mut self,
        now_ms: u64,
        outcome: Result<(), SyncError>,
        faults: &mut FaultSet,
    ) -> bool {
        let previous = self.state;
        match outcome {
            Ok(()) => {
                self.mark_synced(now_ms, faults);
            }
            Err(SyncError::NoRoute) => {
                warn!("Time sync failed: {}", SyncError::NoRoute);
                self.state = TimeReliability::NoNetwork;
                faults.raise(FaultCode::NoNetwork);
                faults.raise(FaultCode::NoTimeSource);
            }
            Err(SyncError::Timeout) => {
                warn!("Time sync failed: {}", SyncError::Timeout);
                self.state = TimeReliability::Error;
                faults.clear(FaultCode::NoNetwork);
                faults.raise(FaultCode::NoTimeSource);
            }
        }
        previous != self.state
    }

    /// Treat an operator-supplied clock setting as a successful sync.
    pub fn mark_synced(&mut self, now_ms: u64, faults: &mut FaultSet) {
        self.state = TimeReliability::Ok;
        self.last_success_ms = now_ms;
        faults.clear(FaultCode::NoTimeSource);
        faults.clear(FaultCode::NoNetwork);
        debug!("Time sync ok at {now_ms} ms");
    }

    /// Milliseconds since the last success (or since boot).
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_success_ms)
    }

    /// Whether the clock has gone longer than the threshold without a sync.
    pub fn is_stale(&self, now_ms: u64, config: &ControllerConfig) -> bool {
        self.age_ms(now_ms) > config.unreliable_after_ms()
    }

    /// Forget the reliability classification (time server changed).
    /// Staleness keeps counting from the last success.
    pub fn reset(&mut self) {
        info!("Time source changed, reliability reset");
        self.state = TimeReliability::Uninitialized;
    }
}

// ───────────────────────────────────────────────────────────────
// Wall clock
// ───────────────────────────────────────────────────────────────

/// Local wall clock anchored to the last synced UTC instant.
///
/// Before the first sync the clock runs from the Unix epoch at boot.
#[derive(Debug, Clone)]
pub struct WallClock {
    anchor_utc: DateTime<Utc>,
    anchor_ms: u64,
    tz_offset_hours: i32,
}

impl WallClock {
    pub fn new(tz_offset_hours: i32) -> Self {
        Self {
            anchor_utc: DateTime::<Utc>::UNIX_EPOCH,
            anchor_ms: 0,
            tz_offset_hours,
        }
    }

    pub fn set_tz_offset(&mut self, hours: i32) {
        self.tz_offset_hours = hours;
    }

    /// Re-anchor on a UTC instant delivered by the time source.
    pub fn set_utc(&mut self, utc: DateTime<Utc>, now_ms: u64) {
        self.anchor_utc = utc;
        self.anchor_ms = now_ms;
    }

    /// Set the local time of day, keeping the current local date.
    pub fn set_time_of_day(&mut self, time: TimeOfDay, now_ms: u64) {
        let offset = self.offset();
        let date = self.now_utc(now_ms).with_timezone(&offset).date_naive();
        let local = NaiveTime::from_num_seconds_from_midnight_opt(time.secs(), 0)
            .map(|t| date.and_time(t))
            .and_then(|naive| naive.and_local_timezone(offset).single());
        match local {
            Some(local) => self.set_utc(local.with_timezone(&Utc), now_ms),
            None => warn!("Could not set clock to {time}"),
        }
    }

    /// Current UTC instant.
    pub fn now_utc(&self, now_ms: u64) -> DateTime<Utc> {
        let elapsed = now_ms.saturating_sub(self.anchor_ms);
        let elapsed = TimeDelta::try_milliseconds(i64::try_from(elapsed).unwrap_or(i64::MAX))
            .unwrap_or(TimeDelta::zero());
        self.anchor_utc
            .checked_add_signed(elapsed)
            .unwrap_or(self.anchor_utc)
    }

    /// Current local time of day.
    pub fn time_of_day(&self, now_ms: u64) -> TimeOfDay {
        let local = self.now_utc(now_ms).with_timezone(&self.offset());
        TimeOfDay::from_secs(local.num_seconds_from_midnight()).unwrap_or(TimeOfDay::MIDNIGHT)
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.tz_offset_hours.saturating_mul(3600)).unwrap_or_else(|| {
            warn!("UTC offset {} h out of range, using UTC", self.tz_offset_hours);
            Utc.fix()
        })
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new(0)
    }
}
