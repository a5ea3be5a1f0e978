//! Daily on/off schedule for one relay.
//!
//! A schedule is a short list of half-open `[on, off)` intervals expressed
//! as seconds since local midnight.  Intervals never wrap past midnight:
//! every interval must satisfy `off > on`, so `23:00:00 -> 01:00:00` is
//! rejected rather than silently misread.  Two daily intervals are needed
//! to cover a period that spans midnight.
//!
//! ```text
//!  00:00                                                          24:00
//!    |-------[on0 ····· off0)-------[on1 ···· off1)------------------|
//!                 active                 active
//! ```

use core::fmt;

use log::debug;

use crate::error::ConfigError;

/// Maximum number of on/off intervals per relay per day.
pub const MAX_SCHEDULES: usize = 4;

const SECS_PER_MIN: u32 = 60;
const SECS_PER_HOUR: u32 = 3600;

/// Seconds in one day; every [`TimeOfDay`] is strictly below this.
pub const SECS_PER_DAY: u32 = 86_400;

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

/// Local wall-clock time of day, seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);

    /// Build from seconds since midnight.  `None` if a full day or more.
    pub const fn from_secs(secs: u32) -> Option<Self> {
        if secs < SECS_PER_DAY {
            Some(Self(secs))
        } else {
            None
        }
    }

    /// Build from hour/minute/second fields.
    ///
    /// Minute and second accept `0..=60`; the resulting instant must still
    /// fall inside the day.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if hour > 23 || minute > 60 || second > 60 {
            return None;
        }
        Self::from_secs(hour * SECS_PER_HOUR + minute * SECS_PER_MIN + second)
    }

    /// Parse an `HH:MM:SS` 24-hour literal.
    ///
    /// Exactly three unsigned integer fields separated by `:` are required.
    pub fn parse(literal: &str) -> Result<Self, ConfigError> {
        let mut fields = [0u32; 3];
        let mut parts = literal.trim().split(':');
        for field in &mut fields {
            let part = parts.next().ok_or(ConfigError::InvalidTime)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ConfigError::InvalidTime);
            }
            *field = part.parse().map_err(|_| ConfigError::InvalidTime)?;
        }
        if parts.next().is_some() {
            return Err(ConfigError::InvalidTime);
        }
        Self::from_hms(fields[0], fields[1], fields[2]).ok_or(ConfigError::InvalidTime)
    }

    pub const fn secs(self) -> u32 {
        self.0
    }

    pub const fn hour(self) -> u32 {
        self.0 / SECS_PER_HOUR
    }

    pub const fn minute(self) -> u32 {
        (self.0 % SECS_PER_HOUR) / SECS_PER_MIN
    }

    pub const fn second(self) -> u32 {
        self.0 % SECS_PER_MIN
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

// ═══════════════════════════════════════════════════════════════
//  Interval
// ═══════════════════════════════════════════════════════════════

/// One half-open `[on, off)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    on: TimeOfDay,
    off: TimeOfDay,
}

impl Interval {
    /// Build an interval; `off` must be strictly after `on`.
    pub fn new(on: TimeOfDay, off: TimeOfDay) -> Result<Self, ConfigError> {
        if off <= on {
            return Err(ConfigError::OffNotAfterOn);
        }
        Ok(Self { on, off })
    }

    /// Parse both endpoints from `HH:MM:SS` literals.
    pub fn parse(on: &str, off: &str) -> Result<Self, ConfigError> {
        Self::new(TimeOfDay::parse(on)?, TimeOfDay::parse(off)?)
    }

    pub fn on(&self) -> TimeOfDay {
        self.on
    }

    pub fn off(&self) -> TimeOfDay {
        self.off
    }

    /// True if `now` lies in `[on, off)`.
    pub fn contains(&self, now: TimeOfDay) -> bool {
        self.on <= now && now < self.off
    }

    /// Half-open overlap test; touching intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.on.max(other.on) < self.off.min(other.off)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Daily schedule
// ═══════════════════════════════════════════════════════════════

/// Ordered, pairwise-disjoint set of intervals for one relay.
///
/// Rebuilt wholesale on every configuration update; read-only while
/// the controller evaluates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailySchedule {
    intervals: heapless::Vec<Interval, MAX_SCHEDULES>,
}

impl DailySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a whole candidate list of `(on, off)` literals in input
    /// order and build the schedule from it.  The first failing entry
    /// rejects the entire list.
    pub fn parse<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut schedule = Self::new();
        for (on, off) in pairs {
            debug!("Schedule: requested \"{}\" <-> \"{}\"", on, off);
            schedule.try_push(Interval::parse(on, off)?)?;
        }
        debug!("Schedule: accepted {} entries", schedule.len());
        Ok(schedule)
    }

    /// Append an interval after checking it against every accepted one.
    pub fn try_push(&mut self, interval: Interval) -> Result<(), ConfigError> {
        if self.intervals.iter().any(|existing| existing.overlaps(&interval)) {
            return Err(ConfigError::Overlap);
        }
        self.intervals
            .push(interval)
            .map_err(|_| ConfigError::TooManyIntervals)
    }

    /// True if `now` falls inside any stored interval.
    pub fn is_active(&self, now: TimeOfDay) -> bool {
        self.intervals.iter().any(|i| i.contains(now))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
