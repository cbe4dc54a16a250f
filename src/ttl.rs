//! Lifetime policy for cached entries.
//!
//! A closed set of named durations ([`ExpireAfter`]) plus raw second counts
//! ([`Ttl::Seconds`]). Both resolve to either a number of seconds or `None`,
//! which means the entry never expires on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Named entry lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpireAfter {
    /// Never expires; only a flush removes the entry.
    #[default]
    Forever,
    OneMinute,
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    FortyFiveMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
}

impl ExpireAfter {
    /// Every variant, shortest first with `Forever` leading.
    pub const ALL: [ExpireAfter; 12] = [
        ExpireAfter::Forever,
        ExpireAfter::OneMinute,
        ExpireAfter::FiveMinutes,
        ExpireAfter::TenMinutes,
        ExpireAfter::FifteenMinutes,
        ExpireAfter::ThirtyMinutes,
        ExpireAfter::FortyFiveMinutes,
        ExpireAfter::OneHour,
        ExpireAfter::OneDay,
        ExpireAfter::OneWeek,
        ExpireAfter::OneMonth,
        ExpireAfter::OneYear,
    ];

    /// Lifetime in seconds, `None` for [`ExpireAfter::Forever`].
    pub const fn in_seconds(self) -> Option<u64> {
        match self {
            ExpireAfter::Forever => None,
            ExpireAfter::OneMinute => Some(60),
            ExpireAfter::FiveMinutes => Some(300),
            ExpireAfter::TenMinutes => Some(600),
            ExpireAfter::FifteenMinutes => Some(900),
            ExpireAfter::ThirtyMinutes => Some(1_800),
            ExpireAfter::FortyFiveMinutes => Some(2_700),
            ExpireAfter::OneHour => Some(3_600),
            ExpireAfter::OneDay => Some(86_400),
            ExpireAfter::OneWeek => Some(604_800),
            ExpireAfter::OneMonth => Some(2_592_000),
            ExpireAfter::OneYear => Some(31_536_000),
        }
    }

    pub fn as_duration(self) -> Option<Duration> {
        self.in_seconds().map(Duration::from_secs)
    }

    /// The snake_case name used in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            ExpireAfter::Forever => "forever",
            ExpireAfter::OneMinute => "one_minute",
            ExpireAfter::FiveMinutes => "five_minutes",
            ExpireAfter::TenMinutes => "ten_minutes",
            ExpireAfter::FifteenMinutes => "fifteen_minutes",
            ExpireAfter::ThirtyMinutes => "thirty_minutes",
            ExpireAfter::FortyFiveMinutes => "forty_five_minutes",
            ExpireAfter::OneHour => "one_hour",
            ExpireAfter::OneDay => "one_day",
            ExpireAfter::OneWeek => "one_week",
            ExpireAfter::OneMonth => "one_month",
            ExpireAfter::OneYear => "one_year",
        }
    }
}

impl fmt::Display for ExpireAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name an [`ExpireAfter`] variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown expiry '{0}'")]
pub struct ParseExpireAfterError(pub String);

impl FromStr for ExpireAfter {
    type Err = ParseExpireAfterError;

    /// Accepts the snake_case name (`one_hour`) as well as the variant name
    /// (`OneHour`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        ExpireAfter::ALL
            .into_iter()
            .find(|variant| variant.as_str().replace('_', "") == normalized)
            .ok_or_else(|| ParseExpireAfterError(s.to_string()))
    }
}

/// Lifetime requested for a single `remember*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// A named lifetime.
    After(ExpireAfter),
    /// A raw number of seconds, used as-is.
    Seconds(u64),
}

impl Ttl {
    /// Never expires.
    pub const FOREVER: Ttl = Ttl::After(ExpireAfter::Forever);

    /// Lifetime in seconds, `None` when the entry never expires.
    pub fn in_seconds(self) -> Option<u64> {
        match self {
            Ttl::After(named) => named.in_seconds(),
            Ttl::Seconds(seconds) => Some(seconds),
        }
    }

    /// Absolute expiry (unix milliseconds) for an entry written at `now_ms`.
    ///
    /// Lifetimes too long to represent saturate at `i64::MAX`.
    pub fn expires_at(self, now_ms: i64) -> Option<i64> {
        self.in_seconds().map(|seconds| {
            let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
            now_ms.saturating_add(seconds.saturating_mul(1000))
        })
    }

    /// A zero-second lifetime means the value must not be stored at all.
    pub fn is_immediate(self) -> bool {
        self.in_seconds() == Some(0)
    }
}

impl From<ExpireAfter> for Ttl {
    fn from(named: ExpireAfter) -> Self {
        Ttl::After(named)
    }
}

impl From<u64> for Ttl {
    fn from(seconds: u64) -> Self {
        Ttl::Seconds(seconds)
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Seconds(duration.as_secs())
    }
}
