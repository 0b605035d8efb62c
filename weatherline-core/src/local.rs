//! Local wall-clock helpers built on the location's fixed UTC offset.

use chrono::{DateTime, FixedOffset};

pub const HOUR: i64 = 3_600;
pub const DAY: i64 = 86_400;

/// UTC offset of the configured location, as reported by the upstream.
///
/// The upstream reports a single offset per response, so local times are
/// computed with a fixed offset rather than a tz database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneOffset(FixedOffset);

impl TimezoneOffset {
    /// `None` when the offset is a day or more away from UTC.
    pub fn from_seconds(seconds: i32) -> Option<Self> {
        FixedOffset::east_opt(seconds).map(Self)
    }

    pub fn seconds(self) -> i32 {
        self.0.local_minus_utc()
    }

    pub fn to_local(self, epoch: i64) -> Option<DateTime<FixedOffset>> {
        DateTime::from_timestamp(epoch, 0).map(|utc| utc.with_timezone(&self.0))
    }

    pub fn seconds_of_day(self, epoch: i64) -> i64 {
        (epoch + i64::from(self.seconds())).rem_euclid(DAY)
    }

    /// Epoch of the local midnight that starts the day containing `epoch`.
    pub fn local_midnight(self, epoch: i64) -> i64 {
        epoch - self.seconds_of_day(epoch)
    }

    pub fn local_hour(self, epoch: i64) -> i64 {
        self.seconds_of_day(epoch) / HOUR
    }

    /// Formats `epoch` as local time, or an empty string for unrepresentable instants.
    pub fn format(self, epoch: i64, pattern: &str) -> String {
        self.to_local(epoch)
            .map(|local| local.format(pattern).to_string())
            .unwrap_or_default()
    }
}

/// Start of the UTC hour containing `epoch`.
pub fn hour_start(epoch: i64) -> i64 {
    epoch - epoch.rem_euclid(HOUR)
}
