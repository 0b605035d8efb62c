use crate::error::WeatherError;
use crate::local::{DAY, HOUR, TimezoneOffset};
use crate::model::{CurrentPoint, DailyPoint, WeatherPoint};
use crate::timeline::Timeline;

/// Timeline positions this close to the end are never handed out.
///
/// Compatibility shim: the hourly forecast has been seen to come back one or
/// two entries longer than its neighbours, with unreliable tail values. Keep
/// the margin at two until the live API is re-validated.
pub const TIMELINE_TAIL_MARGIN: usize = 2;

/// Day offsets served from the hourly timeline.
const TIMELINE_DAYS: std::ops::RangeInclusive<i64> = 0..=2;
/// Day offsets served from the daily forecast.
const DAILY_DAYS: std::ops::RangeInclusive<i64> = 3..=4;

/// Borrowed view over the latest data, answering (day, hour) lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver<'a> {
    pub offset: Option<TimezoneOffset>,
    pub current: Option<&'a CurrentPoint>,
    pub timeline: Option<&'a Timeline>,
    pub daily: Option<&'a [DailyPoint]>,
}

impl Resolver<'_> {
    /// Resolves a display position to a point.
    ///
    /// `(0, 0)` is always the live current reading. Other positions within
    /// the next two days come from the timeline, where `hour_offset` is the
    /// local hour of day; days three and four come from the daily forecast
    /// and ignore `hour_offset`.
    pub fn resolve(
        &self,
        day_offset: i64,
        hour_offset: i64,
        now: i64,
    ) -> Result<WeatherPoint, WeatherError> {
        if day_offset == 0 && hour_offset == 0 {
            return self
                .current
                .cloned()
                .map(WeatherPoint::Current)
                .ok_or(WeatherError::DataUnavailable);
        }

        if TIMELINE_DAYS.contains(&day_offset) {
            let index = self.timeline_index(day_offset, hour_offset, now)?;
            let timeline = self.timeline.ok_or(WeatherError::DataUnavailable)?;
            return timeline
                .get(index)
                .cloned()
                .map(WeatherPoint::Hourly)
                .ok_or(WeatherError::IndexOutOfRange { index: index as i64, len: timeline.len() });
        }

        if DAILY_DAYS.contains(&day_offset) {
            let daily = self.daily.ok_or(WeatherError::DataUnavailable)?;
            return daily
                .get(day_offset as usize)
                .cloned()
                .map(WeatherPoint::Daily)
                .ok_or(WeatherError::IndexOutOfRange { index: day_offset, len: daily.len() });
        }

        Err(WeatherError::IndexOutOfRange {
            index: day_offset,
            len: *DAILY_DAYS.end() as usize + 1,
        })
    }

    /// Timeline position of the first point at or after local
    /// `day_offset` days and `hour_offset` hours past today's local midnight.
    ///
    /// Points sit on whole UTC hours, so with a half-hour offset the chosen
    /// point starts half an hour into the requested local hour.
    pub fn timeline_index(
        &self,
        day_offset: i64,
        hour_offset: i64,
        now: i64,
    ) -> Result<usize, WeatherError> {
        let offset = self.offset.ok_or(WeatherError::DataUnavailable)?;
        let timeline = self.timeline.ok_or(WeatherError::DataUnavailable)?;
        let first = timeline.first().ok_or(WeatherError::DataUnavailable)?;

        let len = timeline.len();
        let out_of_range = |index: i64| WeatherError::IndexOutOfRange { index, len };

        let midnight = offset.local_midnight(now);
        let index = target_index(midnight, first.timestamp, day_offset, hour_offset).ok_or_else(|| {
            out_of_range(day_offset.saturating_mul(24).saturating_add(hour_offset))
        })?;
        let usable = len.saturating_sub(TIMELINE_TAIL_MARGIN);

        if index < 0 || index >= usable as i64 {
            return Err(out_of_range(index));
        }

        Ok(index as usize)
    }
}

/// Hours from `first` up to the requested local instant, rounded up.
/// `None` if the request does not fit in an `i64`.
fn target_index(local_midnight: i64, first: i64, day_offset: i64, hour_offset: i64) -> Option<i64> {
    let target = day_offset
        .checked_mul(DAY)?
        .checked_add(hour_offset.checked_mul(HOUR)?)?
        .checked_add(local_midnight)?;
    let delta = target.checked_sub(first)?;

    Some(delta.checked_add(HOUR - 1)?.div_euclid(HOUR))
}
