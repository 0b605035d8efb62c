//! Stitching of historical and forecast hours into one continuous sequence.
//!
//! The hourly forecast starts at the current hour, but the display also shows
//! the elapsed hours of today. Those come from two time-machine calls: one for
//! today and one for the day before. The time machine's day boundary ignores the
//! location's UTC offset, so for locations east of UTC the first hours after
//! local midnight are only found at the tail of the previous day's answer.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::WeatherError;
use crate::fetch::Fetcher;
use crate::local::{DAY, HOUR, TimezoneOffset, hour_start};
use crate::model::HourlyPoint;

/// Hours taken from the end of the previous day's time-machine answer.
///
/// Matches the upstream's two-hour day-boundary drift observed for UTC+2;
/// re-check against live responses if the stitched timeline starts late.
pub const PREVIOUS_DAY_TAIL: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StitchError {
    #[error("hourly forecast is empty")]
    EmptyForecast,

    #[error("forecast has a gap after {after}")]
    ForecastGap { after: i64 },
}

/// Hourly points with strictly increasing timestamps and no gap longer than
/// an hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    points: Vec<HourlyPoint>,
}

/// Aggregate over a few consecutive timeline hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBlock {
    pub start: i64,
    pub mean_temperature_c: f64,
    /// Sum over the hours that reported rain; `None` if none did.
    pub rain_mm: Option<f64>,
    pub snow_mm: Option<f64>,
}

impl Timeline {
    pub fn points(&self) -> &[HourlyPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HourlyPoint> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&HourlyPoint> {
        self.points.first()
    }

    pub fn position_of(&self, timestamp: i64) -> Option<usize> {
        self.points.binary_search_by_key(&timestamp, |p| p.timestamp).ok()
    }

    /// Splits `count` blocks of `width` hours starting at `start`. Incomplete
    /// trailing blocks are left out.
    pub fn blocks(&self, start: usize, width: usize, count: usize) -> Vec<HourlyBlock> {
        if width == 0 || start >= self.points.len() {
            return Vec::new();
        }

        self.points[start..]
            .chunks_exact(width)
            .take(count)
            .map(|hours| HourlyBlock {
                start: hours[0].timestamp,
                mean_temperature_c: hours.iter().map(|h| h.temperature_c).sum::<f64>()
                    / hours.len() as f64,
                rain_mm: sum_present(hours.iter().map(|h| h.rain_mm_1h)),
                snow_mm: sum_present(hours.iter().map(|h| h.snow_mm_1h)),
            })
            .collect()
    }
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Merges the three hourly sources into one timeline.
///
/// Today's historical hours are only used up to (not including) the hour
/// containing `now`. On duplicate timestamps the forecast wins. If the
/// historical prefix leaves a hole, everything before the hole is dropped;
/// a hole inside the forecast itself fails the stitch.
pub fn stitch(
    previous_day: &[HourlyPoint],
    today: &[HourlyPoint],
    forecast: &[HourlyPoint],
    now: i64,
) -> Result<Timeline, StitchError> {
    let forecast_start = forecast
        .iter()
        .map(|p| p.timestamp)
        .min()
        .ok_or(StitchError::EmptyForecast)?;
    let current_hour = hour_start(now);

    let mut merged: BTreeMap<i64, HourlyPoint> = BTreeMap::new();

    let tail = previous_day.len().saturating_sub(PREVIOUS_DAY_TAIL);
    for point in &previous_day[tail..] {
        merged.insert(point.timestamp, point.clone());
    }
    for point in today.iter().filter(|p| p.timestamp < current_hour) {
        merged.insert(point.timestamp, point.clone());
    }
    for point in forecast {
        merged.insert(point.timestamp, point.clone());
    }

    let mut points: Vec<HourlyPoint> = merged.into_values().collect();

    let mut keep_from = 0;
    for (i, pair) in points.windows(2).enumerate() {
        if pair[1].timestamp - pair[0].timestamp > HOUR {
            if pair[1].timestamp <= forecast_start {
                keep_from = i + 1;
            } else {
                return Err(StitchError::ForecastGap { after: pair[0].timestamp });
            }
        }
    }

    if keep_from > 0 {
        warn!(dropped = keep_from, "historical hours are not contiguous, dropping the older ones");
        points.drain(..keep_from);
    }

    Ok(Timeline { points })
}

/// Runs the three fetches the timeline needs and stitches the result.
///
/// Any failed fetch makes the whole timeline unavailable; a partial one would
/// shift every index the resolver hands out.
pub async fn assemble(
    fetcher: &Fetcher,
    offset: TimezoneOffset,
    now: i64,
) -> Result<Timeline, WeatherError> {
    let today_start = offset.local_midnight(now);

    let today = fetcher.fetch_historical(today_start - 1).await?;
    let previous_day = fetcher.fetch_historical(today_start - 1 - DAY).await?;
    let forecast = fetcher.fetch_hourly_forecast().await?;

    let timeline = stitch(&previous_day.hourly, &today.hourly, &forecast.hourly, now)
        .map_err(|err| {
            warn!(error = %err, "could not stitch timeline");
            WeatherError::DataUnavailable
        })?;

    debug!(
        hours = timeline.len(),
        first = timeline.first().map(|p| p.timestamp),
        "timeline assembled"
    );

    Ok(timeline)
}
