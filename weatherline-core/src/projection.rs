use serde::Serialize;

use crate::icon::{IconSelection, classify};
use crate::local::TimezoneOffset;
use crate::model::{Alert, PointKind, WeatherPoint};

/// Display-ready rendering of one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub kind: PointKind,
    pub timestamp: i64,
    /// "Today" for day 0, otherwise the local weekday name.
    pub day_label: String,
    pub local_time: String,
    pub temperature_c: i64,
    pub feels_like_c: i64,
    /// Daily min/max, rounded.
    pub range_c: Option<(i64, i64)>,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_kmh: i64,
    pub precipitation_pct: Option<i64>,
    pub rain_mm: Option<f64>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub icons: IconSelection,
}

/// An alert prepared for a one-line banner plus detail popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotice {
    pub title: String,
    pub body: String,
    pub source: String,
    pub until: String,
}

impl AlertNotice {
    pub fn new(alert: &Alert, offset: TimezoneOffset) -> Self {
        Self {
            title: alert.title.clone(),
            body: alert.display_body(),
            source: alert.display_source(),
            until: offset.format(alert.end, "%H:%M %d.%m.%Y"),
        }
    }
}

/// Sun times to classify against, for points that carry none of their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Projects `point` for display.
///
/// The live reading is classified against `now`; forecast and historical
/// points against the moment they describe.
pub fn project(
    point: &WeatherPoint,
    day_offset: i64,
    now: i64,
    offset: TimezoneOffset,
    sun: SunTimes,
) -> Projection {
    let moment = match point {
        WeatherPoint::Current(_) => now,
        _ => point.timestamp(),
    };
    let sunrise = point.sunrise().or(sun.sunrise);
    let sunset = point.sunset().or(sun.sunset);

    let (temperature_c, feels_like_c, range_c) = match point {
        WeatherPoint::Current(p) => (p.temperature_c, p.feels_like_c, None),
        WeatherPoint::Hourly(p) => (p.temperature_c, p.feels_like_c, None),
        WeatherPoint::Daily(p) => (
            p.temperature.day,
            p.feels_like.day,
            Some((round(p.temperature.min), round(p.temperature.max))),
        ),
    };

    let conditions = point.conditions();
    let day_label = if day_offset == 0 {
        "Today".to_string()
    } else {
        offset.format(point.timestamp(), "%A")
    };

    Projection {
        kind: point.kind(),
        timestamp: point.timestamp(),
        day_label,
        local_time: offset.format(moment, "%H:%M"),
        temperature_c: round(temperature_c),
        feels_like_c: round(feels_like_c),
        range_c,
        description: conditions.condition_summary.clone(),
        humidity_pct: conditions.humidity_pct,
        wind_kmh: round(conditions.wind_speed_ms * 3.6),
        precipitation_pct: point.precipitation_probability().map(|p| round(p * 100.0)),
        rain_mm: point.rain_mm(),
        sunrise: sunrise.map(|t| offset.format(t, "%H:%M")),
        sunset: sunset.map(|t| offset.format(t, "%H:%M")),
        icons: classify(point, moment, offset, sunrise, sunset),
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}
