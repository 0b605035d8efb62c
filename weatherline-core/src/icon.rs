//! Icon selection from upstream condition codes.
//!
//! See <https://openweathermap.org/weather-conditions> for the code table.

use serde::Serialize;

use crate::local::TimezoneOffset;
use crate::model::WeatherPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intensity {
    Light,
    Medium,
    Showers,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type", content = "intensity")]
pub enum Precipitation {
    None,
    Drizzle,
    Rain(Intensity),
    Snow(Intensity),
    Fog,
}

impl Precipitation {
    pub fn intensity(self) -> Option<Intensity> {
        match self {
            Precipitation::Rain(i) | Precipitation::Snow(i) => Some(i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloudBand {
    None,
    Light,
    Moderate,
    Heavy,
    Overcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Celestial {
    None,
    SunLarge,
    SunSmall,
    MoonLarge,
    MoonSmall,
}

/// The five icon layers a point is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IconSelection {
    pub precipitation: Precipitation,
    pub thunder: bool,
    pub freeze: bool,
    pub cloud_band: CloudBand,
    pub celestial: Celestial,
}

/// Below this minimum temperature the freeze layer is shown.
pub const FREEZE_BELOW_C: f64 = 1.0;

/// Classifies `point` as seen at `now`.
///
/// `sunrise`/`sunset` override the point's own values; hourly points carry
/// none, so callers pass the current or daily ones. Day and night are decided
/// by local time of day, so sunrise/sunset from a different date still apply.
pub fn classify(
    point: &WeatherPoint,
    now: i64,
    offset: TimezoneOffset,
    sunrise: Option<i64>,
    sunset: Option<i64>,
) -> IconSelection {
    let conditions = point.conditions();
    let code = conditions.condition_code;

    let celestial = match code {
        800 | 801 => {
            let sunrise = sunrise.or_else(|| point.sunrise());
            let sunset = sunset.or_else(|| point.sunset());
            let clear = code == 800;

            match (is_daytime(now, offset, sunrise, sunset), clear) {
                (true, true) => Celestial::SunLarge,
                (true, false) => Celestial::SunSmall,
                (false, true) => Celestial::MoonLarge,
                (false, false) => Celestial::MoonSmall,
            }
        }
        _ => Celestial::None,
    };

    IconSelection {
        precipitation: precipitation(code),
        thunder: (200..300).contains(&code),
        freeze: point.minimum_temperature_c() < FREEZE_BELOW_C,
        cloud_band: cloud_band(conditions.clouds_pct),
        celestial,
    }
}

pub fn precipitation(code: u16) -> Precipitation {
    match code {
        300..=399 => Precipitation::Drizzle,
        500 => Precipitation::Rain(Intensity::Light),
        501 => Precipitation::Rain(Intensity::Showers),
        502..=599 => Precipitation::Rain(Intensity::Heavy),
        600 | 612 | 615 | 620 => Precipitation::Snow(Intensity::Light),
        602 | 622 => Precipitation::Snow(Intensity::Heavy),
        601..=699 => Precipitation::Snow(Intensity::Medium),
        700..=799 => Precipitation::Fog,
        _ => Precipitation::None,
    }
}

pub fn cloud_band(clouds_pct: u8) -> CloudBand {
    match clouds_pct {
        0..=10 => CloudBand::None,
        11..=24 => CloudBand::Light,
        25..=49 => CloudBand::Moderate,
        50..=74 => CloudBand::Heavy,
        _ => CloudBand::Overcast,
    }
}

fn is_daytime(now: i64, offset: TimezoneOffset, sunrise: Option<i64>, sunset: Option<i64>) -> bool {
    match (sunrise, sunset) {
        (Some(rise), Some(set)) => {
            let t = offset.seconds_of_day(now);
            let rise = offset.seconds_of_day(rise);
            let set = offset.seconds_of_day(set);

            if rise <= set {
                rise <= t && t < set
            } else {
                // sun sets after local midnight
                t >= rise || t < set
            }
        }
        _ => true,
    }
}
