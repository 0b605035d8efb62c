use serde::{Deserialize, Serialize};

/// Readings every variant carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub clouds_pct: u8,
    pub wind_speed_ms: f64,
    pub wind_degrees: u16,
    pub wind_gust_ms: Option<f64>,
    pub dew_point_c: f64,
    /// Historical hours are sometimes reported without a UV index.
    pub uvi: Option<f64>,
    pub condition_code: u16,
    pub condition_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPoint {
    pub timestamp: i64,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub rain_mm_1h: Option<f64>,
    pub snow_mm_1h: Option<f64>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub conditions: Conditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub timestamp: i64,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    /// Forecast hours carry a probability; historical hours do not.
    pub precipitation_probability: Option<f64>,
    pub rain_mm_1h: Option<f64>,
    pub snow_mm_1h: Option<f64>,
    pub conditions: Conditions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub min: f64,
    pub max: f64,
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

/// Daily feels-like readings; the upstream has no min/max for these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyFeelsLike {
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub timestamp: i64,
    pub temperature: DailyTemperature,
    pub feels_like: DailyFeelsLike,
    pub precipitation_probability: f64,
    /// Daily precipitation totals in mm.
    pub rain_mm: Option<f64>,
    pub snow_mm: Option<f64>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub moonrise: Option<i64>,
    pub moonset: Option<i64>,
    pub moon_phase: Option<f64>,
    pub conditions: Conditions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Current,
    Hourly,
    Daily,
}

/// A single observation or forecast slot, tagged by the response it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeatherPoint {
    Current(CurrentPoint),
    Hourly(HourlyPoint),
    Daily(DailyPoint),
}

impl WeatherPoint {
    pub fn kind(&self) -> PointKind {
        match self {
            WeatherPoint::Current(_) => PointKind::Current,
            WeatherPoint::Hourly(_) => PointKind::Hourly,
            WeatherPoint::Daily(_) => PointKind::Daily,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            WeatherPoint::Current(p) => p.timestamp,
            WeatherPoint::Hourly(p) => p.timestamp,
            WeatherPoint::Daily(p) => p.timestamp,
        }
    }

    pub fn conditions(&self) -> &Conditions {
        match self {
            WeatherPoint::Current(p) => &p.conditions,
            WeatherPoint::Hourly(p) => &p.conditions,
            WeatherPoint::Daily(p) => &p.conditions,
        }
    }

    /// The lowest temperature this point speaks for: the scalar reading for
    /// current/hourly points, the daily minimum otherwise.
    pub fn minimum_temperature_c(&self) -> f64 {
        match self {
            WeatherPoint::Current(p) => p.temperature_c,
            WeatherPoint::Hourly(p) => p.temperature_c,
            WeatherPoint::Daily(p) => p.temperature.min,
        }
    }

    pub fn sunrise(&self) -> Option<i64> {
        match self {
            WeatherPoint::Current(p) => p.sunrise,
            WeatherPoint::Hourly(_) => None,
            WeatherPoint::Daily(p) => p.sunrise,
        }
    }

    pub fn sunset(&self) -> Option<i64> {
        match self {
            WeatherPoint::Current(p) => p.sunset,
            WeatherPoint::Hourly(_) => None,
            WeatherPoint::Daily(p) => p.sunset,
        }
    }

    pub fn precipitation_probability(&self) -> Option<f64> {
        match self {
            WeatherPoint::Current(_) => None,
            WeatherPoint::Hourly(p) => p.precipitation_probability,
            WeatherPoint::Daily(p) => Some(p.precipitation_probability),
        }
    }

    /// Rain amount: last hour for current/hourly points, day total for daily ones.
    pub fn rain_mm(&self) -> Option<f64> {
        match self {
            WeatherPoint::Current(p) => p.rain_mm_1h,
            WeatherPoint::Hourly(p) => p.rain_mm_1h,
            WeatherPoint::Daily(p) => p.rain_mm,
        }
    }
}

/// A weather warning issued by a national agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub start: i64,
    pub end: i64,
    pub title: String,
    pub body: String,
    pub source: String,
}

impl Alert {
    /// Active within `[start, end)`.
    pub fn is_active_at(&self, at: i64) -> bool {
        self.start <= at && at < self.end
    }

    /// Body text with tabs and line breaks removed, ready for a one-line display.
    pub fn display_body(&self) -> String {
        strip_control_breaks(&self.body)
    }

    pub fn display_source(&self) -> String {
        strip_control_breaks(&self.source)
    }
}

fn strip_control_breaks(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\t' | '\n' | '\r')).collect()
}

/// One decoded backend response. Which sections are populated depends on the
/// request it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub lat: f64,
    pub lon: f64,
    pub timezone: Option<String>,
    pub timezone_offset: i32,
    pub current: Option<CurrentPoint>,
    pub hourly: Vec<HourlyPoint>,
    pub daily: Vec<DailyPoint>,
    pub alerts: Vec<Alert>,
}

impl WeatherSnapshot {
    /// First alert active at `at`, if any.
    pub fn active_alert(&self, at: i64) -> Option<&Alert> {
        self.alerts.iter().find(|alert| alert.is_active_at(at))
    }
}
