//! Decoding of raw One Call payloads into [`WeatherSnapshot`]s.
//!
//! The upstream reuses key names across response variants with different
//! shapes (`temp` is a number on current/hourly entries and an object on daily
//! ones; `rain` is an object keyed by `1h` on hourly entries and a plain total
//! on daily ones) and uses keys that are awkward as identifiers (`event`,
//! `1h`). Each section is therefore decoded with its own wire type, selected
//! by the payload kind, and then mapped onto the tagged model.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::endpoint::PayloadKind;
use crate::error::FetchError;
use crate::model::{
    Alert, Conditions, CurrentPoint, DailyFeelsLike, DailyPoint, DailyTemperature, HourlyPoint,
    WeatherSnapshot,
};

/// Top level of every response; sections stay undecoded until the payload
/// kind says which ones matter.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    lat: f64,
    lon: f64,
    #[serde(default)]
    timezone: Option<String>,
    timezone_offset: i32,
    #[serde(default)]
    current: Option<Value>,
    #[serde(default)]
    hourly: Option<Value>,
    #[serde(default)]
    daily: Option<Value>,
    #[serde(default)]
    alerts: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireCondition {
    id: u16,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WireCommon {
    pressure: f64,
    humidity: u8,
    dew_point: f64,
    #[serde(default)]
    uvi: Option<f64>,
    clouds: u8,
    wind_speed: f64,
    wind_deg: u16,
    #[serde(default)]
    wind_gust: Option<f64>,
    weather: Vec<WireCondition>,
}

/// `{"1h": 0.42}` as found under `rain`/`snow` on current and hourly entries.
#[derive(Debug, Deserialize)]
struct WireVolume {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireCurrent {
    dt: i64,
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
    #[serde(default)]
    rain: Option<WireVolume>,
    #[serde(default)]
    snow: Option<WireVolume>,
    #[serde(flatten)]
    common: WireCommon,
}

#[derive(Debug, Deserialize)]
struct WireHourly {
    dt: i64,
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    pop: Option<f64>,
    #[serde(default)]
    rain: Option<WireVolume>,
    #[serde(default)]
    snow: Option<WireVolume>,
    #[serde(flatten)]
    common: WireCommon,
}

#[derive(Debug, Deserialize)]
struct WireDailyTemp {
    min: f64,
    max: f64,
    day: f64,
    night: f64,
    eve: f64,
    morn: f64,
}

#[derive(Debug, Deserialize)]
struct WireDailyFeelsLike {
    day: f64,
    night: f64,
    eve: f64,
    morn: f64,
}

#[derive(Debug, Deserialize)]
struct WireDaily {
    dt: i64,
    temp: WireDailyTemp,
    feels_like: WireDailyFeelsLike,
    pop: f64,
    #[serde(default)]
    rain: Option<f64>,
    #[serde(default)]
    snow: Option<f64>,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
    #[serde(default)]
    moonrise: Option<i64>,
    #[serde(default)]
    moonset: Option<i64>,
    #[serde(default)]
    moon_phase: Option<f64>,
    #[serde(flatten)]
    common: WireCommon,
}

#[derive(Debug, Deserialize)]
struct WireAlert {
    #[serde(default)]
    sender_name: String,
    #[serde(rename = "event")]
    title: String,
    start: i64,
    end: i64,
    #[serde(default)]
    description: String,
}

impl WireCommon {
    fn into_conditions(self) -> Result<Conditions, FetchError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::MalformedPayload("empty weather array".to_string()))?;

        Ok(Conditions {
            humidity_pct: self.humidity,
            pressure_hpa: self.pressure,
            clouds_pct: self.clouds,
            wind_speed_ms: self.wind_speed,
            wind_degrees: self.wind_deg,
            wind_gust_ms: self.wind_gust,
            dew_point_c: self.dew_point,
            uvi: self.uvi,
            condition_code: condition.id,
            condition_summary: condition.description,
        })
    }
}

impl TryFrom<WireCurrent> for CurrentPoint {
    type Error = FetchError;

    fn try_from(w: WireCurrent) -> Result<Self, Self::Error> {
        Ok(CurrentPoint {
            timestamp: w.dt,
            temperature_c: w.temp,
            feels_like_c: w.feels_like,
            rain_mm_1h: w.rain.and_then(|v| v.one_hour),
            snow_mm_1h: w.snow.and_then(|v| v.one_hour),
            sunrise: w.sunrise,
            sunset: w.sunset,
            conditions: w.common.into_conditions()?,
        })
    }
}

impl TryFrom<WireHourly> for HourlyPoint {
    type Error = FetchError;

    fn try_from(w: WireHourly) -> Result<Self, Self::Error> {
        Ok(HourlyPoint {
            timestamp: w.dt,
            temperature_c: w.temp,
            feels_like_c: w.feels_like,
            precipitation_probability: w.pop,
            rain_mm_1h: w.rain.and_then(|v| v.one_hour),
            snow_mm_1h: w.snow.and_then(|v| v.one_hour),
            conditions: w.common.into_conditions()?,
        })
    }
}

impl TryFrom<WireDaily> for DailyPoint {
    type Error = FetchError;

    fn try_from(w: WireDaily) -> Result<Self, Self::Error> {
        Ok(DailyPoint {
            timestamp: w.dt,
            temperature: DailyTemperature {
                min: w.temp.min,
                max: w.temp.max,
                day: w.temp.day,
                night: w.temp.night,
                eve: w.temp.eve,
                morn: w.temp.morn,
            },
            feels_like: DailyFeelsLike {
                day: w.feels_like.day,
                night: w.feels_like.night,
                eve: w.feels_like.eve,
                morn: w.feels_like.morn,
            },
            precipitation_probability: w.pop,
            rain_mm: w.rain,
            snow_mm: w.snow,
            sunrise: w.sunrise,
            sunset: w.sunset,
            moonrise: w.moonrise,
            moonset: w.moonset,
            moon_phase: w.moon_phase,
            conditions: w.common.into_conditions()?,
        })
    }
}

impl From<WireAlert> for Alert {
    fn from(w: WireAlert) -> Self {
        Alert {
            start: w.start,
            end: w.end,
            title: w.title,
            body: w.description,
            source: w.sender_name,
        }
    }
}

/// Decodes `raw` as a response of the given kind.
///
/// The section the kind exists for must be present; sections the kind does
/// not use are ignored even when the upstream sends them.
pub fn normalize(raw: &str, kind: PayloadKind) -> Result<WeatherSnapshot, FetchError> {
    if raw.trim().is_empty() {
        return Err(FetchError::MalformedPayload("empty body".to_string()));
    }

    let envelope: WireEnvelope = serde_json::from_str(raw)?;

    let mut snapshot = WeatherSnapshot {
        lat: envelope.lat,
        lon: envelope.lon,
        timezone: envelope.timezone,
        timezone_offset: envelope.timezone_offset,
        current: None,
        hourly: Vec::new(),
        daily: Vec::new(),
        alerts: Vec::new(),
    };

    match kind {
        PayloadKind::Current => {
            let current: WireCurrent = required(envelope.current, "current")?;
            snapshot.current = Some(current.try_into()?);
            snapshot.alerts = decode_alerts(envelope.alerts)?;
        }
        PayloadKind::Daily => {
            let daily: Vec<WireDaily> = required(envelope.daily, "daily")?;
            snapshot.daily =
                daily.into_iter().map(DailyPoint::try_from).collect::<Result<_, _>>()?;
        }
        PayloadKind::Hourly | PayloadKind::Historical => {
            let hourly: Vec<WireHourly> = required(envelope.hourly, "hourly")?;
            snapshot.hourly =
                hourly.into_iter().map(HourlyPoint::try_from).collect::<Result<_, _>>()?;
        }
    }

    Ok(snapshot)
}

fn required<T: DeserializeOwned>(section: Option<Value>, name: &str) -> Result<T, FetchError> {
    match section {
        Some(value) if !value.is_null() => serde_json::from_value(value)
            .map_err(|err| FetchError::MalformedPayload(format!("section '{name}': {err}"))),
        _ => Err(FetchError::MalformedPayload(format!("missing section '{name}'"))),
    }
}

fn decode_alerts(section: Option<Value>) -> Result<Vec<Alert>, FetchError> {
    match section {
        Some(value) if !value.is_null() => {
            let alerts: Vec<WireAlert> = serde_json::from_value(value)
                .map_err(|err| FetchError::MalformedPayload(format!("section 'alerts': {err}")))?;
            Ok(alerts.into_iter().map(Alert::from).collect())
        }
        _ => Ok(Vec::new()),
    }
}
