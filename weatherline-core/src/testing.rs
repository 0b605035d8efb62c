//! Canned One Call answers and a scripted transport for unit tests.
//!
//! The scenario is fixed: a location at UTC+2, observed on
//! 2021-06-15 at 10:30 local time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use crate::config::Location;
use crate::endpoint::Endpoints;
use crate::fetch::Fetcher;
use crate::local::{DAY, HOUR, hour_start};
use crate::model::{Conditions, HourlyPoint};
use crate::transport::{Transport, TransportError};

pub const OFFSET: i32 = 7_200;
/// 2021-06-15T08:30:00Z
pub const NOW: i64 = 1_623_745_800;
/// 2021-06-15T00:00:00Z
pub const TODAY_START_UTC: i64 = 1_623_715_200;
/// 2021-06-15T00:00:00+02:00
pub const LOCAL_MIDNIGHT: i64 = TODAY_START_UTC - OFFSET as i64;
pub const SUNRISE: i64 = 1_623_726_000; // 05:00 local
pub const SUNSET: i64 = 1_623_783_600; // 21:00 local

pub fn conditions(code: u16, clouds: u8) -> Conditions {
    Conditions {
        humidity_pct: 60,
        pressure_hpa: 1015.0,
        clouds_pct: clouds,
        wind_speed_ms: 3.0,
        wind_degrees: 270,
        wind_gust_ms: None,
        dew_point_c: 10.0,
        uvi: Some(2.0),
        condition_code: code,
        condition_summary: "clear sky".to_string(),
    }
}

pub fn hourly_point(timestamp: i64, temperature_c: f64) -> HourlyPoint {
    HourlyPoint {
        timestamp,
        temperature_c,
        feels_like_c: temperature_c,
        precipitation_probability: Some(0.0),
        rain_mm_1h: None,
        snow_mm_1h: None,
        conditions: conditions(800, 0),
    }
}

fn weather(code: u16) -> Value {
    json!([{ "id": code, "main": "Clear", "description": "clear sky", "icon": "01d" }])
}

/// Hourly entries whose temperature encodes the local hour of day.
fn hourly_entries(start: i64, hours: usize) -> Value {
    let entries: Vec<Value> = (0..hours as i64)
        .map(|i| {
            let dt = start + i * HOUR;
            let local_hour = (dt + OFFSET as i64).rem_euclid(DAY) / HOUR;
            json!({
                "dt": dt,
                "temp": local_hour as f64,
                "feels_like": local_hour as f64 - 1.0,
                "pressure": 1015,
                "humidity": 60,
                "dew_point": 10.0,
                "uvi": 1.0,
                "clouds": 20,
                "wind_speed": 2.0,
                "wind_deg": 180,
                "weather": weather(801),
                "pop": 0.2
            })
        })
        .collect();
    Value::Array(entries)
}

fn envelope(section: &str, body: Value) -> Value {
    let mut root = json!({
        "lat": 48.0377,
        "lon": 14.3962,
        "timezone": "Europe/Vienna",
        "timezone_offset": OFFSET,
    });
    root[section] = body;
    root
}

pub fn current_body() -> String {
    let mut root = envelope(
        "current",
        json!({
            "dt": NOW,
            "sunrise": SUNRISE,
            "sunset": SUNSET,
            "temp": 18.4,
            "feels_like": 18.1,
            "pressure": 1016,
            "humidity": 72,
            "dew_point": 13.2,
            "uvi": 4.1,
            "clouds": 5,
            "wind_speed": 2.5,
            "wind_deg": 290,
            "weather": weather(800)
        }),
    );
    root["alerts"] = json!([{
        "sender_name": "GeoSphere Austria",
        "event": "Heat warning",
        "start": NOW - 3_600,
        "end": NOW + 7_200,
        "description": "High temperatures\nexpected."
    }]);
    root.to_string()
}

pub fn daily_body() -> String {
    let days: Vec<Value> = (0..8i64)
        .map(|i| {
            let noon = LOCAL_MIDNIGHT + i * DAY + 12 * HOUR;
            json!({
                "dt": noon,
                "sunrise": SUNRISE + i * DAY,
                "sunset": SUNSET + i * DAY,
                "temp": {"day": 20.0 + i as f64, "min": 10.0 + i as f64, "max": 25.0 + i as f64,
                         "night": 12.0, "eve": 18.0, "morn": 11.0},
                "feels_like": {"day": 19.5, "night": 11.5, "eve": 17.5, "morn": 10.5},
                "pressure": 1014,
                "humidity": 55,
                "dew_point": 9.0,
                "wind_speed": 4.0,
                "wind_deg": 250,
                "weather": weather(500),
                "clouds": 60,
                "pop": 0.35,
                "rain": 2.4,
                "uvi": 5.5
            })
        })
        .collect();
    envelope("daily", Value::Array(days)).to_string()
}

pub fn hourly_body() -> String {
    envelope("hourly", hourly_entries(hour_start(NOW), 48)).to_string()
}

/// Time machine answer for `dt = local midnight - 1`: today's hours from
/// 00:00 UTC (02:00 local) until shortly after `now`.
pub fn today_history_body() -> String {
    envelope("hourly", hourly_entries(TODAY_START_UTC, 10)).to_string()
}

/// Time machine answer one day earlier: the full previous UTC day.
pub fn previous_day_history_body() -> String {
    envelope("hourly", hourly_entries(TODAY_START_UTC - DAY, 24)).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Current,
    Daily,
    Hourly,
    Historical(i64),
}

impl Route {
    fn of(url: &Url) -> Option<Route> {
        let param = |name: &str| {
            url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
        };

        if url.path().ends_with("/timemachine") {
            return param("dt")?.parse().ok().map(Route::Historical);
        }

        match param("exclude")?.as_str() {
            "hourly,minutely,daily" => Some(Route::Current),
            "hourly,minutely,current,alerts" => Some(Route::Daily),
            "daily,minutely,alerts,current" => Some(Route::Hourly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Fail,
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<Route, Reply>,
    requests: Vec<Route>,
}

/// In-memory transport; clones share the same script so a test can change
/// replies after handing a clone to the code under test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Answers every request of the fixed scenario successfully.
    pub fn healthy() -> Self {
        let transport = Self::default();
        transport.reply(Route::Current, current_body());
        transport.reply(Route::Daily, daily_body());
        transport.reply(Route::Hourly, hourly_body());
        transport.reply(Route::Historical(LOCAL_MIDNIGHT - 1), today_history_body());
        transport.reply(Route::Historical(LOCAL_MIDNIGHT - 1 - DAY), previous_day_history_body());
        transport
    }

    pub fn reply(&self, route: Route, body: impl Into<String>) {
        self.script.lock().unwrap().replies.insert(route, Reply::Body(body.into()));
    }

    pub fn fail(&self, route: Route) {
        self.script.lock().unwrap().replies.insert(route, Reply::Fail);
    }

    pub fn garble(&self, route: Route) {
        self.reply(route, "{\"lat\": 1.0");
    }

    pub fn requests(&self) -> Vec<Route> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self, route: Route) -> usize {
        self.requests().into_iter().filter(|r| *r == route).count()
    }

    pub fn historical_requests(&self) -> Vec<i64> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Route::Historical(dt) => Some(dt),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_text(&self, url: &Url) -> Result<String, TransportError> {
        let unavailable = || TransportError::Status {
            url: url.path().to_string(),
            status: 503,
            body: "scripted failure".to_string(),
        };

        let route = Route::of(url).ok_or_else(unavailable)?;
        let mut script = self.script.lock().unwrap();
        script.requests.push(route);

        match script.replies.get(&route) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Fail) | None => Err(unavailable()),
        }
    }
}

pub fn endpoints() -> Endpoints {
    let location = Location { lat: 48.037659, lon: 14.39616, name: Some("Steyr".to_string()) };
    Endpoints::new("https://api.test/data/2.5", location, "metric", "KEY").unwrap()
}

pub fn fetcher(transport: &ScriptedTransport) -> Fetcher {
    Fetcher::new(Box::new(transport.clone()), endpoints())
}
