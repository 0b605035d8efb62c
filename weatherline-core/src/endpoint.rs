use thiserror::Error;
use url::Url;

use crate::config::Location;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Which sections a response is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Current,
    Daily,
    Hourly,
    Historical,
}

/// The four logical requests against the One Call API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    DailyForecast,
    HourlyForecast,
    Historical { at: i64 },
}

impl Endpoint {
    pub fn kind(self) -> PayloadKind {
        match self {
            Endpoint::Current => PayloadKind::Current,
            Endpoint::DailyForecast => PayloadKind::Daily,
            Endpoint::HourlyForecast => PayloadKind::Hourly,
            Endpoint::Historical { .. } => PayloadKind::Historical,
        }
    }

    fn path(self) -> &'static [&'static str] {
        match self {
            Endpoint::Historical { .. } => &["onecall", "timemachine"],
            _ => &["onecall"],
        }
    }

    fn exclude(self) -> Option<&'static str> {
        match self {
            Endpoint::Current => Some("hourly,minutely,daily"),
            Endpoint::DailyForecast => Some("hourly,minutely,current,alerts"),
            Endpoint::HourlyForecast => Some("daily,minutely,alerts,current"),
            Endpoint::Historical { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid base URL '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base URL '{0}' cannot carry a path")]
    NotABase(String),
}

/// Builds request URLs for one fixed location.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    location: Location,
    units: String,
    api_key: String,
}

impl Endpoints {
    pub fn new(
        base_url: &str,
        location: Location,
        units: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, EndpointError> {
        let base = Url::parse(base_url)
            .map_err(|source| EndpointError::Parse { url: base_url.to_string(), source })?;

        if base.cannot_be_a_base() {
            return Err(EndpointError::NotABase(base_url.to_string()));
        }

        Ok(Self { base, location, units: units.into(), api_key: api_key.into() })
    }

    pub fn url(&self, endpoint: Endpoint) -> Url {
        let mut url = self.base.clone();

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(endpoint.path());
        }

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("lat", &self.location.lat.to_string())
                .append_pair("lon", &self.location.lon.to_string());

            if let Some(exclude) = endpoint.exclude() {
                query.append_pair("exclude", exclude);
            }
            if let Endpoint::Historical { at } = endpoint {
                query.append_pair("dt", &at.to_string());
            }

            query
                .append_pair("units", &self.units)
                .append_pair("appid", &self.api_key);
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(base: &str) -> Endpoints {
        let location = Location { lat: 48.037659, lon: 14.39616, name: None };
        Endpoints::new(base, location, "metric", "KEY").expect("valid base")
    }

    fn query(url: &Url, key: &str) -> Option<String> {
        url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
    }

    #[test]
    fn forecast_urls_differ_only_by_exclusions() {
        let e = endpoints(DEFAULT_BASE_URL);

        let current = e.url(Endpoint::Current);
        let daily = e.url(Endpoint::DailyForecast);
        let hourly = e.url(Endpoint::HourlyForecast);

        for url in [&current, &daily, &hourly] {
            assert_eq!(url.path(), "/data/2.5/onecall");
            assert_eq!(query(url, "lat").as_deref(), Some("48.037659"));
            assert_eq!(query(url, "lon").as_deref(), Some("14.39616"));
            assert_eq!(query(url, "units").as_deref(), Some("metric"));
            assert_eq!(query(url, "appid").as_deref(), Some("KEY"));
            assert!(query(url, "dt").is_none());
        }

        assert_eq!(query(&current, "exclude").as_deref(), Some("hourly,minutely,daily"));
        assert_eq!(query(&daily, "exclude").as_deref(), Some("hourly,minutely,current,alerts"));
        assert_eq!(query(&hourly, "exclude").as_deref(), Some("daily,minutely,alerts,current"));
    }

    #[test]
    fn historical_url_carries_dt() {
        let e = endpoints("https://api.openweathermap.org/data/2.5/");
        let url = e.url(Endpoint::Historical { at: 1_623_707_999 });

        assert_eq!(url.path(), "/data/2.5/onecall/timemachine");
        assert_eq!(query(&url, "dt").as_deref(), Some("1623707999"));
        assert!(query(&url, "exclude").is_none());
    }

    #[test]
    fn bare_host_base_is_accepted() {
        let e = endpoints("http://127.0.0.1:8080");
        assert_eq!(e.url(Endpoint::Current).path(), "/onecall");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        let location = Location { lat: 0.0, lon: 0.0, name: None };
        assert!(matches!(
            Endpoints::new("not a url", location.clone(), "metric", "KEY"),
            Err(EndpointError::Parse { .. })
        ));
        assert!(matches!(
            Endpoints::new("mailto:someone@example.com", location, "metric", "KEY"),
            Err(EndpointError::NotABase(_))
        ));
    }
}
