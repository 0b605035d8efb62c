use std::time::Duration;

use anyhow::Context;
use tracing::{debug, warn};

use crate::config::Config;
use crate::endpoint::{Endpoint, Endpoints};
use crate::error::{FetchError, WeatherError};
use crate::model::WeatherSnapshot;
use crate::normalize::normalize;
use crate::transport::{HttpTransport, Transport, redact};

/// Issues the four One Call requests and decodes their answers.
///
/// Nothing is cached here: every call goes to the transport.
#[derive(Debug)]
pub struct Fetcher {
    transport: Box<dyn Transport>,
    endpoints: Endpoints,
}

impl Fetcher {
    pub fn new(transport: Box<dyn Transport>, endpoints: Endpoints) -> Self {
        Self { transport, endpoints }
    }

    pub async fn fetch_current(&self) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch(Endpoint::Current).await
    }

    pub async fn fetch_daily_forecast(&self) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch(Endpoint::DailyForecast).await
    }

    pub async fn fetch_hourly_forecast(&self) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch(Endpoint::HourlyForecast).await
    }

    pub async fn fetch_historical(&self, at: i64) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch(Endpoint::Historical { at }).await
    }

    /// Like the `fetch_*` methods but keeps the failure kind.
    pub async fn try_fetch(&self, endpoint: Endpoint) -> Result<WeatherSnapshot, FetchError> {
        let url = self.endpoints.url(endpoint);
        debug!(url = %redact(&url), "requesting");

        let body = self.transport.get_text(&url).await?;
        normalize(&body, endpoint.kind())
    }

    async fn fetch(&self, endpoint: Endpoint) -> Result<WeatherSnapshot, WeatherError> {
        self.try_fetch(endpoint).await.map_err(|err| {
            warn!(?endpoint, kind = err.kind(), error = %err, "fetch failed");
            WeatherError::from(err)
        })
    }
}

/// Construct a fetcher backed by HTTP from the stored configuration.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Fetcher> {
    let api_key = config.require_api_key()?;
    let location = config.require_location()?;

    let endpoints =
        Endpoints::new(&config.base_url, location.clone(), config.units.as_str(), api_key)
            .context("Invalid base_url in configuration")?;
    let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_secs))
        .context("Failed to set up HTTP transport")?;

    Ok(Fetcher::new(Box::new(transport), endpoints))
}
