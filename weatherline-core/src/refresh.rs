//! Periodic refresh of the engine's data.
//!
//! One task owns the engine and drives both cadences: a short one for the
//! live reading and a long one for the daily forecast and timeline. A failed
//! refresh is retried once after a fixed delay; until then the engine keeps
//! serving what it had.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

use crate::config::RefreshSettings;
use crate::engine::WeatherEngine;
use crate::error::WeatherError;

/// Configuration for refresh intervals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    pub current_interval: Duration,
    pub forecast_interval: Duration,
    /// Delay before the single retry of a failed refresh.
    pub retry_delay: Duration,
    /// When false only the initial load and explicit triggers refresh.
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::from(&RefreshSettings::default())
    }
}

impl From<&RefreshSettings> for RefreshConfig {
    fn from(settings: &RefreshSettings) -> Self {
        Self {
            current_interval: Duration::from_secs(settings.current_secs.max(1)),
            forecast_interval: Duration::from_secs(settings.forecast_secs.max(1)),
            retry_delay: Duration::from_secs(settings.retry_delay_secs),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Current,
    Forecast,
}

/// What a refresh attempt led to.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    Updated(RefreshKind),
    /// First attempt failed; one more follows after the retry delay.
    RetryScheduled { kind: RefreshKind, error: WeatherError },
    /// The retry failed too. The next regular tick tries again.
    Failed { kind: RefreshKind, error: WeatherError },
}

/// Runs one refresh of `kind` against the engine.
pub async fn refresh_once(
    engine: &mut WeatherEngine,
    kind: RefreshKind,
    now: i64,
) -> Result<(), WeatherError> {
    match kind {
        RefreshKind::Current => engine.request_current().await.map(|_| ()),
        RefreshKind::Forecast => engine.request_forecast(now).await,
    }
}

const BOTH: &[RefreshKind] = &[RefreshKind::Current, RefreshKind::Forecast];
const CURRENT: &[RefreshKind] = &[RefreshKind::Current];
const FORECAST: &[RefreshKind] = &[RefreshKind::Forecast];

#[derive(Debug, Default)]
struct PendingRetries {
    current: Option<Instant>,
    forecast: Option<Instant>,
}

impl PendingRetries {
    fn slot(&mut self, kind: RefreshKind) -> &mut Option<Instant> {
        match kind {
            RefreshKind::Current => &mut self.current,
            RefreshKind::Forecast => &mut self.forecast,
        }
    }
}

/// Drives refreshes until `shutdown` fires or its sender is dropped.
///
/// Both kinds are loaded once up front. A message on `trigger` refreshes both
/// immediately. `clock` supplies the current Unix time; `on_event` sees every
/// outcome together with the engine state it produced.
pub async fn run<C, F>(
    engine: &mut WeatherEngine,
    config: &RefreshConfig,
    clock: C,
    mut shutdown: mpsc::Receiver<()>,
    mut trigger: mpsc::Receiver<()>,
    mut on_event: F,
) where
    C: Fn() -> i64,
    F: FnMut(&WeatherEngine, RefreshEvent),
{
    info!(
        current_secs = config.current_interval.as_secs(),
        forecast_secs = config.forecast_interval.as_secs(),
        enabled = config.enabled,
        "refresh loop starting"
    );

    let mut pending = PendingRetries::default();

    for &kind in BOTH {
        let event = attempt(engine, kind, clock(), false, config.retry_delay, &mut pending).await;
        on_event(engine, event);
    }

    let start = Instant::now();
    let mut current = interval_at(start + config.current_interval, config.current_interval);
    let mut forecast = interval_at(start + config.forecast_interval, config.forecast_interval);
    current.set_missed_tick_behavior(MissedTickBehavior::Delay);
    forecast.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let current_retry = pending.current;
        let forecast_retry = pending.forecast;

        let (kinds, is_retry): (&[RefreshKind], bool) = tokio::select! {
            _ = shutdown.recv() => break,
            Some(()) = trigger.recv() => {
                debug!("refresh triggered");
                (BOTH, false)
            }
            _ = sleep_until(current_retry.unwrap_or(start)), if current_retry.is_some() => {
                (CURRENT, true)
            }
            _ = sleep_until(forecast_retry.unwrap_or(start)), if forecast_retry.is_some() => {
                (FORECAST, true)
            }
            _ = current.tick(), if config.enabled => (CURRENT, false),
            _ = forecast.tick(), if config.enabled => (FORECAST, false),
        };

        for &kind in kinds {
            let event =
                attempt(engine, kind, clock(), is_retry, config.retry_delay, &mut pending).await;
            on_event(engine, event);
        }
    }

    info!("refresh loop stopped");
}

async fn attempt(
    engine: &mut WeatherEngine,
    kind: RefreshKind,
    now: i64,
    is_retry: bool,
    retry_delay: Duration,
    pending: &mut PendingRetries,
) -> RefreshEvent {
    let slot = pending.slot(kind);

    match refresh_once(engine, kind, now).await {
        Ok(()) => {
            *slot = None;
            debug!(?kind, "refresh succeeded");
            RefreshEvent::Updated(kind)
        }
        Err(error) if !is_retry => {
            *slot = Some(Instant::now() + retry_delay);
            warn!(
                ?kind,
                %error,
                retry_in_secs = retry_delay.as_secs(),
                "refresh failed, retrying once"
            );
            RefreshEvent::RetryScheduled { kind, error }
        }
        Err(error) => {
            *slot = None;
            warn!(?kind, %error, "retry failed, keeping previous data");
            RefreshEvent::Failed { kind, error }
        }
    }
}
