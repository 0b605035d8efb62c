use tracing::{debug, info, warn};

use crate::error::WeatherError;
use crate::fetch::Fetcher;
use crate::icon::{IconSelection, classify};
use crate::local::TimezoneOffset;
use crate::model::{Alert, WeatherPoint, WeatherSnapshot};
use crate::projection::{AlertNotice, Projection, SunTimes, project};
use crate::resolve::Resolver;
use crate::timeline::{Timeline, assemble};

/// State that outlives a refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    timezone_offset: Option<TimezoneOffset>,
}

impl Session {
    pub fn timezone_offset(&self) -> Option<TimezoneOffset> {
        self.timezone_offset
    }

    /// Records the location's offset the first time a valid one is seen.
    /// Later values are ignored.
    pub fn learn(&mut self, seconds: i32) -> Option<TimezoneOffset> {
        if self.timezone_offset.is_none() {
            self.timezone_offset = TimezoneOffset::from_seconds(seconds);
            if let Some(offset) = self.timezone_offset {
                info!(offset = offset.seconds(), "learned location UTC offset");
            }
        }
        self.timezone_offset
    }
}

/// Keeps the last good data and answers display queries from it.
///
/// A failed refresh never clears what an earlier one stored.
#[derive(Debug)]
pub struct WeatherEngine {
    fetcher: Fetcher,
    session: Session,
    current: Option<WeatherSnapshot>,
    daily: Option<WeatherSnapshot>,
    timeline: Option<Timeline>,
}

impl WeatherEngine {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher, session: Session::default(), current: None, daily: None, timeline: None }
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn current(&self) -> Option<&WeatherSnapshot> {
        self.current.as_ref()
    }

    pub fn daily(&self) -> Option<&WeatherSnapshot> {
        self.daily.as_ref()
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    /// Fetches the live reading and, on first success, learns the offset.
    pub async fn request_current(&mut self) -> Result<&WeatherSnapshot, WeatherError> {
        let snapshot = self.fetcher.fetch_current().await?;
        self.session.learn(snapshot.timezone_offset);

        debug!(
            code = snapshot.current.as_ref().map(|c| c.conditions.condition_code),
            "current weather updated"
        );
        Ok(self.current.insert(snapshot))
    }

    /// Refreshes the daily forecast and rebuilds the timeline.
    ///
    /// The live reading is fetched first if the offset is still unknown,
    /// since local midnight anchors the historical calls. Each part that
    /// succeeds replaces its predecessor; any failure is reported after the
    /// remaining parts have been tried.
    pub async fn request_forecast(&mut self, now: i64) -> Result<(), WeatherError> {
        let offset = match self.session.timezone_offset() {
            Some(offset) => offset,
            None => {
                self.request_current().await?;
                self.session.timezone_offset().ok_or(WeatherError::DataUnavailable)?
            }
        };

        let daily = self.fetcher.fetch_daily_forecast().await;
        let timeline = assemble(&self.fetcher, offset, now).await;

        let daily = daily.map(|snapshot| {
            debug!(days = snapshot.daily.len(), "daily forecast updated");
            self.daily = Some(snapshot);
        });
        let timeline = timeline.map(|timeline| {
            self.timeline = Some(timeline);
        });
        if timeline.is_err() {
            warn!("timeline rebuild failed, keeping the previous one");
        }

        daily.and(timeline)
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            offset: self.session.timezone_offset(),
            current: self.current.as_ref().and_then(|s| s.current.as_ref()),
            timeline: self.timeline.as_ref(),
            daily: self.daily.as_ref().map(|s| s.daily.as_slice()),
        }
    }

    pub fn resolve(
        &self,
        day_offset: i64,
        hour_offset: i64,
        now: i64,
    ) -> Result<WeatherPoint, WeatherError> {
        self.resolver().resolve(day_offset, hour_offset, now)
    }

    /// Sunrise and sunset from the live reading, else from today's forecast.
    pub fn sun_times(&self) -> SunTimes {
        let current = self.current.as_ref().and_then(|s| s.current.as_ref());
        let today = self.daily.as_ref().and_then(|s| s.daily.first());

        SunTimes {
            sunrise: current.and_then(|c| c.sunrise).or_else(|| today.and_then(|d| d.sunrise)),
            sunset: current.and_then(|c| c.sunset).or_else(|| today.and_then(|d| d.sunset)),
        }
    }

    pub fn classify(&self, point: &WeatherPoint, now: i64) -> Result<IconSelection, WeatherError> {
        let offset = self.session.timezone_offset().ok_or(WeatherError::DataUnavailable)?;
        let sun = self.sun_times();
        Ok(classify(point, now, offset, sun.sunrise, sun.sunset))
    }

    pub fn project(
        &self,
        day_offset: i64,
        hour_offset: i64,
        now: i64,
    ) -> Result<Projection, WeatherError> {
        let offset = self.session.timezone_offset().ok_or(WeatherError::DataUnavailable)?;
        let point = self.resolve(day_offset, hour_offset, now)?;
        Ok(project(&point, day_offset, now, offset, self.sun_times()))
    }

    pub fn active_alert(&self, now: i64) -> Option<&Alert> {
        self.current.as_ref()?.active_alert(now)
    }

    pub fn active_alert_notice(&self, now: i64) -> Option<AlertNotice> {
        let offset = self.session.timezone_offset()?;
        self.active_alert(now).map(|alert| AlertNotice::new(alert, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{DAY, HOUR};
    use crate::testing::{self, LOCAL_MIDNIGHT, NOW, OFFSET, Route, ScriptedTransport};

    fn engine(transport: &ScriptedTransport) -> WeatherEngine {
        WeatherEngine::new(testing::fetcher(transport))
    }

    async fn loaded(transport: &ScriptedTransport) -> WeatherEngine {
        let mut engine = engine(transport);
        engine.request_current().await.expect("current");
        engine.request_forecast(NOW).await.expect("forecast");
        engine
    }

    #[test]
    fn session_keeps_first_valid_offset() {
        let mut session = Session::default();
        assert_eq!(session.learn(100_000), None);
        assert_eq!(session.learn(OFFSET).map(|o| o.seconds()), Some(OFFSET));
        assert_eq!(session.learn(-3_600).map(|o| o.seconds()), Some(OFFSET));
    }

    #[tokio::test]
    async fn nothing_resolves_before_first_fetch() {
        let transport = ScriptedTransport::healthy();
        let engine = engine(&transport);

        assert_eq!(engine.resolve(0, 0, NOW).unwrap_err(), WeatherError::DataUnavailable);
        assert_eq!(engine.resolve(1, 12, NOW).unwrap_err(), WeatherError::DataUnavailable);
        assert_eq!(engine.project(3, 0, NOW).unwrap_err(), WeatherError::DataUnavailable);
        assert!(engine.active_alert_notice(NOW).is_none());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn current_reading_wins_at_origin() {
        let transport = ScriptedTransport::healthy();
        let engine = loaded(&transport).await;

        assert!(engine.timeline().is_some());
        let point = engine.resolve(0, 0, NOW).expect("current");
        assert!(matches!(point, WeatherPoint::Current(_)));

        let tomorrow = engine.resolve(1, 6, NOW).expect("timeline");
        assert_eq!(tomorrow.timestamp(), LOCAL_MIDNIGHT + DAY + 6 * HOUR);
    }

    #[tokio::test]
    async fn forecast_learns_offset_through_current_when_unknown() {
        let transport = ScriptedTransport::healthy();
        let mut engine = engine(&transport);

        engine.request_forecast(NOW).await.expect("forecast");

        let requests = transport.requests();
        assert_eq!(requests.first(), Some(&Route::Current));
        assert_eq!(engine.session().timezone_offset().map(|o| o.seconds()), Some(OFFSET));
        assert_eq!(
            transport.historical_requests(),
            vec![LOCAL_MIDNIGHT - 1, LOCAL_MIDNIGHT - 1 - DAY]
        );
        assert_eq!(requests.last(), Some(&Route::Hourly));
    }

    #[tokio::test]
    async fn known_offset_skips_the_extra_current_call() {
        let transport = ScriptedTransport::healthy();
        let mut engine = loaded(&transport).await;

        engine.request_forecast(NOW).await.expect("second forecast");
        assert_eq!(transport.request_count(Route::Current), 1);
        assert_eq!(transport.request_count(Route::Daily), 2);
    }

    #[tokio::test]
    async fn failed_historical_call_keeps_previous_timeline() {
        let transport = ScriptedTransport::healthy();
        let mut engine = loaded(&transport).await;
        let before = engine.timeline().cloned().expect("timeline");

        transport.fail(Route::Historical(LOCAL_MIDNIGHT - 1 - DAY));
        let err = engine.request_forecast(NOW).await.unwrap_err();

        assert_eq!(err, WeatherError::DataUnavailable);
        assert_eq!(engine.timeline(), Some(&before));
        // the daily part still went through
        assert_eq!(transport.request_count(Route::Daily), 2);
        assert!(engine.resolve(2, 3, NOW).is_ok());
    }

    #[tokio::test]
    async fn failed_daily_still_rebuilds_timeline() {
        let transport = ScriptedTransport::healthy();
        let mut engine = loaded(&transport).await;

        transport.fail(Route::Daily);
        assert!(engine.request_forecast(NOW).await.is_err());

        assert_eq!(transport.request_count(Route::Hourly), 2);
        assert!(engine.daily().is_some());
        assert!(engine.resolve(4, 0, NOW).is_ok());
    }

    #[tokio::test]
    async fn garbled_current_keeps_previous_reading() {
        let transport = ScriptedTransport::healthy();
        let mut engine = loaded(&transport).await;

        transport.garble(Route::Current);
        assert_eq!(engine.request_current().await.unwrap_err(), WeatherError::DataUnavailable);
        assert!(matches!(engine.resolve(0, 0, NOW), Ok(WeatherPoint::Current(_))));
    }

    #[tokio::test]
    async fn reports_active_alert() {
        let transport = ScriptedTransport::healthy();
        let engine = loaded(&transport).await;

        let notice = engine.active_alert_notice(NOW).expect("alert");
        assert_eq!(notice.title, "Heat warning");
        assert_eq!(notice.until, "12:30 15.06.2021");
        assert!(engine.active_alert(NOW + 2 * HOUR).is_none());
    }

    #[tokio::test]
    async fn sun_times_fall_back_to_daily() {
        let transport = ScriptedTransport::healthy();
        let engine = loaded(&transport).await;
        let sun = engine.sun_times();

        assert_eq!(sun.sunrise, Some(testing::SUNRISE));
        assert_eq!(sun.sunset, Some(testing::SUNSET));

        let projection = engine.project(1, 22, NOW).expect("projection");
        assert_eq!(projection.local_time, "22:00");
        assert_eq!(projection.sunset.as_deref(), Some("21:00"));
    }
}
