use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Text};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use weatherline_core::local::hour_start;
use weatherline_core::projection::AlertNotice;
use weatherline_core::timeline::HourlyBlock;
use weatherline_core::{
    Config, Location, Projection, RefreshConfig, RefreshEvent, RefreshKind, TimezoneOffset,
    WeatherEngine, WeatherPoint, fetcher_from_config, project, refresh,
};

/// Hours per row of `weatherline hourly`.
const BLOCK_HOURS: usize = 3;
/// Rows of `weatherline hourly`, covering the next day.
const BLOCK_COUNT: usize = 8;
/// Rows of `weatherline daily`.
const DAILY_ROWS: usize = 5;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherline", version, about = "Hourly and daily weather for one location")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and location.
    Configure,

    /// Show the weather for one position: day 0 hour 0 is right now.
    Show {
        /// Days from today, 0 to 4.
        #[arg(long, default_value_t = 0)]
        day: i64,

        /// Local hour of day for days 0 to 2; ignored for later days.
        #[arg(long, default_value_t = 0)]
        hour: i64,
    },

    /// Three-hour blocks for the next day.
    Hourly,

    /// Five-day overview.
    Daily,

    /// Keep refreshing and print every update. Press Enter to refresh now.
    Watch,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        debug!(command = ?self.command, "dispatching");
        match self.command {
            Command::Configure => configure(),
            Command::Show { day, hour } => show(day, hour).await,
            Command::Hourly => hourly().await,
            Command::Daily => daily().await,
            Command::Watch => watch().await,
        }
    }
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;
    let previous = cfg.location.clone();

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Leave empty to keep the stored key")
        .prompt()?;
    if !api_key.trim().is_empty() {
        cfg.api_key = Some(api_key.trim().to_string());
    }

    let lat = CustomType::<f64>::new("Latitude:")
        .with_starting_input(&previous.as_ref().map(|l| l.lat.to_string()).unwrap_or_default())
        .with_error_message("Please enter a number, e.g. 48.0377")
        .prompt()?;
    let lon = CustomType::<f64>::new("Longitude:")
        .with_starting_input(&previous.as_ref().map(|l| l.lon.to_string()).unwrap_or_default())
        .with_error_message("Please enter a number, e.g. 14.3962")
        .prompt()?;
    let name = Text::new("Display name (optional):")
        .with_initial_value(previous.as_ref().and_then(|l| l.name.as_deref()).unwrap_or_default())
        .prompt()?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        bail!("Coordinates out of range: lat must be within ±90, lon within ±180");
    }

    let name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
    cfg.location = Some(Location { lat, lon, name });
    cfg.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Loads configuration and performs the initial current + forecast fetch.
async fn load_engine(now: i64) -> Result<WeatherEngine> {
    let cfg = Config::load()?;
    let mut engine = WeatherEngine::new(fetcher_from_config(&cfg)?);

    engine.request_current().await.context("Could not fetch the current weather")?;
    engine.request_forecast(now).await.context("Could not fetch the forecast")?;

    Ok(engine)
}

fn offset_of(engine: &WeatherEngine) -> Result<TimezoneOffset> {
    engine
        .session()
        .timezone_offset()
        .context("The service did not report a usable UTC offset")
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn show(day: i64, hour: i64) -> Result<()> {
    let now = unix_now();
    let engine = load_engine(now).await?;

    let projection = engine
        .project(day, hour, now)
        .with_context(|| format!("Nothing to show for day {day}, hour {hour}"))?;

    println!("{}", render_projection(&projection));
    if let Some(notice) = engine.active_alert_notice(now) {
        println!();
        println!("{}", render_alert(&notice));
    }

    Ok(())
}

async fn hourly() -> Result<()> {
    let now = unix_now();
    let engine = load_engine(now).await?;
    let offset = offset_of(&engine)?;

    let timeline = engine.timeline().context("No hourly data available")?;
    let start = timeline
        .position_of(hour_start(now))
        .context("The hourly data does not cover the current hour")?;

    for block in timeline.blocks(start, BLOCK_HOURS, BLOCK_COUNT) {
        println!("{}", render_block(&block, offset));
    }

    Ok(())
}

async fn daily() -> Result<()> {
    let now = unix_now();
    let engine = load_engine(now).await?;
    let offset = offset_of(&engine)?;

    // straight from the daily forecast: the resolver serves days 0-2 hourly
    let days = engine.daily().map(|s| s.daily.as_slice()).unwrap_or_default();
    if days.len() < DAILY_ROWS {
        bail!("Daily forecast has only {} days", days.len());
    }

    for (day, point) in days.iter().take(DAILY_ROWS).enumerate() {
        let point = WeatherPoint::Daily(point.clone());
        let projection = project(&point, day as i64, now, offset, engine.sun_times());
        println!("{}", render_daily_row(&projection));
    }

    Ok(())
}

async fn watch() -> Result<()> {
    let cfg = Config::load()?;
    let mut engine = WeatherEngine::new(fetcher_from_config(&cfg)?);
    let config = RefreshConfig::from(&cfg.refresh);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let (trigger_tx, trigger_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    tokio::spawn(forward_lines(BufReader::new(tokio::io::stdin()), trigger_tx));

    refresh::run(&mut engine, &config, unix_now, shutdown_rx, trigger_rx, |engine, event| {
        print_event(engine, &event, unix_now());
    })
    .await;

    Ok(())
}

/// Sends one trigger per input line until the input ends or the loop is gone.
async fn forward_lines<R: AsyncBufRead + Unpin>(reader: R, trigger: mpsc::Sender<()>) {
    let mut lines = reader.lines();
    while let Ok(Some(_)) = lines.next_line().await {
        debug!("refresh requested from stdin");
        if trigger.send(()).await.is_err() {
            break;
        }
    }
}

fn print_event(engine: &WeatherEngine, event: &RefreshEvent, now: i64) {
    match event {
        RefreshEvent::Updated(RefreshKind::Current) => match engine.project(0, 0, now) {
            Ok(projection) => {
                println!("{}", render_projection(&projection));
                if let Some(notice) = engine.active_alert_notice(now) {
                    println!("{}", render_alert(&notice));
                }
            }
            Err(err) => warn!(error = %err, "current weather not displayable"),
        },
        RefreshEvent::Updated(RefreshKind::Forecast) => {
            let hours = engine.timeline().map(|t| t.len()).unwrap_or_default();
            let days = engine.daily().map(|s| s.daily.len()).unwrap_or_default();
            info!(hours, days, "forecast updated");
        }
        RefreshEvent::RetryScheduled { kind, error } => {
            warn!(?kind, %error, "refresh failed, retrying shortly");
        }
        RefreshEvent::Failed { kind, error } => {
            warn!(?kind, %error, "refresh failed again, showing previous data");
        }
    }
}

fn render_projection(p: &Projection) -> String {
    let mut out = format!(
        "{} {}  {}°C (feels {}°C)  {}",
        p.day_label, p.local_time, p.temperature_c, p.feels_like_c, p.description
    );

    if let Some((min, max)) = p.range_c {
        out.push_str(&format!("\n  min {min}°C / max {max}°C"));
    }
    out.push_str(&format!("\n  humidity {}%  wind {} km/h", p.humidity_pct, p.wind_kmh));
    if let Some(pop) = p.precipitation_pct {
        out.push_str(&format!("  precipitation {pop}%"));
    }
    if let Some(rain) = p.rain_mm {
        out.push_str(&format!("  rain {rain:.1} mm"));
    }
    if let (Some(rise), Some(set)) = (&p.sunrise, &p.sunset) {
        out.push_str(&format!("\n  sunrise {rise}  sunset {set}"));
    }

    out
}

fn render_alert(notice: &AlertNotice) -> String {
    format!(
        "! {} until {}\n  {}\n  ({})",
        notice.title, notice.until, notice.body, notice.source
    )
}

fn render_block(block: &HourlyBlock, offset: TimezoneOffset) -> String {
    let mut out = format!(
        "{}  {:>4}°C",
        offset.format(block.start, "%H:%M"),
        block.mean_temperature_c.round() as i64
    );
    if let Some(rain) = block.rain_mm {
        out.push_str(&format!("  rain {rain:.1} mm"));
    }
    if let Some(snow) = block.snow_mm {
        out.push_str(&format!("  snow {snow:.1} mm"));
    }
    out
}

fn render_daily_row(p: &Projection) -> String {
    let (min, max) = p.range_c.unwrap_or((p.temperature_c, p.temperature_c));
    format!(
        "{:<10} {:>4}°C {:>4}°C  {:>3}%  {}",
        p.day_label,
        min,
        max,
        p.precipitation_pct.unwrap_or_default(),
        p.description
    )
}
