use std::future::Future;
use std::time::Duration;

use picoweather_weather::{classify, DisplayCache, FetchError, WeatherClient};

use crate::clock::Clock;
use crate::config::Config;
use crate::display::DisplayDevice;
use crate::scheduler::{RefreshScheduler, SchedulerConfig};

/// Main control loop: fetch, classify, cache and repaint on schedule
pub struct App<C, D, K> {
    scheduler: RefreshScheduler,
    cache: DisplayCache,
    client: C,
    display: D,
    clock: K,
    latitude: f64,
    longitude: f64,
    poll_interval: Duration,
    banner: String,
    last_error: Option<FetchError>,
}

impl<C, D, K> App<C, D, K>
where
    C: WeatherClient,
    D: DisplayDevice,
    K: Clock,
{
    /// Create the loop from a validated configuration
    pub fn new(config: &Config, client: C, display: D, clock: K) -> Self {
        let scheduler = RefreshScheduler::new(
            SchedulerConfig::from(&config.schedule),
            clock.now(),
            clock.today(),
        );

        Self {
            scheduler,
            cache: DisplayCache::new(),
            client,
            display,
            clock,
            latitude: config.weather.latitude,
            longitude: config.weather.longitude,
            poll_interval: config.schedule.poll_interval(),
            banner: config.display.banner.clone(),
            last_error: None,
        }
    }

    /// Run one iteration of the loop.
    ///
    /// Fetch failures are logged and reported to the scheduler; nothing
    /// escapes this method.
    pub async fn step(&mut self) {
        let today = self.clock.today();
        self.scheduler.observe_day(today);

        let now = self.clock.now();
        let actions = self.scheduler.tick(now);

        if actions.should_fetch {
            self.refresh(today).await;
        }

        // A successful fetch forces a repaint in the same iteration
        if actions.should_display || self.scheduler.display_due(now) {
            self.repaint(now);
        }
    }

    async fn refresh(&mut self, today: chrono::NaiveDate) {
        tracing::debug!(
            "Fetching forecast for ({}, {})",
            self.latitude,
            self.longitude
        );

        match self
            .client
            .fetch_forecast(self.latitude, self.longitude)
            .await
        {
            Ok(item) => {
                let state = classify(&item);
                self.scheduler.record_fetch_result(true, today);
                tracing::info!(
                    "Forecast: {} {:.1} (API calls today: {})",
                    state.label,
                    state.temperature,
                    self.scheduler.daily_call_count()
                );
                self.cache.store(state);
                self.last_error = None;
            }
            Err(e) => {
                // A bad key or location needs the user, not another attempt
                if e.is_retryable() {
                    tracing::warn!("Forecast fetch failed: {} ({})", e.user_message(), e);
                } else {
                    tracing::error!("Forecast fetch failed: {} ({})", e.user_message(), e);
                }
                self.scheduler.record_fetch_result(false, today);
                self.last_error = Some(e);
            }
        }
    }

    fn repaint(&mut self, now: std::time::Instant) {
        match self.cache.get() {
            Some(state) => self.display.render(state),
            None => tracing::debug!("Nothing to display yet"),
        }
        self.scheduler.record_display(now);
    }

    /// Show the banner, then step every poll interval until `shutdown`
    /// resolves.
    ///
    /// Shutdown is only observed between iterations, so an in-flight fetch or
    /// repaint always completes.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            "Starting control loop, polling every {:?}",
            self.poll_interval
        );
        self.display.show_banner(&self.banner);

        tokio::pin!(shutdown);
        loop {
            self.step().await;

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, leaving control loop");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Error from the most recent fetch, cleared by the next success
    pub fn last_fetch_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn cache(&self) -> &DisplayCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }
}
