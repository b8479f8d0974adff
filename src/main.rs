use anyhow::Result;
use picoweather_core::{App, Config, SystemClock, TerminalMatrix};
use picoweather_weather::{StaticForecast, WeatherClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    picoweather_core::init()?;

    let (config, _) = Config::load_validated()?;

    if config.weather.demo {
        tracing::info!("Demo mode: using a fixed forecast, no network access");
        run(&config, StaticForecast::default()).await;
    } else {
        let client = config.weather.build_client().map_err(|e| {
            tracing::error!("{}", e.user_message());
            e
        })?;
        run(&config, client).await;
    }

    tracing::info!("PicoWeather stopped");
    Ok(())
}

async fn run<C: WeatherClient>(config: &Config, client: C) {
    let display = TerminalMatrix::new(std::io::stdout(), config.weather.units);
    let clock = SystemClock::new(config.display.tz_offset_hours);
    let mut app = App::new(config, client, display, clock);

    app.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            // Without a signal handler the loop runs until the process is killed
            std::future::pending::<()>().await;
        }
    })
    .await;
}
