//! # Train Board Application Entry Point
//!
//! This binary wires the departure source, the board renderer and a display
//! sink together and runs the refresh loop until Ctrl-C.
//! It supports both production mode (I2C character LCD) and development mode
//! (ASCII output with `--stdout`).
//!
//! ```text
//! ODPT_API_KEY=... train-board [--stdout] [--config train-board.toml]
//! ```


use anyhow::Context;
use chrono::FixedOffset;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use train_board_lib::{
    board::BoardRenderer,
    config::{Config, API_KEY_ENV},
    departures::OdptClient,
    display::{DisplaySink, TerminalSink},
    refresh::{RefreshLoop, Timing},
};

/// Command line options
struct Args {
    /// Development mode: render to stdout for testing without hardware
    development_mode: bool,
    config_path: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        development_mode: false,
        config_path: None,
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--stdout" => args.development_mode = true,
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn timing(config: &Config) -> anyhow::Result<Timing> {
    let utc_offset = FixedOffset::east_opt(config.station.utc_offset_hours * 3600)
        .context("station.utc_offset_hours is out of range")?;
    Ok(Timing {
        refresh_interval: config.refresh.interval,
        tick_interval: config.animation.tick,
        max_commit_failures: config.refresh.max_commit_failures,
        utc_offset,
    })
}

/// Build the board and run it on `sink` until Ctrl-C.
async fn run_board<D: DisplaySink>(config: &Config, api_key: String, sink: D) -> anyhow::Result<()> {
    // Layout errors are configuration bugs: fail before touching the display
    let layout = config
        .board_layout()
        .context("invalid [[layout]] configuration")?;
    let renderer = BoardRenderer::new(layout, config.motion(), config.display.blank);

    let client = OdptClient::new(
        config.station.base_url.clone(),
        api_key,
        config.refresh.request_timeout,
        config.station.realtime,
    )
    .context("build HTTP client")?;

    let board = RefreshLoop::new(client, config.station(), renderer, sink, timing(config)?);
    board
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("display stopped accepting frames")
}

#[cfg(feature = "hardware")]
fn open_lcd(
    config: &Config,
) -> anyhow::Result<
    train_board_lib::lcd_i2c::Hd44780Lcd<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay>,
> {
    let display = &config.display;
    info!(
        bus = %display.i2c_bus,
        address = display.i2c_address,
        "initializing {}x{} LCD",
        display.columns,
        display.rows
    );
    let i2c = linux_embedded_hal::I2cdev::new(&display.i2c_bus)
        .with_context(|| format!("open {}", display.i2c_bus))?;
    train_board_lib::lcd_i2c::Hd44780Lcd::new(
        i2c,
        linux_embedded_hal::Delay,
        display.i2c_address,
        display.rows,
        display.columns,
    )
    .context("LCD initialization failed")
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;
    let config = match &args.config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    info!(station = %config.station.id, direction = %config.station.direction, "train board starting");
    let api_key = config
        .api_key()
        .with_context(|| format!("no API key: export {API_KEY_ENV} or set station.api_key"))?;

    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;
    let (rows, columns) = (config.display.rows, config.display.columns);

    // Development mode: ASCII output for testing
    if args.development_mode {
        return rt.block_on(run_board(&config, api_key, TerminalSink::stdout(rows, columns)));
    }

    // Production mode: I2C character LCD
    #[cfg(feature = "hardware")]
    let sink = open_lcd(&config)?;

    #[cfg(not(feature = "hardware"))]
    let sink = {
        warn!("LCD support not enabled. Rebuild with --features hardware for display functionality.");
        warn!("Showing ASCII output instead");
        TerminalSink::stdout(rows, columns)
    };

    rt.block_on(run_board(&config, api_key, sink))
}
