pub mod audio;
pub mod config;
pub mod demo;
pub mod error;
pub mod host;
pub mod panning;

use audio::context::AudioContext;
use audio::decode::EncodedAudio;
use config::{DemoConfig, SCREEN_WIDTH, WINDOW_TITLE};
use demo::PanDemo;
use host::{run_game, RunOptions, TerminalPresenter};
use panning::{PanOscillator, PanningController};

pub use error::{Error, Result};

/// Width of the terminal track the marker moves along
const TRACK_COLUMNS: usize = 64;

/// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Load the configuration and run the demo until it stops or fails
pub fn run() -> Result<()> {
    let config = DemoConfig::from_env()?;
    log::info!("{} starting", WINDOW_TITLE);
    log::debug!("Configuration: {:?}", config);

    let source = EncodedAudio::from_file(&config.asset_path)?;
    log::info!("Loaded {} bytes of compressed audio", source.len());

    let context = AudioContext::new(&config.audio)?;
    let oscillator = PanOscillator::new(
        config.ticks_per_second as f64,
        config.pan_period_secs,
        SCREEN_WIDTH as f64,
    );
    let controller = PanningController::new(context, source, oscillator);
    let mut demo = PanDemo::new(controller, config.marker_width);

    let options = RunOptions {
        ticks_per_second: config.ticks_per_second,
        max_ticks: config.max_ticks,
    };
    let mut presenter = TerminalPresenter::stdout(TRACK_COLUMNS);
    run_game(&mut demo, &options, &mut presenter)?;

    println!();
    Ok(())
}
