//! wtype - xdotool type for Wayland
//!
//! Entry point for the `wtype` binary.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use lamco_wtype::config::{Config, LoggingConfig};
use lamco_wtype::{Engine, Session, TextDecoder, WaylandGateway};

/// Environment variable overriding the log filter
const LOG_ENV: &str = "WTYPE_LOG";

fn main() -> ExitCode {
    let (config, source) = Config::discover();

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    source.log();
    lamco_wtype::utils::log_startup_diagnostics();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<()> {
    // Arguments are compiled before connecting so bad input never
    // touches the compositor
    let mut session = Session::compile(
        std::env::args_os().skip(1),
        TextDecoder::from_locale(),
        config.default_delay(),
    )?;
    debug!(
        "{} commands, {} keycodes",
        session.commands().len(),
        session.symbols().len()
    );

    let gateway = WaylandGateway::connect()?;

    let mut engine = Engine::new(gateway, config.timing(), config.keymap_options());
    engine.run(&mut session, std::io::stdin().lock())?;

    info!("Done, {} keymap uploads", engine.uploads());
    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level: {}", logging.level))?;

    let stderr_layer = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    // If a log file is configured, write to both stderr and the file
    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
