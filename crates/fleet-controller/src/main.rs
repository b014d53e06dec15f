//! Entry point: parse the CLI, load config, install telemetry, build the
//! object graph, then run until interrupted (spec §6 "Run the control
//! plane").

mod app;
mod cli;
mod config;
mod import;
mod store;

use clap::Parser;
use cli::{Command, Opts};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to load configuration"))]
    Config { source: config::Error },

    #[snafu(display("failed to initialize telemetry"))]
    Telemetry { source: fleet_telemetry::Error },

    #[snafu(display("failed to start the control plane"))]
    Startup { source: app::Error },

    #[snafu(display("failed to wait for a shutdown signal"))]
    Signal { source: std::io::Error },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts = Opts::parse();
    let Command::Run(run_args) = opts.command;

    let mut config = config::Config::load(&run_args.config).context(ConfigSnafu)?;
    if let Some(level) = run_args.log_level {
        config.logging.level = level;
    }

    let _telemetry_guard =
        fleet_telemetry::init("fleet-controller", &config.logging.clone().into_logging_config()).context(TelemetrySnafu)?;

    tracing::info!(config = %run_args.config.display(), "starting fleet-controller");

    let services = app::build(&config).await.context(StartupSnafu)?;

    tokio::signal::ctrl_c().await.context(SignalSnafu)?;
    tracing::info!("shutdown signal received, stopping engines");

    services.shutdown().await;
    Ok(())
}
