//! Tracing subscriber setup (spec §6 `logging`: `level`/`format`/`output`).
//!
//! A deliberately narrower sibling of `stackable-telemetry`'s `Tracing`
//! builder: one `Registry` with an `EnvFilter` layer and a choice of `fmt`
//! layer, writing to stdout or a rolling file. No OpenTelemetry exporter —
//! this system has no metrics/tracing backend to ship spans to.

use std::path::PathBuf;

use snafu::{ResultExt, Snafu};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer, Registry};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid log level '{level}'"))]
    InvalidLevel { level: String },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefault {
        source: tracing::subscriber::SetGlobalDefaultError,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Where subscriber output is written (spec §6 `logging.output`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogOutput {
    Stdout,
    /// Rolling daily file under `directory`, named `file_name_prefix`.
    RollingFile { directory: PathBuf, file_name_prefix: String },
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stdout,
        }
    }
}

/// Holds the non-blocking writer guard for the file output case; dropping it
/// flushes and stops the background writer thread (mirrors
/// `stackable-telemetry::tracing::Tracing`'s `Drop` guard).
pub struct TelemetryGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Installs the global tracing subscriber per `config` (spec §6 `logging`).
pub fn init(service_name: &'static str, config: &LoggingConfig) -> Result<TelemetryGuard> {
    let level_filter: LevelFilter = config.level.parse().map_err(|_| Error::InvalidLevel {
        level: config.level.clone(),
    })?;
    let env_filter = EnvFilter::builder().with_default_directive(level_filter.into()).from_env_lossy();

    let (subscriber, file_guard): (Box<dyn tracing::Subscriber + Send + Sync>, Option<_>) = match &config.output {
        LogOutput::Stdout => {
            let fmt_layer = build_fmt_layer(config.format, std::io::stdout);
            (Box::new(Registry::default().with(env_filter).with(fmt_layer)), None)
        }
        LogOutput::RollingFile {
            directory,
            file_name_prefix,
        } => {
            let appender = tracing_appender::rolling::daily(directory, file_name_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let fmt_layer = build_fmt_layer(config.format, move || writer.clone());
            (Box::new(Registry::default().with(env_filter).with(fmt_layer)), Some(guard))
        }
    };

    tracing::subscriber::set_global_default(subscriber).context(SetGlobalDefaultSnafu)?;
    tracing::info!(service_name, "telemetry initialized");

    Ok(TelemetryGuard { _file_guard: file_guard })
}

fn build_fmt_layer<W>(
    format: LogFormat,
    writer: W,
) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_writer(writer).boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_text_to_stdout_at_info() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.output, LogOutput::Stdout);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn rejects_unparseable_level() {
        let config = LoggingConfig {
            level: "not-a-level".to_string(),
            ..LoggingConfig::default()
        };
        let level_filter: std::result::Result<LevelFilter, _> = config.level.parse();
        assert!(level_filter.is_err());
    }
}
