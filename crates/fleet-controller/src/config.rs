//! Process configuration (spec §6): loaded from a YAML file, then
//! overridden by a handful of environment variables — a flat version of
//! the teacher's `config::fragment` merge idiom, which exists to resolve
//! role/role-group inheritance this system has no equivalent of.

use std::path::Path;

use fleet_telemetry::{LogFormat, LogOutput, LoggingConfig};
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read config file {path}"))]
    ReadFile { path: String, source: std::io::Error },

    #[snafu(display("failed to parse config file {path}"))]
    ParseYaml { path: String, source: serde_yaml::Error },

    #[snafu(display("invalid log level '{level}' from FLEET_LOG_LEVEL"))]
    InvalidLogLevel { level: String },
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub mode: String,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            mode: "release".to_string(),
            read_timeout_secs: 30,
            write_timeout_secs: 30,
        }
    }
}

/// Carried for shape-completeness (spec §6 `database`): the relational
/// schema and its DAOs are an out-of-scope collaborator (spec §1), so this
/// binary parses but never connects with these fields.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub sslmode: String,
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub conn_max_lifetime_secs: u64,
    pub auto_migrate: bool,
    pub auto_create_db: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "fleet".to_string(),
            password: String::new(),
            dbname: "fleet".to_string(),
            sslmode: "disable".to_string(),
            max_idle_conns: 10,
            max_open_conns: 100,
            conn_max_lifetime_secs: 3600,
            auto_migrate: false,
            auto_create_db: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EncryptionConfig {
    pub key: String,
    pub algorithm: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key: "change-me".to_string(),
            algorithm: "aes-256-gcm".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ClusterManagerConfig {
    pub client_timeout_secs: u64,
    pub max_clients: usize,
    pub cleanup_interval_secs: u64,
}

impl Default for ClusterManagerConfig {
    fn default() -> Self {
        Self {
            client_timeout_secs: 30,
            max_clients: 50,
            cleanup_interval_secs: 300,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub check_interval_secs: u64,
    pub max_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay_millis: u64,
    pub use_informer_mode: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 300,
            max_concurrency: 3,
            retry_attempts: 5,
            retry_delay_millis: 100,
            use_informer_mode: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct KubernetesConfig {
    pub qps: f32,
    pub burst: u32,
    pub timeout_secs: u64,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            qps: 20.0,
            burst: 40,
            timeout_secs: 30,
        }
    }
}

/// Paths the backup orchestrator and create-job runner need but which §6
/// does not name as their own top-level section.
#[derive(Clone, Debug, Deserialize)]
pub struct PathsConfig {
    pub backup_dir: String,
    pub installer_binary: String,
    pub installer_config_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            backup_dir: "/var/lib/fleet-controller/backups".to_string(),
            installer_binary: "/usr/local/bin/kubekey".to_string(),
            installer_config_dir: "/var/lib/fleet-controller/installer".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub encryption: EncryptionConfig,
    pub cluster_manager: ClusterManagerConfig,
    pub worker: WorkerConfig,
    pub kubernetes: KubernetesConfig,
    pub logging: LoggingConfigDto,
    pub paths: PathsConfig,
}

/// A `serde`-friendly mirror of `fleet_telemetry::LoggingConfig`; kept
/// separate so the telemetry crate doesn't need to depend on `serde` for a
/// shape only the binary's config loader cares about.
#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfigDto {
    pub level: String,
    pub format: String,
    pub output: String,
    pub directory: Option<String>,
    pub file_name_prefix: Option<String>,
}

impl Default for LoggingConfigDto {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            output: "stdout".to_string(),
            directory: None,
            file_name_prefix: None,
        }
    }
}

impl LoggingConfigDto {
    pub fn into_logging_config(self) -> LoggingConfig {
        let format = match self.format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let output = match self.output.as_str() {
            "file" => LogOutput::RollingFile {
                directory: self.directory.unwrap_or_else(|| ".".to_string()).into(),
                file_name_prefix: self.file_name_prefix.unwrap_or_else(|| "fleet-controller".to_string()),
            },
            _ => LogOutput::Stdout,
        };
        LoggingConfig {
            level: self.level,
            format,
            output,
        }
    }
}

impl Config {
    /// Loads `path`, then applies a small set of `FLEET_*` environment
    /// overrides on top (spec §6 expansion: "overridable by environment
    /// variables").
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).context(ReadFileSnafu {
            path: path.display().to_string(),
        })?;
        let mut config: Config = serde_yaml::from_str(&text).context(ParseYamlSnafu {
            path: path.display().to_string(),
        })?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("FLEET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("FLEET_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(key) = std::env::var("FLEET_ENCRYPTION_KEY") {
            self.encryption.key = key;
        }
        if let Ok(port) = std::env::var("FLEET_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_yaml_and_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "encryption:\n  key: \"test-key\"\n  algorithm: aes-256-gcm\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.encryption.key, "test-key");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.worker.max_concurrency, 3);
    }

    #[test]
    fn env_override_replaces_log_level() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: info\n  format: text\n  output: stdout\n").unwrap();

        std::env::set_var("FLEET_LOG_LEVEL", "debug");
        let config = Config::load(file.path()).unwrap();
        std::env::remove_var("FLEET_LOG_LEVEL");

        assert_eq!(config.logging.level, "debug");
    }
}
