use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to resolve host '{host}'"))]
    ResolveHost { host: String },

    #[snafu(display("failed to connect to '{host}:{port}'"))]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[snafu(display("SSH handshake with '{host}' failed"))]
    Handshake { host: String, source: ssh2::Error },

    #[snafu(display("host key verification failed for '{host}'"))]
    HostKeyVerification { host: String },

    #[snafu(display("authentication failed for user '{user}'"))]
    Authentication { user: String, source: ssh2::Error },

    #[snafu(display("failed to open SSH channel"))]
    OpenChannel { source: ssh2::Error },

    /// One-shot command exited with a nonzero status (spec §4.D).
    #[snafu(display("command '{command}' exited with status {status}: {stderr}"))]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[snafu(display("SCP upload of '{local}' to '{remote}' failed"))]
    Upload {
        local: String,
        remote: String,
        source: ssh2::Error,
    },

    #[snafu(display("SCP download of '{remote}' to '{local}' failed"))]
    Download {
        remote: String,
        local: String,
        source: ssh2::Error,
    },

    #[snafu(display("local file IO failed"))]
    LocalIo { source: std::io::Error },

    #[snafu(display("the blocking SSH task panicked"))]
    TaskPanicked { source: tokio::task::JoinError },
}

impl From<Error> for fleet_entities::FleetError {
    fn from(err: Error) -> Self {
        fleet_entities::FleetError::Unavailable {
            message: err.to_string(),
        }
    }
}
