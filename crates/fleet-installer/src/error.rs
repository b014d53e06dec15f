use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("task '{id}' not found"))]
    TaskNotFound { id: String },

    #[snafu(display("machine '{id}' not found"))]
    MachineNotFound { id: String },

    #[snafu(display("machine '{id}' is not available (status is not `available`)"))]
    MachineNotAvailable { id: String },

    #[snafu(display("no machine in the request carries the `master` role"))]
    NoMasterRole,

    #[snafu(display("repository call failed"))]
    Repository { source: fleet_entities::FleetError },

    #[snafu(display("failed to render installer config"))]
    RenderConfig { source: serde_yaml::Error },

    #[snafu(display("failed to write config file '{path}'"))]
    WriteConfig { path: String, source: std::io::Error },

    #[snafu(display("failed to spawn installer process '{binary}'"))]
    Spawn { binary: String, source: std::io::Error },

    #[snafu(display("installer process produced no stdout/stderr handle"))]
    MissingPipe,

    #[snafu(display("failed to wait on installer process"))]
    Wait { source: std::io::Error },
}

impl From<Error> for fleet_entities::FleetError {
    fn from(err: Error) -> Self {
        fleet_entities::FleetError::Unavailable {
            message: err.to_string(),
        }
    }
}
