//! SSH command execution and file transfer (spec §4.D).

pub mod error;
pub mod session;

pub use error::{Error, Result};
pub use session::{ConnectOptions, InteractiveShell, SshSession};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_options_default_disables_host_key_verification() {
        let options = ConnectOptions::default();
        assert!(options.known_hosts.is_none());
    }

    #[rstest::rstest]
    #[case(1, "exit 1")]
    #[case(127, "exit 127")]
    fn command_failed_error_carries_status_and_stderr(#[case] status: i32, #[case] command: &str) {
        let err = Error::CommandFailed {
            command: command.to_string(),
            status,
            stderr: "boom".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains(command));
        assert!(rendered.contains("boom"));

        let fleet_err: fleet_entities::FleetError = err.into();
        assert!(matches!(fleet_err, fleet_entities::FleetError::Unavailable { .. }));
    }

    #[test]
    fn host_key_verification_error_converts_to_unavailable() {
        let err = Error::HostKeyVerification {
            host: "10.0.0.5".to_string(),
        };
        let fleet_err: fleet_entities::FleetError = err.into();
        match fleet_err {
            fleet_entities::FleetError::Unavailable { message } => {
                assert!(message.contains("10.0.0.5"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
