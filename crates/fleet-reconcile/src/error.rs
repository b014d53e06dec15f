use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to decrypt kubeconfig for cluster '{cluster_id}'"))]
    DecryptKubeconfig {
        cluster_id: String,
        source: fleet_crypto::Error,
    },

    #[snafu(display("failed to acquire client for cluster '{cluster_id}'"))]
    AcquireClient {
        cluster_id: String,
        source: fleet_client::Error,
    },

    #[snafu(display("Kubernetes API call failed: {context}"))]
    KubeApi { context: String, source: kube::Error },

    #[snafu(display("failed to discover API groups"))]
    Discovery { source: kube::Error },

    #[snafu(display("policy sync for cluster '{cluster_id}' timed out after {timeout_secs}s"))]
    PolicySyncTimeout { cluster_id: String, timeout_secs: u64 },
}

impl From<Error> for fleet_entities::FleetError {
    fn from(err: Error) -> Self {
        fleet_entities::FleetError::Unavailable {
            message: err.to_string(),
        }
    }
}
