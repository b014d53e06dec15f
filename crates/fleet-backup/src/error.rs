use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("backup '{id}' not found"))]
    BackupNotFound { id: String },

    #[snafu(display("cluster '{id}' not found"))]
    ClusterNotFound { id: String },

    #[snafu(display("restore '{id}' not found"))]
    RestoreNotFound { id: String },

    #[snafu(display("no enabled backup schedule for cluster '{cluster_id}'"))]
    NoSchedule { cluster_id: String },

    #[snafu(display("etcd-endpoints field is empty"))]
    EmptyEtcdEndpoints,

    #[snafu(display("all nodes unreachable for {operation}"))]
    AllNodesUnreachable { operation: String },

    #[snafu(display("failed to decrypt kubeconfig for cluster '{cluster_id}'"))]
    Decrypt {
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

    #[snafu(display("resource kind '{kind}' has no typed client binding in this workspace"))]
    UnsupportedKind { kind: String },

    #[snafu(display("repository call failed"))]
    Repository { source: fleet_entities::FleetError },

    #[snafu(display("SSH operation against '{host}' failed"))]
    Ssh { host: String, source: fleet_ssh::Error },

    #[snafu(display("filesystem operation on '{path}' failed"))]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("failed to serialize object to YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to deserialize object from YAML file '{path}'"))]
    DeserializeYaml {
        path: String,
        source: serde_yaml::Error,
    },
}

impl From<Error> for fleet_entities::FleetError {
    fn from(err: Error) -> Self {
        fleet_entities::FleetError::Unavailable {
            message: err.to_string(),
        }
    }
}
