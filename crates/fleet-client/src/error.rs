use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("kubeconfig could not be parsed"))]
    InvalidKubeconfig { source: kube::config::KubeconfigError },

    #[snafu(display("kubeconfig is not valid UTF-8"))]
    InvalidKubeconfigEncoding,

    #[snafu(display("kubeconfig has no cluster entries"))]
    NoClusterEntry,

    #[snafu(display("failed to build a cluster client"))]
    BuildClient { source: kube::Error },

    #[snafu(display("cluster version discovery failed"))]
    VersionDiscovery { source: kube::Error },

    #[snafu(display("node listing failed"))]
    NodeListing { source: kube::Error },
}

impl From<Error> for fleet_entities::FleetError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidKubeconfig { .. } | Error::InvalidKubeconfigEncoding | Error::NoClusterEntry => {
                fleet_entities::FleetError::invalid_argument(err.to_string())
            }
            Error::BuildClient { .. } | Error::VersionDiscovery { .. } | Error::NodeListing { .. } => {
                fleet_entities::FleetError::Unavailable {
                    message: err.to_string(),
                }
            }
        }
    }
}
