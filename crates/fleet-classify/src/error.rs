use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read namespace '{namespace}'"))]
    ReadNamespace { namespace: String, source: kube::Error },

    #[snafu(display("failed to list deployments in namespace '{namespace}'"))]
    ListDeployments { namespace: String, source: kube::Error },

    #[snafu(display("failed to list resource quotas in namespace '{namespace}'"))]
    ListResourceQuotas { namespace: String, source: kube::Error },
}

impl From<Error> for fleet_entities::FleetError {
    fn from(err: Error) -> Self {
        fleet_entities::FleetError::Unavailable {
            message: err.to_string(),
        }
    }
}
