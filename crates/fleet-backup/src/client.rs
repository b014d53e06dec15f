//! Shared decrypt-then-acquire-client helper (spec §4.H "Execute": "decrypt
//! kubeconfig; acquire a cluster client").

use fleet_client::ClusterClientPool;
use fleet_crypto::Cipher;
use fleet_entities::model::Cluster;
use snafu::ResultExt;

use crate::error::{self, Result};

pub async fn build_client(pool: &ClusterClientPool, cipher: &Cipher, cluster: &Cluster) -> Result<kube::Client> {
    let kubeconfig = cipher
        .decrypt(&cluster.kubeconfig_ciphertext)
        .with_context(|_| error::DecryptSnafu {
            cluster_id: cluster.id.to_string(),
        })?;
    pool.get(&kubeconfig).await.with_context(|_| error::AcquireClientSnafu {
        cluster_id: cluster.id.to_string(),
    })
}

/// Extracts the bare hostnames from a comma-separated `etcd-endpoints`
/// field such as `https://10.0.0.1:2379,https://10.0.0.2:2379` (spec
/// §4.H "SSH to the first host parsed out of etcd-endpoints").
pub fn parse_etcd_hosts(etcd_endpoints: &str) -> Vec<String> {
    etcd_endpoints
        .split(',')
        .filter_map(|entry| host_from_endpoint(entry.trim()))
        .collect()
}

fn host_from_endpoint(endpoint: &str) -> Option<String> {
    let without_scheme = match endpoint.split_once("://") {
        Some((_, rest)) => rest,
        None => endpoint,
    };
    let host = without_scheme.split(':').next().unwrap_or(without_scheme);
    let host = host.split('/').next().unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://10.0.0.1:2379,https://10.0.0.2:2379", vec!["10.0.0.1", "10.0.0.2"])]
    #[case("10.0.0.1:2379", vec!["10.0.0.1"])]
    #[case(" https://10.0.0.1:2379 , https://10.0.0.2:2379 ", vec!["10.0.0.1", "10.0.0.2"])]
    #[case("", Vec::<&str>::new())]
    fn parses_hosts_out_of_endpoint_list(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(parse_etcd_hosts(input), expected);
    }
}
