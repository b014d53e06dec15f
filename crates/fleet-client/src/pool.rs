//! Cached, LRU-evicted typed clients keyed by kubeconfig fingerprint
//! (spec §4.B).

use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use lru::LruCache;
use sha2::{Digest, Sha256};
use snafu::ResultExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::{self, Error, Result};

type Fingerprint = String;

struct CachedEntry {
    client: Client,
    last_used: DateTime<Utc>,
}

struct PoolState {
    cache: LruCache<Fingerprint, CachedEntry>,
}

/// Fingerprint is the cryptographic hash of the kubeconfig bytes
/// (spec §4.B). SHA-256 is fixed here so the pool shares a digest
/// primitive with `fleet-crypto`'s key derivation rather than introducing a
/// second hash algorithm.
pub fn fingerprint(kubeconfig: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(kubeconfig);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// A map from fingerprint to `{typed client, last-used}`, with LRU eviction
/// once the pool exceeds `max_clients` (spec §4.B). The mutex is held for
/// the whole `get` call, including cache hits, so that bumping `last_used`
/// is never racy (spec §5: "`get` takes the write lock even for cache
/// hits").
pub struct ClusterClientPool {
    state: Mutex<PoolState>,
    max_clients: usize,
    client_timeout: Duration,
}

impl ClusterClientPool {
    pub fn new(max_clients: usize, client_timeout: Duration) -> Self {
        let cap = NonZeroUsize::new(max_clients.max(1)).expect("max_clients.max(1) is never zero");
        Self {
            state: Mutex::new(PoolState {
                cache: LruCache::new(cap),
            }),
            max_clients,
            client_timeout,
        }
    }

    /// Returns the cached client if present, bumping recency; otherwise
    /// parses the kubeconfig, builds a typed client, inserts it, and evicts
    /// the least-recently-used entry if the pool now exceeds `max_clients`
    /// (spec §4.B).
    #[instrument(skip(self, kubeconfig))]
    pub async fn get(&self, kubeconfig: &[u8]) -> Result<Client> {
        let key = fingerprint(kubeconfig);

        {
            let mut state = self.state.lock().await;
            if let Some(entry) = state.cache.get_mut(&key) {
                entry.last_used = Utc::now();
                debug!(fingerprint = %key, "cluster client pool hit");
                return Ok(entry.client.clone());
            }
        }

        let client = build_client(kubeconfig, self.client_timeout).await?;

        let mut state = self.state.lock().await;
        // Another task may have raced us to build the same client while the
        // lock was released; prefer the one already cached.
        if let Some(entry) = state.cache.get_mut(&key) {
            entry.last_used = Utc::now();
            return Ok(entry.client.clone());
        }
        debug!(fingerprint = %key, capacity = self.max_clients, "cluster client pool miss, inserting");
        state.cache.put(
            key,
            CachedEntry {
                client: client.clone(),
                last_used: Utc::now(),
            },
        );
        Ok(client)
    }

    /// Drops the cached entry for `kubeconfig`, if any (spec §4.B).
    pub async fn remove(&self, kubeconfig: &[u8]) {
        let key = fingerprint(kubeconfig);
        self.state.lock().await.cache.pop(&key);
    }

    /// Succeeds iff the kubeconfig parses (spec §4.B).
    pub fn validate(kubeconfig: &[u8]) -> bool {
        parse_kubeconfig(kubeconfig).is_ok()
    }

    /// The parsed host of the current cluster's API server (spec §4.B).
    pub fn api_server_url(kubeconfig: &[u8]) -> Result<String> {
        let parsed = parse_kubeconfig(kubeconfig)?;
        current_cluster_server(&parsed)
    }

    /// Read-only introspection used by the LRU testable property
    /// (spec §8) and by callers that want to avoid building a client just
    /// to check membership.
    pub async fn len(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    pub async fn contains(&self, kubeconfig: &[u8]) -> bool {
        let key = fingerprint(kubeconfig);
        self.state.lock().await.cache.contains(&key)
    }

    /// Drops every cached entry. Used by the reconciliation engine's
    /// shutdown path; does not change eviction semantics.
    pub async fn clear(&self) {
        self.state.lock().await.cache.clear();
    }
}

fn parse_kubeconfig(bytes: &[u8]) -> Result<Kubeconfig> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::InvalidKubeconfigEncoding)?;
    Kubeconfig::from_yaml(text).context(error::InvalidKubeconfigSnafu)
}

fn current_cluster_server(kubeconfig: &Kubeconfig) -> Result<String> {
    let cluster_name = kubeconfig
        .current_context
        .as_deref()
        .and_then(|ctx_name| kubeconfig.contexts.iter().find(|c| c.name == ctx_name))
        .and_then(|ctx| ctx.context.as_ref())
        .map(|ctx| ctx.cluster.clone());

    let named_cluster = match cluster_name {
        Some(name) => kubeconfig.clusters.iter().find(|c| c.name == name),
        None => kubeconfig.clusters.first(),
    }
    .ok_or(Error::NoClusterEntry)?;

    named_cluster
        .cluster
        .as_ref()
        .and_then(|c| c.server.clone())
        .ok_or(Error::NoClusterEntry)
}

async fn build_client(kubeconfig: &[u8], timeout: Duration) -> Result<Client> {
    let parsed = parse_kubeconfig(kubeconfig)?;
    let mut config = Config::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
        .await
        .context(error::InvalidKubeconfigSnafu)?;
    config.read_timeout = Some(timeout);
    config.write_timeout = Some(timeout);
    Client::try_from(config).context(error::BuildClientSnafu)
}
