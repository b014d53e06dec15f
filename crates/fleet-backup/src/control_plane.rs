//! Stop/start of cluster control-plane components over SSH around an etcd
//! restore (spec §4.H.1 "ControlPlaneManager").

use fleet_entities::model::EtcdDeploymentType;
use fleet_ssh::{ConnectOptions, SshSession};
use snafu::ResultExt;

use crate::error::{self, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Action {
    Stop,
    Start,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlPlaneComponent {
    Etcd,
    ApiServer,
}

impl ControlPlaneComponent {
    fn systemd_unit(self) -> &'static str {
        match self {
            Self::Etcd => "etcd",
            Self::ApiServer => "kube-apiserver",
        }
    }

    fn static_manifest_name(self) -> &'static str {
        match self {
            Self::Etcd => "etcd.yaml",
            Self::ApiServer => "kube-apiserver.yaml",
        }
    }
}

/// Stops/starts a control-plane component across every node, sequentially,
/// per etcd/k8s deployment type (spec §4.H.1). Stateless: the "mutex-
/// protected lazy init" named in spec §5 lives in the restore service that
/// owns one instance of this type behind a `tokio::sync::OnceCell`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlPlaneManager;

impl ControlPlaneManager {
    pub fn new() -> Self {
        Self
    }

    /// Stops `component` on every node in `nodes`, in order. A per-node
    /// failure fails the whole operation (spec §5: "the stop/start sequence
    /// is sequential per node, with the per-node failure failing the
    /// operation").
    pub async fn stop(
        &self,
        component: ControlPlaneComponent,
        deployment_type: EtcdDeploymentType,
        nodes: &[String],
        ssh_username: &str,
        ssh_password: &str,
    ) -> Result<()> {
        self.run_sequential(component, deployment_type, Action::Stop, nodes, ssh_username, ssh_password)
            .await
    }

    pub async fn start(
        &self,
        component: ControlPlaneComponent,
        deployment_type: EtcdDeploymentType,
        nodes: &[String],
        ssh_username: &str,
        ssh_password: &str,
    ) -> Result<()> {
        self.run_sequential(component, deployment_type, Action::Start, nodes, ssh_username, ssh_password)
            .await
    }

    async fn run_sequential(
        &self,
        component: ControlPlaneComponent,
        deployment_type: EtcdDeploymentType,
        action: Action,
        nodes: &[String],
        ssh_username: &str,
        ssh_password: &str,
    ) -> Result<()> {
        let command = command_for(component, deployment_type, action);
        for node in nodes {
            let session = SshSession::connect(node, ssh_username, ssh_password, ConnectOptions::default())
                .await
                .with_context(|_| error::SshSnafu { host: node.clone() })?;
            session.exec(&command).await.with_context(|_| error::SshSnafu { host: node.clone() })?;
        }
        Ok(())
    }
}

/// Command templates per spec §4.H.1: `kubexm` stops/starts a systemd unit;
/// `kubeadm` moves the static pod manifest in/out of the kubelet's manifest
/// directory.
fn command_for(component: ControlPlaneComponent, deployment_type: EtcdDeploymentType, action: Action) -> String {
    match deployment_type {
        EtcdDeploymentType::Kubexm => {
            let verb = match action {
                Action::Stop => "stop",
                Action::Start => "start",
            };
            format!("sudo systemctl {verb} {}", component.systemd_unit())
        }
        EtcdDeploymentType::Kubeadm => {
            let manifest = component.static_manifest_name();
            match action {
                Action::Stop => format!("sudo mv /etc/kubernetes/manifests/{manifest} /tmp/{manifest}"),
                Action::Start => format!("sudo mv /tmp/{manifest} /etc/kubernetes/manifests/{manifest}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        ControlPlaneComponent::Etcd,
        EtcdDeploymentType::Kubexm,
        Action::Stop,
        "sudo systemctl stop etcd"
    )]
    #[case(
        ControlPlaneComponent::Etcd,
        EtcdDeploymentType::Kubexm,
        Action::Start,
        "sudo systemctl start etcd"
    )]
    #[case(
        ControlPlaneComponent::Etcd,
        EtcdDeploymentType::Kubeadm,
        Action::Stop,
        "sudo mv /etc/kubernetes/manifests/etcd.yaml /tmp/etcd.yaml"
    )]
    #[case(
        ControlPlaneComponent::Etcd,
        EtcdDeploymentType::Kubeadm,
        Action::Start,
        "sudo mv /tmp/etcd.yaml /etc/kubernetes/manifests/etcd.yaml"
    )]
    #[case(
        ControlPlaneComponent::ApiServer,
        EtcdDeploymentType::Kubexm,
        Action::Stop,
        "sudo systemctl stop kube-apiserver"
    )]
    #[case(
        ControlPlaneComponent::ApiServer,
        EtcdDeploymentType::Kubeadm,
        Action::Start,
        "sudo mv /tmp/kube-apiserver.yaml /etc/kubernetes/manifests/kube-apiserver.yaml"
    )]
    fn command_matches_spec_table(
        #[case] component: ControlPlaneComponent,
        #[case] deployment_type: EtcdDeploymentType,
        #[case] action: Action,
        #[case] expected: &str,
    ) {
        assert_eq!(command_for(component, deployment_type, action), expected);
    }
}
