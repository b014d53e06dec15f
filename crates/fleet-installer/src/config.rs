//! YAML config generation for the installer process (spec §4.I: "Builds a
//! YAML configuration from the template plus request fields").

use std::collections::BTreeSet;

use fleet_entities::model::{Machine, MachineRole};
use serde::Serialize;
use snafu::ResultExt;

use crate::error::{self, Result};

/// A create request, as received by the runner: the cluster name and the
/// set of pool machines to provision it onto (spec §4.I).
#[derive(Clone, Debug)]
pub struct CreateRequest {
    pub cluster_name: String,
    pub machine_ids: BTreeSet<fleet_entities::model::EntityId>,
    pub artifact: Option<String>,
    pub with_packages: bool,
    pub yes: bool,
}

#[derive(Serialize)]
struct ConfigHost {
    hostname: String,
    role: &'static str,
}

#[derive(Serialize)]
struct ConfigTemplate {
    cluster_name: String,
    hosts: Vec<ConfigHost>,
}

fn role_name(machine: &Machine) -> &'static str {
    if machine.roles.contains(&MachineRole::Master) {
        "master"
    } else {
        "worker"
    }
}

/// Renders the installer's YAML configuration from the cluster name and its
/// validated machine set, in deterministic hostname order.
pub fn render(cluster_name: &str, machines: &[Machine]) -> Result<String> {
    let mut hosts: Vec<ConfigHost> = machines
        .iter()
        .map(|machine| ConfigHost {
            hostname: machine.hostname.clone(),
            role: role_name(machine),
        })
        .collect();
    hosts.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    let template = ConfigTemplate {
        cluster_name: cluster_name.to_string(),
        hosts,
    };
    serde_yaml::to_string(&template).context(error::RenderConfigSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_entities::model::MachineStatus;
    use uuid::Uuid;

    fn machine(hostname: &str, roles: &[MachineRole]) -> Machine {
        Machine {
            id: Uuid::new_v4(),
            hostname: hostname.to_string(),
            status: MachineStatus::Available,
            roles: roles.iter().copied().collect(),
        }
    }

    #[test]
    fn renders_hosts_sorted_by_name_with_roles() {
        let machines = vec![
            machine("node-b", &[MachineRole::Worker]),
            machine("node-a", &[MachineRole::Master]),
        ];
        let yaml = render("demo-cluster", &machines).expect("render");
        let node_a_idx = yaml.find("node-a").expect("node-a present");
        let node_b_idx = yaml.find("node-b").expect("node-b present");
        assert!(node_a_idx < node_b_idx);
        assert!(yaml.contains("cluster_name: demo-cluster"));
        assert!(yaml.contains("role: master"));
        assert!(yaml.contains("role: worker"));
    }
}
