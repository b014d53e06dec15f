//! Resource quota mirroring (spec §4.F "Resource quota mirror").

use std::collections::BTreeMap;

use fleet_quantity::parse_for_resource;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceQuotaDraft {
    pub hard_limits: BTreeMap<String, i64>,
    pub used: BTreeMap<String, i64>,
}

/// Copies `status.hard` into `hard_limits` and `status.used` into `used`,
/// parsing each quantity string to the canonical integer scale (spec §3).
pub fn mirror_resource_quota(hard: &BTreeMap<String, String>, used: &BTreeMap<String, String>) -> ResourceQuotaDraft {
    ResourceQuotaDraft {
        hard_limits: parse_map(hard),
        used: parse_map(used),
    }
}

fn parse_map(source: &BTreeMap<String, String>) -> BTreeMap<String, i64> {
    source
        .iter()
        .filter_map(|(key, value)| parse_for_resource(key, value).ok().map(|parsed| (key.clone(), parsed)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_hard_and_used_with_canonical_parsing() {
        let mut hard = BTreeMap::new();
        hard.insert("requests.cpu".to_string(), "2".to_string());
        hard.insert("requests.memory".to_string(), "1Gi".to_string());
        let mut used = BTreeMap::new();
        used.insert("requests.cpu".to_string(), "500m".to_string());

        let draft = mirror_resource_quota(&hard, &used);
        assert_eq!(draft.hard_limits.get("requests.cpu"), Some(&2000));
        assert_eq!(draft.hard_limits.get("requests.memory"), Some(&(1 << 30)));
        assert_eq!(draft.used.get("requests.cpu"), Some(&500));
    }
}
