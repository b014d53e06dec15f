//! Substring-to-progress mapping for installer stdout/stderr lines (spec
//! §4.I table): case-sensitive, first match in table order wins.

const TABLE: &[(&str, u8, &str)] = &[
    ("Checking an existing installation", 5, "Checking existing installation"),
    ("Preparing for installation", 10, "Preparing for installation"),
    ("Downloading", 20, "Downloading required packages"),
    ("downloading kubeadm", 30, "Downloading kubeadm binary"),
    ("pulling images", 40, "Pulling container images"),
    ("Installing", 60, "Installing Kubernetes components"),
    ("Configuring", 80, "Configuring cluster"),
    ("Installing kubesphere", 90, "Installing add-on"),
    ("successfully installed", 100, "Installation completed"),
    ("is successfully installed", 100, "Installation completed"),
];

/// Returns `(progress, step)` for the first table entry whose substring
/// appears in `line`, or `None` if nothing matches.
pub fn map_line(line: &str) -> Option<(u8, &'static str)> {
    TABLE
        .iter()
        .find(|(substring, _, _)| line.contains(substring))
        .map(|(_, progress, step)| (*progress, *step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Checking an existing installation...", Some((5, "Checking existing installation")))]
    #[case("Preparing for installation", Some((10, "Preparing for installation")))]
    #[case("Downloading required rpm packages", Some((20, "Downloading required packages")))]
    #[case("downloading kubeadm binary v1.28", Some((30, "Downloading kubeadm binary")))]
    #[case("pulling images alpine:3.18", Some((40, "Pulling container images")))]
    #[case("Installing etcd", Some((60, "Installing Kubernetes components")))]
    #[case("Configuring network plugin", Some((80, "Configuring cluster")))]
    #[case("Installing kubesphere", Some((90, "Installing add-on")))]
    #[case("KubeSphere is successfully installed", Some((100, "Installation completed")))]
    #[case("random unrelated log line", None)]
    fn maps_lines_to_progress(#[case] line: &str, #[case] expected: Option<(u8, &'static str)>) {
        assert_eq!(map_line(line), expected);
    }

    #[test]
    fn first_match_wins_when_multiple_substrings_present() {
        // "Installing" (progress 60) appears before "Installing kubesphere"
        // (progress 90) in table order, so it wins even though this line
        // also contains the kubesphere substring.
        assert_eq!(
            map_line("Installing kubesphere dashboard"),
            Some((60, "Installing Kubernetes components"))
        );
    }

    #[test]
    fn replays_spec_example_transition() {
        let lines = [
            "Preparing for installation",
            "pulling images alpine:3.18",
            "KubeSphere is successfully installed",
        ];
        let transitions: Vec<u8> = lines.iter().filter_map(|line| map_line(line)).map(|(p, _)| p).collect();
        assert_eq!(transitions, vec![10, 40, 100]);
    }
}
