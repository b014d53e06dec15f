//! Event severity classification (spec §4.E.1).

use fleet_entities::model::EventSeverity;

/// `type=Warning` ⇒ `warning`; reasons `Failed|FailedScheduling|FailedMount`
/// ⇒ `error`; reasons `Killing|Preempting` ⇒ `warning`; reasons
/// `Created|Started|Scheduled` ⇒ `info`; otherwise `info` (spec §4.E.1).
pub fn classify(event_type: &str, reason: &str) -> EventSeverity {
    match reason {
        "Failed" | "FailedScheduling" | "FailedMount" => EventSeverity::Error,
        "Killing" | "Preempting" => EventSeverity::Warning,
        "Created" | "Started" | "Scheduled" => EventSeverity::Info,
        _ if event_type == "Warning" => EventSeverity::Warning,
        _ => EventSeverity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Normal", "FailedMount", EventSeverity::Error)]
    #[case("Normal", "FailedScheduling", EventSeverity::Error)]
    #[case("Normal", "Failed", EventSeverity::Error)]
    #[case("Normal", "Killing", EventSeverity::Warning)]
    #[case("Normal", "Preempting", EventSeverity::Warning)]
    #[case("Normal", "Created", EventSeverity::Info)]
    #[case("Normal", "Started", EventSeverity::Info)]
    #[case("Normal", "Scheduled", EventSeverity::Info)]
    #[case("Warning", "SomethingElse", EventSeverity::Warning)]
    #[case("Normal", "SomethingElse", EventSeverity::Info)]
    fn maps_type_and_reason_to_severity(
        #[case] event_type: &str,
        #[case] reason: &str,
        #[case] expected: EventSeverity,
    ) {
        assert_eq!(classify(event_type, reason), expected);
    }

    /// Reason-based rules take priority over the type-based `Warning`
    /// fallback (spec §4.E.1 lists reason rules first).
    #[test]
    fn reason_rule_wins_over_warning_type_when_both_could_apply() {
        assert_eq!(classify("Warning", "Created"), EventSeverity::Info);
    }
}
