//! Deal stage → negotiation status lookup
//!
//! Stage ids of non-default pipelines carry a `C{category}:` prefix
//! (`C3:WON`). Lookups use the stage id without it. A pipeline's
//! `pipeline_configs` row overrides the default table entry by entry.

use crate::domain::crm::NegotiationStatus;
use std::collections::HashMap;

const DEFAULT_STAGES: &[(&str, NegotiationStatus)] = &[
    ("NEW", NegotiationStatus::Initial),
    ("PREPARATION", NegotiationStatus::FormFilled),
    ("PREPAYMENT_INVOICE", NegotiationStatus::InService),
    ("EXECUTING", NegotiationStatus::InService),
    ("FINAL_INVOICE", NegotiationStatus::InService),
    ("WON", NegotiationStatus::Won),
    ("LOSE", NegotiationStatus::Lost),
    ("APOLOGY", NegotiationStatus::Lost),
];

/// Removes a leading `C{digits}:` pipeline prefix
///
/// ```
/// use leadsync::core::webhook::stages::strip_pipeline_prefix;
///
/// assert_eq!(strip_pipeline_prefix("C12:WON"), "WON");
/// assert_eq!(strip_pipeline_prefix("WON"), "WON");
/// assert_eq!(strip_pipeline_prefix("CUSTOM:X"), "CUSTOM:X");
/// ```
pub fn strip_pipeline_prefix(stage_id: &str) -> &str {
    let Some(rest) = stage_id.strip_prefix('C') else {
        return stage_id;
    };
    match rest.split_once(':') {
        Some((digits, stage))
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            stage
        }
        _ => stage_id,
    }
}

/// Status for a stage in the default table
pub fn default_status(stage_id: &str) -> Option<NegotiationStatus> {
    let stage = strip_pipeline_prefix(stage_id);
    DEFAULT_STAGES
        .iter()
        .find(|(id, _)| *id == stage)
        .map(|(_, status)| *status)
}

/// Status for a stage, consulting the pipeline overrides first
///
/// `None` means the stage has no negotiation counterpart.
pub fn resolve_status(
    stage_id: &str,
    overrides: &HashMap<String, NegotiationStatus>,
) -> Option<NegotiationStatus> {
    let stage = strip_pipeline_prefix(stage_id);
    overrides
        .get(stage)
        .copied()
        .or_else(|| default_status(stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("C1:WON", "WON" ; "single digit")]
    #[test_case("C27:UC_4F1X", "UC_4F1X" ; "custom stage")]
    #[test_case("NEW", "NEW" ; "no prefix")]
    #[test_case("C:NEW", "C:NEW" ; "no digits")]
    #[test_case("CX:NEW", "CX:NEW" ; "letters")]
    fn test_strip_pipeline_prefix(input: &str, expected: &str) {
        assert_eq!(strip_pipeline_prefix(input), expected);
    }

    #[test]
    fn test_default_table() {
        assert_eq!(default_status("C3:WON"), Some(NegotiationStatus::Won));
        assert_eq!(default_status("APOLOGY"), Some(NegotiationStatus::Lost));
        assert_eq!(default_status("UC_CUSTOM"), None);
    }

    #[test]
    fn test_override_wins() {
        let overrides = HashMap::from([
            ("NEW".to_string(), NegotiationStatus::FormFilled),
            ("UC_CUSTOM".to_string(), NegotiationStatus::InService),
        ]);
        assert_eq!(resolve_status("C2:NEW", &overrides), Some(NegotiationStatus::FormFilled));
        assert_eq!(resolve_status("C2:UC_CUSTOM", &overrides), Some(NegotiationStatus::InService));
        assert_eq!(resolve_status("C2:WON", &overrides), Some(NegotiationStatus::Won));
        assert_eq!(resolve_status("C2:UC_OTHER", &overrides), None);
    }
}
