use evalguard_domain::EvaluationPolicy;

pub const DEFAULT_PROFILE: &str = "audit";

/// Preset profiles. `None` for an unknown name.
///
/// Presets carry no applicability; the context tags always come from the file or overrides.
pub fn preset(profile: &str) -> Option<EvaluationPolicy> {
    match profile {
        "audit" => Some(audit_profile()),
        "remediate" => Some(remediate_profile()),
        _ => None,
    }
}

fn audit_profile() -> EvaluationPolicy {
    EvaluationPolicy {
        profile: "audit".to_string(),
        applicability: Vec::new(),
        changes_allowed: false,
        interrupt_guard: true,
    }
}

fn remediate_profile() -> EvaluationPolicy {
    EvaluationPolicy {
        profile: "remediate".to_string(),
        applicability: Vec::new(),
        changes_allowed: true,
        interrupt_guard: true,
    }
}
