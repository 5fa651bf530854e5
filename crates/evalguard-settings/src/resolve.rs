use crate::{model::EvalguardConfigV1, presets};
use anyhow::Context;
use evalguard_domain::EvaluationPolicy;
use evalguard_types::SCHEMA_CONFIG_V1;

#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    /// Replaces the file's list when non-empty.
    pub applicability: Vec<String>,
    pub changes_allowed: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub policy: EvaluationPolicy,
}

pub fn resolve_config(
    cfg: EvalguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = cfg.schema.as_deref()
        && schema != SCHEMA_CONFIG_V1
    {
        anyhow::bail!("unsupported config schema: {schema} (expected {SCHEMA_CONFIG_V1})");
    }

    let profile = overrides
        .profile
        .clone()
        .or(cfg.profile.clone())
        .unwrap_or_else(|| presets::DEFAULT_PROFILE.to_string());

    let mut policy = presets::preset(&profile)
        .with_context(|| format!("unknown profile: {profile} (expected 'audit' or 'remediate')"))?;

    let tags = if overrides.applicability.is_empty() {
        cfg.applicability
    } else {
        overrides.applicability
    };
    policy.applicability = normalize_tags(tags);
    if policy.applicability.is_empty() {
        anyhow::bail!("no applicability tags configured; at least one is required");
    }

    if let Some(changes_allowed) = overrides.changes_allowed.or(cfg.changes_allowed) {
        policy.changes_allowed = changes_allowed;
    }
    if let Some(interrupt_guard) = cfg.interrupt_guard {
        policy.interrupt_guard = interrupt_guard;
    }

    Ok(ResolvedConfig { policy })
}

/// Trim, drop blanks, and de-duplicate while keeping first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn cfg_with_tags(values: &[&str]) -> EvalguardConfigV1 {
        EvalguardConfigV1 {
            applicability: tags(values),
            ..EvalguardConfigV1::default()
        }
    }

    #[test]
    fn defaults_to_audit() {
        let resolved =
            resolve_config(cfg_with_tags(&["tlp-green"]), Overrides::default()).expect("resolve");

        assert_eq!(resolved.policy.profile, "audit");
        assert!(!resolved.policy.changes_allowed);
        assert!(resolved.policy.interrupt_guard);
    }

    #[test]
    fn remediate_allows_changes() {
        let cfg = EvalguardConfigV1 {
            profile: Some("remediate".to_string()),
            ..cfg_with_tags(&["tlp-green"])
        };
        let resolved = resolve_config(cfg, Overrides::default()).expect("resolve");

        assert_eq!(resolved.policy.profile, "remediate");
        assert!(resolved.policy.changes_allowed);
    }

    #[test]
    fn file_beats_profile() {
        let cfg = EvalguardConfigV1 {
            profile: Some("remediate".to_string()),
            changes_allowed: Some(false),
            interrupt_guard: Some(false),
            ..cfg_with_tags(&["tlp-green"])
        };
        let resolved = resolve_config(cfg, Overrides::default()).expect("resolve");

        assert!(!resolved.policy.changes_allowed);
        assert!(!resolved.policy.interrupt_guard);
    }

    #[test]
    fn overrides_beat_file() {
        let cfg = EvalguardConfigV1 {
            profile: Some("audit".to_string()),
            changes_allowed: Some(false),
            ..cfg_with_tags(&["tlp-green"])
        };
        let overrides = Overrides {
            profile: Some("remediate".to_string()),
            applicability: tags(&["tlp-red"]),
            changes_allowed: Some(true),
        };
        let resolved = resolve_config(cfg, overrides).expect("resolve");

        assert_eq!(resolved.policy.profile, "remediate");
        assert_eq!(resolved.policy.applicability, tags(&["tlp-red"]));
        assert!(resolved.policy.changes_allowed);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let resolved = resolve_config(
            cfg_with_tags(&[" tlp-green", "tlp-amber", "tlp-green ", "  "]),
            Overrides::default(),
        )
        .expect("resolve");

        assert_eq!(resolved.policy.applicability, tags(&["tlp-green", "tlp-amber"]));
    }

    #[test]
    fn empty_applicability_is_an_error() {
        let err = resolve_config(cfg_with_tags(&["  "]), Overrides::default())
            .expect_err("no tags");
        assert!(err.to_string().contains("applicability"));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let cfg = EvalguardConfigV1 {
            profile: Some("yolo".to_string()),
            ..cfg_with_tags(&["tlp-green"])
        };
        let err = resolve_config(cfg, Overrides::default()).expect_err("unknown profile");
        assert!(err.to_string().contains("unknown profile: yolo"));
    }

    #[test]
    fn foreign_schema_is_an_error() {
        let cfg = EvalguardConfigV1 {
            schema: Some("evalguard.config.v0".to_string()),
            ..cfg_with_tags(&["tlp-green"])
        };
        let err = resolve_config(cfg, Overrides::default()).expect_err("schema mismatch");
        assert!(err.to_string().contains("unsupported config schema"));
    }
}
