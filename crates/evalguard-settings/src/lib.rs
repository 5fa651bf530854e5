//! Config parsing and profile/preset resolution.
//!
//! This crate is IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

mod model;
mod presets;
mod resolve;

pub use model::EvalguardConfigV1;
pub use resolve::{Overrides, ResolvedConfig};

/// Parse `evalguard.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<EvalguardConfigV1> {
    let cfg: EvalguardConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the policy used by an evaluation (profile + file + overrides).
pub fn resolve_config(
    cfg: EvalguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
