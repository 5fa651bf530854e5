//! Catalog of controls and requirements, as produced by an external loader.
//!
//! Only the shape lives here. Reading YAML/JSON from disk or URLs is someone else's job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct Catalog {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub control_families: Vec<ControlFamily>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub applicability_categories: Vec<Category>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ControlFamily {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub controls: Vec<Control>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Control {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Requirement {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub applicability: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Catalog {
    /// All controls across families, in declaration order.
    pub fn controls(&self) -> impl Iterator<Item = (&ControlFamily, &Control)> {
        self.control_families
            .iter()
            .flat_map(|family| family.controls.iter().map(move |control| (family, control)))
    }
}
