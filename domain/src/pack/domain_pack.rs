//! Domain Pack — immutable, versioned configuration for one vertical
//!.

use super::guardrails::Guardrails;
use crate::ids::DomainName;
use crate::playbook::Playbook;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionTypeDefinition {
    pub description: String,
    #[serde(default)]
    pub detection_rules: Vec<String>,
    #[serde(default)]
    pub severity_condition_rules: Vec<String>,
    /// Optional parent exception type for playbook composition.
    pub parent_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub description: String,
    pub endpoint: String,
    /// Opaque JSON-schema-like parameter description; kept as raw JSON
    /// since its shape is tool-specific and not interpreted by the core.
    #[serde(default)]
    pub parameter_schema: serde_json::Value,
    pub version: String,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub max_retries: u32,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

/// An immutable versioned Domain Pack: the vertical's exception taxonomy,
/// tools, playbooks, and guardrails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainPack {
    pub domain_name: DomainName,
    pub version: String,
    pub exception_types: BTreeMap<String, ExceptionTypeDefinition>,
    pub tools: BTreeMap<String, ToolDefinition>,
    pub playbooks: Vec<Playbook>,
    pub guardrails: Guardrails,
}

impl DomainPack {
    pub fn exception_type(&self, name: &str) -> Option<&ExceptionTypeDefinition> {
        self.exception_types.get(name)
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn playbook_for(&self, exception_type: &str) -> Option<&Playbook> {
        self.playbooks.iter().find(|p| p.exception_type == exception_type)
    }
}
