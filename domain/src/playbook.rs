//! Playbook and playbook step value objects, plus the tool-name extraction
//! rule described below.

use crate::value::DynValue;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TOOL_CALL_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

static BARE_IDENT_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

const TOOL_PARAM_KEYS: [&str; 5] = ["tool", "toolName", "tool_name", "action", "method"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybookStep {
    pub action: String,
    #[serde(default)]
    pub parameters: Option<DynValue>,
    pub description: Option<String>,
    pub step_id: Option<String>,
}

impl PlaybookStep {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            parameters: None,
            description: None,
            step_id: None,
        }
    }

    pub fn with_parameters(mut self, parameters: DynValue) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Resolves the step's tool reference by the first matching rule
    ///:
    /// (i) an action string matching `<ident>(...)` → the identifier;
    /// (ii) a parameter key in {tool, toolName, tool_name, action, method}
    ///      whose value is a string → that string;
    /// (iii) an action string that is a bare identifier → that identifier;
    /// otherwise `None` (the step is non-tool-bearing, e.g. a declarative
    /// `notify`).
    pub fn extract_tool_name(&self) -> Option<&str> {
        if let Some(caps) = TOOL_CALL_PATTERN.captures(&self.action) {
            return caps.get(1).map(|m| m.as_str());
        }

        if let Some(params) = self.parameters.as_ref().and_then(DynValue::as_object) {
            for key in TOOL_PARAM_KEYS {
                if let Some(value) = params.get(key).and_then(DynValue::as_str) {
                    return Some(value);
                }
            }
        }

        if BARE_IDENT_PATTERN.is_match(&self.action) {
            return Some(self.action.as_str());
        }

        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playbook {
    pub exception_type: String,
    pub steps: Vec<PlaybookStep>,
}

impl PartialEq for PlaybookStep {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action && self.step_id == other.step_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tool_name_from_call_syntax() {
        let step = PlaybookStep::new("getSettlement('ORD-123')");
        assert_eq!(step.extract_tool_name(), Some("getSettlement"));
    }

    #[test]
    fn extracts_tool_name_from_parameter_key() {
        let mut params = DynValue::object();
        params.set("tool_name", DynValue::String("triggerSettlementRetry".into()));
        let step = PlaybookStep::new("invoke").with_parameters(params);
        assert_eq!(step.extract_tool_name(), Some("triggerSettlementRetry"));
    }

    #[test]
    fn bare_identifier_action_is_a_tool_name() {
        let step = PlaybookStep::new("rollback");
        assert_eq!(step.extract_tool_name(), Some("rollback"));
    }

    #[test]
    fn declarative_verb_with_spaces_is_non_tool_bearing() {
        let step = PlaybookStep::new("notify owner of delay");
        assert_eq!(step.extract_tool_name(), None);
    }

    #[test]
    fn call_syntax_takes_precedence_over_parameter_key() {
        let mut params = DynValue::object();
        params.set("tool_name", DynValue::String("otherTool".into()));
        let step = PlaybookStep::new("getSettlement('ORD-1')").with_parameters(params);
        assert_eq!(step.extract_tool_name(), Some("getSettlement"));
    }
}
