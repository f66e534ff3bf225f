//! Schema-constrained output for LLM responses: each agent
//! stage declares a schema name; the fabric parses the model's text as
//! JSON, validates, sanitizes (dropping unknown fields, clamping numeric
//! ranges), re-validates, and either returns the value or a typed
//! validation error. Validation failure is never silently repaired by
//! default-filling required fields.

use exception_platform_domain::DynValue;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaName {
    Triage,
    Policy,
    Resolution,
    Supervisor,
    Feedback,
}

impl SchemaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaName::Triage => "triage",
            SchemaName::Policy => "policy",
            SchemaName::Resolution => "resolution",
            SchemaName::Supervisor => "supervisor",
            SchemaName::Feedback => "feedback",
        }
    }

    /// Required top-level fields and their declared type, used by
    /// [`validate`]. `"number"` fields named `confidence`/`relevance` are
    /// additionally range-clamped to `[0,1]` by [`sanitize`].
    fn required_fields(&self) -> &'static [(&'static str, FieldKind)] {
        match self {
            SchemaName::Triage => &[
                ("exception_type", FieldKind::String),
                ("severity", FieldKind::String),
                ("confidence", FieldKind::Number),
            ],
            SchemaName::Policy => &[("decision", FieldKind::String), ("confidence", FieldKind::Number)],
            SchemaName::Resolution => &[("confidence", FieldKind::Number)],
            SchemaName::Supervisor => &[("decision", FieldKind::String), ("confidence", FieldKind::Number)],
            SchemaName::Feedback => &[("confidence", FieldKind::Number)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("field '{field}' has wrong type, expected {expected}")]
    WrongType { field: String, expected: &'static str },
    #[error("response was not valid JSON and no balanced object could be extracted")]
    NotJson,
}

/// Parses the model's raw text as JSON. Falls back to: strip markdown code
/// fences, then scan for the first balanced `{...}` span.
pub fn parse_llm_json(text: &str) -> Result<DynValue, ValidationError> {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(text.trim()) {
        return Ok(v.into());
    }

    let stripped = strip_markdown_fences(text);
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(stripped.trim()) {
        return Ok(v.into());
    }

    if let Some(span) = first_balanced_object(stripped) {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(span) {
            return Ok(v.into());
        }
    }

    Err(ValidationError::NotJson)
}

fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches('\n');
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Validates required fields/types for a declared schema.
pub fn validate(schema: SchemaName, value: &DynValue) -> Result<(), ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::WrongType { field: "$".into(), expected: "object" })?;
    for (field, kind) in schema.required_fields() {
        let Some(v) = obj.get(*field) else {
            return Err(ValidationError::MissingField((*field).to_string()));
        };
        let matches = match kind {
            FieldKind::String => v.as_str().is_some(),
            FieldKind::Number => v.as_f64().is_some(),
        };
        if !matches {
            let expected = match kind {
                FieldKind::String => "string",
                FieldKind::Number => "number",
            };
            return Err(ValidationError::WrongType { field: (*field).to_string(), expected });
        }
    }
    Ok(())
}

/// Drops unknown top-level fields and clamps `confidence`/`relevance`
/// numeric fields to `[0,1]`. Required fields are never filled in with
/// defaults — a response missing one is rejected by [`validate`], not
/// repaired here.
pub fn sanitize(schema: SchemaName, value: &DynValue) -> DynValue {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    let known: Vec<&str> = schema.required_fields().iter().map(|(f, _)| *f).chain(["evidence", "next_step", "metadata", "reasoning_steps", "summary"]).collect();

    let mut out = BTreeMap::new();
    for (key, v) in obj {
        if !known.contains(&key.as_str()) {
            continue;
        }
        let v = if (key == "confidence" || key == "relevance") && v.as_f64().is_some() {
            DynValue::Number(v.as_f64().unwrap().clamp(0.0, 1.0))
        } else {
            v.clone()
        };
        out.insert(key.clone(), v);
    }
    DynValue::Object(out)
}

/// Parses, validates, sanitizes, and re-validates in one call — the
/// top-level entry point the routing fabric uses on every LLM response
///.
pub fn validate_and_sanitize(schema: SchemaName, raw_text: &str) -> Result<DynValue, ValidationError> {
    let parsed = parse_llm_json(raw_text)?;
    validate(schema, &parsed)?;
    let sanitized = sanitize(schema, &parsed);
    validate(schema, &sanitized)?;
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let v = parse_llm_json(r#"{"decision": "ALLOW", "confidence": 0.9}"#).unwrap();
        assert_eq!(v.require_str("decision"), Ok("ALLOW"));
    }

    #[test]
    fn strips_markdown_fences() {
        let text = "```json\n{\"decision\": \"ALLOW\", \"confidence\": 0.9}\n```";
        let v = parse_llm_json(text).unwrap();
        assert_eq!(v.require_str("decision"), Ok("ALLOW"));
    }

    #[test]
    fn scans_for_first_balanced_object_amid_prose() {
        let text = "Sure, here is my answer: {\"decision\": \"BLOCK\", \"confidence\": 0.4} — let me know if you need more.";
        let v = parse_llm_json(text).unwrap();
        assert_eq!(v.require_str("decision"), Ok("BLOCK"));
    }

    #[test]
    fn rejects_non_json_garbage() {
        assert_eq!(parse_llm_json("not json at all"), Err(ValidationError::NotJson));
    }

    #[test]
    fn validate_rejects_missing_required_field() {
        let v: DynValue = serde_json::json!({"confidence": 0.5}).into();
        assert_eq!(validate(SchemaName::Policy, &v), Err(ValidationError::MissingField("decision".into())));
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let v: DynValue = serde_json::json!({"decision": "ALLOW", "confidence": "high"}).into();
        assert_eq!(
            validate(SchemaName::Policy, &v),
            Err(ValidationError::WrongType { field: "confidence".into(), expected: "number" })
        );
    }

    #[test]
    fn sanitize_drops_unknown_fields_and_clamps_confidence() {
        let v: DynValue = serde_json::json!({
            "decision": "ALLOW",
            "confidence": 1.8,
            "unexpected_field": "should be dropped",
        })
        .into();
        let sanitized = sanitize(SchemaName::Policy, &v);
        assert_eq!(sanitized.get("confidence").and_then(DynValue::as_f64), Some(1.0));
        assert!(sanitized.get("unexpected_field").is_none());
    }

    #[test]
    fn validate_and_sanitize_never_fills_missing_required_fields() {
        let result = validate_and_sanitize(SchemaName::Policy, r#"{"confidence": 0.5}"#);
        assert_eq!(result, Err(ValidationError::MissingField("decision".into())));
    }
}
