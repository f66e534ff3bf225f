//! Prompt sanitization: invoked before every outbound
//! provider call. Only the `Healthcare` domain (case-insensitive) redacts
//! anything; every other domain passes the prompt through unchanged.
//!
//! Kept as a standalone pipeline rather than inlined into a provider client
//! so new domains can register their own redaction rules without touching
//! `infrastructure::llm`.

use crate::value::DynValue;
use std::sync::LazyLock;

const CONTEXT_REDACTION_KEYS: [&str; 5] = ["patient_id", "patientId", "mrn", "MRN", "medical_record_number"];

static PATIENT_ID_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)\b(?:patient[_\s]?id|patient_id|MRN|medical[_\s]?record[_\s]?number)\s*[:=]\s*([A-Z0-9\-]+)",
    )
    .unwrap()
});
static SSN_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)\b(?:SSN|social[_\s]?security[_\s]?number)\s*[:=]\s*(\d{3}-\d{2}-\d{4})").unwrap()
});
static EMAIL_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)\b([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})\b").unwrap());
static PHONE_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)\b(\d{3}[-.\s]?\d{3}[-.\s]?\d{4})\b").unwrap());
static CARD_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)\b(\d{4}[-.\s]?\d{4}[-.\s]?\d{4}[-.\s]?\d{4})\b").unwrap());

/// Redacts PII/PHI from a prompt bound for an LLM provider, for the
/// `Healthcare` domain only; every other domain (including `None`) returns
/// the prompt unchanged.
pub fn sanitize_prompt(domain: Option<&str>, prompt: &str, context: &DynValue) -> String {
    if prompt.is_empty() {
        return prompt.to_string();
    }
    let normalized = domain.unwrap_or("").trim().to_lowercase();
    if normalized != "healthcare" {
        return prompt.to_string();
    }

    // Card pattern must run before phone: a 16-digit card number grouped in
    // 4s would otherwise be partially consumed by the 10-digit phone regex.
    let mut out = CARD_PATTERN.replace_all(prompt, "[CARD_REDACTED]").into_owned();
    out = PATIENT_ID_PATTERN.replace_all(&out, "patient_id=[REDACTED]").into_owned();
    out = SSN_PATTERN.replace_all(&out, "SSN=[REDACTED]").into_owned();
    out = EMAIL_PATTERN.replace_all(&out, "[EMAIL_REDACTED]").into_owned();
    out = PHONE_PATTERN.replace_all(&out, "[PHONE_REDACTED]").into_owned();

    if let Some(obj) = context.as_object() {
        for key in CONTEXT_REDACTION_KEYS {
            if let Some(value) = obj.get(key).and_then(DynValue::as_str) {
                if !value.is_empty() && out.contains(value) {
                    out = out.replace(value, "[REDACTED]");
                }
            }
        }
    }

    out
}

/// Reserved enforcement point: always `(true, None)` today.
pub fn validate_prompt_for_domain(_domain: Option<&str>, _prompt: &str) -> (bool, Option<String>) {
    (true, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_healthcare_domain_is_unchanged() {
        let prompt = "Patient SSN: 123-45-6789, email a@b.com";
        assert_eq!(sanitize_prompt(Some("Finance"), prompt, &DynValue::object()), prompt);
        assert_eq!(sanitize_prompt(None, prompt, &DynValue::object()), prompt);
    }

    #[test]
    fn healthcare_is_case_insensitive() {
        let prompt = "contact me at a@b.com";
        let out = sanitize_prompt(Some("HEALTHCARE"), prompt, &DynValue::object());
        assert!(out.contains("[EMAIL_REDACTED]"));
    }

    #[test]
    fn redacts_ssn_email_phone_card() {
        let prompt = "SSN: 123-45-6789, email a@b.com, call 555-123-4567, card 4111 1111 1111 1111";
        let out = sanitize_prompt(Some("Healthcare"), prompt, &DynValue::object());
        assert!(!out.contains("123-45-6789"));
        assert!(!out.contains("a@b.com"));
        assert!(!out.contains("555-123-4567"));
        assert!(!out.contains("4111 1111 1111 1111"));
        assert!(out.contains("SSN=[REDACTED]"));
        assert!(out.contains("[EMAIL_REDACTED]"));
        assert!(out.contains("[PHONE_REDACTED]"));
        assert!(out.contains("[CARD_REDACTED]"));
    }

    #[test]
    fn redacts_patient_id_token() {
        let prompt = "patient_id: ABC-123 presented with symptoms";
        let out = sanitize_prompt(Some("Healthcare"), prompt, &DynValue::object());
        assert!(!out.contains("ABC-123"));
        assert!(out.contains("patient_id=[REDACTED]"));
    }

    #[test]
    fn redacts_context_value_substring_match() {
        let mut context = DynValue::object();
        context.set("patient_id", DynValue::String("P-998877".into()));
        let prompt = "Case notes reference P-998877 in the chart.";
        let out = sanitize_prompt(Some("Healthcare"), prompt, &context);
        assert!(!out.contains("P-998877"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn empty_prompt_returned_unchanged() {
        assert_eq!(sanitize_prompt(Some("Healthcare"), "", &DynValue::object()), "");
    }

    #[test]
    fn validate_prompt_for_domain_is_always_allowed() {
        assert_eq!(validate_prompt_for_domain(Some("Healthcare"), "x"), (true, None));
        assert_eq!(validate_prompt_for_domain(None, ""), (true, None));
    }
}
