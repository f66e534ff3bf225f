//! Triage stage: names `exception_type` and `severity`.
//!
//! The rule-based computation here only reads declarative fields a source
//! system can reasonably be expected to populate (`exceptionType`/
//! `severity` on the raw payload) against the domain pack's declared
//! taxonomy — the pack's `detection_rules`/`severity_condition_rules` are
//! free-text guidance for the LLM prompt, not an executable rule DSL, so
//! the rule-based path does not attempt to interpret them.

use super::{emit_stage_audit, StageDeps, DISAGREEMENT_PENALTY};
use crate::llm::{call_with_fallback, SchemaName};
use exception_platform_domain::{AgentDecision, DomainPack, DynValue, ExceptionRecord, Severity};

pub struct TriageInput<'a> {
    pub exception: &'a ExceptionRecord,
    pub domain_pack: &'a DomainPack,
    /// Opaque similar-case results (RAG-style evidence), passed through to
    /// the LLM prompt untouched.
    pub similar_cases: &'a [DynValue],
}

pub struct TriageOutcome {
    pub decision: AgentDecision,
    pub exception_type: String,
    pub severity: Severity,
}

fn parse_severity(raw: &str) -> Option<Severity> {
    match raw.to_ascii_uppercase().as_str() {
        "LOW" => Some(Severity::Low),
        "MEDIUM" => Some(Severity::Medium),
        "HIGH" => Some(Severity::High),
        "CRITICAL" => Some(Severity::Critical),
        _ => None,
    }
}

struct RuleResult {
    exception_type: String,
    severity: Severity,
    confidence: f64,
}

fn rule_based(exception: &ExceptionRecord, domain_pack: &DomainPack) -> RuleResult {
    let declared_type = exception
        .raw_payload
        .get("exceptionType")
        .or_else(|| exception.raw_payload.get("exception_type"))
        .and_then(DynValue::as_str);

    let (exception_type, confidence) = match declared_type {
        Some(t) if domain_pack.exception_type(t).is_some() => (t.to_string(), 0.6),
        Some(t) if domain_pack.exception_types.is_empty() => (t.to_string(), 0.5),
        _ => match domain_pack.exception_types.keys().next() {
            Some(first) => (first.clone(), 0.4),
            None => ("UNCLASSIFIED".to_string(), 0.2),
        },
    };

    let severity = exception
        .raw_payload
        .get("severity")
        .and_then(DynValue::as_str)
        .and_then(parse_severity)
        .unwrap_or(Severity::Medium);

    RuleResult { exception_type, severity, confidence }
}

/// Runs the rule-based classification, optionally merges an LLM opinion
/// under the stage's merging rule, and audits the result.
pub async fn process(input: TriageInput<'_>, deps: &StageDeps<'_>) -> TriageOutcome {
    let rule = rule_based(input.exception, input.domain_pack);

    let mut evidence = vec![format!(
        "rule-based: type={} severity={:?} confidence={:.2}",
        rule.exception_type, rule.severity, rule.confidence
    )];

    let (exception_type, severity, confidence) = match deps.llm {
        None => (rule.exception_type.clone(), rule.severity, rule.confidence),
        Some(client) => {
            let mut context = DynValue::object();
            context.set("exception_type_candidate", DynValue::String(rule.exception_type.clone()));
            context.set(
                "similar_cases",
                DynValue::Array(input.similar_cases.to_vec()),
            );

            let prompt = format!(
                "Classify this exception. Domain={} payload={:?} rule_candidate_type={} rule_candidate_severity={:?}",
                input.domain_pack.domain_name, input.exception.raw_payload, rule.exception_type, rule.severity
            );

            let outcome = call_with_fallback(
                "triage",
                Some(input.exception.tenant_id.as_str()),
                Some(input.domain_pack.domain_name.as_str()),
                client,
                deps.breaker,
                SchemaName::Triage,
                &prompt,
                &context,
                &deps.retry,
                deps.audit,
                || {
                    let mut v = DynValue::object();
                    v.set("exception_type", DynValue::String(rule.exception_type.clone()));
                    v.set("severity", DynValue::String(format!("{:?}", rule.severity).to_uppercase()));
                    v.set("confidence", DynValue::Number(rule.confidence));
                    v
                },
            )
            .await;

            let llm_type = outcome.value.get("exception_type").and_then(DynValue::as_str).map(str::to_string);
            let llm_severity = outcome.value.get("severity").and_then(DynValue::as_str).and_then(parse_severity);
            let llm_confidence = outcome.value.get("confidence").and_then(DynValue::as_f64).unwrap_or(rule.confidence);

            let type_is_valid = llm_type
                .as_deref()
                .map(|t| domain_pack_has_or_empty(input.domain_pack, t))
                .unwrap_or(false);

            let chosen_type = if type_is_valid { llm_type.clone().unwrap() } else { rule.exception_type.clone() };
            if !type_is_valid {
                if let Some(t) = &llm_type {
                    evidence.push(format!("LLM proposed unrecognized exception type '{t}'; falling back to rule-based type"));
                }
            }

            let type_agrees = llm_type.as_deref() == Some(chosen_type.as_str());
            let severity_agrees = llm_severity.map(|s| s == rule.severity).unwrap_or(true);

            let mut merged_confidence = (rule.confidence + llm_confidence) / 2.0;
            if type_agrees {
                merged_confidence = (merged_confidence * 1.1).min(1.0);
                evidence.push("LLM agreed on exception type: confidence increased".into());
            } else {
                merged_confidence *= DISAGREEMENT_PENALTY;
                evidence.push("LLM disagreed on exception type: confidence decreased".into());
            }
            if !severity_agrees {
                merged_confidence *= DISAGREEMENT_PENALTY;
                evidence.push("LLM disagreed on severity: confidence decreased".into());
            }

            let chosen_severity = llm_severity.unwrap_or(rule.severity);

            if outcome.used_fallback {
                evidence.push("LLM unavailable; used rule-based result".into());
            }

            (chosen_type, chosen_severity, merged_confidence)
        }
    };

    let mut decision = AgentDecision::new(exception_type.clone(), confidence, "ProceedToPolicy").with_evidence(evidence);
    let mut metadata = DynValue::object();
    metadata.set("exception_type", DynValue::String(exception_type.clone()));
    metadata.set("severity", DynValue::String(format!("{severity:?}").to_uppercase()));
    decision.metadata = metadata;

    emit_stage_audit(deps.audit, "triage", input.exception, &decision).await;

    TriageOutcome { decision, exception_type, severity }
}

fn domain_pack_has_or_empty(domain_pack: &DomainPack, candidate: &str) -> bool {
    domain_pack.exception_type(candidate).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::RecordingAuditSink;
    use crate::llm::CircuitBreakerRegistry;
    use crate::ports::{GatewayError, GenerateRaw, GenerateResult, LlmGateway};
    use async_trait::async_trait;
    use exception_platform_domain::pack::ExceptionTypeDefinition;
    use exception_platform_domain::Guardrails;
    use std::collections::BTreeMap;

    fn domain_pack() -> DomainPack {
        let mut types = BTreeMap::new();
        types.insert(
            "SETTLEMENT_FAIL".to_string(),
            ExceptionTypeDefinition {
                description: "settlement failure".into(),
                detection_rules: vec![],
                severity_condition_rules: vec![],
                parent_type: None,
            },
        );
        DomainPack {
            domain_name: "Finance".into(),
            version: "1".into(),
            exception_types: types,
            tools: BTreeMap::new(),
            playbooks: vec![],
            guardrails: Guardrails::default(),
        }
    }

    fn exception() -> ExceptionRecord {
        let mut payload = DynValue::object();
        payload.set("exceptionType", DynValue::String("SETTLEMENT_FAIL".into()));
        payload.set("severity", DynValue::String("HIGH".into()));
        ExceptionRecord::new("EX-001", "TENANT_A", "src", "Finance", chrono::Utc::now(), payload)
    }

    #[tokio::test]
    async fn rule_only_classifies_from_declared_payload_fields() {
        let pack = domain_pack();
        let exception = exception();
        let audit = RecordingAuditSink::default();
        let breaker = CircuitBreakerRegistry::default();
        let deps = StageDeps { llm: None, breaker: &breaker, retry: Default::default(), audit: &audit };

        let outcome = process(
            TriageInput { exception: &exception, domain_pack: &pack, similar_cases: &[] },
            &deps,
        )
        .await;

        assert_eq!(outcome.exception_type, "SETTLEMENT_FAIL");
        assert_eq!(outcome.severity, Severity::High);
        assert_eq!(audit.events.lock().unwrap().len(), 1);
    }

    struct AgreeingClient;
    #[async_trait]
    impl LlmGateway for AgreeingClient {
        async fn generate(&self, _prompt: &str, _context: &DynValue, _schema_name: &str) -> Result<GenerateResult, GatewayError> {
            Ok(GenerateResult {
                text: r#"{"exception_type": "SETTLEMENT_FAIL", "severity": "HIGH", "confidence": 0.95}"#.to_string(),
                raw: GenerateRaw::default(),
            })
        }
        fn provider_name(&self) -> &str {
            "dummy"
        }
        fn model_name(&self) -> &str {
            "m"
        }
    }

    #[tokio::test]
    async fn llm_agreement_increases_confidence() {
        let pack = domain_pack();
        let exception = exception();
        let audit = RecordingAuditSink::default();
        let breaker = CircuitBreakerRegistry::default();
        let client = AgreeingClient;
        let deps = StageDeps { llm: Some(&client), breaker: &breaker, retry: Default::default(), audit: &audit };

        let outcome = process(
            TriageInput { exception: &exception, domain_pack: &pack, similar_cases: &[] },
            &deps,
        )
        .await;

        assert_eq!(outcome.exception_type, "SETTLEMENT_FAIL");
        assert!(outcome.decision.confidence > 0.6);
    }

    struct DisagreeingClient;
    #[async_trait]
    impl LlmGateway for DisagreeingClient {
        async fn generate(&self, _prompt: &str, _context: &DynValue, _schema_name: &str) -> Result<GenerateResult, GatewayError> {
            Ok(GenerateResult {
                text: r#"{"exception_type": "WorkflowFailure", "severity": "LOW", "confidence": 0.8}"#.to_string(),
                raw: GenerateRaw::default(),
            })
        }
        fn provider_name(&self) -> &str {
            "dummy"
        }
        fn model_name(&self) -> &str {
            "m"
        }
    }

    #[tokio::test]
    async fn unrecognized_llm_type_falls_back_to_rule_based_type_with_lower_confidence() {
        let pack = domain_pack();
        let exception = exception();
        let audit = RecordingAuditSink::default();
        let breaker = CircuitBreakerRegistry::default();
        let client = DisagreeingClient;
        let deps = StageDeps { llm: Some(&client), breaker: &breaker, retry: Default::default(), audit: &audit };

        let outcome = process(
            TriageInput { exception: &exception, domain_pack: &pack, similar_cases: &[] },
            &deps,
        )
        .await;

        assert_eq!(outcome.exception_type, "SETTLEMENT_FAIL");
        assert!(outcome.decision.confidence < 0.6);
        assert!(outcome
            .decision
            .evidence
            .iter()
            .any(|e| e.contains("unrecognized exception type")));
    }
}
