//! The structured decision value object emitted by every agent stage
//!.

use crate::value::DynValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDecision {
    pub decision: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub next_step: String,
    pub metadata: DynValue,
}

impl AgentDecision {
    pub fn new(decision: impl Into<String>, confidence: f64, next_step: impl Into<String>) -> Self {
        Self {
            decision: decision.into(),
            confidence: confidence.clamp(0.0, 1.0),
            evidence: Vec::new(),
            next_step: next_step.into(),
            metadata: DynValue::object(),
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_metadata(mut self, metadata: DynValue) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn push_evidence(&mut self, line: impl Into<String>) {
        self.evidence.push(line.into());
    }
}
