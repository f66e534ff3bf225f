//! Application layer for the exception-processing platform.
//!
//! Use cases, ports, and pure domain-rule logic (playbook matching, the
//! execution engine, the LLM routing fabric's retry/breaker/schema layer,
//! and the five agent stages). Programs against `domain` types and its own
//! ports only — no dependency on concrete infrastructure adapters.

pub mod agents;
pub mod execution;
pub mod llm;
pub mod orchestrator;
pub mod playbooks;
pub mod ports;

pub use agents::{StageDeps, DISAGREEMENT_PENALTY};
pub use orchestrator::{run as run_pipeline, CaseOutcomeEvaluation, OrchestratorDeps, OrchestratorResult};
