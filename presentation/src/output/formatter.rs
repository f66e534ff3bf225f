//! Output formatter trait.

use exception_platform_application::orchestrator::OrchestratorResult;
use exception_platform_domain::ExceptionRecord;

/// A completed orchestrator run, paired with the exception it was run
/// against — everything a formatter needs to render one end-to-end
/// result.
pub struct RunReport<'a> {
    pub exception: &'a ExceptionRecord,
    pub result: &'a OrchestratorResult,
}

/// Trait for formatting a completed pipeline run.
pub trait OutputFormatter {
    /// Format every stage the run reached.
    fn format(&self, report: &RunReport<'_>) -> String;

    /// Format as JSON.
    fn format_json(&self, report: &RunReport<'_>) -> String;

    /// Format the final status and verdict only (concise output).
    fn format_synthesis_only(&self, report: &RunReport<'_>) -> String;
}
