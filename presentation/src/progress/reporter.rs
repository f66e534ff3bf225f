//! Stage-by-stage progress narration.
//!
//! The orchestrator runs synchronously and returns one completed
//! [`RunReport`] rather than streaming per-stage events, so there is no
//! live callback to animate a progress bar against (see DESIGN.md on the
//! `indicatif` drop). [`SimpleProgress`] narrates the stages a completed
//! run reached, one line at a time, the way the upstream `SimpleProgress`
//! narrates completed tasks without a fancy terminal UI.

use crate::output::formatter::RunReport;
use colored::Colorize;

/// Narrates the stages of a pipeline run.
pub trait StageProgress {
    fn on_stage_start(&self, stage: &str);
    fn on_stage_complete(&self, stage: &str, summary: &str);
    fn on_run_complete(&self, final_status: &str);
}

/// Plain `println!`-based narrator; no terminal UI dependency.
pub struct SimpleProgress;

impl StageProgress for SimpleProgress {
    fn on_stage_start(&self, stage: &str) {
        println!("{} {}", "->".cyan(), stage.bold());
    }

    fn on_stage_complete(&self, stage: &str, summary: &str) {
        println!("  {} {}: {}", "v".green(), stage, summary);
    }

    fn on_run_complete(&self, final_status: &str) {
        println!("{} {}\n", "done:".green().bold(), final_status);
    }
}

/// Walks a completed [`RunReport`] and narrates every stage it reached,
/// in pipeline order, through `progress`.
pub fn narrate(report: &RunReport<'_>, progress: &dyn StageProgress) {
    let result = report.result;

    progress.on_stage_start("Triage");
    progress.on_stage_complete("Triage", &format!("{} / {:?}", result.triage.exception_type, result.triage.severity));

    if let Some(checkpoint) = &result.post_triage_checkpoint {
        progress.on_stage_start("Supervisor (post-triage)");
        progress.on_stage_complete("Supervisor (post-triage)", &format!("{:?}", checkpoint.verdict));
    }

    if let Some(policy) = &result.policy {
        progress.on_stage_start("Policy");
        progress.on_stage_complete("Policy", &format!("{:?}", policy.policy_decision));
    }

    if let Some(checkpoint) = &result.post_policy_checkpoint {
        progress.on_stage_start("Supervisor (post-policy)");
        progress.on_stage_complete("Supervisor (post-policy)", &format!("{:?}", checkpoint.verdict));
    }

    if let Some(resolution) = &result.resolution {
        progress.on_stage_start("Resolution");
        let summary = if resolution.resolved_plan.is_some() {
            "plan resolved"
        } else if resolution.suggested_draft.is_some() {
            "draft suggested"
        } else {
            "no plan"
        };
        progress.on_stage_complete("Resolution", summary);
    }

    if let Some(checkpoint) = &result.post_resolution_checkpoint {
        progress.on_stage_start("Supervisor (post-resolution)");
        progress.on_stage_complete("Supervisor (post-resolution)", &format!("{:?}", checkpoint.verdict));
    }

    if let Some(feedback) = &result.feedback {
        progress.on_stage_start("Feedback");
        progress.on_stage_complete("Feedback", &format!("{} observations recorded", feedback.counts.total));
    }

    progress.on_run_complete(&format!("{:?}", report.exception.status));
}
