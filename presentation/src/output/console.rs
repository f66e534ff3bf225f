//! Console output formatter for a completed exception-processing run.

use super::formatter::{OutputFormatter, RunReport};
use colored::Colorize;
use exception_platform_application::agents::supervisor::SupervisorVerdict;
use exception_platform_domain::AgentDecision;
use serde_json::json;

/// Formats a [`RunReport`] for terminal display.
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn format(report: &RunReport<'_>) -> String {
        let mut out = String::new();
        let exception = report.exception;
        let result = report.result;

        out.push_str(&Self::header("Exception Processing Result"));
        out.push('\n');

        out.push_str(&format!(
            "{} {}   {} {}   {} {}\n\n",
            "Exception:".cyan().bold(),
            exception.exception_id.as_str(),
            "Tenant:".cyan().bold(),
            exception.tenant_id.as_str(),
            "Domain:".cyan().bold(),
            exception.domain.as_str(),
        ));

        out.push_str(&Self::section_header("Triage"));
        out.push_str(&format!(
            "type={} severity={:?}\n",
            result.triage.exception_type, result.triage.severity
        ));
        out.push_str(&Self::decision(&result.triage.decision));

        if let Some(checkpoint) = &result.post_triage_checkpoint {
            out.push_str(&Self::section_header("Supervisor (post-triage)"));
            out.push_str(&Self::checkpoint(checkpoint.verdict));
            out.push_str(&Self::decision(&checkpoint.decision));
        }

        if let Some(policy) = &result.policy {
            out.push_str(&Self::section_header("Policy"));
            out.push_str(&format!(
                "decision={:?} actionability={:?}\n",
                policy.policy_decision, policy.actionability
            ));
            out.push_str(&Self::decision(&policy.decision));
        }

        if let Some(checkpoint) = &result.post_policy_checkpoint {
            out.push_str(&Self::section_header("Supervisor (post-policy)"));
            out.push_str(&Self::checkpoint(checkpoint.verdict));
            out.push_str(&Self::decision(&checkpoint.decision));
        }

        if let Some(resolution) = &result.resolution {
            out.push_str(&Self::section_header("Resolution"));
            if let Some(plan) = &resolution.resolved_plan {
                out.push_str(&format!("resolved plan for {} ({} step(s)):\n", plan.exception_type, plan.steps.len()));
                for (i, step) in plan.steps.iter().enumerate() {
                    out.push_str(&format!("  {}. {}\n", i + 1, step.action));
                }
            } else if let Some(draft) = &resolution.suggested_draft {
                out.push_str(&format!(
                    "draft suggestion for {} ({} step(s), approved={})\n",
                    draft.exception_type,
                    draft.steps.len(),
                    draft.approved
                ));
            } else {
                out.push_str("no plan: informational only\n");
            }
            out.push_str(&Self::decision(&resolution.decision));
        }

        if let Some(checkpoint) = &result.post_resolution_checkpoint {
            out.push_str(&Self::section_header("Supervisor (post-resolution)"));
            out.push_str(&Self::checkpoint(checkpoint.verdict));
            out.push_str(&Self::decision(&checkpoint.decision));
        }

        if let Some(feedback) = &result.feedback {
            out.push_str(&Self::section_header("Feedback"));
            out.push_str(&format!(
                "observations: total={} false_positive={} false_negative={}\n",
                feedback.counts.total, feedback.counts.false_positive, feedback.counts.false_negative
            ));
            if let Some(rec) = &feedback.recommendation {
                out.push_str(&format!(
                    "{} {:?} — {}\n",
                    "recommendation:".yellow().bold(),
                    rec.kind,
                    rec.rationale
                ));
            }
            out.push_str(&Self::decision(&feedback.decision));
        }

        out.push_str(&format!("\n{} {:?}\n", "Final status:".green().bold(), exception.status));
        out.push_str(&Self::footer());
        out
    }

    pub fn format_json(report: &RunReport<'_>) -> String {
        let result = report.result;
        let checkpoint_json = |c: &exception_platform_application::agents::supervisor::SupervisorOutcome| {
            json!({ "verdict": format!("{:?}", c.verdict), "decision": Self::decision_json(&c.decision) })
        };

        let value = json!({
            "exception_id": report.exception.exception_id.as_str(),
            "tenant_id": report.exception.tenant_id.as_str(),
            "domain": report.exception.domain.as_str(),
            "final_status": format!("{:?}", report.exception.status),
            "triage": {
                "exception_type": result.triage.exception_type,
                "severity": format!("{:?}", result.triage.severity),
                "decision": Self::decision_json(&result.triage.decision),
            },
            "post_triage_checkpoint": result.post_triage_checkpoint.as_ref().map(checkpoint_json),
            "policy": result.policy.as_ref().map(|p| json!({
                "policy_decision": format!("{:?}", p.policy_decision),
                "actionability": format!("{:?}", p.actionability),
                "decision": Self::decision_json(&p.decision),
            })),
            "post_policy_checkpoint": result.post_policy_checkpoint.as_ref().map(checkpoint_json),
            "resolution": result.resolution.as_ref().map(|r| json!({
                "resolved_plan_steps": r.resolved_plan.as_ref().map(|p| p.steps.len()),
                "suggested_draft": r.suggested_draft.is_some(),
                "decision": Self::decision_json(&r.decision),
            })),
            "post_resolution_checkpoint": result.post_resolution_checkpoint.as_ref().map(checkpoint_json),
            "feedback": result.feedback.as_ref().map(|f| json!({
                "total_observations": f.counts.total,
                "false_positive": f.counts.false_positive,
                "false_negative": f.counts.false_negative,
                "recommendation": f.recommendation.as_ref().map(|r| format!("{:?}: {}", r.kind, r.rationale)),
                "decision": Self::decision_json(&f.decision),
            })),
        });

        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn format_synthesis_only(report: &RunReport<'_>) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n\n", "=== Exception Processing Summary ===".cyan().bold()));
        out.push_str(&format!(
            "{} {} ({})\n",
            "Exception:".bold(),
            report.exception.exception_id.as_str(),
            report.exception.tenant_id.as_str()
        ));
        out.push_str(&format!(
            "{} {}\n",
            "Classified as:".dimmed(),
            report.result.triage.exception_type
        ));
        out.push_str(&format!("{} {:?}\n", "Final status:".green().bold(), report.exception.status));
        out
    }

    fn decision(decision: &AgentDecision) -> String {
        let mut out = format!(
            "  {} {} (confidence {:.2}, next={})\n",
            "->".dimmed(),
            decision.decision,
            decision.confidence,
            decision.next_step
        );
        for line in &decision.evidence {
            out.push_str(&format!("     {} {}\n", "-".dimmed(), line));
        }
        out
    }

    fn decision_json(decision: &AgentDecision) -> serde_json::Value {
        json!({
            "decision": decision.decision,
            "confidence": decision.confidence,
            "next_step": decision.next_step,
            "evidence": decision.evidence,
        })
    }

    fn checkpoint(verdict: SupervisorVerdict) -> String {
        let label = format!("{verdict:?}");
        let colored = match verdict {
            SupervisorVerdict::ApprovedFlow => label.green().bold(),
            SupervisorVerdict::Intervened => label.yellow().bold(),
            SupervisorVerdict::Escalated => label.red().bold(),
        };
        format!("verdict: {colored}\n")
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, report: &RunReport<'_>) -> String {
        Self::format(report)
    }

    fn format_json(&self, report: &RunReport<'_>) -> String {
        Self::format_json(report)
    }

    fn format_synthesis_only(&self, report: &RunReport<'_>) -> String {
        Self::format_synthesis_only(report)
    }
}
