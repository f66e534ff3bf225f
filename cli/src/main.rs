//! CLI entrypoint for the exception-processing platform demo harness.
//!
//! Loads a scenario file (one exception, one domain pack, one tenant
//! policy), wires the in-memory adapters behind the application layer's
//! ports, runs the scenario through the orchestrator once, and renders
//! the result through the presentation layer.

use anyhow::{Context, Result};
use clap::Parser;
use exception_platform_application::orchestrator::{run as run_pipeline, CaseOutcomeEvaluation, OrchestratorDeps};
use exception_platform_application::agents::StageDeps;
use exception_platform_application::llm::{CircuitBreakerRegistry, RetryConfig};
use exception_platform_application::ports::{ExceptionRepository, PackRepository};
use exception_platform_domain::{DomainPack, ExceptionRecord, TenantPolicyPack};
use exception_platform_infrastructure::{
    ConfigLoader, DryRunToolExecutor, InMemoryExceptionRepository, InMemoryFeedbackStore, InMemoryPackRegistry,
    JsonlAuditSink, TracingMetricsSink,
};
use exception_platform_infrastructure::llm::ProviderCache;
use exception_platform_presentation::{narrate, Cli, ConsoleFormatter, OutputFormat, OutputFormatter, RunReport, SimpleProgress};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One scenario file: the exception to process plus the domain pack and
/// tenant policy it should be evaluated against.
#[derive(Deserialize)]
struct Scenario {
    exception: ExceptionRecord,
    domain_pack: DomainPack,
    tenant_policy: TenantPolicyPack,
    #[serde(default)]
    outcome_evaluation: Option<ScenarioOutcome>,
}

#[derive(Deserialize)]
struct ScenarioOutcome {
    was_false_positive: bool,
    was_false_negative: bool,
}

impl From<ScenarioOutcome> for CaseOutcomeEvaluation {
    fn from(o: ScenarioOutcome) -> Self {
        CaseOutcomeEvaluation { was_false_positive: o.was_false_positive, was_false_negative: o.was_false_negative }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!("starting exception-processing platform");

    let app_config = ConfigLoader::load(cli.config.as_deref()).context("failed to load application config")?;

    let scenario_bytes = std::fs::read_to_string(&cli.scenario)
        .with_context(|| format!("failed to read scenario file {}", cli.scenario.display()))?;
    let scenario: Scenario =
        serde_json::from_str(&scenario_bytes).with_context(|| format!("failed to parse scenario file {}", cli.scenario.display()))?;

    if !cli.quiet {
        println!();
        println!("+============================================================+");
        println!("|       Exception Processing Platform - Demo Harness         |");
        println!("+============================================================+");
        println!();
    }

    // === Dependency injection ===
    let pack_version = scenario.domain_pack.version.clone();
    let packs = InMemoryPackRegistry::new();
    let report = packs.register_domain_pack(scenario.domain_pack.clone());
    if !report.is_valid() {
        anyhow::bail!("domain pack failed validation: {:?}", report.errors);
    }
    packs.activate_domain_pack(&scenario.domain_pack.domain_name, &pack_version);
    packs.register_tenant_policy(scenario.tenant_policy.clone(), &pack_version);
    packs.activate_tenant_policy(&scenario.tenant_policy.tenant_id, &scenario.tenant_policy.domain_name, &pack_version);

    let repository = InMemoryExceptionRepository::new();
    repository.save(&scenario.exception).await.context("failed to seed exception record")?;

    let feedback_store = InMemoryFeedbackStore::new();
    let tool_executor = DryRunToolExecutor::new();
    let audit = JsonlAuditSink::new(&app_config.audit_log_path).context("failed to open audit log")?;
    let breaker = CircuitBreakerRegistry::default();
    let metrics = Arc::new(TracingMetricsSink);
    let provider_cache = ProviderCache::new(cli.routing_config.clone(), metrics);
    let llm = provider_cache.load(Some(&scenario.exception.tenant_id), Some(&scenario.domain_pack.domain_name), None, None);

    let dry_run = app_config.dry_run_tools && !cli.no_dry_run;

    let deps = OrchestratorDeps {
        stage: StageDeps { llm: Some(llm.as_ref()), breaker: &breaker, retry: RetryConfig::default(), audit: &audit },
        tool_executor: &tool_executor,
        feedback_store: &feedback_store,
        repository: &repository,
        dry_run,
    };

    let mut exception = scenario.exception.clone();
    let outcome_evaluation = scenario.outcome_evaluation.map(CaseOutcomeEvaluation::from);

    let result = run_pipeline(&mut exception, &scenario.domain_pack, &scenario.tenant_policy, &[], outcome_evaluation, &deps).await;

    if !cli.quiet {
        narrate(&RunReport { exception: &exception, result: &result }, &SimpleProgress);
    }

    let formatter = ConsoleFormatter;
    let report = RunReport { exception: &exception, result: &result };
    let output = match cli.output {
        OutputFormat::Full => formatter.format(&report),
        OutputFormat::Synthesis => formatter.format_synthesis_only(&report),
        OutputFormat::Json => formatter.format_json(&report),
    };

    println!("{output}");

    Ok(())
}
