//! `PlaybookWorker`: the representative worker mesh consumer.
//! Consumes `PlaybookMatched`, selects the matched playbook, emits one
//! `StepExecutionRequested` for the current step; consumes
//! `StepExecutionCompleted`, advances `current_step`, and either emits
//! the next request or concludes. Backpressure is a per-worker
//! `tokio::sync::Semaphore`; shutdown is cooperative via
//! `tokio_util::sync::CancellationToken`.

use crate::mesh::InMemoryIdempotencyStore;
use exception_platform_application::playbooks::select_playbook;
use exception_platform_application::ports::{EventBus, ExceptionRepository, IdempotencyStore, PackRepository};
use exception_platform_domain::{CanonicalEvent, DynValue, EventId, EventType};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

pub const CONSUMER_GROUP: &str = "playbook_worker";
pub const TOPIC_PLAYBOOK_MATCHED: &str = "playbook_matched";
pub const TOPIC_STEP_REQUESTED: &str = "step_execution_requested";
pub const TOPIC_STEP_COMPLETED: &str = "step_execution_completed";

pub struct PlaybookWorker {
    event_bus: Arc<dyn EventBus>,
    idempotency: Arc<dyn IdempotencyStore>,
    repository: Arc<dyn ExceptionRepository>,
    packs: Arc<dyn PackRepository>,
    concurrency: Arc<Semaphore>,
}

impl PlaybookWorker {
    pub fn new(
        event_bus: Arc<dyn EventBus>,
        repository: Arc<dyn ExceptionRepository>,
        packs: Arc<dyn PackRepository>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            event_bus,
            idempotency: Arc::new(InMemoryIdempotencyStore::new()),
            repository,
            packs,
            concurrency: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Drives both subscriptions until `cancel` fires. Each delivery
    /// acquires a semaphore permit before doing any work, bounding how
    /// many steps this worker drives concurrently.
    pub async fn run(
        self: Arc<Self>,
        mut matched_rx: mpsc::UnboundedReceiver<CanonicalEvent>,
        mut completed_rx: mpsc::UnboundedReceiver<CanonicalEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("playbook worker shutting down");
                    return;
                }
                Some(event) = matched_rx.recv() => {
                    let worker = self.clone();
                    let permit = worker.concurrency.clone().acquire_owned().await.expect("semaphore never closed");
                    tokio::spawn(async move {
                        let _permit = permit;
                        worker.handle_playbook_matched(event).await;
                    });
                }
                Some(event) = completed_rx.recv() => {
                    let worker = self.clone();
                    let permit = worker.concurrency.clone().acquire_owned().await.expect("semaphore never closed");
                    tokio::spawn(async move {
                        let _permit = permit;
                        worker.handle_step_completed(event).await;
                    });
                }
                else => return,
            }
        }
    }

    async fn handle_playbook_matched(&self, event: CanonicalEvent) {
        if self.idempotency.begin(event.event_id.as_str(), CONSUMER_GROUP).is_err() {
            return;
        }

        let Ok(exception) = self.repository.get(&event.tenant_id, &event.correlation_id).await else {
            self.idempotency.fail(event.event_id.as_str(), CONSUMER_GROUP, "exception record not found");
            return;
        };

        let Some(domain_pack) = self.packs.get_active_domain_pack(&exception.domain) else {
            self.idempotency.fail(event.event_id.as_str(), CONSUMER_GROUP, "no active domain pack");
            return;
        };
        let Some(tenant_policy) = self.packs.get_active_tenant_policy(&exception.tenant_id, &exception.domain) else {
            self.idempotency.fail(event.event_id.as_str(), CONSUMER_GROUP, "no active tenant policy");
            return;
        };

        let Some(exception_type) = exception.exception_type.as_deref() else {
            self.idempotency.fail(event.event_id.as_str(), CONSUMER_GROUP, "exception has no classified type");
            return;
        };

        let Some(playbook) = select_playbook(exception_type, &tenant_policy, &domain_pack) else {
            tracing::debug!(exception_id = %exception.exception_id, "no selectable playbook; nothing to dispatch");
            self.idempotency.complete(event.event_id.as_str(), CONSUMER_GROUP);
            return;
        };

        self.dispatch_step(&event, exception.current_step, &playbook.steps).await;
        self.idempotency.complete(event.event_id.as_str(), CONSUMER_GROUP);
    }

    async fn handle_step_completed(&self, event: CanonicalEvent) {
        if self.idempotency.begin(event.event_id.as_str(), CONSUMER_GROUP).is_err() {
            return;
        }

        let Ok(mut exception) = self.repository.get(&event.tenant_id, &event.correlation_id).await else {
            self.idempotency.fail(event.event_id.as_str(), CONSUMER_GROUP, "exception record not found");
            return;
        };

        exception.advance_step();
        let next_step = exception.current_step;

        if self.repository.save(&exception).await.is_err() {
            self.idempotency.fail(event.event_id.as_str(), CONSUMER_GROUP, "failed to persist advanced step");
            return;
        }

        let domain_pack = self.packs.get_active_domain_pack(&exception.domain);
        let tenant_policy = self.packs.get_active_tenant_policy(&exception.tenant_id, &exception.domain);
        if let (Some(domain_pack), Some(tenant_policy), Some(exception_type)) =
            (domain_pack, tenant_policy, exception.exception_type.as_deref())
        {
            if let Some(playbook) = select_playbook(exception_type, &tenant_policy, &domain_pack) {
                self.dispatch_step(&event, next_step, &playbook.steps).await;
            }
        }

        self.idempotency.complete(event.event_id.as_str(), CONSUMER_GROUP);
    }

    async fn dispatch_step(&self, origin: &CanonicalEvent, step_index: u32, steps: &[exception_platform_domain::PlaybookStep]) {
        let Some(step) = steps.get(step_index as usize) else {
            tracing::debug!(step_index, "playbook exhausted; no further step to dispatch");
            return;
        };

        let mut payload = DynValue::object();
        payload.set("step_index", DynValue::Number(step_index as f64));
        payload.set("action", DynValue::String(step.action.clone()));
        if let Some(params) = &step.parameters {
            payload.set("parameters", params.clone());
        }

        let event = CanonicalEvent::new(
            EventId::from(format!("{}-step-{}", origin.correlation_id.as_str(), step_index)),
            EventType::StepExecutionRequested,
            origin.tenant_id.clone(),
            origin.correlation_id.clone(),
            chrono::Utc::now(),
            payload,
        );

        if let Err(err) = self.event_bus.publish(TOPIC_STEP_REQUESTED, event).await {
            tracing::warn!(error = %err, "failed to publish step execution request");
        }
    }
}
