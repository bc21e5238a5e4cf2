//! Level-triggered campaign scheduler.
//!
//! Nothing is cached between passes. Each pass loads the active leads,
//! decides due-ness from the persisted `last_step_at` and the catalog delay,
//! sends at most one step per lead and commits the advance with a
//! compare-and-swap. A lost swap means another pass got there first.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use dripforge_core::{
    AttemptOutcome, CommitOutcome, DeliveryAttempt, DeliveryError, DeliveryGateway, DripError,
    Lead, LeadStatus, LeadStore, OutreachStep, RenderedMessage, Result,
};
use dripforge_logging::redact_sensitive_data;

use crate::catalog::StepCatalog;
use crate::retry::RetryPolicy;
use crate::template::TemplateRenderer;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Summary of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Leads the pass looked at (cancelled leads excluded).
    pub evaluated: usize,
    /// Successful sends whose step advance was committed.
    pub advanced: usize,
    /// Leads that reached `completed` during this pass.
    pub completed: usize,
    pub failed: usize,
    pub not_due: usize,
    /// Compare-and-swap updates lost to a concurrent pass.
    pub conflicts: usize,
    pub skipped_no_contact: usize,
    pub errors: usize,
    pub cancelled: usize,
}

impl PassReport {
    fn record(&mut self, outcome: LeadOutcome) {
        if outcome != LeadOutcome::Cancelled {
            self.evaluated += 1;
        }
        match outcome {
            LeadOutcome::Advanced { completed } => {
                self.advanced += 1;
                if completed {
                    self.completed += 1;
                }
            }
            LeadOutcome::Completed => self.completed += 1,
            LeadOutcome::Failed => self.failed += 1,
            LeadOutcome::NotDue => self.not_due += 1,
            LeadOutcome::Conflict => self.conflicts += 1,
            LeadOutcome::SkippedNoContact => self.skipped_no_contact += 1,
            LeadOutcome::Error => self.errors += 1,
            LeadOutcome::Cancelled => self.cancelled += 1,
            LeadOutcome::Inactive => {}
        }
    }

    /// Whether the pass changed any lead.
    pub fn changed_anything(&self) -> bool {
        self.advanced + self.completed + self.failed > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeadOutcome {
    Advanced { completed: bool },
    Completed,
    Failed,
    NotDue,
    Conflict,
    SkippedNoContact,
    Error,
    Cancelled,
    Inactive,
}

/// Whether `step` may be sent to `lead` at `now`.
///
/// The first step, and any lead that has never been contacted, is due
/// immediately. Otherwise the step is due once its delay has elapsed since
/// `last_step_at`.
pub fn is_due(lead: &Lead, step: &OutreachStep, now: DateTime<Utc>) -> bool {
    if step.index == 0 {
        return true;
    }
    let Some(last) = lead.last_step_at else {
        return true;
    };
    chrono::Duration::from_std(step.min_delay_since_previous)
        .ok()
        .and_then(|delay| last.checked_add_signed(delay))
        .map(|due_at| now >= due_at)
        .unwrap_or(false)
}

pub struct CampaignScheduler {
    store: Arc<dyn LeadStore>,
    gateway: Arc<dyn DeliveryGateway>,
    catalog: StepCatalog,
    renderer: TemplateRenderer,
    retry: RetryPolicy,
    concurrency: usize,
    shutdown: Option<watch::Receiver<bool>>,
}

impl CampaignScheduler {
    /// Build a scheduler. Every template the catalog names is read here, so
    /// a missing or unreadable template stops the campaign before any lead
    /// is touched.
    pub fn new(
        store: Arc<dyn LeadStore>,
        gateway: Arc<dyn DeliveryGateway>,
        catalog: StepCatalog,
        mut renderer: TemplateRenderer,
    ) -> Result<Self> {
        renderer
            .preload(catalog.ordered_steps().iter().map(|s| s.template_id.as_str()))
            .map_err(|e| DripError::Template(e.to_string()))?;
        Ok(Self {
            store,
            gateway,
            catalog,
            renderer,
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            shutdown: None,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Maximum number of leads processed at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stop starting new leads once the receiver reads `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    /// Send `step` to one lead outside the campaign. The lead's step, status
    /// and timestamps are left alone and no attempt is recorded.
    pub async fn send_single(&self, lead_id: &str, step: u32) -> Result<RenderedMessage> {
        let lead = self
            .store
            .get(lead_id)
            .await?
            .ok_or_else(|| DripError::NotFound(lead_id.to_string()))?;
        let Some(recipient) = lead.email.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Err(DripError::InvalidTransition {
                lead_id: lead.id.clone(),
                message: format!("{} has no email address", lead.company_name),
            });
        };
        let outreach = self.catalog.step_at(step).ok_or_else(|| {
            DripError::Config(format!(
                "step {step} is outside the catalog ({} steps)",
                self.catalog.len()
            ))
        })?;
        let message = self
            .renderer
            .render(&outreach.template_id, &lead, outreach.index)
            .map_err(|e| DripError::Template(e.to_string()))?;

        self.gateway
            .send(recipient, &message)
            .await
            .map_err(|e| DripError::Delivery(redact_sensitive_data(&e.to_string())))?;
        info!(lead_id = %lead.id, step, gateway = self.gateway.name(), "Single step sent");
        Ok(message)
    }

    pub async fn run_pass(&self) -> Result<PassReport> {
        self.run_pass_at(Utc::now()).await
    }

    /// Run one pass treating `now` as the current time. `now` is also the
    /// `last_step_at` written for every step sent in this pass.
    pub async fn run_pass_at(&self, now: DateTime<Utc>) -> Result<PassReport> {
        self.pass(now, self.shutdown.as_ref()).await
    }

    /// Run passes every `interval` until `shutdown` reads `true`.
    ///
    /// A pass that fails to load its leads is logged and retried on the next
    /// tick. Returns the number of passes that completed.
    pub async fn run_periodic(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        info!(
            interval_secs = interval.as_secs_f64(),
            gateway = self.gateway.name(),
            steps = self.catalog.len(),
            "Campaign watch started"
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut passes = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    match self.pass(Utc::now(), Some(&shutdown)).await {
                        Ok(report) => {
                            passes += 1;
                            if report.changed_anything() {
                                info!(?report, "Campaign pass finished");
                            } else {
                                debug!(?report, "Campaign pass finished with no changes");
                            }
                        }
                        Err(e) => error!(error = %e, "Campaign pass failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(passes, "Campaign watch stopped");
        passes
    }

    async fn pass(
        &self,
        now: DateTime<Utc>,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<PassReport> {
        let leads = self.store.load_due_candidates(now).await?;
        debug!(candidates = leads.len(), now = %now, "Campaign pass started");

        let outcomes: Vec<LeadOutcome> = stream::iter(leads)
            .map(|lead| async move {
                if shutdown.map(|rx| *rx.borrow()).unwrap_or(false) {
                    return LeadOutcome::Cancelled;
                }
                self.process_lead(lead, now).await
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = PassReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        if report.cancelled > 0 {
            info!(cancelled = report.cancelled, "Campaign pass cancelled before all leads ran");
        }
        Ok(report)
    }

    async fn process_lead(&self, lead: Lead, now: DateTime<Utc>) -> LeadOutcome {
        match self.try_process_lead(&lead, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(lead_id = %lead.id, step = lead.current_step, error = %e, "Lead processing failed");
                LeadOutcome::Error
            }
        }
    }

    async fn try_process_lead(&self, lead: &Lead, now: DateTime<Utc>) -> Result<LeadOutcome> {
        if lead.status.is_terminal() {
            return Ok(LeadOutcome::Inactive);
        }

        let Some(step) = self.catalog.step_at(lead.current_step) else {
            return match self.store.mark_completed(&lead.id, lead.current_step).await? {
                CommitOutcome::Committed => {
                    info!(lead_id = %lead.id, step = lead.current_step, "Catalog exhausted, lead completed");
                    Ok(LeadOutcome::Completed)
                }
                CommitOutcome::Conflict { .. } => Ok(LeadOutcome::Conflict),
            };
        };

        if !is_due(lead, step, now) {
            return Ok(LeadOutcome::NotDue);
        }

        let Some(recipient) = lead.email.as_deref().filter(|e| !e.trim().is_empty()) else {
            debug!(lead_id = %lead.id, company = %lead.company_name, "No contact email, skipping");
            return Ok(LeadOutcome::SkippedNoContact);
        };

        // Templates were checked at build; a render error here leaves the lead unchanged.
        let message = match self.renderer.render(&step.template_id, lead, step.index) {
            Ok(message) => message,
            Err(e) => {
                error!(lead_id = %lead.id, step = step.index, error = %e, "Template unavailable");
                return Ok(LeadOutcome::Error);
            }
        };

        let mut attempt = 0;
        let last_error = loop {
            attempt += 1;
            let result = self.gateway.send(recipient, &message).await;
            self.record_attempt(lead, step, attempt, &message, &result).await;

            match result {
                Ok(()) => return self.commit_success(lead, step, now).await,
                Err(e) if e.is_permanent() => {
                    warn!(lead_id = %lead.id, step = step.index, attempt, error = %redact_sensitive_data(&e.to_string()), "Permanent delivery failure");
                    break e;
                }
                Err(e) => {
                    if !self.retry.should_retry(attempt) {
                        warn!(lead_id = %lead.id, step = step.index, attempt, error = %redact_sensitive_data(&e.to_string()), "Delivery retries exhausted");
                        break e;
                    }
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        lead_id = %lead.id,
                        step = step.index,
                        attempt,
                        max = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %redact_sensitive_data(&e.to_string()),
                        "Delivery failed, will retry"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        };

        self.fail(lead, &last_error.to_string()).await
    }

    async fn commit_success(
        &self,
        lead: &Lead,
        step: &OutreachStep,
        now: DateTime<Utc>,
    ) -> Result<LeadOutcome> {
        let last = self.catalog.is_final(step.index);
        let new_status = if last {
            LeadStatus::Completed
        } else {
            LeadStatus::InProgress
        };

        match self
            .store
            .commit_step_advance(&lead.id, lead.current_step, lead.current_step + 1, new_status, now)
            .await?
        {
            CommitOutcome::Committed => {
                info!(
                    lead_id = %lead.id,
                    step = step.index,
                    status = %new_status,
                    gateway = self.gateway.name(),
                    "Step delivered"
                );
                Ok(LeadOutcome::Advanced { completed: last })
            }
            CommitOutcome::Conflict {
                actual_step,
                actual_status,
            } => {
                // The message has gone out but another pass owns this step.
                warn!(
                    lead_id = %lead.id,
                    step = step.index,
                    actual_step,
                    actual_status = %actual_status,
                    "Step advance lost to a concurrent update"
                );
                Ok(LeadOutcome::Conflict)
            }
        }
    }

    async fn fail(&self, lead: &Lead, error: &str) -> Result<LeadOutcome> {
        let error = redact_sensitive_data(error);
        match self.store.mark_failed(&lead.id, lead.current_step, &error).await? {
            CommitOutcome::Committed => {
                warn!(lead_id = %lead.id, step = lead.current_step, error = %error, "Lead marked failed");
                Ok(LeadOutcome::Failed)
            }
            CommitOutcome::Conflict { .. } => Ok(LeadOutcome::Conflict),
        }
    }

    async fn record_attempt(
        &self,
        lead: &Lead,
        step: &OutreachStep,
        attempt_no: u32,
        message: &RenderedMessage,
        result: &std::result::Result<(), DeliveryError>,
    ) {
        let attempt = DeliveryAttempt {
            lead_id: lead.id.clone(),
            step_index: step.index,
            attempt_no,
            sent_at: Utc::now(),
            outcome: if result.is_ok() {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::Failure
            },
            subject: Some(message.subject.clone()),
            error_detail: result
                .as_ref()
                .err()
                .map(|e| redact_sensitive_data(&e.to_string())),
        };
        if let Err(e) = self.store.record_attempt(&attempt).await {
            warn!(lead_id = %lead.id, step = step.index, attempt = attempt_no, error = %e, "Failed to record delivery attempt");
        }
    }
}
