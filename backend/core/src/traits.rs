use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{DeliveryError, Result};
use crate::types::{
    CommitOutcome, DeliveryAttempt, Lead, LeadStatus, NewLead, RenderedMessage, UpsertOutcome,
};

/// Outbound transport for rendered outreach messages.
///
/// Implementations hold no campaign state. Any failure must be classified as
/// transient or permanent; the scheduler never inspects the reason beyond that.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    /// Human-readable gateway name for logging.
    fn name(&self) -> &str;

    /// Attempt to deliver `message` to `recipient`.
    async fn send(&self, recipient: &str, message: &RenderedMessage)
        -> std::result::Result<(), DeliveryError>;
}

/// Durable lead table and the authoritative campaign progress fields.
///
/// Every progress mutation is a compare-and-swap on `(current_step, status)`:
/// it only applies while the stored step equals `expected_current_step` and the
/// lead is still `new` or `in_progress`. This is the sole coordination point
/// between concurrent scheduling passes.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert a discovered lead with `status = new` and `current_step = 0`.
    async fn upsert_new_lead(&self, lead: NewLead) -> Result<UpsertOutcome>;

    /// Leads whose status is `new` or `in_progress`. The store may pre-filter on
    /// `last_step_at <= now`; callers re-validate due-ness themselves.
    async fn load_due_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Lead>>;

    /// Advance a lead by exactly one step after a confirmed delivery.
    async fn commit_step_advance(
        &self,
        lead_id: &str,
        expected_current_step: u32,
        new_step: u32,
        new_status: LeadStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<CommitOutcome>;

    /// Mark a lead failed, leaving its step unchanged.
    async fn mark_failed(
        &self,
        lead_id: &str,
        expected_current_step: u32,
        error: &str,
    ) -> Result<CommitOutcome>;

    /// Mark a lead completed once it is past the last catalog step.
    async fn mark_completed(&self, lead_id: &str, expected_current_step: u32)
        -> Result<CommitOutcome>;

    async fn get(&self, lead_id: &str) -> Result<Option<Lead>>;

    /// Append a delivery attempt to the audit trail. Stores without one ignore it.
    async fn record_attempt(&self, _attempt: &DeliveryAttempt) -> Result<()> {
        Ok(())
    }
}
