use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned lead id (UUID v4 string).
pub type LeadId = String;

/// Campaign status of a lead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    InProgress,
    Completed,
    Failed,
    OptedOut,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::InProgress,
        LeadStatus::Completed,
        LeadStatus::Failed,
        LeadStatus::OptedOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::OptedOut => "opted_out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Some(Self::New),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "opted_out" => Some(Self::OptedOut),
            _ => None,
        }
    }

    /// Whether the scheduler still considers this lead.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::New | Self::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prospective business contact and its campaign progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: LeadId,
    /// Unique external identifier (e.g. a Places `place_id`).
    pub identity: String,
    pub company_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website_url: Option<String>,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub source: String,
    pub premium_score: u8,
    pub notes: Option<String>,
    pub current_step: u32,
    pub last_step_at: Option<DateTime<Utc>>,
    pub status: LeadStatus,
    pub last_error: Option<String>,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lead data produced by discovery, before the store assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLead {
    pub identity: String,
    pub company_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website_url: Option<String>,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub source: String,
    pub premium_score: u8,
    pub notes: Option<String>,
}

impl NewLead {
    pub fn new(identity: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            company_name: company_name.into(),
            email: None,
            phone: None,
            website_url: None,
            address: None,
            contact_name: None,
            source: "googlemaps".to_string(),
            premium_score: 0,
            notes: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_website(mut self, url: impl Into<String>) -> Self {
        self.website_url = Some(url.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_contact_name(mut self, name: impl Into<String>) -> Self {
        self.contact_name = Some(name.into());
        self
    }
}

/// One entry of the outreach step catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutreachStep {
    /// 0-based position in the catalog.
    pub index: u32,
    /// Minimum elapsed time since the previous step was recorded.
    pub min_delay_since_previous: Duration,
    pub template_id: String,
}

/// A message ready for the delivery gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Audit record of a single dispatch through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryAttempt {
    pub lead_id: LeadId,
    pub step_index: u32,
    /// 1-based attempt number within a scheduling pass.
    pub attempt_no: u32,
    pub sent_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub subject: Option<String>,
    pub error_detail: Option<String>,
}

/// Result of inserting a discovered lead.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Inserted(Lead),
    /// A lead with the same identity or email already exists.
    Conflict { existing_id: LeadId },
    Blacklisted { reason: String },
}

/// Result of a compare-and-swap update on a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The stored step or status no longer matched the caller's expectation.
    Conflict {
        actual_step: u32,
        actual_status: LeadStatus,
    },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistKind {
    Domain,
    CompanyName,
    Phone,
    Email,
}

impl BlacklistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::CompanyName => "company_name",
            Self::Phone => "phone",
            Self::Email => "email",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "domain" => Some(Self::Domain),
            "company_name" | "company" => Some(Self::CompanyName),
            "phone" => Some(Self::Phone),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in LeadStatus::ALL {
            assert_eq!(LeadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeadStatus::parse("cold"), None);
    }

    #[test]
    fn only_new_and_in_progress_are_active() {
        assert!(LeadStatus::New.is_active());
        assert!(LeadStatus::InProgress.is_active());
        assert!(LeadStatus::Completed.is_terminal());
        assert!(LeadStatus::Failed.is_terminal());
        assert!(LeadStatus::OptedOut.is_terminal());
    }

    #[test]
    fn blacklist_kind_accepts_dashed_names() {
        assert_eq!(BlacklistKind::parse("company-name"), Some(BlacklistKind::CompanyName));
        assert_eq!(BlacklistKind::parse("DOMAIN"), Some(BlacklistKind::Domain));
        assert_eq!(BlacklistKind::parse("fax"), None);
    }
}
