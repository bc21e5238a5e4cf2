pub mod error;
pub mod traits;
pub mod types;

pub use error::{DeliveryError, DripError, Result};
pub use traits::{DeliveryGateway, LeadStore};
pub use types::{
    AttemptOutcome, BlacklistKind, CommitOutcome, DeliveryAttempt, Lead, LeadId, LeadStatus,
    NewLead, OutreachStep, RenderedMessage, UpsertOutcome,
};
