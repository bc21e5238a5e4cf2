//! `dripforge-scheduler`: drives each lead through the outreach step catalog.

pub mod catalog;
pub mod retry;
pub mod scheduler;
pub mod template;

pub use catalog::{CatalogError, StepCatalog};
pub use retry::RetryPolicy;
pub use scheduler::{is_due, CampaignScheduler, PassReport, DEFAULT_CONCURRENCY};
pub use template::{SenderProfile, TemplateError, TemplateRenderer};
