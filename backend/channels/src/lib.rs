//! Delivery gateways.
//!
//! Production sends through [`SmtpGateway`]; test mode swaps in
//! [`DryRunGateway`], which never leaves the process.

pub mod dry_run;
pub mod pacer;
pub mod smtp;

pub use dry_run::DryRunGateway;
pub use pacer::{DEFAULT_SEND_INTERVAL, SendPacer};
pub use smtp::{SmtpGateway, SmtpSettings};
