//! `dripforge-store`: durable state for the outreach campaign.
//!
//! - `SqliteLeadStore`: the lead table with compare-and-swap progress updates
//! - delivery attempt audit log
//! - blacklist consulted when discovered leads are inserted
//! - CSV export of the final lead state

mod attempt_log;
mod blacklist;
pub mod export;
pub mod lead_store;

pub use export::{export_csv, write_leads_csv};
pub use lead_store::SqliteLeadStore;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use dripforge_core::DripError;
use rusqlite::types::Type;

/// Timestamps are stored as fixed-width RFC 3339 text so that string order
/// matches chronological order in SQL comparisons.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Current time at the precision the store keeps.
pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn db_err(e: rusqlite::Error) -> DripError {
    DripError::Storage(e.to_string())
}
