//! Durable audit log of delivery attempts.
//!
//! Every dispatch through the gateway, successful or not, is written here.
//! The log is informational: campaign progress is decided by the lead row.

use rusqlite::{params, Connection};
use uuid::Uuid;

use dripforge_core::{AttemptOutcome, DeliveryAttempt};

use crate::{fmt_ts, parse_ts};

pub(crate) fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS delivery_attempts (
            id           TEXT PRIMARY KEY,
            lead_id      TEXT NOT NULL,
            step_index   INTEGER NOT NULL,
            attempt_no   INTEGER NOT NULL,
            sent_at      TEXT NOT NULL,
            outcome      TEXT NOT NULL,
            subject      TEXT,
            error_detail TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_delivery_attempts_lead ON delivery_attempts(lead_id);
        "#,
    )
}

pub(crate) fn insert(conn: &Connection, attempt: &DeliveryAttempt) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO delivery_attempts
           (id, lead_id, step_index, attempt_no, sent_at, outcome, subject, error_detail)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            Uuid::new_v4().to_string(),
            attempt.lead_id,
            attempt.step_index as i64,
            attempt.attempt_no as i64,
            fmt_ts(attempt.sent_at),
            attempt.outcome.as_str(),
            attempt.subject,
            attempt.error_detail,
        ],
    )?;
    Ok(())
}

pub(crate) fn for_lead(conn: &Connection, lead_id: &str) -> rusqlite::Result<Vec<DeliveryAttempt>> {
    let mut stmt = conn.prepare(
        "SELECT lead_id, step_index, attempt_no, sent_at, outcome, subject, error_detail
         FROM delivery_attempts WHERE lead_id = ?1
         ORDER BY sent_at ASC, step_index ASC, attempt_no ASC",
    )?;
    let rows = stmt.query_map(params![lead_id], |row| {
        let sent_at: String = row.get(3)?;
        let outcome: String = row.get(4)?;
        Ok(DeliveryAttempt {
            lead_id: row.get(0)?,
            step_index: row.get::<_, i64>(1)? as u32,
            attempt_no: row.get::<_, i64>(2)? as u32,
            sent_at: parse_ts(3, &sent_at)?,
            outcome: if outcome == "success" {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::Failure
            },
            subject: row.get(5)?,
            error_detail: row.get(6)?,
        })
    })?;
    rows.collect()
}

pub(crate) fn count(conn: &Connection) -> rusqlite::Result<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM delivery_attempts", [], |row| row.get(0))?;
    Ok(n as usize)
}
