//! SQLite-backed lead store.
//!
//! A single connection is shared behind a mutex and every statement runs on
//! the blocking pool, so a slow disk never stalls the async scheduling workers.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use dripforge_core::{
    BlacklistKind, CommitOutcome, DeliveryAttempt, DripError, Lead, LeadStatus, LeadStore, NewLead,
    Result, UpsertOutcome,
};

use crate::{attempt_log, blacklist, db_err, fmt_ts, now_micros, parse_ts};

const LEAD_COLUMNS: &str = "id, identity, company_name, email, phone, website_url, address, \
     contact_name, source, premium_score, notes, current_step, last_step_at, status, \
     last_error, discovered_at, updated_at";

/// Status guard shared by every compare-and-swap update.
const ACTIVE_STATUS_SQL: &str = "status IN ('new', 'in_progress')";

#[derive(Clone)]
pub struct SqliteLeadStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLeadStore {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DripError::Storage(format!("create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(db_err)?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
            .map_err(db_err)?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "Lead store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| DripError::Storage("lead store lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| DripError::Storage(format!("store task failed: {e}")))?
    }

    /// Administrative opt-out. Only applies to leads still in the campaign.
    pub async fn opt_out(&self, lead_id: &str) -> Result<CommitOutcome> {
        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| {
            let updated = conn
                .execute(
                    &format!(
                        "UPDATE leads SET status = 'opted_out', updated_at = ?2
                         WHERE id = ?1 AND {ACTIVE_STATUS_SQL}"
                    ),
                    params![lead_id, fmt_ts(now_micros())],
                )
                .map_err(db_err)?;
            resolve_cas(conn, &lead_id, updated)
        })
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<Lead>> {
        self.with_conn(|conn| {
            query_leads(
                conn,
                &format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY discovered_at, id"),
                [],
            )
        })
        .await
    }

    /// Lead counts per status, in `LeadStatus::ALL` order, zeros included.
    pub async fn status_counts(&self) -> Result<Vec<(LeadStatus, usize)>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT status, COUNT(*) FROM leads GROUP BY status")
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?;
            Ok(LeadStatus::ALL
                .iter()
                .map(|status| {
                    let n = rows
                        .iter()
                        .find(|(s, _)| s == status.as_str())
                        .map(|(_, n)| *n as usize)
                        .unwrap_or(0);
                    (*status, n)
                })
                .collect())
        })
        .await
    }

    /// Leads with a website but no contact email yet, oldest first.
    pub async fn leads_missing_email(&self, limit: Option<usize>) -> Result<Vec<Lead>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        self.with_conn(move |conn| {
            query_leads(
                conn,
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads
                     WHERE email IS NULL AND website_url IS NOT NULL
                     ORDER BY discovered_at, id LIMIT ?1"
                ),
                params![limit],
            )
        })
        .await
    }

    /// Set the contact email of a lead that has none.
    ///
    /// Returns `false` if the lead already had an email or another lead already
    /// uses this address.
    pub async fn set_email(&self, lead_id: &str, email: &str) -> Result<bool> {
        let lead_id = lead_id.to_string();
        let email = email.trim().to_string();
        self.with_conn(move |conn| {
            let result = conn.execute(
                "UPDATE leads SET email = ?2, updated_at = ?3 WHERE id = ?1 AND email IS NULL",
                params![lead_id, email, fmt_ts(now_micros())],
            );
            match result {
                Ok(n) => Ok(n > 0),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    debug!(lead_id = %lead_id, email = %email, "Email already used by another lead");
                    Ok(false)
                }
                Err(e) => Err(db_err(e)),
            }
        })
        .await
    }

    pub async fn attempts_for(&self, lead_id: &str) -> Result<Vec<DeliveryAttempt>> {
        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| attempt_log::for_lead(conn, &lead_id).map_err(db_err))
            .await
    }

    pub async fn attempt_count(&self) -> Result<usize> {
        self.with_conn(|conn| attempt_log::count(conn).map_err(db_err))
            .await
    }

    /// Add a blacklist entry. Returns `false` if it already existed.
    pub async fn add_blacklist(
        &self,
        kind: BlacklistKind,
        value: &str,
        reason: Option<&str>,
    ) -> Result<bool> {
        let value = value.to_string();
        let reason = reason.map(str::to_string);
        self.with_conn(move |conn| {
            blacklist::insert(conn, kind, &value, reason.as_deref()).map_err(db_err)
        })
        .await
    }
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn upsert_new_lead(&self, lead: NewLead) -> Result<UpsertOutcome> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(db_err)?;

            if let Some(reason) = blacklist::matching_reason(&tx, &lead).map_err(db_err)? {
                debug!(identity = %lead.identity, reason = %reason, "Lead rejected by blacklist");
                return Ok(UpsertOutcome::Blacklisted { reason });
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM leads
                     WHERE identity = ?1 OR (?2 IS NOT NULL AND email = ?2 COLLATE NOCASE)
                     LIMIT 1",
                    params![lead.identity, lead.email],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            if let Some(existing_id) = existing {
                return Ok(UpsertOutcome::Conflict { existing_id });
            }

            let now = now_micros();
            let inserted = Lead {
                id: Uuid::new_v4().to_string(),
                identity: lead.identity,
                company_name: lead.company_name,
                email: lead.email,
                phone: lead.phone,
                website_url: lead.website_url,
                address: lead.address,
                contact_name: lead.contact_name,
                source: lead.source,
                premium_score: lead.premium_score.min(10),
                notes: lead.notes,
                current_step: 0,
                last_step_at: None,
                status: LeadStatus::New,
                last_error: None,
                discovered_at: now,
                updated_at: now,
            };
            tx.execute(
                &format!(
                    "INSERT INTO leads ({LEAD_COLUMNS})
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)"
                ),
                params![
                    inserted.id,
                    inserted.identity,
                    inserted.company_name,
                    inserted.email,
                    inserted.phone,
                    inserted.website_url,
                    inserted.address,
                    inserted.contact_name,
                    inserted.source,
                    inserted.premium_score as i64,
                    inserted.notes,
                    0i64,
                    Option::<String>::None,
                    inserted.status.as_str(),
                    Option::<String>::None,
                    fmt_ts(now),
                    fmt_ts(now),
                ],
            )
            .map_err(db_err)?;
            tx.commit().map_err(db_err)?;

            debug!(lead_id = %inserted.id, company = %inserted.company_name, "Lead inserted");
            Ok(UpsertOutcome::Inserted(inserted))
        })
        .await
    }

    async fn load_due_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Lead>> {
        self.with_conn(move |conn| {
            query_leads(
                conn,
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads
                     WHERE {ACTIVE_STATUS_SQL}
                       AND (last_step_at IS NULL OR last_step_at <= ?1)
                     ORDER BY discovered_at, id"
                ),
                params![fmt_ts(now)],
            )
        })
        .await
    }

    async fn commit_step_advance(
        &self,
        lead_id: &str,
        expected_current_step: u32,
        new_step: u32,
        new_status: LeadStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        if new_step != expected_current_step + 1 {
            return Err(DripError::InvalidTransition {
                lead_id: lead_id.to_string(),
                message: format!(
                    "step must advance by exactly one ({expected_current_step} -> {new_step})"
                ),
            });
        }
        if !matches!(new_status, LeadStatus::InProgress | LeadStatus::Completed) {
            return Err(DripError::InvalidTransition {
                lead_id: lead_id.to_string(),
                message: format!("cannot advance a step into status '{new_status}'"),
            });
        }

        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| {
            let stamp = fmt_ts(timestamp);
            let updated = conn
                .execute(
                    &format!(
                        "UPDATE leads
                         SET current_step = ?3, last_step_at = ?4, status = ?5, updated_at = ?4
                         WHERE id = ?1 AND current_step = ?2 AND {ACTIVE_STATUS_SQL}"
                    ),
                    params![
                        lead_id,
                        expected_current_step as i64,
                        new_step as i64,
                        stamp,
                        new_status.as_str(),
                    ],
                )
                .map_err(db_err)?;
            resolve_cas(conn, &lead_id, updated)
        })
        .await
    }

    async fn mark_failed(
        &self,
        lead_id: &str,
        expected_current_step: u32,
        error: &str,
    ) -> Result<CommitOutcome> {
        let lead_id = lead_id.to_string();
        let error = error.to_string();
        self.with_conn(move |conn| {
            let updated = conn
                .execute(
                    &format!(
                        "UPDATE leads SET status = 'failed', last_error = ?3, updated_at = ?4
                         WHERE id = ?1 AND current_step = ?2 AND {ACTIVE_STATUS_SQL}"
                    ),
                    params![
                        lead_id,
                        expected_current_step as i64,
                        error,
                        fmt_ts(now_micros())
                    ],
                )
                .map_err(db_err)?;
            resolve_cas(conn, &lead_id, updated)
        })
        .await
    }

    async fn mark_completed(
        &self,
        lead_id: &str,
        expected_current_step: u32,
    ) -> Result<CommitOutcome> {
        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| {
            let updated = conn
                .execute(
                    &format!(
                        "UPDATE leads SET status = 'completed', updated_at = ?3
                         WHERE id = ?1 AND current_step = ?2 AND {ACTIVE_STATUS_SQL}"
                    ),
                    params![lead_id, expected_current_step as i64, fmt_ts(now_micros())],
                )
                .map_err(db_err)?;
            resolve_cas(conn, &lead_id, updated)
        })
        .await
    }

    async fn get(&self, lead_id: &str) -> Result<Option<Lead>> {
        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![lead_id],
                row_to_lead,
            )
            .optional()
            .map_err(db_err)
        })
        .await
    }

    async fn record_attempt(&self, attempt: &DeliveryAttempt) -> Result<()> {
        let attempt = attempt.clone();
        self.with_conn(move |conn| attempt_log::insert(conn, &attempt).map_err(db_err))
            .await
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id            TEXT PRIMARY KEY,
            identity      TEXT NOT NULL UNIQUE,
            company_name  TEXT NOT NULL,
            email         TEXT,
            phone         TEXT,
            website_url   TEXT,
            address       TEXT,
            contact_name  TEXT,
            source        TEXT NOT NULL DEFAULT 'googlemaps',
            premium_score INTEGER NOT NULL DEFAULT 0,
            notes         TEXT,
            current_step  INTEGER NOT NULL DEFAULT 0,
            last_step_at  TEXT,
            status        TEXT NOT NULL DEFAULT 'new',
            last_error    TEXT,
            discovered_at TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_leads_email
            ON leads(email COLLATE NOCASE) WHERE email IS NOT NULL;
        "#,
    )?;
    attempt_log::init_schema(conn)?;
    blacklist::init_schema(conn)?;
    Ok(())
}

/// Turn an UPDATE row count into a CAS outcome, reading back the current
/// state when nothing matched.
fn resolve_cas(conn: &Connection, lead_id: &str, updated: usize) -> Result<CommitOutcome> {
    if updated > 0 {
        return Ok(CommitOutcome::Committed);
    }
    let current: Option<(i64, String)> = conn
        .query_row(
            "SELECT current_step, status FROM leads WHERE id = ?1",
            params![lead_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(db_err)?;
    let Some((step, status)) = current else {
        return Err(DripError::NotFound(lead_id.to_string()));
    };
    let actual_status = LeadStatus::parse(&status)
        .ok_or_else(|| DripError::Storage(format!("unknown lead status '{status}'")))?;
    debug!(lead_id = %lead_id, actual_step = step, status = %actual_status, "CAS update lost");
    Ok(CommitOutcome::Conflict {
        actual_step: step as u32,
        actual_status,
    })
}

fn query_leads<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Lead>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let leads = stmt
        .query_map(params, row_to_lead)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(leads)
}

fn row_to_lead(row: &Row<'_>) -> rusqlite::Result<Lead> {
    let status_raw: String = row.get(13)?;
    let status = LeadStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            13,
            Type::Text,
            format!("unknown lead status '{status_raw}'").into(),
        )
    })?;
    let last_step_at: Option<String> = row.get(12)?;
    let discovered_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;

    Ok(Lead {
        id: row.get(0)?,
        identity: row.get(1)?,
        company_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        website_url: row.get(5)?,
        address: row.get(6)?,
        contact_name: row.get(7)?,
        source: row.get(8)?,
        premium_score: row.get::<_, i64>(9)?.clamp(0, 10) as u8,
        notes: row.get(10)?,
        current_step: row.get::<_, i64>(11)? as u32,
        last_step_at: last_step_at.map(|s| parse_ts(12, &s)).transpose()?,
        status,
        last_error: row.get(14)?,
        discovered_at: parse_ts(15, &discovered_at)?,
        updated_at: parse_ts(16, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn sample(identity: &str) -> NewLead {
        NewLead::new(identity, format!("Clinic {identity}"))
            .with_email(format!("info@{identity}.co.uk"))
            .with_address("1 Harley Street, London")
    }

    async fn insert(store: &SqliteLeadStore, identity: &str) -> Lead {
        match store.upsert_new_lead(sample(identity)).await.unwrap() {
            UpsertOutcome::Inserted(lead) => lead,
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn new_leads_start_at_step_zero() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let lead = insert(&store, "p1").await;
        assert_eq!(lead.current_step, 0);
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.last_step_at.is_none());

        let loaded = store.get(&lead.id).await.unwrap().unwrap();
        assert_eq!(loaded, lead);
    }

    #[tokio::test]
    async fn duplicate_identity_or_email_conflicts() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let lead = insert(&store, "p1").await;

        let dup = store.upsert_new_lead(NewLead::new("p1", "Other")).await.unwrap();
        assert_eq!(dup, UpsertOutcome::Conflict { existing_id: lead.id.clone() });

        let same_email = NewLead::new("p2", "Other").with_email("INFO@p1.co.uk");
        let dup = store.upsert_new_lead(same_email).await.unwrap();
        assert_eq!(dup, UpsertOutcome::Conflict { existing_id: lead.id });
    }

    #[tokio::test]
    async fn blacklisted_leads_are_rejected() {
        let store = SqliteLeadStore::in_memory().unwrap();
        store
            .add_blacklist(BlacklistKind::Domain, "example.com", Some("Test domain"))
            .await
            .unwrap();
        let lead = NewLead::new("p9", "Example Dental").with_email("hi@example.com");
        let outcome = store.upsert_new_lead(lead).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Blacklisted { reason: "Test domain".into() });
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn step_advance_is_compare_and_swap() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let lead = insert(&store, "p1").await;
        let now = Utc::now();

        let first = store
            .commit_step_advance(&lead.id, 0, 1, LeadStatus::InProgress, now)
            .await
            .unwrap();
        assert!(first.is_committed());

        let second = store
            .commit_step_advance(&lead.id, 0, 1, LeadStatus::InProgress, now)
            .await
            .unwrap();
        assert_eq!(
            second,
            CommitOutcome::Conflict { actual_step: 1, actual_status: LeadStatus::InProgress }
        );

        let loaded = store.get(&lead.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_step, 1);
        assert!(loaded.last_step_at.is_some());
    }

    #[tokio::test]
    async fn step_advance_rejects_skips_and_rewinds() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let lead = insert(&store, "p1").await;
        let now = Utc::now();

        let skip = store
            .commit_step_advance(&lead.id, 0, 2, LeadStatus::InProgress, now)
            .await;
        assert!(matches!(skip, Err(DripError::InvalidTransition { .. })));

        let bad_status = store
            .commit_step_advance(&lead.id, 0, 1, LeadStatus::Failed, now)
            .await;
        assert!(matches!(bad_status, Err(DripError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn terminal_leads_cannot_be_advanced() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let lead = insert(&store, "p1").await;

        let failed = store.mark_failed(&lead.id, 0, "550 mailbox unavailable").await.unwrap();
        assert!(failed.is_committed());

        let advance = store
            .commit_step_advance(&lead.id, 0, 1, LeadStatus::InProgress, Utc::now())
            .await
            .unwrap();
        assert_eq!(
            advance,
            CommitOutcome::Conflict { actual_step: 0, actual_status: LeadStatus::Failed }
        );

        let loaded = store.get(&lead.id).await.unwrap().unwrap();
        assert_eq!(loaded.last_error.as_deref(), Some("550 mailbox unavailable"));
    }

    #[tokio::test]
    async fn unknown_lead_is_not_found() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let result = store.mark_completed("missing", 0).await;
        assert!(matches!(result, Err(DripError::NotFound(_))));
    }

    #[tokio::test]
    async fn due_candidates_exclude_terminal_and_future_leads() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let active = insert(&store, "p1").await;
        let done = insert(&store, "p2").await;
        let opted = insert(&store, "p3").await;
        let later = insert(&store, "p4").await;

        store.mark_completed(&done.id, 0).await.unwrap();
        store.opt_out(&opted.id).await.unwrap();
        let now = Utc::now();
        store
            .commit_step_advance(&later.id, 0, 1, LeadStatus::InProgress, now + ChronoDuration::hours(1))
            .await
            .unwrap();

        let due: Vec<String> = store
            .load_due_candidates(now)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(due, vec![active.id]);
    }

    #[tokio::test]
    async fn opt_out_only_from_active_states() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let lead = insert(&store, "p1").await;
        assert!(store.opt_out(&lead.id).await.unwrap().is_committed());
        assert!(!store.opt_out(&lead.id).await.unwrap().is_committed());
    }

    #[tokio::test]
    async fn set_email_only_fills_missing_addresses() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let with_email = insert(&store, "p1").await;
        let bare = NewLead::new("p2", "Bare Clinic").with_website("https://bare.co.uk");
        let UpsertOutcome::Inserted(bare) = store.upsert_new_lead(bare).await.unwrap() else {
            panic!("expected insert");
        };

        let missing = store.leads_missing_email(None).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, bare.id);

        assert!(!store.set_email(&with_email.id, "new@p1.co.uk").await.unwrap());
        assert!(!store.set_email(&bare.id, "info@p1.co.uk").await.unwrap());
        assert!(store.set_email(&bare.id, "hello@bare.co.uk").await.unwrap());
        assert!(store.leads_missing_email(Some(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_counts_include_zeroes() {
        let store = SqliteLeadStore::in_memory().unwrap();
        insert(&store, "p1").await;
        let lead = insert(&store, "p2").await;
        store.mark_failed(&lead.id, 0, "bounced").await.unwrap();

        let counts = store.status_counts().await.unwrap();
        assert_eq!(counts.len(), LeadStatus::ALL.len());
        assert!(counts.contains(&(LeadStatus::New, 1)));
        assert!(counts.contains(&(LeadStatus::Failed, 1)));
        assert!(counts.contains(&(LeadStatus::Completed, 0)));
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("dripforge-store-{}", Uuid::new_v4()));
        let path = dir.join("leads.db");
        let lead_id = {
            let store = SqliteLeadStore::open(&path).unwrap();
            let lead = insert(&store, "p1").await;
            store
                .commit_step_advance(&lead.id, 0, 1, LeadStatus::InProgress, Utc::now())
                .await
                .unwrap();
            lead.id
        };

        let reopened = SqliteLeadStore::open(&path).unwrap();
        let lead = reopened.get(&lead_id).await.unwrap().unwrap();
        assert_eq!(lead.current_step, 1);
        assert_eq!(lead.status, LeadStatus::InProgress);
        drop(reopened);
        std::fs::remove_dir_all(&dir).ok();
    }
}
