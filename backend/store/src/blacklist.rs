//! Blacklist of businesses that must never enter the campaign.
//!
//! Values are normalised on write and on lookup: lowercase, domains without a
//! leading `www.`, phone numbers reduced to digits.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use dripforge_core::{BlacklistKind, NewLead};

use crate::{fmt_ts, now_micros};

pub(crate) fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS blacklist (
            id         TEXT PRIMARY KEY,
            kind       TEXT NOT NULL,
            value      TEXT NOT NULL,
            reason     TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (kind, value)
        );
        "#,
    )
}

/// Insert an entry. Returns `false` when it already existed.
pub(crate) fn insert(
    conn: &Connection,
    kind: BlacklistKind,
    value: &str,
    reason: Option<&str>,
) -> rusqlite::Result<bool> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO blacklist (id, kind, value, reason, created_at)
         VALUES (?1,?2,?3,?4,?5)",
        params![
            Uuid::new_v4().to_string(),
            kind.as_str(),
            normalize(kind, value),
            reason,
            fmt_ts(now_micros()),
        ],
    )?;
    Ok(n > 0)
}

/// The reason the lead is blacklisted, if any of its fields match an entry.
pub(crate) fn matching_reason(conn: &Connection, lead: &NewLead) -> rusqlite::Result<Option<String>> {
    let mut candidates = vec![(BlacklistKind::CompanyName, lead.company_name.clone())];
    if let Some(email) = &lead.email {
        candidates.push((BlacklistKind::Email, email.clone()));
        if let Some((_, domain)) = email.rsplit_once('@') {
            candidates.push((BlacklistKind::Domain, domain.to_string()));
        }
    }
    if let Some(host) = lead.website_url.as_deref().and_then(website_host) {
        candidates.push((BlacklistKind::Domain, host));
    }
    if let Some(phone) = &lead.phone {
        candidates.push((BlacklistKind::Phone, phone.clone()));
    }

    for (kind, raw) in candidates {
        let value = normalize(kind, &raw);
        if value.is_empty() {
            continue;
        }
        let hit: Option<Option<String>> = conn
            .query_row(
                "SELECT reason FROM blacklist WHERE kind = ?1 AND value = ?2",
                params![kind.as_str(), value],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(reason) = hit {
            return Ok(Some(reason.unwrap_or_else(|| {
                format!("blacklisted {} '{}'", kind.as_str(), value)
            })));
        }
    }
    Ok(None)
}

fn normalize(kind: BlacklistKind, value: &str) -> String {
    let value = value.trim().to_lowercase();
    match kind {
        BlacklistKind::Domain => value.strip_prefix("www.").unwrap_or(&value).to_string(),
        BlacklistKind::Phone => value.chars().filter(char::is_ascii_digit).collect(),
        BlacklistKind::CompanyName | BlacklistKind::Email => value,
    }
}

/// Host part of a website URL, without scheme, port, path or `www.`.
fn website_host(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest
        .split(['/', '?', '#'])
        .next()?
        .split(':')
        .next()?
        .trim()
        .to_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}
