//! CSV export of the lead table.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use dripforge_core::Lead;

use crate::SqliteLeadStore;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    identity: &'a str,
    company_name: &'a str,
    email: &'a str,
    phone: &'a str,
    website_url: &'a str,
    address: &'a str,
    contact_name: &'a str,
    source: &'a str,
    premium_score: u8,
    status: &'a str,
    current_step: u32,
    last_step_at: String,
    last_error: &'a str,
    discovered_at: String,
}

impl<'a> From<&'a Lead> for ExportRow<'a> {
    fn from(lead: &'a Lead) -> Self {
        Self {
            id: &lead.id,
            identity: &lead.identity,
            company_name: &lead.company_name,
            email: lead.email.as_deref().unwrap_or(""),
            phone: lead.phone.as_deref().unwrap_or(""),
            website_url: lead.website_url.as_deref().unwrap_or(""),
            address: lead.address.as_deref().unwrap_or(""),
            contact_name: lead.contact_name.as_deref().unwrap_or(""),
            source: &lead.source,
            premium_score: lead.premium_score,
            status: lead.status.as_str(),
            current_step: lead.current_step,
            last_step_at: lead.last_step_at.map(crate::fmt_ts).unwrap_or_default(),
            last_error: lead.last_error.as_deref().unwrap_or(""),
            discovered_at: crate::fmt_ts(lead.discovered_at),
        }
    }
}

/// Write leads as CSV with a header row. Returns the number of data rows.
pub fn write_leads_csv<W: Write>(leads: &[Lead], writer: W) -> anyhow::Result<usize> {
    let mut out = csv::Writer::from_writer(writer);
    for lead in leads {
        out.serialize(ExportRow::from(lead))?;
    }
    out.flush()?;
    Ok(leads.len())
}

/// Export every lead in the store to `path`, creating parent directories.
pub async fn export_csv(store: &SqliteLeadStore, path: &Path) -> anyhow::Result<usize> {
    let leads = store.list_all().await?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let rows = write_leads_csv(&leads, file)?;
    info!(path = %path.display(), rows, "Leads exported");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dripforge_core::{LeadStore, NewLead, UpsertOutcome};

    #[tokio::test]
    async fn csv_has_header_and_one_row_per_lead() {
        let store = SqliteLeadStore::in_memory().unwrap();
        let lead = NewLead::new("p1", "Smile, Harley Street")
            .with_email("info@smile.co.uk")
            .with_phone("020 7123 4567");
        let UpsertOutcome::Inserted(_) = store.upsert_new_lead(lead).await.unwrap() else {
            panic!("expected insert");
        };
        store
            .upsert_new_lead(NewLead::new("p2", "Bare Clinic"))
            .await
            .unwrap();

        let leads = store.list_all().await.unwrap();
        let mut buf = Vec::new();
        assert_eq!(write_leads_csv(&leads, &mut buf).unwrap(), 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,identity,company_name,email"));
        assert!(lines[1].contains("\"Smile, Harley Street\""));
        assert!(lines[1].contains(",new,0,"));
    }
}
