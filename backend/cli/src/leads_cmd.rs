//! Lead management commands: schema, discovery, enrichment, export and
//! administrative overrides.

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use dripforge_core::{BlacklistKind, CommitOutcome, LeadStore, NewLead, UpsertOutcome};
use dripforge_discovery::{
    discover_leads, standard_email_guesses, DiscoverySettings, EmailEnricher, FilterSettings,
    PlacesClient,
};
use dripforge_logging::redact_sensitive_data;
use dripforge_store::{export_csv, SqliteLeadStore};

use crate::app::AppContext;
use crate::terminal_output::{note_info, note_success, note_warn};

/// Sample practices for trying the pipeline without a Places key.
pub fn sample_leads() -> Vec<NewLead> {
    vec![
        NewLead::new("sample-harley-smile", "Harley Street Smile Clinic")
            .with_email("info@harleysmileclinic.co.uk")
            .with_phone("020 7946 0101")
            .with_website("https://harleysmileclinic.co.uk")
            .with_address("12 Harley Street, London W1G 9PG"),
        NewLead::new("sample-kensington-aesthetic", "Kensington Aesthetic Dentistry")
            .with_email("hello@kensingtonaesthetic.co.uk")
            .with_website("https://kensingtonaesthetic.co.uk")
            .with_address("45 Kensington High Street, London W8 5ED")
            .with_contact_name("Dr Amelia Hart"),
        NewLead::new("sample-mayfair-studio", "Mayfair Dental Studio")
            .with_website("https://mayfairdentalstudio.co.uk")
            .with_address("8 Mount Street, London W1K 3NF"),
    ]
    .into_iter()
    .map(|mut lead| {
        lead.source = "seed".to_string();
        lead.premium_score = 8;
        lead
    })
    .collect()
}

fn sample_blacklist() -> Vec<(BlacklistKind, &'static str, &'static str)> {
    vec![
        (BlacklistKind::Domain, "nhs.uk", "public sector"),
        (BlacklistKind::CompanyName, "Budget Dental Chain", "not a premium practice"),
    ]
}

pub async fn init_db(app: &AppContext, seed: bool) -> Result<()> {
    let store = app.open_store()?;
    note_success(&format!("Database ready at {}", app.config.database.path()));
    if !seed {
        return Ok(());
    }

    for (kind, value, reason) in sample_blacklist() {
        store.add_blacklist(kind, value, Some(reason)).await?;
    }
    let mut inserted = 0;
    for lead in sample_leads() {
        if matches!(store.upsert_new_lead(lead).await?, UpsertOutcome::Inserted(_)) {
            inserted += 1;
        }
    }
    note_success(&format!("Seeded {inserted} sample leads and {} blacklist entries", sample_blacklist().len()));
    Ok(())
}

pub async fn discover(app: &AppContext, limit: Option<usize>) -> Result<()> {
    let discovery = &app.config.discovery;
    let client = PlacesClient::new(
        discovery.api_key.clone().unwrap_or_default(),
        discovery.language(),
    )?;
    let settings = DiscoverySettings {
        queries: discovery.queries(),
        districts: discovery.districts(),
        query_delay: discovery.query_delay(),
        filter: FilterSettings {
            min_rating: discovery.min_rating(),
            min_reviews: discovery.min_reviews(),
            max_results: limit.unwrap_or_else(|| discovery.max_results()),
        },
    };

    let store = app.open_store()?;
    let (mut inserted, mut duplicates, mut blacklisted) = (0, 0, 0);
    for lead in discover_leads(&client, &settings).await {
        match store.upsert_new_lead(lead).await? {
            UpsertOutcome::Inserted(lead) => {
                info!(lead_id = %lead.id, company = %lead.company_name, "Lead discovered");
                inserted += 1;
            }
            UpsertOutcome::Conflict { .. } => duplicates += 1,
            UpsertOutcome::Blacklisted { .. } => blacklisted += 1,
        }
    }
    note_success(&format!(
        "Discovery: {inserted} new, {duplicates} already known, {blacklisted} blacklisted"
    ));
    Ok(())
}

pub async fn enrich(app: &AppContext, limit: Option<usize>, dry_run: bool) -> Result<()> {
    let store = app.open_store()?;
    let leads = store.leads_missing_email(limit).await?;
    if leads.is_empty() {
        note_info("No leads need an email");
        return Ok(());
    }

    let enricher = EmailEnricher::new()?;
    let (mut found, mut stored) = (0, 0);
    for lead in &leads {
        let Some(website) = lead.website_url.as_deref() else {
            continue;
        };
        let scan = enricher.scan(website).await;
        match scan.best {
            Some(email) => {
                found += 1;
                if dry_run {
                    note_info(&format!("{}: would store {email}", lead.company_name));
                } else if store.set_email(&lead.id, &email).await? {
                    stored += 1;
                    info!(lead_id = %lead.id, email = %email, "Email stored");
                } else {
                    warn!(lead_id = %lead.id, email = %email, "Email not stored: already set or used by another lead");
                }
            }
            None => {
                let guesses = scan
                    .domain
                    .as_deref()
                    .map(standard_email_guesses)
                    .unwrap_or_default();
                info!(
                    lead_id = %lead.id,
                    pages = scan.pages_checked,
                    guesses = %guesses.join(", "),
                    "No email found on website"
                );
            }
        }
    }

    note_success(&format!(
        "Enrichment: {} leads checked, {found} emails found, {stored} stored{}",
        leads.len(),
        if dry_run { " (dry run)" } else { "" }
    ));
    Ok(())
}

pub async fn export(app: &AppContext, output: &Path) -> Result<()> {
    let store = app.open_store()?;
    let rows = export_csv(&store, output).await?;
    note_success(&format!("Exported {rows} leads to {}", output.display()));
    Ok(())
}

pub async fn opt_out(app: &AppContext, lead_id: &str) -> Result<()> {
    let store = app.open_store()?;
    match store.opt_out(lead_id).await? {
        CommitOutcome::Committed => note_success(&format!("Lead {lead_id} opted out")),
        CommitOutcome::Conflict { actual_status, .. } => note_warn(&format!(
            "Lead {lead_id} is already {}; nothing changed",
            actual_status.as_str()
        )),
    }
    Ok(())
}

pub async fn blacklist(
    app: &AppContext,
    kind: &str,
    value: &str,
    reason: Option<&str>,
) -> Result<()> {
    let kind = BlacklistKind::parse(kind)
        .ok_or_else(|| anyhow!("Unknown blacklist kind '{kind}'. Use domain, company_name, phone or email"))?;
    let store: SqliteLeadStore = app.open_store()?;
    if store.add_blacklist(kind, value, reason).await? {
        note_success(&format!(
            "Blacklisted {} '{}'",
            kind.as_str(),
            redact_sensitive_data(value)
        ));
    } else {
        note_info("Entry already on the blacklist");
    }
    Ok(())
}
