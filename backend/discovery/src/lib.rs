//! Lead discovery: Google Places search, premium filtering and website
//! email enrichment.

pub mod enrichment;
pub mod filter;
pub mod places;

use std::time::Duration;

use dripforge_core::NewLead;
use tracing::{info, warn};

pub use enrichment::{
    choose_best_email, extract_emails, is_generic_email, standard_email_guesses, website_domain,
    EmailEnricher, SiteScan,
};
pub use filter::{dedupe_by_place_id, filter_premium, premium_score, to_new_lead, FilterSettings};
pub use places::{build_queries, PlaceDetails, PlaceResult, PlacesClient};

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub queries: Vec<String>,
    pub districts: Vec<String>,
    pub query_delay: Duration,
    pub filter: FilterSettings,
}

/// Turn raw search results into candidate leads.
pub fn select_leads(places: Vec<PlaceResult>, filter: &FilterSettings) -> Vec<NewLead> {
    let unique = dedupe_by_place_id(places);
    filter_premium(unique, filter)
        .iter()
        .filter_map(to_new_lead)
        .collect()
}

/// Fill phone and website from Place Details. Values already on the lead win.
pub fn apply_details(lead: &mut NewLead, details: PlaceDetails) {
    let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !filled(&lead.phone) {
        lead.phone = details.formatted_phone_number.filter(|s| !s.trim().is_empty());
    }
    if !filled(&lead.website_url) {
        lead.website_url = details.website.filter(|s| !s.trim().is_empty());
    }
}

/// Search every query × district and return the premium practices found,
/// with phone and website looked up for each selected practice.
pub async fn discover_leads(client: &PlacesClient, settings: &DiscoverySettings) -> Vec<NewLead> {
    let queries = build_queries(&settings.queries, &settings.districts);
    info!(queries = queries.len(), "Starting Places discovery");
    let places = client.search_all(&queries, settings.query_delay).await;
    let found = places.len();
    let mut leads = select_leads(places, &settings.filter);

    let mut with_website = 0;
    let mut lookups = 0;
    for lead in leads.iter_mut() {
        if lead.website_url.is_none() || lead.phone.is_none() {
            if lookups > 0 && !settings.query_delay.is_zero() {
                tokio::time::sleep(settings.query_delay).await;
            }
            lookups += 1;
            match client.details(&lead.identity).await {
                Ok(details) => apply_details(lead, details),
                Err(e) => warn!(place_id = %lead.identity, error = %e, "Place Details failed"),
            }
        }
        if lead.website_url.is_some() {
            with_website += 1;
        }
    }

    info!(found, selected = leads.len(), with_website, "Places discovery complete");
    leads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_leads_dedupes_before_filtering() {
        let json = r#"[
            {"place_id": "p1", "name": "Mayfair Dental Spa", "rating": 4.8, "user_ratings_total": 150},
            {"place_id": "p1", "name": "Mayfair Dental Spa", "rating": 4.8, "user_ratings_total": 150},
            {"place_id": "p2", "name": "Budget Teeth", "rating": 3.9, "user_ratings_total": 800}
        ]"#;
        let places: Vec<PlaceResult> = serde_json::from_str(json).unwrap();
        let leads = select_leads(places, &FilterSettings::default());
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].identity, "p1");
        assert_eq!(leads[0].premium_score, 3);
    }

    #[test]
    fn details_fill_only_missing_fields() {
        let json = r#"[{"place_id": "p1", "name": "Mayfair Dental Spa", "rating": 4.8,
            "user_ratings_total": 150, "formatted_phone_number": "020 7946 0001"}]"#;
        let places: Vec<PlaceResult> = serde_json::from_str(json).unwrap();
        let mut lead = select_leads(places, &FilterSettings::default()).remove(0);
        assert!(lead.website_url.is_none());

        let details: PlaceDetails = serde_json::from_str(
            r#"{"formatted_phone_number": "020 7946 0958", "website": "https://mayfairdentalspa.co.uk/"}"#,
        )
        .unwrap();
        apply_details(&mut lead, details);
        assert_eq!(lead.phone.as_deref(), Some("020 7946 0001"));
        assert_eq!(lead.website_url.as_deref(), Some("https://mayfairdentalspa.co.uk/"));
    }

    #[test]
    fn blank_details_leave_lead_without_website() {
        let mut lead = NewLead::new("p9", "Quiet Dental");
        apply_details(
            &mut lead,
            PlaceDetails {
                formatted_phone_number: None,
                website: Some("  ".into()),
            },
        );
        assert!(lead.website_url.is_none());
        assert!(lead.phone.is_none());
    }
}
