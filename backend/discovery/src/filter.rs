//! Premium filtering and scoring of Places search results.

use std::collections::HashSet;

use dripforge_core::NewLead;

use crate::places::PlaceResult;

/// Names containing any of these are never leads.
const STOP_MARKERS: &[&str] = &["nhs"];

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    pub min_rating: f64,
    pub min_reviews: u32,
    pub max_results: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_rating: 4.7,
            min_reviews: 50,
            max_results: 20,
        }
    }
}

/// Keep the first occurrence of each `place_id`; results without one are dropped.
pub fn dedupe_by_place_id(places: Vec<PlaceResult>) -> Vec<PlaceResult> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|p| match p.place_id.as_deref() {
            Some(id) if !id.is_empty() => seen.insert(id.to_string()),
            _ => false,
        })
        .collect()
}

pub fn is_excluded_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    STOP_MARKERS.iter().any(|m| lower.contains(m))
}

/// 0-10 score from rating and review volume.
pub fn premium_score(rating: f64, reviews: u32) -> u8 {
    let review_part = (reviews as f64 / 100.0).min(5.0);
    let raw = ((rating - 4.0) * 2.0 + review_part).trunc();
    raw.clamp(0.0, 10.0) as u8
}

/// Apply the rating, review and name filters, best score first, capped at
/// `max_results`.
pub fn filter_premium(places: Vec<PlaceResult>, settings: &FilterSettings) -> Vec<PlaceResult> {
    let mut kept: Vec<PlaceResult> = places
        .into_iter()
        .filter(|p| p.rating() >= settings.min_rating)
        .filter(|p| p.reviews() >= settings.min_reviews)
        .filter(|p| !is_excluded_name(&p.name))
        .collect();
    kept.sort_by_key(|p| std::cmp::Reverse(premium_score(p.rating(), p.reviews())));
    kept.truncate(settings.max_results);
    kept
}

/// Lead for a filtered place. `None` without a `place_id`.
pub fn to_new_lead(place: &PlaceResult) -> Option<NewLead> {
    let place_id = place.place_id.as_deref().filter(|id| !id.is_empty())?;
    let mut lead = NewLead::new(place_id, place.name.trim());
    lead.phone = place.formatted_phone_number.clone();
    lead.website_url = place.website.clone();
    lead.address = place.formatted_address.clone();
    lead.premium_score = premium_score(place.rating(), place.reviews());
    lead.notes = Some(format!(
        "Google Maps: rating {}, {} reviews, place_id: {}",
        place.rating(),
        place.reviews(),
        place_id
    ));
    Some(lead)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: Option<&str>, name: &str, rating: f64, reviews: u32) -> PlaceResult {
        PlaceResult {
            place_id: id.map(str::to_string),
            name: name.to_string(),
            formatted_address: Some("1 Harley Street, London W1G 9QD".into()),
            rating: Some(rating),
            user_ratings_total: Some(reviews),
            formatted_phone_number: None,
            website: None,
        }
    }

    #[test]
    fn score_formula() {
        assert_eq!(premium_score(4.9, 320), 5);
        assert_eq!(premium_score(5.0, 1_000), 7);
        assert_eq!(premium_score(3.0, 0), 0);
        assert_eq!(premium_score(4.7, 50), 1);
    }

    #[test]
    fn dedupe_keeps_first_and_drops_missing_ids() {
        let places = vec![
            place(Some("a"), "First", 4.8, 100),
            place(Some("a"), "Second", 4.8, 100),
            place(None, "No id", 4.9, 900),
            place(Some("b"), "Other", 4.8, 100),
        ];
        let names: Vec<String> = dedupe_by_place_id(places).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["First", "Other"]);
    }

    #[test]
    fn filter_applies_thresholds_and_stop_markers() {
        let places = vec![
            place(Some("ok"), "Harley Street Dental Studio", 4.9, 300),
            place(Some("low"), "Low Rated Dental", 4.5, 900),
            place(Some("few"), "New Clinic", 5.0, 10),
            place(Some("nhs"), "Westminster NHS Dental Practice", 4.9, 400),
            place(Some("edge"), "Edge Dental", 4.7, 50),
        ];
        let kept: Vec<String> = filter_premium(places, &FilterSettings::default())
            .into_iter()
            .filter_map(|p| p.place_id)
            .collect();
        assert_eq!(kept, vec!["ok", "edge"]);
    }

    #[test]
    fn filter_truncates_best_first() {
        let places = vec![
            place(Some("a"), "A", 4.7, 60),
            place(Some("b"), "B", 5.0, 600),
            place(Some("c"), "C", 4.8, 200),
        ];
        let settings = FilterSettings {
            max_results: 2,
            ..Default::default()
        };
        let kept: Vec<String> = filter_premium(places, &settings)
            .into_iter()
            .filter_map(|p| p.place_id)
            .collect();
        assert_eq!(kept, vec!["b", "c"]);
    }

    #[test]
    fn lead_carries_place_details() {
        let mut p = place(Some("pid-1"), " Smile Studio ", 4.9, 320);
        p.website = Some("https://smilestudio.co.uk".into());
        let lead = to_new_lead(&p).unwrap();
        assert_eq!(lead.identity, "pid-1");
        assert_eq!(lead.company_name, "Smile Studio");
        assert_eq!(lead.source, "googlemaps");
        assert_eq!(lead.premium_score, 5);
        assert!(lead.notes.unwrap().contains("320 reviews"));
        assert!(lead.email.is_none());
    }
}
