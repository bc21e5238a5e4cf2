//! Google Places Text Search and Place Details client.

use std::time::Duration;

use dripforge_core::{DripError, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

pub const TEXT_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
pub const DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";

/// Text Search leaves these out, so they are fetched per place.
const DETAILS_FIELDS: &str = "formatted_phone_number,website";

/// A `next_page_token` only becomes valid a short while after it is issued.
pub const PAGE_TOKEN_DELAY: Duration = Duration::from_secs(2);

/// Text Search returns at most three pages per query.
const MAX_PAGES: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceResult {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl PlaceResult {
    pub fn rating(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    pub fn reviews(&self) -> u32 {
        self.user_ratings_total.unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct TextSearchResponse {
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TextSearchResponse {
    /// `OK` and `ZERO_RESULTS` are successes; every other status is an API error.
    pub fn into_page(self) -> Result<(Vec<PlaceResult>, Option<String>)> {
        match self.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok((self.results, self.next_page_token)),
            status => Err(DripError::Discovery(format!(
                "Places API returned {status}: {}",
                self.error_message.unwrap_or_default()
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsResponse {
    #[serde(default)]
    pub result: Option<PlaceDetails>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DetailsResponse {
    pub fn into_details(self) -> Result<PlaceDetails> {
        match self.status.as_str() {
            "OK" => Ok(self.result.unwrap_or_default()),
            status => Err(DripError::Discovery(format!(
                "Place Details returned {status}: {}",
                self.error_message.unwrap_or_default()
            ))),
        }
    }
}

/// Build one search string per query and district, plus the generic
/// "dentistry in" and "dental clinic in" searches for each district.
pub fn build_queries(queries: &[String], districts: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity((queries.len() + 2) * districts.len());
    for district in districts {
        for query in queries {
            out.push(format!("{query} in {district}"));
        }
        out.push(format!("dentistry in {district}"));
        out.push(format!("dental clinic in {district}"));
    }
    out
}

pub struct PlacesClient {
    http_client: Client,
    api_key: String,
    language: String,
    base_url: String,
    details_url: String,
    page_delay: Duration,
}

impl PlacesClient {
    pub fn new(api_key: impl Into<String>, language: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DripError::Config(
                "discovery.api_key is required to search Google Places".into(),
            ));
        }
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DripError::Discovery(format!("HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            api_key,
            language: language.into(),
            base_url: TEXT_SEARCH_URL.to_string(),
            details_url: DETAILS_URL.to_string(),
            page_delay: PAGE_TOKEN_DELAY,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_details_url(mut self, url: impl Into<String>) -> Self {
        self.details_url = url.into();
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// All pages for one query.
    pub async fn text_search(&self, query: &str) -> Result<Vec<PlaceResult>> {
        let mut places = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            let request = match &page_token {
                Some(token) => self
                    .http_client
                    .get(&self.base_url)
                    .query(&[("pagetoken", token.as_str()), ("key", self.api_key.as_str())]),
                None => self.http_client.get(&self.base_url).query(&[
                    ("query", query),
                    ("key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                ]),
            };

            let res = request
                .send()
                .await
                .map_err(|e| DripError::Discovery(format!("Places request failed: {}", e.without_url())))?;
            if !res.status().is_success() {
                let status = res.status();
                let err = res.text().await.unwrap_or_default();
                return Err(DripError::Discovery(format!(
                    "Places API HTTP {status}: {err}"
                )));
            }
            let body: TextSearchResponse = res
                .json()
                .await
                .map_err(|e| DripError::Discovery(format!("Places response: {}", e.without_url())))?;

            let (results, next) = body.into_page()?;
            debug!(query, page, count = results.len(), "Places page fetched");
            places.extend(results);

            match next {
                Some(token) if page + 1 < MAX_PAGES => {
                    tokio::time::sleep(self.page_delay).await;
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(places)
    }

    /// Phone and website for one place.
    pub async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
        let res = self
            .http_client
            .get(&self.details_url)
            .query(&[
                ("place_id", place_id),
                ("fields", DETAILS_FIELDS),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DripError::Discovery(format!("Details request failed: {}", e.without_url())))?;
        if !res.status().is_success() {
            let status = res.status();
            let err = res.text().await.unwrap_or_default();
            return Err(DripError::Discovery(format!(
                "Place Details HTTP {status}: {err}"
            )));
        }
        let body: DetailsResponse = res
            .json()
            .await
            .map_err(|e| DripError::Discovery(format!("Details response: {}", e.without_url())))?;
        body.into_details()
    }

    /// Run every query in order. A failing query is logged and skipped.
    pub async fn search_all(&self, queries: &[String], query_delay: Duration) -> Vec<PlaceResult> {
        let mut all = Vec::new();
        for (i, query) in queries.iter().enumerate() {
            match self.text_search(query).await {
                Ok(places) => all.extend(places),
                Err(e) => warn!(query = %query, error = %e, "Places search failed"),
            }
            if i + 1 < queries.len() && !query_delay.is_zero() {
                tokio::time::sleep(query_delay).await;
            }
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "results": [
            {
                "place_id": "ChIJ-harley",
                "name": "Harley Street Smile Studio",
                "formatted_address": "10 Harley St, London W1G 9PF, UK",
                "rating": 4.9,
                "user_ratings_total": 412,
                "types": ["dentist", "health"]
            },
            {"name": "Nameless without id"}
        ],
        "next_page_token": "tok-2",
        "status": "OK"
    }"#;

    #[test]
    fn parses_page_with_token() {
        let resp: TextSearchResponse = serde_json::from_str(PAGE).unwrap();
        let (places, next) = resp.into_page().unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].reviews(), 412);
        assert_eq!(places[1].rating(), 0.0);
        assert!(places[1].place_id.is_none());
        assert_eq!(next.as_deref(), Some("tok-2"));
    }

    #[test]
    fn zero_results_is_empty_page() {
        let resp: TextSearchResponse =
            serde_json::from_str(r#"{"results": [], "status": "ZERO_RESULTS"}"#).unwrap();
        let (places, next) = resp.into_page().unwrap();
        assert!(places.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn denied_status_is_discovery_error() {
        let resp: TextSearchResponse = serde_json::from_str(
            r#"{"results": [], "status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap();
        let err = resp.into_page().unwrap_err();
        assert!(matches!(err, DripError::Discovery(ref m) if m.contains("REQUEST_DENIED")));
    }

    #[test]
    fn parses_details_fixture() {
        let resp: DetailsResponse = serde_json::from_str(
            r#"{
                "html_attributions": [],
                "result": {
                    "formatted_phone_number": "020 7946 0958",
                    "website": "https://harleysmile.co.uk/"
                },
                "status": "OK"
            }"#,
        )
        .unwrap();
        let details = resp.into_details().unwrap();
        assert_eq!(details.formatted_phone_number.as_deref(), Some("020 7946 0958"));
        assert_eq!(details.website.as_deref(), Some("https://harleysmile.co.uk/"));
    }

    #[test]
    fn details_without_website_is_empty_not_error() {
        let resp: DetailsResponse =
            serde_json::from_str(r#"{"result": {}, "status": "OK"}"#).unwrap();
        let details = resp.into_details().unwrap();
        assert!(details.website.is_none());
        assert!(details.formatted_phone_number.is_none());
    }

    #[test]
    fn details_not_found_is_discovery_error() {
        let resp: DetailsResponse =
            serde_json::from_str(r#"{"status": "NOT_FOUND"}"#).unwrap();
        assert!(matches!(resp.into_details(), Err(DripError::Discovery(ref m)) if m.contains("NOT_FOUND")));
    }

    #[test]
    fn queries_cover_each_district() {
        let queries = vec!["veneers".to_string()];
        let districts = vec!["Soho London".to_string(), "Mayfair London".to_string()];
        let built = build_queries(&queries, &districts);
        assert_eq!(
            built,
            vec![
                "veneers in Soho London",
                "dentistry in Soho London",
                "dental clinic in Soho London",
                "veneers in Mayfair London",
                "dentistry in Mayfair London",
                "dental clinic in Mayfair London",
            ]
        );
    }

    #[test]
    fn missing_key_is_config_error() {
        assert!(matches!(PlacesClient::new("  ", "en"), Err(DripError::Config(_))));
    }
}
