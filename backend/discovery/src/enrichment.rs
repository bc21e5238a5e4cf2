//! Find a contact email on a practice's own website.

use std::time::Duration;

use dripforge_core::{DripError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

static MAILTO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)mailto:([^"'?>\s]+)"#).unwrap());

static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").unwrap());

static VALID_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

const CONTACT_PATHS: &[&str] = &["/contact", "/contact-us"];

const PLACEHOLDER_MARKERS: &[&str] = &[
    "example.com",
    "test.com",
    "domain.com",
    "yoursite.com",
    "website.com",
    "sample.com",
    "lorem",
    "placeholder",
];

const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

const GENERIC_PREFIXES: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "do-not-reply",
    "automated",
    "system",
    "bot",
    "mailer",
    "daemon",
    "postmaster",
    "webmaster",
    "admin",
];

const GUESS_PREFIXES: &[&str] = &[
    "info",
    "contact",
    "hello",
    "enquiries",
    "appointments",
    "reception",
    "admin",
];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub fn is_valid_email(email: &str) -> bool {
    VALID_EMAIL.is_match(email)
}

fn is_plausible(email: &str) -> bool {
    !PLACEHOLDER_MARKERS.iter().any(|m| email.contains(m))
        && !IMAGE_SUFFIXES.iter().any(|s| email.ends_with(s))
        && is_valid_email(email)
}

/// Lowercased, deduplicated addresses in page order. `mailto:` links come first.
pub fn extract_emails(html: &str) -> Vec<String> {
    let cleaned = SCRIPT_STYLE.replace_all(html, " ");
    let mailto = MAILTO_PATTERN
        .captures_iter(&cleaned)
        .map(|c| c[1].to_string())
        .collect::<Vec<_>>();
    let inline = EMAIL_PATTERN
        .find_iter(&cleaned)
        .map(|m| m.as_str().to_string())
        .collect::<Vec<_>>();

    let mut out: Vec<String> = Vec::new();
    for email in mailto.into_iter().chain(inline) {
        let email = email.trim().trim_end_matches('.').to_lowercase();
        if is_plausible(&email) && !out.contains(&email) {
            out.push(email);
        }
    }
    out
}

/// Host of a website URL, lowercased and without a leading `www.`.
pub fn website_domain(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest
        .split(['/', '?', '#'])
        .next()?
        .rsplit('@')
        .next()?
        .split(':')
        .next()?
        .trim()
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    (!host.is_empty() && host.contains('.')).then_some(host)
}

/// Prefix `https://` when the URL has no scheme.
pub fn normalize_website(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Homepage first, then the usual contact pages.
pub fn pages_to_check(website: &str) -> Vec<String> {
    let base = normalize_website(website);
    let root = base.trim_end_matches('/');
    let mut pages = vec![base.clone()];
    pages.extend(CONTACT_PATHS.iter().map(|p| format!("{root}{p}")));
    pages
}

pub fn is_generic_email(email: &str) -> bool {
    let local = email.split('@').next().unwrap_or("").to_lowercase();
    GENERIC_PREFIXES.iter().any(|p| local.starts_with(p))
}

/// First non-generic address, falling back to the first one found.
pub fn choose_best_email(emails: &[String]) -> Option<String> {
    emails
        .iter()
        .find(|e| !is_generic_email(e))
        .or_else(|| emails.first())
        .cloned()
}

/// Conventional inbox names for a domain. Never stored, only reported.
pub fn standard_email_guesses(domain: &str) -> Vec<String> {
    GUESS_PREFIXES.iter().map(|p| format!("{p}@{domain}")).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteScan {
    pub domain: Option<String>,
    pub pages_checked: usize,
    pub emails: Vec<String>,
    pub best: Option<String>,
}

pub struct EmailEnricher {
    http_client: Client,
    page_delay: Duration,
}

impl EmailEnricher {
    pub fn new() -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DripError::Discovery(format!("HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            page_delay: Duration::from_secs(1),
        })
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let res = match self.http_client.get(url).send().await {
            Ok(res) => res,
            Err(e) => {
                debug!(url, error = %e, "Page fetch failed");
                return None;
            }
        };
        if !res.status().is_success() {
            debug!(url, status = %res.status(), "Page fetch returned error status");
            return None;
        }
        res.text().await.ok()
    }

    /// Scan a website. Addresses on the site's own domain win; others are
    /// used only when the site shows none of its own.
    pub async fn scan(&self, website: &str) -> SiteScan {
        let domain = website_domain(&normalize_website(website));
        let mut scan = SiteScan {
            domain: domain.clone(),
            ..Default::default()
        };
        let Some(domain) = domain else {
            warn!(website, "Could not extract a domain");
            return scan;
        };

        let pages = pages_to_check(website);
        for (i, url) in pages.iter().enumerate() {
            if let Some(body) = self.fetch(url).await {
                scan.pages_checked += 1;
                for email in extract_emails(&body) {
                    if !scan.emails.contains(&email) {
                        scan.emails.push(email);
                    }
                }
            }
            if i + 1 < pages.len() && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        let own: Vec<String> = scan
            .emails
            .iter()
            .filter(|e| e.ends_with(&format!("@{domain}")) || e.ends_with(&format!(".{domain}")))
            .cloned()
            .collect();
        scan.best = if own.is_empty() {
            choose_best_email(&scan.emails)
        } else {
            choose_best_email(&own)
        };
        info!(
            domain = %domain,
            pages = scan.pages_checked,
            found = scan.emails.len(),
            "Website scan complete"
        );
        scan
    }
}
