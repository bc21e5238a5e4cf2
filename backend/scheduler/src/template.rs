//! Outreach message templates.
//!
//! A template is plain text. A line starting with `Subject: ` gives the
//! subject, everything else is the body. `{placeholder}` tokens are replaced
//! with sender and lead fields before the subject is split off.

use std::collections::HashMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

use dripforge_core::{Lead, RenderedMessage};

const SUBJECT_PREFIX: &str = "Subject: ";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Neighbourhoods recognised in a lead's address, in priority order.
const LOCATIONS: [(&str, &str); 4] = [
    ("Harley", "Harley Street"),
    ("Kensington", "Kensington"),
    ("Chelsea", "Chelsea"),
    ("Mayfair", "Mayfair"),
];

const EMAIL_STEP_0: &str = "\
Subject: Helping {lead_company_name} attract more premium patients in {location}

Hello,

My name is {seller_name} from {company_name}. We work with a small number of
private dental practices in {location} to bring in high-value treatment
enquiries: implants, Invisalign and smile makeovers.

I came across {lead_company_name} ({website}) and was impressed by your
reviews. Would you be open to a short call next week to see whether we could
help you fill more of those appointments?

Best regards,
{seller_name}
{company_name}
";

const EMAIL_STEP_1: &str = "\
Subject: Re: Premium patient enquiries for {lead_company_name}

Hello again,

I wanted to follow up on my note from last week. Practices we work with in
{location} typically see a steady flow of new cosmetic and implant
consultations within the first two months.

The number we have for the practice is {phone}. If there is a better one,
reply with it and a good time and I will call at your convenience.

Kind regards,
{seller_name}
{company_name}
";

const EMAIL_STEP_2: &str = "\
Subject: Last note from {company_name}

Hello,

I appreciate you are busy running {lead_company_name}, so this is my last
message. If attracting more premium patients in {location} becomes a priority,
just reply to this email and I will send over a short proposal.

Wishing you and the team all the best,
{seller_name}
{company_name}
";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Who the messages are from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderProfile {
    pub seller_name: String,
    pub company_name: String,
    pub default_location: String,
}

impl Default for SenderProfile {
    fn default() -> Self {
        Self {
            seller_name: "Alex".to_string(),
            company_name: "Premium Dental Solutions".to_string(),
            default_location: "London".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    sender: SenderProfile,
    template_dir: Option<PathBuf>,
    loaded: HashMap<String, String>,
}

impl TemplateRenderer {
    pub fn new(sender: SenderProfile) -> Self {
        Self {
            sender,
            template_dir: None,
            loaded: HashMap::new(),
        }
    }

    /// Look up `{template_id}.txt` in `dir` before the built-in templates.
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    pub fn sender(&self) -> &SenderProfile {
        &self.sender
    }

    /// Raw template text for `template_id`, read from the template directory
    /// or taken from the built-ins.
    pub fn load(&self, template_id: &str) -> Result<String, TemplateError> {
        if let Some(dir) = &self.template_dir {
            let path = dir.join(format!("{template_id}.txt"));
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    debug!(template = %template_id, path = %path.display(), "Loaded template file");
                    return Ok(text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(TemplateError::Io {
                        path: path.display().to_string(),
                        source,
                    })
                }
            }
        }
        builtin(template_id)
            .map(str::to_string)
            .ok_or_else(|| TemplateError::NotFound(template_id.to_string()))
    }

    /// Read every template in `template_ids` once, so rendering never touches
    /// the filesystem. Fails on the first id that cannot be resolved.
    pub fn preload<'a>(
        &mut self,
        template_ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), TemplateError> {
        for id in template_ids {
            if !self.loaded.contains_key(id) {
                let text = self.load(id)?;
                self.loaded.insert(id.to_string(), text);
            }
        }
        Ok(())
    }

    /// Render `template_id` for `lead` at 0-based `step`.
    ///
    /// Only preloaded templates and the built-ins are available here.
    pub fn render(
        &self,
        template_id: &str,
        lead: &Lead,
        step: u32,
    ) -> Result<RenderedMessage, TemplateError> {
        let template = self
            .loaded
            .get(template_id)
            .map(String::as_str)
            .or_else(|| builtin(template_id))
            .ok_or_else(|| TemplateError::NotFound(template_id.to_string()))?;
        Ok(self.render_text(template, lead, step))
    }

    pub fn render_text(&self, template: &str, lead: &Lead, step: u32) -> RenderedMessage {
        let location = self.location_for(lead);
        let step = step.to_string();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("seller_name", self.sender.seller_name.as_str()),
            ("company_name", self.sender.company_name.as_str()),
            ("lead_company_name", lead.company_name.as_str()),
            ("location", location),
            ("email", lead.email.as_deref().unwrap_or("")),
            ("phone", lead.phone.as_deref().unwrap_or("not provided")),
            ("website", lead.website_url.as_deref().unwrap_or("not available")),
            ("step", step.as_str()),
        ]);

        // One pass, so substituted values are never expanded again.
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
            vars.get(&caps[1])
                .map(|v| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });

        let mut subject = None;
        let mut body_lines = Vec::new();
        for line in rendered.trim().lines() {
            match line.strip_prefix(SUBJECT_PREFIX) {
                Some(s) if subject.is_none() => subject = Some(s.trim().to_string()),
                Some(_) => {}
                None => body_lines.push(line),
            }
        }
        let subject = subject
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("Partnership Opportunity - {}", lead.company_name));
        let body_text = body_lines.join("\n").trim().to_string();
        let body_html = Some(html_body(&body_text));

        RenderedMessage {
            subject,
            body_text,
            body_html,
        }
    }

    fn location_for<'a>(&'a self, lead: &Lead) -> &'a str {
        lead.address
            .as_deref()
            .and_then(|address| {
                LOCATIONS
                    .iter()
                    .find(|(needle, _)| address.contains(needle))
                    .map(|(_, name)| *name)
            })
            .unwrap_or(&self.sender.default_location)
    }
}

fn builtin(template_id: &str) -> Option<&'static str> {
    match template_id {
        "email_step_0" => Some(EMAIL_STEP_0),
        "email_step_1" => Some(EMAIL_STEP_1),
        "email_step_2" => Some(EMAIL_STEP_2),
        _ => None,
    }
}

fn html_body(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<html>\n<body style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\n{}\n</body>\n</html>",
        escaped.replace('\n', "<br>\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dripforge_core::LeadStatus;

    fn lead(address: Option<&str>) -> Lead {
        let now = Utc::now();
        Lead {
            id: "lead-1".into(),
            identity: "place-1".into(),
            company_name: "Smile Studio".into(),
            email: Some("info@smile.co.uk".into()),
            phone: None,
            website_url: Some("https://smile.co.uk".into()),
            address: address.map(str::to_string),
            contact_name: None,
            source: "googlemaps".into(),
            premium_score: 7,
            notes: None,
            current_step: 0,
            last_step_at: None,
            status: LeadStatus::New,
            last_error: None,
            discovered_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn builtin_templates_render_all_placeholders() {
        let renderer = TemplateRenderer::default();
        for step in 0..3 {
            let msg = renderer
                .render(&format!("email_step_{step}"), &lead(Some("10 Harley Street")), step)
                .unwrap();
            assert!(!msg.subject.is_empty());
            assert!(!msg.body_text.contains('{'), "unrendered placeholder in step {step}");
            assert!(!msg.body_text.starts_with(SUBJECT_PREFIX));
        }
    }

    #[test]
    fn subject_and_fallbacks() {
        let renderer = TemplateRenderer::default();
        let msg = renderer.render_text(
            "Subject: Hi {lead_company_name}\nCall {phone}, see {website} in {location}. Step {step}",
            &lead(Some("2 King's Road, Chelsea")),
            1,
        );
        assert_eq!(msg.subject, "Hi Smile Studio");
        assert_eq!(
            msg.body_text,
            "Call not provided, see https://smile.co.uk in Chelsea. Step 1"
        );
    }

    #[test]
    fn missing_subject_uses_default() {
        let renderer = TemplateRenderer::default();
        let msg = renderer.render_text("Hello from {seller_name}", &lead(None), 0);
        assert_eq!(msg.subject, "Partnership Opportunity - Smile Studio");
        assert_eq!(msg.body_text, "Hello from Alex");
    }

    #[test]
    fn unknown_address_uses_default_location() {
        let renderer = TemplateRenderer::new(SenderProfile {
            default_location: "Central London".into(),
            ..SenderProfile::default()
        });
        let msg = renderer.render_text("{location}", &lead(Some("1 High Road, Ilford")), 0);
        assert_eq!(msg.body_text, "Central London");
    }

    #[test]
    fn html_body_keeps_line_breaks() {
        let renderer = TemplateRenderer::default();
        let msg = renderer.render_text("Subject: x\nline one\nline <two>", &lead(None), 0);
        let html = msg.body_html.unwrap();
        assert!(html.contains("line one<br>\nline &lt;two&gt;"));
        assert!(html.starts_with("<html>"));
    }

    #[test]
    fn unknown_template_is_not_found() {
        let renderer = TemplateRenderer::default();
        let err = renderer.load("email_step_9").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(id) if id == "email_step_9"));
    }

    #[test]
    fn template_dir_overrides_builtin() {
        let dir = std::env::temp_dir().join(format!(
            "dripforge-templates-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("email_step_0.txt"), "Subject: Custom\nBody for {lead_company_name}").unwrap();

        let mut renderer = TemplateRenderer::default().with_template_dir(&dir);
        renderer.preload(["email_step_0", "email_step_1"]).unwrap();
        // Rendering uses the text read at preload time.
        std::fs::remove_file(dir.join("email_step_0.txt")).unwrap();
        let msg = renderer.render("email_step_0", &lead(None), 0).unwrap();
        assert_eq!(msg.subject, "Custom");
        assert_eq!(msg.body_text, "Body for Smile Studio");
        // Ids without a file still fall back to the built-ins.
        assert!(renderer.render("email_step_1", &lead(None), 1).is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let renderer = TemplateRenderer::default();
        let mut l = lead(Some("Chelsea"));
        l.company_name = "{phone} Dental {location}".into();
        let msg = renderer.render_text("{lead_company_name} / {unknown}", &l, 0);
        assert_eq!(msg.body_text, "{phone} Dental {location} / {unknown}");
    }

    #[test]
    fn template_dir_that_is_a_file_fails_preload() {
        let file = std::env::temp_dir().join(format!(
            "dripforge-not-a-dir-{}-{}.txt",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::write(&file, "not a directory").unwrap();

        let mut renderer = TemplateRenderer::default().with_template_dir(&file);
        let err = renderer.preload(["email_step_0"]).unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));

        std::fs::remove_file(&file).ok();
    }
}
