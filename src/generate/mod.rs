//! Outreach content generation.
//!
//! Generators turn one lead plus the campaign parameters into a subject and a
//! plain-text body. Backends only have to move a prompt to a model and bring
//! text back; prompt assembly and answer parsing live here so every backend
//! behaves the same.
mod html;
mod lm_client;
mod openai;

pub use html::{render_html, HtmlRenderer, LocalHtmlRenderer};
pub use lm_client::{LmCommandGenerator, LM_COMMAND_ENV};
pub use openai::{OpenAiGenerator, DEFAULT_OPENAI_MODEL, OPENAI_API_BASE};

use crate::error::GenerationUnavailable;
use crate::sheet::RowRecord;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Extra attempts allowed when the model answers with unparseable text.
const MAX_PARSE_RETRIES: usize = 2;

const OUTREACH_EMAIL_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/outreach_email.md"
));

/// Fixed per-campaign inputs shared by every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CampaignParams {
    pub on_behalf_of: String,
    pub background_info: String,
    pub call_to_action: String,
    pub closing: String,
}

/// Subject and plain-text body for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEmail {
    pub subject: String,
    pub body: String,
}

impl GeneratedEmail {
    /// Subject and body as stored in the `Full Email` column.
    pub fn full_text(&self) -> String {
        format!("{}\n\n{}", self.subject, self.body)
    }
}

pub trait ContentGenerator {
    fn generate(
        &self,
        row: &RowRecord,
        company_info: &str,
        campaign: &CampaignParams,
    ) -> Result<GeneratedEmail, GenerationUnavailable>;
}

fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder regex"))
}

/// Fill the outreach template for one row.
///
/// Placeholders are substituted in a single pass over the template, so values
/// are inserted verbatim even when they contain placeholder text themselves.
pub fn build_prompt(row: &RowRecord, company_info: &str, campaign: &CampaignParams) -> String {
    fill_template(OUTREACH_EMAIL_PROMPT, |name| match name {
        "on_behalf_of" => Some(campaign.on_behalf_of.as_str()),
        "background_info" => Some(campaign.background_info.as_str()),
        "call_to_action" => Some(campaign.call_to_action.as_str()),
        "closing" => Some(campaign.closing.as_str()),
        "company_name" => Some(row.company_name.as_str()),
        "company_info" => Some(company_info),
        "person_name" => Some(row.contact_name.as_str()),
        "person_headline" => Some(row.contact_headline.as_str()),
        "person_about" => Some(row.contact_about.as_str()),
        _ => None,
    })
}

/// Unknown placeholders are left as written.
fn fill_template<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| match lookup(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Send `prompt` through `invoke`, re-asking with the parse error when the
/// answer is not a usable email. Invocation failures are not retried.
pub(crate) fn generate_with_retries<F>(
    prompt: &str,
    mut invoke: F,
) -> Result<GeneratedEmail, GenerationUnavailable>
where
    F: FnMut(&str) -> Result<String, GenerationUnavailable>,
{
    let mut last_error = String::new();
    for attempt in 0..=MAX_PARSE_RETRIES {
        let answer = if attempt == 0 {
            invoke(prompt)?
        } else {
            tracing::debug!(attempt, error = %last_error, "re-asking after malformed answer");
            invoke(&retry_prompt(prompt, &last_error))?
        };
        match parse_email_response(&answer) {
            Ok(email) => return Ok(email),
            Err(err) => last_error = err,
        }
    }
    Err(GenerationUnavailable(format!(
        "malformed answer after {} attempts: {last_error}",
        MAX_PARSE_RETRIES + 1
    )))
}

fn retry_prompt(prompt: &str, error: &str) -> String {
    format!(
        "{prompt}\n\n## Previous answer error\n\nYour previous answer could not be used: {error}\n\
         Respond ONLY with the JSON object containing non-empty \"subject\" and \"email\" fields.\n"
    )
}

#[derive(Deserialize)]
struct EmailAnswer {
    #[serde(default)]
    subject: String,
    #[serde(default, alias = "body")]
    email: String,
}

/// Decode a `{"subject", "email"}` answer, tolerating code fences and prose
/// around the JSON object.
pub fn parse_email_response(text: &str) -> Result<GeneratedEmail, String> {
    let json_text = extract_json(text);
    let answer: EmailAnswer = serde_json::from_str(json_text).map_err(|err| {
        let preview: String = text.chars().take(200).collect();
        format!("parse answer as JSON: {err} (answer starts: {preview:?})")
    })?;
    let subject = answer.subject.trim();
    let body = answer.email.trim();
    if subject.is_empty() {
        return Err("answer has no subject".to_string());
    }
    if body.is_empty() {
        return Err("answer has no email body".to_string());
    }
    Ok(GeneratedEmail {
        subject: subject.to_string(),
        body: body.to_string(),
    })
}

/// Pull the JSON object out of a model answer.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        let start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => &text[open..=close],
        _ => text,
    }
}
