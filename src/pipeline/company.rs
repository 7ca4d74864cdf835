//! Company information enrichment.
//!
//! Rows that already carry a substantial `company_about` are used as-is; the
//! rest get a best-effort scrape of the company site. Enrichment never fails:
//! whatever goes wrong, the row keeps the text it came with.
use crate::sheet::RowRecord;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};

/// Minimum `company_about` length (in characters) that skips the fetch.
pub const DEFAULT_ENRICH_MIN_LENGTH: usize = 300;

/// Best-effort source of descriptive text about a company.
pub trait CompanyEnricher {
    /// Return text for `domain`, or an empty string when nothing is available.
    fn fetch(&self, domain: &str) -> String;
}

/// Pick the company information used for generation.
pub fn enrich(row: &RowRecord, min_length: usize, enricher: &dyn CompanyEnricher) -> String {
    if row.company_about.chars().count() >= min_length {
        return row.company_about.clone();
    }
    let fetched = enricher.fetch(&row.company_domain);
    if fetched.trim().is_empty() {
        tracing::debug!(row = row.index, "no company text fetched; keeping sheet value");
        return row.company_about.clone();
    }
    fetched
}

/// Scrapes paragraph text from a company's landing page.
pub struct HttpEnricher {
    agent: ureq::Agent,
}

impl HttpEnricher {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl CompanyEnricher for HttpEnricher {
    fn fetch(&self, domain: &str) -> String {
        let domain = domain.trim();
        if domain.is_empty() {
            return String::new();
        }
        let url = company_url(domain);
        let start = Instant::now();
        let html = match self
            .agent
            .get(&url)
            .call()
            .and_then(|mut response| response.body_mut().read_to_string())
        {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(%url, error = %err, "company page fetch failed");
                return String::new();
            }
        };
        let text = paragraph_text(&html);
        tracing::debug!(
            %url,
            elapsed_ms = start.elapsed().as_millis() as u64,
            text_chars = text.chars().count(),
            "company page fetched"
        );
        text
    }
}

/// Add an `https://` scheme to bare domains.
pub fn company_url(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// Join the text of every `<p>` element, whitespace collapsed.
pub fn paragraph_text(html: &str) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    let document = Html::parse_document(html);
    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect();
    paragraphs.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct StubEnricher {
        calls: Cell<usize>,
        domains: RefCell<Vec<String>>,
        response: String,
    }

    impl StubEnricher {
        fn returning(response: &str) -> Self {
            Self {
                calls: Cell::new(0),
                domains: RefCell::new(Vec::new()),
                response: response.to_string(),
            }
        }
    }

    impl CompanyEnricher for StubEnricher {
        fn fetch(&self, domain: &str) -> String {
            self.calls.set(self.calls.get() + 1);
            self.domains.borrow_mut().push(domain.to_string());
            self.response.clone()
        }
    }

    fn row_with_about(about: &str) -> RowRecord {
        RowRecord {
            index: 2,
            company_domain: "acme.test".to_string(),
            company_about: about.to_string(),
            ..RowRecord::default()
        }
    }

    #[test]
    fn long_about_text_skips_the_fetch() {
        let stub = StubEnricher::returning("scraped");
        let about = "a".repeat(DEFAULT_ENRICH_MIN_LENGTH);
        let info = enrich(&row_with_about(&about), DEFAULT_ENRICH_MIN_LENGTH, &stub);
        assert_eq!(info, about);
        assert_eq!(stub.calls.get(), 0);
    }

    #[test]
    fn threshold_counts_characters_not_bytes() {
        let stub = StubEnricher::returning("scraped");
        let about = "é".repeat(DEFAULT_ENRICH_MIN_LENGTH);
        enrich(&row_with_about(&about), DEFAULT_ENRICH_MIN_LENGTH, &stub);
        assert_eq!(stub.calls.get(), 0);
    }

    #[test]
    fn short_about_text_uses_fetched_text() {
        let stub = StubEnricher::returning("We build rockets.");
        let info = enrich(&row_with_about("Rockets"), DEFAULT_ENRICH_MIN_LENGTH, &stub);
        assert_eq!(info, "We build rockets.");
        assert_eq!(stub.calls.get(), 1);
        assert_eq!(stub.domains.borrow().as_slice(), ["acme.test".to_string()]);
    }

    #[test]
    fn empty_fetch_falls_back_to_sheet_text() {
        let stub = StubEnricher::returning("  ");
        let info = enrich(&row_with_about("Rockets"), DEFAULT_ENRICH_MIN_LENGTH, &stub);
        assert_eq!(info, "Rockets");
        assert_eq!(stub.calls.get(), 1);
    }

    #[test]
    fn company_url_adds_missing_scheme() {
        assert_eq!(company_url("acme.test"), "https://acme.test");
        assert_eq!(company_url("http://acme.test"), "http://acme.test");
        assert_eq!(company_url("https://acme.test/about"), "https://acme.test/about");
    }

    #[test]
    fn paragraph_text_ignores_other_elements() {
        let html = r#"<html><head><title>Acme</title></head><body>
            <h1>Welcome</h1>
            <p>We build   <b>rockets</b>.</p>
            <div>Navigation</div>
            <p>
              Since 1999.
            </p>
            <p></p>
        </body></html>"#;
        assert_eq!(paragraph_text(html), "We build rockets. Since 1999.");
    }
}
