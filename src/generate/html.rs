//! Plain-text to HTML email body conversion.
//!
//! The output uses exactly two kinds of markup: `<br>` line breaks (a blank
//! line becomes `<br><br>`) and `<a>` anchors around bare URLs.
use crate::error::GenerationUnavailable;
use regex::Regex;
use std::sync::OnceLock;

pub trait HtmlRenderer {
    fn render(&self, body: &str) -> Result<String, GenerationUnavailable>;
}

/// Deterministic local rendering; never fails.
pub struct LocalHtmlRenderer;

impl HtmlRenderer for LocalHtmlRenderer {
    fn render(&self, body: &str) -> Result<String, GenerationUnavailable> {
        Ok(render_html(body))
    }
}

const PARAGRAPH_BREAK: &str = "<br><br>";
const LINE_BREAK: &str = "<br>";
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"'];

fn paragraph_split() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n\s*").expect("paragraph regex"))
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:https?://|www\.)[^\s<>"]+"#).expect("url regex"))
}

/// Convert a plain-text email body to HTML.
pub fn render_html(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    paragraph_split()
        .split(normalized.trim_matches('\n'))
        .map(|paragraph| {
            paragraph
                .split('\n')
                .map(linkify)
                .collect::<Vec<_>>()
                .join(LINE_BREAK)
        })
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK)
}

fn linkify(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for found in url_pattern().find_iter(line) {
        out.push_str(&escape(&line[last..found.start()]));
        let candidate = found.as_str();
        let url = candidate.trim_end_matches(TRAILING_PUNCTUATION);
        let href = if url.starts_with("www.") {
            format!("https://{url}")
        } else {
            url.to_string()
        };
        out.push_str(&format!(r#"<a href="{}">{}</a>"#, escape(&href), escape(url)));
        out.push_str(&escape(&candidate[url.len()..]));
        last = found.end();
    }
    out.push_str(&escape(&line[last..]));
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
