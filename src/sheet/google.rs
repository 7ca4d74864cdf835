//! Google Sheets store over the REST v4 `values` API.
//!
//! Authentication is a bearer access token handed in by the caller; obtaining
//! and refreshing that token is the credential provider's job.
use super::SheetStore;
use crate::error::SheetError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const GOOGLE_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
pub const GOOGLE_ACCESS_TOKEN_ENV: &str = "GOOGLE_ACCESS_TOKEN";

#[derive(Debug, Default, Deserialize, Serialize)]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<Vec<Value>>,
}

/// Spreadsheet column letters for a 1-based column index (`27 -> "AA"`).
pub fn col_letter(col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// One worksheet inside a Google spreadsheet.
pub struct GoogleSheet {
    agent: ureq::Agent,
    base: Url,
    spreadsheet_id: String,
    worksheet: String,
    token: String,
}

impl GoogleSheet {
    pub fn new(
        api_base: &str,
        spreadsheet_id: &str,
        worksheet: &str,
        token: String,
        timeout: Duration,
    ) -> Result<Self> {
        let base = Url::parse(api_base).with_context(|| format!("parse API base {api_base}"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("API base {api_base} cannot hold a path"));
        }
        if spreadsheet_id.trim().is_empty() {
            return Err(anyhow!("spreadsheet id must be non-empty"));
        }
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Ok(Self {
            agent,
            base,
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            worksheet: worksheet.to_string(),
            token,
        })
    }

    /// Build a store using the access token from the environment.
    pub fn from_env(
        api_base: &str,
        spreadsheet_id: &str,
        worksheet: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let token = std::env::var(GOOGLE_ACCESS_TOKEN_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("credential provider unavailable: {GOOGLE_ACCESS_TOKEN_ENV} is not set")
            })?;
        Self::new(api_base, spreadsheet_id, worksheet, token, timeout)
    }

    fn a1(&self, range: &str) -> String {
        let title = self.worksheet.replace('\'', "''");
        if range.is_empty() {
            format!("'{title}'")
        } else {
            format!("'{title}'!{range}")
        }
    }

    fn values_url(&self, range: &str) -> Result<Url, SheetError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetError::Permanent("API base cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                self.a1(range).as_str(),
            ]);
        Ok(url)
    }

    fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.values_url(range)?;
        let mut response = self
            .agent
            .get(url.as_str())
            .header("Authorization", format!("Bearer {}", self.token))
            .call()
            .map_err(classify_error)?;
        let body: ValueRange = response.body_mut().read_json().map_err(classify_error)?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn put_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), SheetError> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = ValueRange {
            values: values
                .into_iter()
                .map(|row| row.into_iter().map(Value::String).collect())
                .collect(),
        };
        self.agent
            .put(url.as_str())
            .header("Authorization", format!("Bearer {}", self.token))
            .send_json(&body)
            .map_err(classify_error)?;
        Ok(())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn classify_error(err: ureq::Error) -> SheetError {
    match err {
        ureq::Error::StatusCode(code) if code == 429 || code >= 500 => {
            SheetError::Transient(format!("HTTP {code}"))
        }
        ureq::Error::StatusCode(code) => SheetError::Permanent(format!("HTTP {code}")),
        ureq::Error::Io(_)
        | ureq::Error::Timeout(_)
        | ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed => SheetError::Transient(err.to_string()),
        other => SheetError::Permanent(other.to_string()),
    }
}

impl SheetStore for GoogleSheet {
    fn header(&self) -> Result<Vec<String>, SheetError> {
        Ok(self.get_values("1:1")?.into_iter().next().unwrap_or_default())
    }

    fn set_header(&mut self, header: &[String]) -> Result<(), SheetError> {
        self.put_values("A1", vec![header.to_vec()])
    }

    fn data_row_count(&self) -> Result<usize, SheetError> {
        Ok(self.get_values("")?.len().saturating_sub(1))
    }

    fn row_values(&self, start: usize, end: usize) -> Result<Vec<Vec<String>>, SheetError> {
        if start == 0 || end < start {
            return Ok(Vec::new());
        }
        self.get_values(&format!("{start}:{end}"))
    }

    fn set_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        if row == 0 || col == 0 {
            return Err(SheetError::Permanent(format!(
                "cell address ({row}, {col}) is not 1-based"
            )));
        }
        let address = format!("{}{row}", col_letter(col));
        self.put_values(&address, vec![vec![value.to_string()]])
    }
}
