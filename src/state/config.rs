//! Run configuration helpers.
//!
//! Loads, validates, and writes `config.json`. Secrets never live here; they
//! come from the environment when collaborators are built.
use super::types::{DEFAULT_ENRICH_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};
use super::{
    GeneratorConfig, RunConfig, RunPaths, SheetSource, CONFIG_SCHEMA_VERSION, DEFAULT_LM_COMMAND,
    DEFAULT_WORKBOOK_PATH,
};
use crate::generate::{CampaignParams, LM_COMMAND_ENV};
use crate::pipeline::{RetryPolicy, DEFAULT_ENRICH_MIN_LENGTH};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

/// Build the config written by `init`.
pub fn default_config() -> RunConfig {
    RunConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        sheet: SheetSource::Workbook {
            path: PathBuf::from(DEFAULT_WORKBOOK_PATH),
        },
        generator: GeneratorConfig::Command {
            command: DEFAULT_LM_COMMAND.to_string(),
        },
        campaign: CampaignParams {
            on_behalf_of: "Your Name".to_string(),
            background_info: String::new(),
            call_to_action: "Would you be open to a short call next week?".to_string(),
            closing: "Best regards".to_string(),
        },
        enrich_min_length: DEFAULT_ENRICH_MIN_LENGTH,
        enrich_timeout_secs: DEFAULT_ENRICH_TIMEOUT_SECS,
        request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        write_retry: RetryPolicy::default(),
    }
}

/// Load `config.json` from the run directory.
pub fn load_config(paths: &RunPaths) -> Result<RunConfig> {
    let path = paths.config_path();
    let bytes = fs::read(&path).with_context(|| {
        format!(
            "read config {} (run `sheetmail init` first)",
            path.display()
        )
    })?;
    let config: RunConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Persist a config in a stable JSON format.
pub fn write_config(paths: &RunPaths, config: &RunConfig) -> Result<()> {
    let path = paths.config_path();
    fs::create_dir_all(paths.root())
        .with_context(|| format!("create run dir {}", paths.root().display()))?;
    let text = serde_json::to_string_pretty(config).context("serialize run config")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_config(config: &RunConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    match &config.sheet {
        SheetSource::Workbook { path } => {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("sheet.path must be non-empty"));
            }
        }
        SheetSource::Google {
            spreadsheet_id,
            worksheet,
            ..
        } => {
            if spreadsheet_id.trim().is_empty() {
                return Err(anyhow!("sheet.spreadsheet_id must be non-empty"));
            }
            if worksheet.trim().is_empty() {
                return Err(anyhow!("sheet.worksheet must be non-empty"));
            }
        }
    }
    match &config.generator {
        GeneratorConfig::Command { command } => {
            if command.trim().is_empty() {
                return Err(anyhow!("generator.command must be non-empty"));
            }
        }
        GeneratorConfig::Openai { model, .. } => {
            if model.trim().is_empty() {
                return Err(anyhow!("generator.model must be non-empty"));
            }
        }
    }
    if config.campaign.on_behalf_of.trim().is_empty() {
        return Err(anyhow!("campaign.on_behalf_of must be non-empty"));
    }
    if config.write_retry.max_attempts == 0 {
        return Err(anyhow!("write_retry.max_attempts must be at least 1"));
    }
    Ok(())
}

/// Resolve the LM command: explicit flag > `SHEETMAIL_LM_COMMAND` > config.
///
/// An OpenAI-backed config only switches to a command when `--lm` is given;
/// `None` means "use the configured API backend".
pub fn resolve_lm_command(explicit: Option<&str>, config: &RunConfig) -> Option<String> {
    let env_command = std::env::var(LM_COMMAND_ENV).ok();
    pick_lm_command(explicit, env_command.as_deref(), config)
}

fn pick_lm_command(
    explicit: Option<&str>,
    env_command: Option<&str>,
    config: &RunConfig,
) -> Option<String> {
    let candidates = match &config.generator {
        GeneratorConfig::Command { command } => vec![explicit, env_command, Some(command.as_str())],
        GeneratorConfig::Openai { .. } => vec![explicit],
    };
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|command| !command.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
