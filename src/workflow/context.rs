use crate::generate::{ContentGenerator, LmCommandGenerator, OpenAiGenerator};
use crate::pipeline::{HttpEnricher, RowWriter, ThreadSleeper};
use crate::sheet::{GoogleSheet, SheetStore, WorkbookFile};
use crate::state::{
    load_config, resolve_lm_command, validate_config, GeneratorConfig, RunConfig, RunPaths,
    SheetSource,
};
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default run directory: `<data_local_dir>/sheetmail/default`.
pub fn default_run_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(data_dir.join("sheetmail").join("default"))
}

/// Loaded, validated run directory.
pub struct RunContext {
    pub paths: RunPaths,
    pub config: RunConfig,
}

impl RunContext {
    pub fn load(run_dir: &Path) -> Result<Self> {
        let paths = RunPaths::new(run_dir.to_path_buf());
        let config = load_config(&paths)?;
        validate_config(&config)?;
        Ok(Self { paths, config })
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    pub fn open_sheet(&self) -> Result<Box<dyn SheetStore>> {
        match &self.config.sheet {
            SheetSource::Workbook { path } => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    self.paths.root().join(path)
                };
                tracing::debug!(path = %path.display(), "opening workbook");
                Ok(Box::new(WorkbookFile::open(&path)?))
            }
            SheetSource::Google {
                spreadsheet_id,
                worksheet,
                api_base,
            } => {
                tracing::debug!(spreadsheet_id = %spreadsheet_id, worksheet = %worksheet, "opening google sheet");
                Ok(Box::new(GoogleSheet::from_env(
                    api_base,
                    spreadsheet_id,
                    worksheet,
                    self.request_timeout(),
                )?))
            }
        }
    }

    pub fn build_generator(&self, lm_override: Option<&str>) -> Result<Box<dyn ContentGenerator>> {
        if let Some(command) = resolve_lm_command(lm_override, &self.config) {
            tracing::debug!(command = %command, "using LM command generator");
            return Ok(Box::new(LmCommandGenerator::new(&command)?));
        }
        match &self.config.generator {
            GeneratorConfig::Openai { model, base_url } => {
                tracing::debug!(model = %model, "using OpenAI generator");
                Ok(Box::new(OpenAiGenerator::from_env(
                    base_url,
                    model,
                    self.request_timeout(),
                )?))
            }
            GeneratorConfig::Command { .. } => Err(anyhow!("no LM command configured")),
        }
    }

    pub fn build_enricher(&self) -> HttpEnricher {
        HttpEnricher::new(Duration::from_secs(self.config.enrich_timeout_secs))
    }

    pub fn build_writer(&self) -> RowWriter {
        RowWriter::new(self.config.write_retry, Box::new(ThreadSleeper))
    }
}
