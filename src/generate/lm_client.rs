//! Local LM command backend.
//!
//! Runs a user-configured command with the prompt on stdin and reads the
//! answer from stdout. Any tool that takes text in and gives text out works
//! (`llm`, `ollama run <model>`, a wrapper script).
//!
//! The command is resolved in priority order:
//! 1. `--lm` CLI flag
//! 2. `SHEETMAIL_LM_COMMAND` environment variable
//! 3. `generator.command` in `config.json`
use super::{build_prompt, generate_with_retries, CampaignParams, ContentGenerator, GeneratedEmail};
use crate::error::GenerationUnavailable;
use crate::sheet::RowRecord;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

pub const LM_COMMAND_ENV: &str = "SHEETMAIL_LM_COMMAND";

/// Generator backed by a local command.
#[derive(Debug, Clone)]
pub struct LmCommandGenerator {
    program: PathBuf,
    args: Vec<String>,
}

impl LmCommandGenerator {
    /// Parse a shell-style command line and resolve its program on `PATH`.
    pub fn new(command: &str) -> Result<Self> {
        let mut argv =
            shell_words::split(command).with_context(|| format!("parse LM command: {command}"))?;
        if argv.is_empty() {
            return Err(anyhow!("LM command is empty"));
        }
        let program_name = argv.remove(0);
        let program = which::which(&program_name)
            .with_context(|| format!("resolve LM command program {program_name}"))?;
        Ok(Self {
            program,
            args: argv,
        })
    }

    fn invoke(&self, prompt: &str) -> Result<String, GenerationUnavailable> {
        let start = Instant::now();
        let unavailable =
            |what: &str, err: std::io::Error| GenerationUnavailable(format!("{what}: {err}"));
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| unavailable("spawn LM command", err))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .map_err(|err| unavailable("write prompt to LM stdin", err))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| unavailable("wait for LM command", err))?;

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = output.stdout.len(),
            "lm invoke complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationUnavailable(format!(
                "LM command failed with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|err| GenerationUnavailable(format!("decode LM stdout as UTF-8: {err}")))
    }
}

impl ContentGenerator for LmCommandGenerator {
    fn generate(
        &self,
        row: &RowRecord,
        company_info: &str,
        campaign: &CampaignParams,
    ) -> Result<GeneratedEmail, GenerationUnavailable> {
        let prompt = build_prompt(row, company_info, campaign);
        generate_with_retries(&prompt, |prompt| self.invoke(prompt))
    }
}
