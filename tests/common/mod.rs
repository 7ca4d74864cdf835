//! Shared test infrastructure for CLI integration tests.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const HEADER: [&str; 6] = [
    "company_name",
    "company_domain",
    "full_name",
    "headline",
    "about",
    "company_about",
];

/// Stand-in model: fails for prompts mentioning FailCo, otherwise answers
/// with a fixed email.
const LM_SCRIPT: &str = r#"#!/bin/sh
prompt=$(cat)
case "$prompt" in
  *FailCo*) echo "model offline" >&2; exit 1 ;;
esac
printf '%s' '{"subject":"Quick idea","email":"Hello there\n\nBye"}'
"#;

/// Temp run directory with a workbook and a scripted LM command.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new(companies: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let workspace = Self { dir };
        fs::create_dir_all(workspace.run_dir()).expect("create run dir");

        let mut rows = vec![HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        for (n, company) in companies.iter().enumerate() {
            rows.push(vec![
                company.to_string(),
                format!("{}.test", company.to_lowercase()),
                format!("Person {n}"),
                "Head of Ops".to_string(),
                String::new(),
                format!("{company} makes things."),
            ]);
        }
        let workbook = serde_json::json!({ "rows": rows });
        fs::write(
            workspace.workbook_path(),
            serde_json::to_string_pretty(&workbook).expect("serialize workbook"),
        )
        .expect("write workbook");
        fs::write(workspace.script_path(), LM_SCRIPT).expect("write lm script");
        workspace
    }

    pub fn run_dir(&self) -> PathBuf {
        self.dir.path().join("run")
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.run_dir().join("leads.json")
    }

    fn script_path(&self) -> PathBuf {
        self.dir.path().join("lm.sh")
    }

    pub fn lm_command(&self) -> String {
        let script = self.script_path();
        shell_words::join(["sh", script.to_str().expect("utf-8 temp path")])
    }

    /// Run `sheetmail --run-dir <run> <args>` from inside the temp dir.
    pub fn sheetmail(&self, args: &[&str]) -> Output {
        let run_dir = self.run_dir();
        Command::new(env!("CARGO_BIN_EXE_sheetmail"))
            .arg("--run-dir")
            .arg(&run_dir)
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("SHEETMAIL_LM_COMMAND")
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn sheetmail")
    }

    /// `init` with the scripted model, then turn off web enrichment.
    pub fn init(&self) {
        let lm = self.lm_command();
        let output = self.sheetmail(&[
            "init",
            "--workbook",
            "leads.json",
            "--on-behalf-of",
            "Sam Lee",
            "--lm",
            &lm,
        ]);
        assert_success(&output);

        let config_path = self.run_dir().join("config.json");
        let mut config = read_json(&config_path);
        config["enrich_min_length"] = serde_json::json!(0);
        fs::write(&config_path, config.to_string()).expect("rewrite config");
    }

    pub fn workbook_rows(&self) -> Vec<Vec<String>> {
        let workbook = read_json(&self.workbook_path());
        serde_json::from_value(workbook["rows"].clone()).expect("workbook rows")
    }

    /// Cell value by column name; `None` for cells never written.
    pub fn cell(&self, row: usize, column: &str) -> Option<String> {
        let rows = self.workbook_rows();
        let col = rows[0].iter().position(|name| name == column)?;
        rows.get(row - 1)?.get(col).cloned()
    }
}

pub fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).expect("read json file");
    serde_json::from_str(&text).expect("parse json file")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "sheetmail failed\nstdout:\n{}\nstderr:\n{}",
        stdout(output),
        stderr(output)
    );
}
