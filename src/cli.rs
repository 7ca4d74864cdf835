//! CLI argument parsing for the outreach workflow.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "sheetmail",
    version,
    about = "Generate personalized outreach emails for spreadsheet leads",
    after_help = "Commands:\n  init --workbook <file>   Write a default config.json for the run directory\n  preview                  Show the rows a run would cover\n  run [--start N] [--end N] Generate and write emails for a row range\n  resume                   Continue a paused run from its cursor\n  status                   Show the persisted cursor and last report\n  reset                    Discard a paused run\n\nExamples:\n  sheetmail init --workbook leads.json --on-behalf-of \"Sam Lee\"\n  sheetmail run --start 2 --end 50\n  sheetmail resume\n  sheetmail status --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Run directory holding config.json, cursor.json, and run history
    #[arg(long, global = true, value_name = "DIR")]
    pub run_dir: Option<PathBuf>,

    /// Log debug detail to stderr (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Preview(PreviewArgs),
    Run(RunArgs),
    Resume(ResumeArgs),
    Status(StatusArgs),
    Reset(ResetArgs),
}

/// 1-based sheet rows; row 1 is the header.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// First row to process (default: first data row)
    #[arg(long, value_name = "ROW")]
    pub start: Option<usize>,

    /// Row to stop before (default: one past the last data row)
    #[arg(long, value_name = "ROW")]
    pub end: Option<usize>,
}

#[derive(Parser, Debug)]
#[command(about = "Write a default config.json")]
pub struct InitArgs {
    /// Local JSON workbook holding the leads
    #[arg(long, value_name = "PATH", conflicts_with = "google_sheet")]
    pub workbook: Option<PathBuf>,

    /// Google spreadsheet id holding the leads
    #[arg(long, value_name = "ID")]
    pub google_sheet: Option<String>,

    /// Worksheet title inside the Google spreadsheet
    #[arg(long, value_name = "TITLE", default_value = "Sheet1")]
    pub worksheet: String,

    /// Sender the emails are written on behalf of
    #[arg(long, value_name = "NAME")]
    pub on_behalf_of: Option<String>,

    /// LM command that reads a prompt on stdin and answers on stdout
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Overwrite an existing config.json
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Show the rows a run would cover (no writes)")]
pub struct PreviewArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Generate and write emails for a row range")]
pub struct RunArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// LM command override (takes precedence over SHEETMAIL_LM_COMMAND)
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Discard a paused run instead of refusing to start
    #[arg(long)]
    pub restart: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Continue a paused run from its cursor")]
pub struct ResumeArgs {
    /// LM command override (takes precedence over SHEETMAIL_LM_COMMAND)
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Show the persisted cursor and last report")]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Discard a paused run")]
pub struct ResetArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_range_and_global_flags() {
        let args = RootArgs::try_parse_from([
            "sheetmail", "run", "--start", "3", "--end", "9", "--run-dir", "/tmp/x", "--verbose",
        ])
        .expect("parse");
        assert!(args.verbose);
        assert_eq!(args.run_dir, Some(PathBuf::from("/tmp/x")));
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.range.start, Some(3));
                assert_eq!(run.range.end, Some(9));
                assert!(!run.restart);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_rejects_both_sheet_sources() {
        let result = RootArgs::try_parse_from([
            "sheetmail",
            "init",
            "--workbook",
            "leads.json",
            "--google-sheet",
            "abc",
        ]);
        assert!(result.is_err());
    }
}
