//! Command workflows.
//!
//! Each command loads the run directory, builds the collaborators its config
//! names, and hands them to the pipeline. The pipeline itself never touches
//! the run directory.
mod context;
mod init;
mod preview;
mod run;
mod status;

pub use context::{default_run_dir, RunContext};
pub use init::run_init;
pub use preview::run_preview;
pub use run::{run_resume, run_run};
pub use status::{run_reset, run_status, status_summary, StatusSummary};
