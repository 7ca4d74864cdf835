use crate::cli::InitArgs;
use crate::state::{default_config, validate_config, write_config, GeneratorConfig, RunPaths, SheetSource};
use crate::sheet::{WorkbookFile, GOOGLE_SHEETS_API_BASE, INPUT_COLUMNS};
use anyhow::{anyhow, Result};
use std::path::Path;

pub fn run_init(run_dir: &Path, args: &InitArgs) -> Result<()> {
    let paths = RunPaths::new(run_dir.to_path_buf());
    let config_path = paths.config_path();
    if config_path.is_file() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }

    let mut config = default_config();
    if let Some(workbook) = &args.workbook {
        config.sheet = SheetSource::Workbook {
            path: workbook.clone(),
        };
    }
    if let Some(spreadsheet_id) = &args.google_sheet {
        config.sheet = SheetSource::Google {
            spreadsheet_id: spreadsheet_id.clone(),
            worksheet: args.worksheet.clone(),
            api_base: GOOGLE_SHEETS_API_BASE.to_string(),
        };
    }
    if let Some(sender) = &args.on_behalf_of {
        config.campaign.on_behalf_of = sender.clone();
    }
    if let Some(command) = &args.lm {
        config.generator = GeneratorConfig::Command {
            command: command.clone(),
        };
    }
    validate_config(&config)?;
    write_config(&paths, &config)?;
    println!("wrote {}", config_path.display());

    if let SheetSource::Workbook { path } = &config.sheet {
        let workbook_path = if path.is_absolute() {
            path.clone()
        } else {
            run_dir.join(path)
        };
        if !workbook_path.exists() {
            let header = INPUT_COLUMNS.iter().map(|name| name.to_string()).collect();
            WorkbookFile::create(&workbook_path, vec![header])?;
            println!("wrote starter workbook {}", workbook_path.display());
        }
    }
    Ok(())
}
