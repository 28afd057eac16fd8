use crate::cli::ReportArgs;
use crate::config::Config;
use crate::core::Pipeline;
use crate::utils::error::AppError;
use anyhow::Result;
use std::path::PathBuf;

pub fn handle_report_command(
    config: Config,
    args: &ReportArgs,
    workspace: &Option<PathBuf>,
) -> Result<()> {
    let workspace = super::existing_workspace(&config, workspace)?;
    let pipeline = Pipeline::new(config, workspace);

    let report = pipeline.report()?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::System(format!("Failed to serialize report: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", report);
    }
    Ok(())
}
