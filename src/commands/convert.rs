use crate::config::Config;
use crate::core::Pipeline;
use crate::utils::output::print_success;
use anyhow::Result;
use std::path::PathBuf;

pub fn handle_convert_command(config: Config, workspace: &Option<PathBuf>) -> Result<()> {
    let workspace = super::existing_workspace(&config, workspace)?;
    let pipeline = Pipeline::new(config, workspace);

    let step = pipeline.convert()?;
    print_success(&format!("Solid STEP written to {}", step.display()));
    Ok(())
}
