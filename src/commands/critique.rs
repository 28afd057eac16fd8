use crate::cli::CritiqueArgs;
use crate::config::Config;
use crate::core::Pipeline;
use crate::utils::output::OutputStyle;
use anyhow::Result;
use std::path::PathBuf;

pub async fn handle_critique_command(
    config: Config,
    args: &CritiqueArgs,
    workspace: &Option<PathBuf>,
) -> Result<()> {
    let workspace = super::existing_workspace(&config, workspace)?;
    let pipeline = Pipeline::new(config, workspace);

    let suggestion = pipeline.critique(args.image.as_deref()).await?;
    println!("{}", OutputStyle::value(&suggestion));
    Ok(())
}
