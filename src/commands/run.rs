use crate::cli::RunArgs;
use crate::config::Config;
use crate::core::Pipeline;
use crate::utils::output::{OutputStyle, print_success};
use crate::utils::prompt_line;
use anyhow::Result;
use std::path::PathBuf;

/// One full pass: generate, convert, mesh, solve, report.
pub async fn handle_run_command(
    config: Config,
    args: &RunArgs,
    workspace: &Option<PathBuf>,
) -> Result<()> {
    let prompt = match &args.prompt {
        Some(prompt) => prompt.clone(),
        None => {
            match prompt_line(&format!("{}: ", OutputStyle::label("Design prompt")))? {
                Some(prompt) if !prompt.is_empty() => prompt,
                _ => return Ok(()),
            }
        }
    };

    let workspace = super::new_workspace(&config, workspace)?;
    println!(
        "{} {}",
        OutputStyle::title("flyai run:"),
        OutputStyle::muted(&workspace.dir().display().to_string())
    );

    let pipeline = Pipeline::new(config, workspace);
    let report = pipeline.run_once(&prompt).await?;
    print!("{}", report);

    print_success("Pipeline finished");
    Ok(())
}
