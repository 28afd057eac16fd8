use crate::cli::OptimizeArgs;
use crate::config::Config;
use crate::core::Pipeline;
use crate::utils::output::{OutputStyle, print_success};
use crate::utils::prompt_line;
use anyhow::Result;
use std::path::PathBuf;

pub async fn handle_optimize_command(
    config: Config,
    args: &OptimizeArgs,
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
        OutputStyle::title("flyai optimize:"),
        OutputStyle::muted(&workspace.dir().display().to_string())
    );

    let pipeline = Pipeline::new(config, workspace);
    let ledger = pipeline.optimize(&prompt, args.rounds).await?;

    print_success(&format!(
        "Optimize finished after {} round(s). Ledger written to {}",
        ledger.rounds.len(),
        pipeline
            .workspace()
            .path(crate::workspace::ITERATIONS_FILE)
            .display()
    ));
    Ok(())
}
