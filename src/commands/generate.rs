use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::core::{GenerateOptions, Pipeline};
use crate::utils::output::{OutputStyle, print_success};
use crate::utils::prompt_line;
use anyhow::Result;
use std::path::PathBuf;

pub async fn handle_generate_command(
    config: Config,
    args: &GenerateArgs,
    workspace: &Option<PathBuf>,
) -> Result<()> {
    let prompt = match &args.prompt {
        Some(prompt) => prompt.clone(),
        None => {
            match prompt_line(&format!("{}: ", OutputStyle::label("Design prompt")))? {
                Some(prompt) if !prompt.is_empty() => prompt,
                _ => return Ok(()), // ESC or empty input cancels
            }
        }
    };

    let workspace = super::new_workspace(&config, workspace)?;
    let pipeline = Pipeline::new(config, workspace);

    let options = GenerateOptions {
        from_scratch: args.from_scratch,
        baseline: args.baseline.clone(),
        goal: args.goal.clone(),
        image: args.image.clone(),
    };

    let path = pipeline.generate(&prompt, &options).await?;
    print_success(&format!("CPACS written to {}", path.display()));
    Ok(())
}
