use crate::cli::SolveArgs;
use crate::config::Config;
use crate::core::{Pipeline, SolveOverrides};
use crate::utils::output::print_success;
use anyhow::Result;
use std::path::PathBuf;

pub fn handle_solve_command(
    config: Config,
    args: &SolveArgs,
    workspace: &Option<PathBuf>,
) -> Result<()> {
    let workspace = super::existing_workspace(&config, workspace)?;
    let pipeline = Pipeline::new(config, workspace);

    let overrides = SolveOverrides {
        mach: args.mach,
        aoa_deg: args.aoa,
        iters: args.iters,
        inviscid: args.inviscid,
    };

    pipeline.solve(&overrides)?;
    print_success(&format!(
        "Solver run finished. Log written to {}",
        pipeline
            .workspace()
            .path(crate::workspace::SOLVER_LOG_FILE)
            .display()
    ));
    Ok(())
}
