pub mod configure;
pub mod convert;
pub mod critique;
pub mod generate;
pub mod mesh;
pub mod optimize;
pub mod report;
pub mod run;
pub mod solve;

use crate::config::Config;
use crate::workspace::RunWorkspace;
use anyhow::Result;
use std::path::PathBuf;

/// Workspace for commands that start a new run: an explicit `--workspace`
/// wins, otherwise a fresh run directory is created.
pub(crate) fn new_workspace(config: &Config, explicit: &Option<PathBuf>) -> Result<RunWorkspace> {
    let ws = match explicit {
        Some(dir) => RunWorkspace::open(dir)?,
        None => RunWorkspace::create(&config.general.workspace_root)?,
    };
    Ok(ws)
}

/// Workspace for stage commands that continue a run: an explicit
/// `--workspace` wins, otherwise the most recent run is used.
pub(crate) fn existing_workspace(
    config: &Config,
    explicit: &Option<PathBuf>,
) -> Result<RunWorkspace> {
    let ws = match explicit {
        Some(dir) => RunWorkspace::open(dir)?,
        None => RunWorkspace::latest(&config.general.workspace_root)?,
    };
    Ok(ws)
}
