use crate::cli::MeshArgs;
use crate::config::Config;
use crate::core::Pipeline;
use crate::utils::output::{print_info, print_success};
use anyhow::Result;
use std::path::PathBuf;

pub fn handle_mesh_command(
    config: Config,
    args: &MeshArgs,
    workspace: &Option<PathBuf>,
) -> Result<()> {
    let workspace = super::existing_workspace(&config, workspace)?;
    let pipeline = Pipeline::new(config, workspace);

    let domain = pipeline.mesh(args.preset, args.axis)?;
    print_info(&format!(
        "Farfield box: x [{:.2}, {:.2}]  y [{:.2}, {:.2}]  z [{:.2}, {:.2}]",
        domain.x0, domain.x1, domain.y0, domain.y1, domain.z0, domain.z1
    ));
    print_success(&format!(
        "SU2 mesh written to {}",
        pipeline.workspace().path(crate::workspace::MESH_FILE).display()
    ));
    Ok(())
}
