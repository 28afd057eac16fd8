use crate::commands::{
    configure, convert, critique, generate, mesh, optimize, report, run, solve,
};
use crate::config::Config;
use crate::mesh::{DomainPreset, FlowAxis};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flyai")]
#[command(about = "Prompt-to-aircraft aerodynamic design pipeline")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(short, long, value_name = "DIR", help = "Operate on an existing run workspace")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Commands {
    pub async fn execute(self, config: Config, workspace: Option<PathBuf>) -> Result<()> {
        match self {
            Commands::Generate(args) => {
                generate::handle_generate_command(config, &args, &workspace).await?;
            }
            Commands::Convert => {
                convert::handle_convert_command(config, &workspace)?;
            }
            Commands::Mesh(args) => {
                mesh::handle_mesh_command(config, &args, &workspace)?;
            }
            Commands::Solve(args) => {
                solve::handle_solve_command(config, &args, &workspace)?;
            }
            Commands::Report(args) => {
                report::handle_report_command(config, &args, &workspace)?;
            }
            Commands::Critique(args) => {
                critique::handle_critique_command(config, &args, &workspace).await?;
            }
            Commands::Optimize(args) => {
                optimize::handle_optimize_command(config, &args, &workspace).await?;
            }
            Commands::Run(args) => {
                run::handle_run_command(config, &args, &workspace).await?;
            }
            Commands::Config(args) => {
                configure::handle_config_command(config, args.command.clone())?;
            }
        }
        Ok(())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a CPACS aircraft from a natural-language prompt
    Generate(GenerateArgs),

    /// Convert the generated CPACS to a solid STEP file
    Convert,

    /// Mesh the external flow domain around the geometry
    Mesh(MeshArgs),

    /// Run the CFD solver on the meshed domain
    Solve(SolveArgs),

    /// Analyze the solver's convergence history
    Report(ReportArgs),

    /// Ask the vision model for one design improvement
    Critique(CritiqueArgs),

    /// Iteratively refine the design to reduce drag
    Optimize(OptimizeArgs),

    /// Full single pass: generate, convert, mesh, solve, report
    Run(RunArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(help = "Natural-language description of the aircraft or the change")]
    pub prompt: Option<String>,

    #[arg(long, help = "Generate a full document instead of patching the baseline")]
    pub from_scratch: bool,

    #[arg(long, value_name = "FILE", help = "Baseline CPACS to patch (overrides config)")]
    pub baseline: Option<PathBuf>,

    #[arg(long, help = "High-level design goal guiding the edits")]
    pub goal: Option<String>,

    #[arg(long, value_name = "FILE", help = "Flow image used as visual context")]
    pub image: Option<PathBuf>,
}

#[derive(Args)]
pub struct MeshArgs {
    #[arg(short, long, value_enum)]
    pub preset: Option<DomainPreset>,

    #[arg(short, long, value_enum, help = "Freestream flow axis")]
    pub axis: Option<FlowAxis>,
}

#[derive(Args)]
pub struct SolveArgs {
    #[arg(long, help = "Freestream Mach number")]
    pub mach: Option<f64>,

    #[arg(long, help = "Angle of attack [deg]")]
    pub aoa: Option<f64>,

    #[arg(long, help = "Solver iterations")]
    pub iters: Option<u32>,

    #[arg(long, help = "Run Euler (no viscosity/turbulence)")]
    pub inviscid: bool,
}

#[derive(Args)]
pub struct ReportArgs {
    #[arg(long, help = "Emit the report as JSON")]
    pub json: bool,
}

#[derive(Args)]
pub struct CritiqueArgs {
    #[arg(long, value_name = "FILE", help = "Flow image to critique (defaults to the run's flow.png)")]
    pub image: Option<PathBuf>,
}

#[derive(Args)]
pub struct OptimizeArgs {
    #[arg(help = "Natural-language description of the aircraft")]
    pub prompt: Option<String>,

    #[arg(short, long, default_value_t = 2, help = "Design-refinement rounds")]
    pub rounds: u32,
}

#[derive(Args)]
pub struct RunArgs {
    #[arg(help = "Natural-language description of the aircraft")]
    pub prompt: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommands>,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Open,

    /// Reset configuration to defaults
    Reset,
}
