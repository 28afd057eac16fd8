use crate::cli::ConfigCommands;
use crate::config::Config;
use crate::utils::error::AppError;
use crate::utils::prompt_yes_no;
use anyhow::Result;
use std::process::Command;

pub fn handle_config_command(mut config: Config, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) => handle_show_command(&config),
        Some(ConfigCommands::Open) => handle_open_command(),
        Some(ConfigCommands::Reset) => handle_reset_command(&mut config),
        None => handle_config_help(),
    }
}

fn handle_show_command(config: &Config) -> Result<()> {
    println!("⚙️  flyai Configuration");
    println!("======================");

    println!("General:");
    println!("  Workspace root: {}", config.general.workspace_root.display());
    println!("  Color: {}", config.general.color);
    println!("  Keep artifacts: {}", config.general.keep_artifacts);

    println!("LLM:");
    println!("  API base: {}", config.llm.api_base);
    if config.llm.api_key.is_some() {
        println!("  API key: ✓");
    }
    println!("  Design model: {}", config.llm.design_model);
    println!("  Vision model: {}", config.llm.vision_model);
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max repair attempts: {}", config.llm.max_repair_attempts);

    println!("Geometry:");
    if let Some(baseline) = &config.geometry.baseline {
        println!("  Baseline: {}", baseline.display());
    } else {
        println!("  Baseline: built-in wing template");
    }
    println!("  Converter: {}", config.geometry.converter_cmd);

    println!("Mesh:");
    println!("  Preset: {:?}", config.mesh.preset);
    println!("  Flow axis: {}", config.mesh.flow_axis);
    println!("  Gmsh command: {}", config.mesh.gmsh_cmd);

    println!("Solver:");
    println!("  SU2 command: {}", config.solver.su2_cmd);
    println!("  Mach: {}", config.solver.mach);
    println!("  AoA: {} deg", config.solver.aoa_deg);
    println!("  Reynolds: {:e}", config.solver.reynolds);
    println!("  Iterations: {}", config.solver.iters);
    println!("  Inviscid: {}", config.solver.inviscid);

    Ok(())
}

fn handle_config_help() -> Result<()> {
    println!("⚙️  Configuration Management");
    println!("==========================");
    println!("Available configuration commands:");
    println!("  flyai config show    - Show current configuration");
    println!("  flyai config open    - Open configuration file in editor");
    println!("  flyai config reset   - Reset configuration to defaults");
    println!();
    println!(
        "Configuration file location: {}",
        Config::config_file_path().display()
    );
    Ok(())
}

fn handle_open_command() -> Result<()> {
    Config::ensure_config_exists()?;

    let config_path = Config::config_file_path();
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| AppError::System(format!("Failed to launch editor '{}': {}", editor, e)))?;

    if !status.success() {
        return Err(AppError::System(format!("Editor exited with {}", status)).into());
    }
    Ok(())
}

fn handle_reset_command(config: &mut Config) -> Result<()> {
    if prompt_yes_no(
        "Are you sure you want to reset configuration to defaults? This will overwrite your current settings.",
    )? {
        *config = Config::default();
        config.save()?;
        println!("✓ Configuration reset to defaults!");
    } else {
        println!("Reset cancelled.");
    }
    Ok(())
}
