use crate::mesh::{DomainPreset, FlowAxis};
use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub llm: LlmConfig,
    pub geometry: GeometryConfig,
    pub mesh: MeshConfig,
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory under which run workspaces are created
    pub workspace_root: PathBuf,
    pub color: bool,
    /// Keep intermediate artifacts (gmsh script, raw logs) after a run
    #[serde(default = "default_true")]
    pub keep_artifacts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_base: String,
    #[serde(
        default,
        serialize_with = "crate::utils::format::serialize_option_string",
        deserialize_with = "crate::utils::format::deserialize_option_string"
    )]
    pub api_key: Option<String>,
    /// Model used for CPACS generation and edit patches
    pub design_model: String,
    /// Vision-capable model used for design critique
    pub vision_model: String,
    pub temperature: f64,
    /// Attempts for the generate-validate-repair loop
    pub max_repair_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Baseline CPACS file edited by prompt patches; a built-in single-wing
    /// template is used when unset
    #[serde(default)]
    pub baseline: Option<PathBuf>,
    /// CPACS-to-STEP converter invocation with {input}/{output} placeholders
    pub converter_cmd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub preset: DomainPreset,
    pub flow_axis: FlowAxis,
    pub gmsh_cmd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub su2_cmd: String,
    pub mach: f64,
    pub aoa_deg: f64,
    pub reynolds: f64,
    pub iters: u32,
    /// Euler run instead of RANS/SA
    pub inviscid: bool,
    /// Lines of the solver log surfaced on failure
    pub log_tail: usize,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                workspace_root: PathBuf::from("runs"),
                color: true,
                keep_artifacts: true,
            },
            llm: LlmConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: None,
                design_model: "gpt-4.1".to_string(),
                vision_model: "gpt-4o-mini".to_string(),
                temperature: 0.2,
                max_repair_attempts: 3,
            },
            geometry: GeometryConfig {
                baseline: None,
                converter_cmd: "cpacs2step {input} {output}".to_string(),
            },
            mesh: MeshConfig {
                preset: DomainPreset::Small,
                flow_axis: FlowAxis::X,
                gmsh_cmd: "gmsh".to_string(),
            },
            solver: SolverConfig {
                su2_cmd: "SU2_CFD".to_string(),
                mach: 0.2,
                aoa_deg: 2.0,
                reynolds: 5e6,
                iters: 800,
                inviscid: false,
                log_tail: 80,
            },
        }
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        Self::load_custom(&Self::config_file_path())
    }

    pub fn ensure_config_exists() -> AppResult<()> {
        let config_path = Self::config_file_path();
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save()?;
        }
        Ok(())
    }

    pub fn load_custom(config_path: &std::path::Path) -> AppResult<Self> {
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save()?;
            return Ok(default_config);
        }

        let content =
            std::fs::read_to_string(config_path).map_err(|e| AppError::Io(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::System(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.geometry.converter_cmd.trim().is_empty() {
            return Err(AppError::System(
                "Geometry converter command cannot be empty".to_string(),
            ));
        }

        if self.mesh.gmsh_cmd.trim().is_empty() {
            return Err(AppError::System("Gmsh command cannot be empty".to_string()));
        }

        if self.solver.su2_cmd.trim().is_empty() {
            return Err(AppError::System("SU2 command cannot be empty".to_string()));
        }

        if self.solver.mach <= 0.0 {
            return Err(AppError::System(
                "Freestream Mach number must be positive".to_string(),
            ));
        }

        if self.solver.iters == 0 {
            return Err(AppError::System(
                "Solver iteration count must be at least 1".to_string(),
            ));
        }

        if self.llm.temperature <= 0.0 || self.llm.temperature > 2.0 {
            return Err(AppError::System(
                "LLM temperature must be in (0, 2]".to_string(),
            ));
        }

        if self.llm.max_repair_attempts == 0 {
            return Err(AppError::System(
                "max_repair_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Io(e.to_string()))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::System(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, content).map_err(|e| AppError::Io(e.to_string()))?;

        Ok(())
    }

    pub fn config_file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flyai")
            .join("config.toml")
    }

    /// API key from config, falling back to the environment
    pub fn resolve_api_key(&self) -> AppResult<String> {
        self.llm
            .api_key
            .clone()
            .or_else(get_api_key_from_env)
            .ok_or_else(|| {
                AppError::System(
                    "API key not found. Set it in config or use the FLYAI_OPENAI_API_KEY or OPENAI_API_KEY environment variable".to_string(),
                )
            })
    }
}

pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("FLYAI_OPENAI_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_solver_command() {
        let mut config = Config::default();
        config.solver.su2_cmd = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_iters() {
        let mut config = Config::default();
        config.solver.iters = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.solver.iters, config.solver.iters);
        assert_eq!(parsed.llm.design_model, config.llm.design_model);
        assert!(parsed.llm.api_key.is_none());
    }
}
