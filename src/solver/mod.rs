//! SU2 case setup and execution. The solver itself is external; this module
//! writes its configuration, runs it, and surfaces failures usefully.

pub mod history;

use crate::config::SolverConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::process;
use std::path::Path;

/// One CFD case: freestream state plus run controls.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowCase {
    pub mach: f64,
    pub aoa_deg: f64,
    pub reynolds: f64,
    /// Reference length for the Reynolds number, from the geometry bounds
    pub ref_len: f64,
    pub iters: u32,
    pub inviscid: bool,
}

impl FlowCase {
    pub fn from_config(config: &SolverConfig, ref_len: f64) -> Self {
        Self {
            mach: config.mach,
            aoa_deg: config.aoa_deg,
            reynolds: config.reynolds,
            ref_len,
            iters: config.iters,
            inviscid: config.inviscid,
        }
    }

    /// Render the SU2 configuration for this case.
    pub fn su2_config(&self, mesh_file_name: &str) -> String {
        let wall_marker_line = if self.inviscid {
            "MARKER_EULER= ( walls )"
        } else {
            "MARKER_HEATFLUX= ( walls, 0.0 )"
        };
        let solver = if self.inviscid { "EULER" } else { "RANS" };
        let turb = if self.inviscid { "NONE" } else { "SA" };

        format!(
            "%\n\
             % Auto-generated SU2 configuration\n\
             MATH_PROBLEM= DIRECT\n\
             SOLVER= {solver}\n\
             KIND_TURB_MODEL= {turb}\n\
             \n\
             NDIM= 3\n\
             MESH_FILENAME= {mesh}\n\
             MESH_FORMAT= SU2\n\
             HISTORY_FILENAME= history\n\
             RESTART_FILENAME= restart.dat\n\
             \n\
             MACH_NUMBER= {mach}\n\
             AOA= {aoa}\n\
             SIDESLIP_ANGLE= 0.0\n\
             GAMMA_VALUE= 1.4\n\
             FREESTREAM_TEMPERATURE= 288.15\n\
             FREESTREAM_PRESSURE= 101325.0\n\
             REYNOLDS_NUMBER= {re}\n\
             REYNOLDS_LENGTH= {ref_len}\n\
             \n\
             MARKER_FAR= ( farfield, inlet, outlet )\n\
             {wall_marker_line}\n\
             \n\
             NUM_METHOD_GRAD= GREEN_GAUSS\n\
             CFL_NUMBER= 5.0\n\
             CFL_ADAPT= YES\n\
             CFL_ADAPT_PARAM= ( 0.5, 2.0, 1.1, 50.0 )\n\
             LINEAR_SOLVER= FGMRES\n\
             LINEAR_SOLVER_PREC= ILU\n\
             LINEAR_SOLVER_ERROR= 1e-6\n\
             LINEAR_SOLVER_ITER= 50\n\
             \n\
             CONV_NUM_METHOD_FLOW= ROE\n\
             VENKAT_LIMITER_COEFF= 0.05\n\
             MUSCL_FLOW= YES\n\
             SLOPE_LIMITER_FLOW= VENKATAKRISHNAN\n\
             \n\
             ITER= {iters}\n\
             CONV_RESIDUAL_MINVAL= 1e-10\n\
             CONV_STARTITER= 10\n\
             SCREEN_OUTPUT= (ITER, RMS_RES, LIFT, DRAG, MACH, AOA)\n\
             HISTORY_OUTPUT= (ITER, RMS_RES, AERO_COEFF)\n\
             TABULAR_FORMAT= CSV\n",
            solver = solver,
            turb = turb,
            mesh = mesh_file_name,
            mach = self.mach,
            aoa = self.aoa_deg,
            re = self.reynolds,
            ref_len = self.ref_len,
            iters = self.iters,
            wall_marker_line = wall_marker_line,
        )
    }

    pub fn write_config(&self, path: &Path, mesh_file_name: &str) -> AppResult<()> {
        std::fs::write(path, self.su2_config(mesh_file_name))
            .map_err(|e| AppError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

/// Run the solver in `dir`, logging to `log_name`. On failure the error
/// carries the tail of the log so the user sees why SU2 stopped.
pub fn run_solver(
    config: &SolverConfig,
    dir: &Path,
    cfg_name: &str,
    log_name: &str,
) -> AppResult<()> {
    let cfg_path = dir.join(cfg_name);
    if !cfg_path.is_file() {
        return Err(AppError::Solver(format!(
            "Case configuration not found: {} (run the solve stage setup first)",
            cfg_path.display()
        )));
    }

    let command = format!("{} {}", config.su2_cmd, cfg_name);
    let log_path = dir.join(log_name);
    let success = process::run_tool_logged(&command, dir, &log_path)?;

    if !success {
        let tail = process::tail_lines(&log_path, config.log_tail)?;
        return Err(AppError::Solver(format!(
            "SU2 returned a non-zero exit status. Full output is in {}.\n\
             --- Last {} lines ---\n{}",
            log_path.display(),
            tail.len(),
            tail.join("\n")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(inviscid: bool) -> FlowCase {
        FlowCase {
            mach: 0.2,
            aoa_deg: 2.0,
            reynolds: 5e6,
            ref_len: 10.0,
            iters: 800,
            inviscid,
        }
    }

    #[test]
    fn test_su2_config_rans() {
        let cfg = case(false).su2_config("mesh.su2");
        assert!(cfg.contains("SOLVER= RANS"));
        assert!(cfg.contains("KIND_TURB_MODEL= SA"));
        assert!(cfg.contains("MARKER_HEATFLUX= ( walls, 0.0 )"));
        assert!(cfg.contains("MESH_FILENAME= mesh.su2"));
        assert!(cfg.contains("MARKER_FAR= ( farfield, inlet, outlet )"));
        assert!(cfg.contains("REYNOLDS_LENGTH= 10"));
        assert!(cfg.contains("ITER= 800"));
    }

    #[test]
    fn test_su2_config_euler() {
        let cfg = case(true).su2_config("mesh.su2");
        assert!(cfg.contains("SOLVER= EULER"));
        assert!(cfg.contains("KIND_TURB_MODEL= NONE"));
        assert!(cfg.contains("MARKER_EULER= ( walls )"));
        assert!(!cfg.contains("MARKER_HEATFLUX"));
    }

    #[test]
    fn test_from_config_carries_ref_len() {
        let solver_config = crate::config::Config::default().solver;
        let case = FlowCase::from_config(&solver_config, 7.5);
        assert_eq!(case.ref_len, 7.5);
        assert_eq!(case.iters, solver_config.iters);
    }
}
