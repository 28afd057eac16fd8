//! Pipeline orchestration: wires configuration, the run workspace and the
//! chat provider into the generate / convert / mesh / solve / report /
//! critique stages and the optimize loop on top of them.

use crate::config::Config;
use crate::core::data::{DesignRound, IterationLedger};
use crate::cpacs::generate::{BASELINE_CPACS, DesignGenerator};
use crate::critique;
use crate::geometry::{self, StepBounds};
use crate::llm::openai::OpenAiClient;
use crate::mesh::{self, DomainPreset, FarfieldDomain, FlowAxis};
use crate::solver::history::ConvergenceReport;
use crate::solver::{self, FlowCase};
use crate::utils::error::{AppError, AppResult};
use crate::utils::output::{print_info, print_stage, print_success, print_warning};
use crate::workspace::{self, RunWorkspace};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub from_scratch: bool,
    pub baseline: Option<PathBuf>,
    pub goal: Option<String>,
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOverrides {
    pub mach: Option<f64>,
    pub aoa_deg: Option<f64>,
    pub iters: Option<u32>,
    pub inviscid: bool,
}

pub struct Pipeline {
    config: Config,
    workspace: RunWorkspace,
}

impl Pipeline {
    pub fn new(config: Config, workspace: RunWorkspace) -> Self {
        Self { config, workspace }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &RunWorkspace {
        &self.workspace
    }

    fn provider(&self) -> AppResult<OpenAiClient> {
        OpenAiClient::new(&self.config.llm.api_base, self.config.resolve_api_key()?)
    }

    /// Baseline CPACS text: explicit override, configured file, or the
    /// built-in wing template.
    pub fn baseline_xml(&self, override_path: Option<&Path>) -> AppResult<String> {
        let path = override_path.or(self.config.geometry.baseline.as_deref());
        match path {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Io(format!("Failed to read baseline '{}': {}", path.display(), e))
            }),
            None => Ok(BASELINE_CPACS.to_string()),
        }
    }

    /// Generate stage: prompt to CPACS file in the workspace.
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> AppResult<PathBuf> {
        let provider = self.provider()?;
        let generator = DesignGenerator::new(&provider, &self.config.llm);

        let xml = if options.from_scratch {
            generator.generate_from_scratch(prompt).await?
        } else {
            let baseline = self.baseline_xml(options.baseline.as_deref())?;
            let (edited, report) = generator
                .apply_prompt_edits(
                    &baseline,
                    prompt,
                    options.goal.as_deref(),
                    options.image.as_deref(),
                )
                .await?;
            for note in &report.skipped {
                print_warning(note);
            }
            print_info(&format!("Applied {} edit(s) to the baseline", report.applied));
            edited
        };

        self.workspace.write_text(workspace::CPACS_FILE, &xml)
    }

    /// Convert stage: CPACS to solid STEP via the external converter.
    pub fn convert(&self) -> AppResult<PathBuf> {
        let cpacs = self.workspace.require(workspace::CPACS_FILE, "generate")?;
        let step = self.workspace.step_path();
        geometry::convert(&self.config.geometry, &cpacs, &step)?;
        Ok(step)
    }

    /// Mesh stage: farfield domain script plus external gmsh run.
    pub fn mesh(
        &self,
        preset: Option<DomainPreset>,
        axis: Option<FlowAxis>,
    ) -> AppResult<FarfieldDomain> {
        self.workspace.require(workspace::STEP_FILE, "convert")?;

        let mut mesh_config = self.config.mesh.clone();
        if let Some(preset) = preset {
            mesh_config.preset = preset;
        }
        if let Some(axis) = axis {
            mesh_config.flow_axis = axis;
        }

        mesh::generate_mesh(
            &mesh_config,
            self.workspace.dir(),
            workspace::STEP_FILE,
            workspace::GEO_FILE,
            workspace::MESH_FILE,
        )
    }

    /// Solve stage: write the SU2 case and run the solver.
    pub fn solve(&self, overrides: &SolveOverrides) -> AppResult<()> {
        self.workspace.require(workspace::MESH_FILE, "mesh")?;
        let step = self.workspace.require(workspace::STEP_FILE, "convert")?;

        let mut solver_config = self.config.solver.clone();
        if let Some(mach) = overrides.mach {
            solver_config.mach = mach;
        }
        if let Some(aoa) = overrides.aoa_deg {
            solver_config.aoa_deg = aoa;
        }
        if let Some(iters) = overrides.iters {
            solver_config.iters = iters;
        }
        if overrides.inviscid {
            solver_config.inviscid = true;
        }

        let ref_len = StepBounds::from_file(&step)?.ref_len();
        let case = FlowCase::from_config(&solver_config, ref_len);
        case.write_config(
            &self.workspace.path(workspace::CASE_FILE),
            workspace::MESH_FILE,
        )?;

        solver::run_solver(
            &solver_config,
            self.workspace.dir(),
            workspace::CASE_FILE,
            workspace::SOLVER_LOG_FILE,
        )
    }

    /// Report stage: analyze the convergence history.
    pub fn report(&self) -> AppResult<ConvergenceReport> {
        ConvergenceReport::from_file(&self.workspace.history_path())
    }

    /// Critique stage: one imperative design suggestion from the vision
    /// model, fed with the latest report and the flow image when present.
    pub async fn critique(&self, image_override: Option<&Path>) -> AppResult<String> {
        let provider = self.provider()?;
        let report = self.report().ok();

        let flow_image = self.workspace.flow_image_path();
        let image = image_override.or_else(|| flow_image.is_file().then_some(flow_image.as_path()));

        critique::suggest_design_change(&provider, &self.config.llm, report.as_ref(), image).await
    }

    /// One full pass: generate, convert, mesh, solve, report.
    pub async fn run_once(&self, prompt: &str) -> AppResult<ConvergenceReport> {
        print_stage(1, "Generating aircraft geometry");
        self.generate(prompt, &GenerateOptions::default()).await?;

        print_stage(2, "Converting CPACS to solid STEP");
        self.convert()?;

        print_stage(3, "Meshing flow domain");
        self.mesh(None, None)?;

        print_stage(4, "Running CFD");
        self.solve(&SolveOverrides::default())?;

        print_stage(5, "Analyzing convergence history");
        let report = self.report()?;

        self.cleanup_artifacts();
        Ok(report)
    }

    /// Drop bulky intermediate files when the config asks for lean runs.
    fn cleanup_artifacts(&self) {
        if self.config.general.keep_artifacts {
            return;
        }
        for name in [workspace::GEO_FILE, "restart.dat"] {
            let path = self.workspace.path(name);
            if path.is_file() {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    /// Iterative drag refinement. Each round patches the previous round's
    /// design with the latest critique suggestion. The ledger is persisted
    /// even when a round fails mid-way.
    pub async fn optimize(&self, prompt: &str, rounds: u32) -> AppResult<IterationLedger> {
        let mut ledger = IterationLedger::new(prompt);
        let result = self.optimize_rounds(prompt, rounds, &mut ledger).await;

        ledger.write_csv(&self.workspace.path(workspace::ITERATIONS_FILE))?;
        ledger.write_json(&self.workspace.path(workspace::SUMMARY_FILE))?;
        result?;

        if let Some(best) = ledger.best() {
            print_success(&format!(
                "Best design: round {} (CD = {:.4}) -> {}",
                best.round,
                best.cd.unwrap_or(f64::NAN),
                best.cpacs
            ));
        }
        self.cleanup_artifacts();
        Ok(ledger)
    }

    async fn optimize_rounds(
        &self,
        prompt: &str,
        rounds: u32,
        ledger: &mut IterationLedger,
    ) -> AppResult<()> {
        if rounds == 0 {
            return Err(AppError::System(
                "Optimize needs at least one round".to_string(),
            ));
        }

        let provider = self.provider()?;
        let generator = DesignGenerator::new(&provider, &self.config.llm);

        let mut current_xml = self.baseline_xml(None)?;
        let mut round_prompt = prompt.to_string();

        for round in 1..=rounds {
            print_info(&format!("--- Round {}/{}: {} ---", round, rounds, round_prompt));

            let snapshot = self.workspace.cpacs_round_path(round);
            let snapshot_name = snapshot
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            // Rounds after the first may use the previous round's flow image
            // as visual context.
            let flow_image = self.workspace.flow_image_path();
            let image = (round > 1 && flow_image.is_file()).then_some(flow_image.as_path());

            let (edited, patch_report) = generator
                .apply_prompt_edits(&current_xml, &round_prompt, Some(prompt), image)
                .await?;
            for note in &patch_report.skipped {
                print_warning(note);
            }

            self.workspace.write_text(workspace::CPACS_FILE, &edited)?;
            std::fs::write(&snapshot, &edited)
                .map_err(|e| AppError::Io(format!("Failed to write {}: {}", snapshot.display(), e)))?;

            let stage_result = (|| {
                self.convert()?;
                self.mesh(None, None)?;
                self.solve(&SolveOverrides::default())
            })();

            if let Err(e) = stage_result {
                ledger.push(DesignRound::failed(round, &round_prompt, &snapshot_name));
                return Err(e);
            }

            let report = self.report()?;
            print_info(&format!(
                "Round {} result: CD = {:.4}{}",
                round,
                report.cd,
                if report.converged { "" } else { " (unconverged)" }
            ));
            ledger.push(DesignRound::from_report(
                round,
                &round_prompt,
                &report,
                &snapshot_name,
            ));

            current_xml = edited;

            if round < rounds {
                let image = flow_image.is_file().then_some(flow_image.as_path());
                round_prompt = critique::suggest_design_change(
                    &provider,
                    &self.config.llm,
                    Some(&report),
                    image,
                )
                .await?;
                print_info(&format!("Critique suggests: {}", round_prompt));
            }
        }

        Ok(())
    }
}
