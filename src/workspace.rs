//! Run workspaces: one directory per pipeline run with fixed artifact names,
//! so every stage can be re-invoked independently on an existing run.

use crate::utils::error::{AppError, AppResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CPACS_FILE: &str = "plane.cpacs.xml";
pub const STEP_FILE: &str = "plane.stp";
pub const GEO_FILE: &str = "domain.geo";
pub const MESH_FILE: &str = "mesh.su2";
pub const CASE_FILE: &str = "case.cfg";
pub const SOLVER_LOG_FILE: &str = "su2_out.log";
pub const HISTORY_FILE: &str = "history.csv";
pub const FLOW_IMAGE_FILE: &str = "flow.png";
pub const ITERATIONS_FILE: &str = "iterations.csv";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone)]
pub struct RunWorkspace {
    dir: PathBuf,
}

impl RunWorkspace {
    /// Create a fresh run directory under `root`, named so that
    /// lexicographic order is chronological order.
    pub fn create(root: &Path) -> AppResult<Self> {
        let short_id: String = Uuid::new_v4().simple().to_string()[..8].to_string();
        let name = format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), short_id);
        let dir = root.join(name);
        std::fs::create_dir_all(&dir)
            .map_err(|e| AppError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    pub fn open(dir: &Path) -> AppResult<Self> {
        if !dir.is_dir() {
            return Err(AppError::System(format!(
                "Run workspace not found: {}",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Most recent run under `root`.
    pub fn latest(root: &Path) -> AppResult<Self> {
        let entries = std::fs::read_dir(root)
            .map_err(|e| AppError::Io(format!("Failed to read {}: {}", root.display(), e)))?;

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        match dirs.pop() {
            Some(dir) => Ok(Self { dir }),
            None => Err(AppError::System(format!(
                "No run workspaces under {} (run 'generate' first)",
                root.display()
            ))),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn cpacs_path(&self) -> PathBuf {
        self.path(CPACS_FILE)
    }

    /// Per-round CPACS snapshot kept by the optimize loop.
    pub fn cpacs_round_path(&self, round: u32) -> PathBuf {
        self.path(&format!("plane_r{}.cpacs.xml", round))
    }

    pub fn step_path(&self) -> PathBuf {
        self.path(STEP_FILE)
    }

    pub fn flow_image_path(&self) -> PathBuf {
        self.path(FLOW_IMAGE_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.path(HISTORY_FILE)
    }

    /// Stage-input check with a hint about which stage produces the file.
    pub fn require(&self, file_name: &str, produced_by: &str) -> AppResult<PathBuf> {
        let path = self.path(file_name);
        if !path.is_file() {
            return Err(AppError::System(format!(
                "{} not found in {} (run the {} stage first)",
                file_name,
                self.dir.display(),
                produced_by
            )));
        }
        Ok(path)
    }

    pub fn read_text(&self, file_name: &str) -> AppResult<String> {
        let path = self.path(file_name);
        std::fs::read_to_string(&path)
            .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    pub fn write_text(&self, file_name: &str, content: &str) -> AppResult<PathBuf> {
        let path = self.path(file_name);
        std::fs::write(&path, content)
            .map_err(|e| AppError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(path)
    }
}
