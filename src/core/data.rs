//! Core data structures for the design iteration loop.

use crate::solver::history::ConvergenceReport;
use crate::utils::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Outcome of a single optimize round.
#[derive(Debug, Clone, Serialize)]
pub struct DesignRound {
    pub round: u32,
    /// The prompt that produced this round's geometry (user prompt for round
    /// 1, critique suggestion afterwards)
    pub prompt: String,
    pub cd: Option<f64>,
    pub cl: Option<f64>,
    pub l_over_d: Option<f64>,
    pub converged: bool,
    pub completed: bool,
    /// CPACS snapshot of this round's design
    pub cpacs: String,
}

impl DesignRound {
    pub fn from_report(
        round: u32,
        prompt: impl Into<String>,
        report: &ConvergenceReport,
        cpacs: impl Into<String>,
    ) -> Self {
        Self {
            round,
            prompt: prompt.into(),
            cd: Some(report.cd),
            cl: report.cl,
            l_over_d: report.l_over_d,
            converged: report.converged,
            completed: true,
            cpacs: cpacs.into(),
        }
    }

    pub fn failed(round: u32, prompt: impl Into<String>, cpacs: impl Into<String>) -> Self {
        Self {
            round,
            prompt: prompt.into(),
            cd: None,
            cl: None,
            l_over_d: None,
            converged: false,
            completed: false,
            cpacs: cpacs.into(),
        }
    }
}

/// All rounds of one optimize run, persisted as CSV and JSON.
#[derive(Debug, Clone, Serialize)]
pub struct IterationLedger {
    pub started_at: DateTime<Utc>,
    pub design_prompt: String,
    pub rounds: Vec<DesignRound>,
}

fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn csv_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

impl IterationLedger {
    pub fn new(design_prompt: impl Into<String>) -> Self {
        Self {
            started_at: Utc::now(),
            design_prompt: design_prompt.into(),
            rounds: Vec::new(),
        }
    }

    pub fn push(&mut self, round: DesignRound) {
        self.rounds.push(round);
    }

    /// Best completed round: converged ones are preferred, lowest drag wins.
    pub fn best(&self) -> Option<&DesignRound> {
        let completed: Vec<&DesignRound> = self
            .rounds
            .iter()
            .filter(|r| r.completed && r.cd.is_some())
            .collect();

        let pool: Vec<&DesignRound> = if completed.iter().any(|r| r.converged) {
            completed.into_iter().filter(|r| r.converged).collect()
        } else {
            completed
        };

        pool.into_iter().min_by(|a, b| {
            a.cd.partial_cmp(&b.cd)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn write_csv(&self, path: &Path) -> AppResult<()> {
        let file = File::create(path)
            .map_err(|e| AppError::Io(format!("Failed to create {}: {}", path.display(), e)))?;
        let mut w = BufWriter::new(file);

        (|| -> std::io::Result<()> {
            writeln!(w, "round,prompt,cd,cl,l_over_d,converged,completed,cpacs")?;
            for r in &self.rounds {
                writeln!(
                    w,
                    "{},{},{},{},{},{},{},{}",
                    r.round,
                    csv_quote(&r.prompt),
                    csv_opt(r.cd),
                    csv_opt(r.cl),
                    csv_opt(r.l_over_d),
                    r.converged,
                    r.completed,
                    csv_quote(&r.cpacs),
                )?;
            }
            w.flush()
        })()
        .map_err(|e| AppError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    pub fn write_json(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::System(format!("Failed to serialize ledger: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| AppError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(n: u32, cd: f64, converged: bool) -> DesignRound {
        DesignRound {
            round: n,
            prompt: format!("round {}", n),
            cd: Some(cd),
            cl: Some(0.4),
            l_over_d: Some(0.4 / cd),
            converged,
            completed: true,
            cpacs: format!("plane_r{}.cpacs.xml", n),
        }
    }

    #[test]
    fn test_best_prefers_converged_rounds() {
        let mut ledger = IterationLedger::new("sleek glider");
        ledger.push(round(1, 0.020, false)); // lowest CD but unconverged
        ledger.push(round(2, 0.031, true));
        ledger.push(round(3, 0.028, true));

        assert_eq!(ledger.best().unwrap().round, 3);
    }

    #[test]
    fn test_best_falls_back_to_unconverged() {
        let mut ledger = IterationLedger::new("x");
        ledger.push(round(1, 0.040, false));
        ledger.push(round(2, 0.035, false));
        ledger.push(DesignRound::failed(3, "bad", "plane_r3.cpacs.xml"));

        assert_eq!(ledger.best().unwrap().round, 2);
    }

    #[test]
    fn test_best_ignores_failed_rounds() {
        let mut ledger = IterationLedger::new("x");
        ledger.push(DesignRound::failed(1, "bad", "plane_r1.cpacs.xml"));
        assert!(ledger.best().is_none());
    }

    #[test]
    fn test_write_csv_quotes_prompts() {
        let mut ledger = IterationLedger::new("x");
        let mut r = round(1, 0.03, true);
        r.prompt = "make the nose, and tail, \"sharper\"".to_string();
        ledger.push(r);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iterations.csv");
        ledger.write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "round,prompt,cd,cl,l_over_d,converged,completed,cpacs"
        );
        assert!(content.contains("\"make the nose, and tail, \"\"sharper\"\"\""));
        assert!(content.contains("0.030000"));
    }

    #[test]
    fn test_write_json_round_trips_fields() {
        let mut ledger = IterationLedger::new("sleek glider");
        ledger.push(round(1, 0.03, true));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        ledger.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["design_prompt"], "sleek glider");
        assert_eq!(value["rounds"][0]["round"], 1);
        assert_eq!(value["rounds"][0]["converged"], true);
    }
}
