//! Convergence-history analysis.
//!
//! SU2 writes a CSV whose headers vary with version and output configuration
//! (quoting, spacing, `CD` vs `"CD "` vs `Drag_Coefficient`). Column discovery
//! is candidate-based and falls back to substring matching, so a renamed
//! column does not break the pipeline.

use crate::utils::error::{AppError, AppResult};
use serde::Serialize;
use std::fmt;
use std::path::Path;

const STABILITY_WINDOW: usize = 20;
const CONVERGED_RESIDUAL: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct HistorySeries {
    headers: Vec<String>,
    rows: Vec<Vec<f64>>,
}

fn normalize(header: &str) -> String {
    header.trim().trim_matches('"').trim().to_uppercase()
}

fn split_csv_line(line: &str) -> Vec<String> {
    line.split(',')
        .map(|cell| cell.trim().trim_matches('"').trim().to_string())
        .collect()
}

impl HistorySeries {
    pub fn parse(content: &str) -> AppResult<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let header_line = lines
            .next()
            .ok_or_else(|| AppError::Solver("History file is empty".to_string()))?;
        let headers: Vec<String> = split_csv_line(header_line)
            .into_iter()
            .map(|h| normalize(&h))
            .collect();

        let mut rows = Vec::new();
        for line in lines {
            let cells = split_csv_line(line);
            if cells.len() != headers.len() {
                continue;
            }
            let row: Vec<f64> = cells
                .iter()
                .map(|c| c.parse::<f64>().unwrap_or(f64::NAN))
                .collect();
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(AppError::Solver(
                "History file contains no data rows".to_string(),
            ));
        }

        Ok(Self { headers, rows })
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        if !path.is_file() {
            return Err(AppError::Solver(format!(
                "{} not found (did the solve stage run?)",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Column index by exact candidates first, then substring/prefix fallback.
    fn find_column(
        &self,
        candidates: &[&str],
        contains: Option<&str>,
        starts_with: Option<&str>,
    ) -> Option<usize> {
        for candidate in candidates {
            if let Some(i) = self.headers.iter().position(|h| h == candidate) {
                return Some(i);
            }
        }
        self.headers.iter().position(|h| {
            contains.is_some_and(|c| h.contains(c))
                || starts_with.is_some_and(|s| h.starts_with(s))
        })
    }

    fn drag_column(&self) -> Option<usize> {
        self.find_column(
            &["CD", "DRAG", "CD_TOTAL", "C_D", "CD_SUM", "C_D_SUM"],
            Some("DRAG"),
            Some("CD"),
        )
    }

    fn lift_column(&self) -> Option<usize> {
        self.find_column(
            &["CL", "LIFT", "CL_TOTAL", "C_L", "CL_SUM", "C_L_SUM"],
            Some("LIFT"),
            Some("CL"),
        )
    }

    fn residual_column(&self) -> Option<usize> {
        self.find_column(
            &["RMS_RES", "RMS_DENSITY", "RMS_RESIDUAL"],
            Some("RMS"),
            None,
        )
    }

    fn iter_column(&self) -> Option<usize> {
        self.find_column(&["ITER", "ITERATION", "INNER_ITER"], None, None)
    }

    fn last(&self, column: usize) -> f64 {
        self.rows[self.rows.len() - 1][column]
    }

    /// Max-min of a column over the trailing stability window.
    fn spread(&self, column: usize) -> Option<f64> {
        if self.rows.len() <= STABILITY_WINDOW {
            return None;
        }
        let tail = &self.rows[self.rows.len() - STABILITY_WINDOW..];
        let values = tail.iter().map(|row| row[column]);
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let min = values.fold(f64::INFINITY, f64::min);
        Some(max - min)
    }
}

/// Final force coefficients and convergence quality of a solver run.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceReport {
    pub cd: f64,
    pub cl: Option<f64>,
    pub l_over_d: Option<f64>,
    pub cd_spread: Option<f64>,
    pub cl_spread: Option<f64>,
    /// Orders of magnitude the residual dropped over the run
    pub residual_drop: Option<f64>,
    pub final_residual: Option<f64>,
    pub iterations: Option<u64>,
    pub converged: bool,
}

impl ConvergenceReport {
    pub fn from_series(series: &HistorySeries) -> AppResult<Self> {
        let drag_col = series.drag_column().ok_or_else(|| {
            AppError::Solver("No drag-like column in the history file".to_string())
        })?;

        let cd = series.last(drag_col);
        let cl = series.lift_column().map(|col| series.last(col));
        let l_over_d = cl.and_then(|cl| if cd != 0.0 { Some(cl / cd) } else { None });

        let cd_spread = series.spread(drag_col);
        let cl_spread = series.lift_column().and_then(|col| series.spread(col));

        let (residual_drop, final_residual) = match series.residual_column() {
            Some(col) => {
                let first = series.rows[0][col];
                let last = series.last(col);
                // RMS_RES is already log10-scaled in recent SU2 output; raw
                // residuals are positive, so treat non-positive values as
                // already-logged ones.
                let drop = if first > 0.0 && last > 0.0 {
                    first.max(1e-99).log10() - last.max(1e-99).log10()
                } else {
                    first - last
                };
                (Some(drop), Some(last))
            }
            None => (None, None),
        };

        let iterations = series.iter_column().map(|col| series.last(col) as u64);

        let converged = final_residual.is_some_and(|r| {
            let linear = if r <= 0.0 { 10f64.powf(r) } else { r };
            linear < CONVERGED_RESIDUAL
        });

        Ok(Self {
            cd,
            cl,
            l_over_d,
            cd_spread,
            cl_spread,
            residual_drop,
            final_residual,
            iterations,
            converged,
        })
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        Self::from_series(&HistorySeries::from_file(path)?)
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.converged {
            writeln!(f, "Converged-looking solution")?;
        } else {
            writeln!(f, "May need more iterations or mesh refinement")?;
        }

        match self.cl {
            Some(cl) => {
                write!(f, "Final coefficients: CL = {:.4}, CD = {:.4}", cl, self.cd)?;
                if let Some(ld) = self.l_over_d {
                    write!(f, ", L/D = {:.2}", ld)?;
                }
                writeln!(f)?;
            }
            None => writeln!(f, "Final drag coefficient: CD = {:.4}", self.cd)?,
        }

        if let (Some(dcd), Some(dcl)) = (self.cd_spread, self.cl_spread) {
            writeln!(
                f,
                "Stability over last {} iters: ΔCL = {:.4e}, ΔCD = {:.4e}",
                STABILITY_WINDOW, dcl, dcd
            )?;
        }
        if let (Some(drop), Some(last)) = (self.residual_drop, self.final_residual) {
            writeln!(
                f,
                "Residual drop: {:.1} orders (final = {:.2e})",
                drop, last
            )?;
        }
        if let Some(iters) = self.iterations {
            writeln!(f, "Iterations run: {}", iters)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv(rows: usize) -> String {
        let mut csv = String::from("\"ITER\", \"RMS_Density\", \"CD\", \"CL\"\n");
        for i in 0..rows {
            // residual decays from 1e-2 to small values, coefficients settle
            let res = 1e-2 * 10f64.powf(-(i as f64) / 10.0);
            let cd = 0.05 + 0.01 / (1.0 + i as f64);
            let cl = 0.40 + 0.02 / (1.0 + i as f64);
            csv.push_str(&format!("{}, {:e}, {}, {}\n", i, res, cd, cl));
        }
        csv
    }

    #[test]
    fn test_parse_normalizes_quoted_headers() {
        let series = HistorySeries::parse(&sample_csv(5)).unwrap();
        assert!(series.drag_column().is_some());
        assert!(series.lift_column().is_some());
        assert!(series.residual_column().is_some());
        assert!(series.iter_column().is_some());
    }

    #[test]
    fn test_report_uses_last_row() {
        let report =
            ConvergenceReport::from_series(&HistorySeries::parse(&sample_csv(50)).unwrap())
                .unwrap();
        assert!((report.cd - (0.05 + 0.01 / 50.0)).abs() < 1e-12);
        assert_eq!(report.iterations, Some(49));
        assert!(report.l_over_d.unwrap() > 7.0);
    }

    #[test]
    fn test_report_convergence_verdict() {
        // 50 rows: residual ends at 1e-2 * 10^-4.9 < 1e-5 -> converged
        let report =
            ConvergenceReport::from_series(&HistorySeries::parse(&sample_csv(50)).unwrap())
                .unwrap();
        assert!(report.converged);
        assert!(report.residual_drop.unwrap() > 4.0);

        // 5 rows: residual still high -> not converged
        let report =
            ConvergenceReport::from_series(&HistorySeries::parse(&sample_csv(5)).unwrap())
                .unwrap();
        assert!(!report.converged);
    }

    #[test]
    fn test_spread_requires_window() {
        let series = HistorySeries::parse(&sample_csv(10)).unwrap();
        let report = ConvergenceReport::from_series(&series).unwrap();
        assert!(report.cd_spread.is_none());

        let series = HistorySeries::parse(&sample_csv(40)).unwrap();
        let report = ConvergenceReport::from_series(&series).unwrap();
        assert!(report.cd_spread.unwrap() > 0.0);
    }

    #[test]
    fn test_fuzzy_drag_column_fallback() {
        let csv = "Iteration, Drag_Coefficient\n0, 0.1\n1, 0.09\n";
        let series = HistorySeries::parse(csv).unwrap();
        let report = ConvergenceReport::from_series(&series).unwrap();
        assert!((report.cd - 0.09).abs() < 1e-12);
        assert!(report.cl.is_none());
    }

    #[test]
    fn test_missing_drag_column_is_error() {
        let series = HistorySeries::parse("ITER, RMS_RES\n0, 1.0\n").unwrap();
        assert!(ConvergenceReport::from_series(&series).is_err());
    }

    #[test]
    fn test_skips_malformed_rows() {
        let csv = "ITER, CD\n0, 0.1\nthis row is broken\n1, 0.09\n";
        let series = HistorySeries::parse(csv).unwrap();
        let report = ConvergenceReport::from_series(&series).unwrap();
        assert!((report.cd - 0.09).abs() < 1e-12);
    }
}
