//! Solid geometry plumbing: CPACS-to-STEP conversion via the configured
//! external converter, and bounding-box extraction from STEP files.

use crate::config::GeometryConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::process;
use regex::Regex;
use std::path::Path;

/// Render a converter command template, substituting `{input}`/`{output}`.
pub fn render_command(template: &str, input: &Path, output: &Path) -> String {
    template
        .replace("{input}", &input.display().to_string())
        .replace("{output}", &output.display().to_string())
}

/// Convert a CPACS file to a solid STEP file by invoking the configured
/// converter. The lofting itself is the converter's job; we only check that
/// it produced the file it promised.
pub fn convert(config: &GeometryConfig, cpacs: &Path, step: &Path) -> AppResult<()> {
    if !cpacs.is_file() {
        return Err(AppError::Geometry(format!(
            "CPACS file not found: {}",
            cpacs.display()
        )));
    }

    let command = render_command(&config.converter_cmd, cpacs, step);
    process::run_tool(&command, None)
        .map_err(|e| AppError::Geometry(format!("Geometry converter failed: {}", e)))?;

    if !step.is_file() {
        return Err(AppError::Geometry(format!(
            "Converter finished but produced no STEP file at {}",
            step.display()
        )));
    }

    Ok(())
}

/// Axis-aligned bounding box of a solid, in model units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl StepBounds {
    /// Fold every CARTESIAN_POINT in a STEP file into a bounding box. STEP is
    /// a text format; this avoids pulling a CAD kernel in just to size the
    /// flow domain.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_step_text(&content).map_err(|e| match e {
            AppError::Geometry(msg) => {
                AppError::Geometry(format!("{} in {}", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn from_step_text(content: &str) -> AppResult<Self> {
        // #12=CARTESIAN_POINT('',(1.0,2.0,3.0));  possibly with spacing.
        let re = Regex::new(r"CARTESIAN_POINT\s*\(\s*'[^']*'\s*,\s*\(([^)]*)\)")
            .map_err(|e| AppError::System(e.to_string()))?;

        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        let mut found = false;

        for cap in re.captures_iter(content) {
            let coords: Vec<f64> = cap[1]
                .split(',')
                .filter_map(|c| c.trim().parse::<f64>().ok())
                .collect();
            if coords.len() != 3 {
                continue;
            }
            found = true;
            for axis in 0..3 {
                min[axis] = min[axis].min(coords[axis]);
                max[axis] = max[axis].max(coords[axis]);
            }
        }

        if !found {
            return Err(AppError::Geometry(
                "No CARTESIAN_POINT records found".to_string(),
            ));
        }

        let bounds = Self { min, max };
        if bounds.ref_len() <= 0.0 {
            return Err(AppError::Geometry(
                "Degenerate bounding box".to_string(),
            ));
        }
        Ok(bounds)
    }

    pub fn center(&self) -> [f64; 3] {
        [
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        ]
    }

    pub fn extents(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Reference length: the longest box edge.
    pub fn ref_len(&self) -> f64 {
        let e = self.extents();
        e[0].max(e[1]).max(e[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    const STEP_SNIPPET: &str = "\
ISO-10303-21;
DATA;
#10=CARTESIAN_POINT('',(0.,0.,0.));
#11=CARTESIAN_POINT('',(10.,0.,0.));
#12=CARTESIAN_POINT('', (4.0, -5.0, 1.5));
#13=CARTESIAN_POINT('Origin',(4.0,5.0,-1.5));
#14=DIRECTION('',(1.,0.,0.));
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_render_command_substitutes_placeholders() {
        let cmd = render_command(
            "cpacs2step {input} {output}",
            &PathBuf::from("plane.cpacs.xml"),
            &PathBuf::from("plane.stp"),
        );
        assert_eq!(cmd, "cpacs2step plane.cpacs.xml plane.stp");
    }

    #[test]
    fn test_bounds_from_step_text() {
        let bounds = StepBounds::from_step_text(STEP_SNIPPET).unwrap();
        assert_eq!(bounds.min, [0.0, -5.0, -1.5]);
        assert_eq!(bounds.max, [10.0, 5.0, 1.5]);
        assert_eq!(bounds.center(), [5.0, 0.0, 0.0]);
        assert_eq!(bounds.ref_len(), 10.0);
    }

    #[test]
    fn test_bounds_ignores_directions() {
        // DIRECTION records carry triplets too, but must not shrink the box.
        let bounds = StepBounds::from_step_text(STEP_SNIPPET).unwrap();
        assert!(bounds.extents()[1] > 9.9);
    }

    #[test]
    fn test_bounds_errors_without_points() {
        assert!(StepBounds::from_step_text("DATA; ENDSEC;").is_err());
    }

    #[test]
    fn test_bounds_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(STEP_SNIPPET.as_bytes()).unwrap();
        let bounds = StepBounds::from_file(f.path()).unwrap();
        assert_eq!(bounds.ref_len(), 10.0);
    }
}
