//! Flow-domain meshing around a solid STEP geometry.
//!
//! The crate computes the farfield box and sizing parameters, emits a Gmsh
//! `.geo` script (OpenCASCADE kernel: STEP import, boolean cut, boundary
//! classification, distance-based sizing) and drives the external `gmsh`
//! binary to produce an SU2 mesh. Gmsh itself is never reimplemented.

use crate::config::MeshConfig;
use crate::geometry::StepBounds;
use crate::utils::error::{AppError, AppResult};
use crate::utils::process;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Mesh size presets; cell-count targets assume a wing-sized geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DomainPreset {
    /// Very small box and coarse farfield, roughly 0.5-1.2M cells
    Tiny,
    /// Slightly larger box, roughly 1-2M cells
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlowAxis {
    X,
    Y,
    Z,
}

impl fmt::Display for FlowAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowAxis::X => write!(f, "x"),
            FlowAxis::Y => write!(f, "y"),
            FlowAxis::Z => write!(f, "z"),
        }
    }
}

/// Box extents and sizing bands, all as multiples of the reference length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetRatios {
    /// Upstream box extent
    pub up: f64,
    /// Downstream box extent
    pub dn: f64,
    /// Lateral half-extent
    pub h1: f64,
    /// Vertical half-extent
    pub h2: f64,
    pub lc_near: f64,
    pub lc_far: f64,
    pub d_near: f64,
    pub d_far: f64,
}

impl DomainPreset {
    pub fn ratios(&self) -> PresetRatios {
        match self {
            DomainPreset::Tiny => PresetRatios {
                up: 1.5,
                dn: 3.5,
                h1: 1.0,
                h2: 1.0,
                lc_near: 1.0 / 180.0,
                lc_far: 1.0,
                d_near: 1.0 / 60.0,
                d_far: 1.0 / 6.0,
            },
            DomainPreset::Small => PresetRatios {
                up: 2.5,
                dn: 6.0,
                h1: 1.5,
                h2: 1.5,
                lc_near: 1.0 / 300.0,
                lc_far: 0.5,
                d_near: 1.0 / 50.0,
                d_far: 1.0 / 5.0,
            },
        }
    }
}

/// Farfield box around the geometry, axis-aligned, in model units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarfieldDomain {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub z0: f64,
    pub z1: f64,
}

impl FarfieldDomain {
    pub fn from_bounds(bounds: &StepBounds, preset: DomainPreset, axis: FlowAxis) -> Self {
        let r = preset.ratios();
        let l = bounds.ref_len();
        let (up, dn, h1, h2) = (r.up * l, r.dn * l, r.h1 * l, r.h2 * l);
        let [cx, cy, cz] = bounds.center();

        match axis {
            FlowAxis::X => Self {
                x0: bounds.min[0] - up,
                x1: bounds.max[0] + dn,
                y0: cy - h1,
                y1: cy + h1,
                z0: cz - h2,
                z1: cz + h2,
            },
            FlowAxis::Y => Self {
                y0: bounds.min[1] - up,
                y1: bounds.max[1] + dn,
                x0: cx - h1,
                x1: cx + h1,
                z0: cz - h2,
                z1: cz + h2,
            },
            FlowAxis::Z => Self {
                z0: bounds.min[2] - up,
                z1: bounds.max[2] + dn,
                x0: cx - h1,
                x1: cx + h1,
                y0: cy - h2,
                y1: cy + h2,
            },
        }
    }

    pub fn longest_edge(&self) -> f64 {
        (self.x1 - self.x0)
            .max(self.y1 - self.y0)
            .max(self.z1 - self.z0)
    }

    /// Slab tolerance for selecting surfaces that lie on a box plane.
    pub fn plane_tolerance(&self) -> f64 {
        let l = self.longest_edge();
        1e-6 * if l > 0.0 { l } else { 1.0 }
    }

    /// The six box planes as (axis, position) pairs: flow-normal planes first
    /// (inlet, outlet), then the four remaining farfield planes.
    fn planes(&self, axis: FlowAxis) -> ([(FlowAxis, f64); 2], [(FlowAxis, f64); 4]) {
        match axis {
            FlowAxis::X => (
                [(FlowAxis::X, self.x0), (FlowAxis::X, self.x1)],
                [
                    (FlowAxis::Y, self.y0),
                    (FlowAxis::Y, self.y1),
                    (FlowAxis::Z, self.z0),
                    (FlowAxis::Z, self.z1),
                ],
            ),
            FlowAxis::Y => (
                [(FlowAxis::Y, self.y0), (FlowAxis::Y, self.y1)],
                [
                    (FlowAxis::X, self.x0),
                    (FlowAxis::X, self.x1),
                    (FlowAxis::Z, self.z0),
                    (FlowAxis::Z, self.z1),
                ],
            ),
            FlowAxis::Z => (
                [(FlowAxis::Z, self.z0), (FlowAxis::Z, self.z1)],
                [
                    (FlowAxis::X, self.x0),
                    (FlowAxis::X, self.x1),
                    (FlowAxis::Y, self.y0),
                    (FlowAxis::Y, self.y1),
                ],
            ),
        }
    }

    /// A `Surface In BoundingBox` slab selecting surfaces on the plane
    /// `plane_axis = position`.
    fn slab(&self, plane_axis: FlowAxis, position: f64, eps: f64) -> String {
        let (mut lo, mut hi) = (
            [self.x0 - eps, self.y0 - eps, self.z0 - eps],
            [self.x1 + eps, self.y1 + eps, self.z1 + eps],
        );
        let i = match plane_axis {
            FlowAxis::X => 0,
            FlowAxis::Y => 1,
            FlowAxis::Z => 2,
        };
        lo[i] = position - eps;
        hi[i] = position + eps;
        format!(
            "Surface In BoundingBox{{{:.9}, {:.9}, {:.9}, {:.9}, {:.9}, {:.9}}}",
            lo[0], lo[1], lo[2], hi[0], hi[1], hi[2]
        )
    }
}

/// Build the Gmsh script for the external flow domain.
pub fn build_domain_script(
    step_file_name: &str,
    domain: &FarfieldDomain,
    ratios: &PresetRatios,
    ref_len: f64,
    axis: FlowAxis,
) -> String {
    let eps = domain.plane_tolerance();
    let (flow_planes, far_planes) = domain.planes(axis);

    let h_near = ref_len * ratios.lc_near;
    let h_far = ref_len * ratios.lc_far;
    let d_near = ref_len * ratios.d_near;
    let d_far = ref_len * ratios.d_far;

    let mut s = String::new();
    s.push_str("SetFactory(\"OpenCASCADE\");\n");
    s.push_str(&format!("Merge \"{}\";\n", step_file_name));
    s.push_str("solids() = Volume{:};\n");
    s.push_str("box = newv;\n");
    s.push_str(&format!(
        "Box(box) = {{{:.9}, {:.9}, {:.9}, {:.9}, {:.9}, {:.9}}};\n",
        domain.x0,
        domain.y0,
        domain.z0,
        domain.x1 - domain.x0,
        domain.y1 - domain.y0,
        domain.z1 - domain.z0,
    ));
    s.push_str(
        "fluid() = BooleanDifference{ Volume{box}; Delete; }{ Volume{solids()}; Delete; };\n\n",
    );

    s.push_str(&format!(
        "inlet() = {};\n",
        domain.slab(flow_planes[0].0, flow_planes[0].1, eps)
    ));
    s.push_str(&format!(
        "outlet() = {};\n",
        domain.slab(flow_planes[1].0, flow_planes[1].1, eps)
    ));
    s.push_str("far() = {};\n");
    for (plane_axis, position) in far_planes {
        s.push_str(&format!(
            "far() += {};\n",
            domain.slab(plane_axis, position, eps)
        ));
    }
    s.push_str("walls() = Surface{:};\n");
    s.push_str("walls() -= inlet();\n");
    s.push_str("walls() -= outlet();\n");
    s.push_str("walls() -= far();\n\n");

    s.push_str("Physical Volume(\"fluid\") = fluid();\n");
    s.push_str("Physical Surface(\"inlet\") = inlet();\n");
    s.push_str("Physical Surface(\"outlet\") = outlet();\n");
    s.push_str("Physical Surface(\"walls\") = walls();\n");
    s.push_str("Physical Surface(\"farfield\") = far();\n\n");

    // Size by distance to the body surfaces, not to the box.
    s.push_str("Field[1] = Distance;\n");
    s.push_str("Field[1].SurfacesList = {walls()};\n");
    s.push_str("Field[2] = Threshold;\n");
    s.push_str("Field[2].InField = 1;\n");
    s.push_str(&format!("Field[2].SizeMin = {:.9};\n", h_near));
    s.push_str(&format!("Field[2].SizeMax = {:.9};\n", h_far));
    s.push_str(&format!("Field[2].DistMin = {:.9};\n", d_near));
    s.push_str(&format!("Field[2].DistMax = {:.9};\n", d_far));
    s.push_str("Background Field = 2;\n\n");

    s.push_str("Mesh.Algorithm3D = 10;\n");
    s.push_str("Mesh.ElementOrder = 1;\n");
    s.push_str("Mesh.Optimize = 0;\n");
    s.push_str("Mesh.OptimizeNetgen = 0;\n");
    s.push_str("Mesh.MeshSizeFromCurvature = 0;\n");
    s.push_str("Mesh.MeshSizeFromPoints = 0;\n");
    s.push_str("Mesh.MeshSizeExtendFromBoundary = 0;\n");
    s.push_str("Mesh.SaveAll = 0;\n");

    s
}

/// Full mesh stage: bbox from the STEP file, domain script, gmsh run.
/// All paths are resolved inside `dir`; returns the computed domain.
pub fn generate_mesh(
    config: &MeshConfig,
    dir: &Path,
    step_name: &str,
    geo_name: &str,
    mesh_name: &str,
) -> AppResult<FarfieldDomain> {
    let step_path = dir.join(step_name);
    if !step_path.is_file() {
        return Err(AppError::Mesh(format!(
            "STEP file not found: {} (run the convert stage first)",
            step_path.display()
        )));
    }

    let bounds = StepBounds::from_file(&step_path)?;
    let domain = FarfieldDomain::from_bounds(&bounds, config.preset, config.flow_axis);
    let script = build_domain_script(
        step_name,
        &domain,
        &config.preset.ratios(),
        bounds.ref_len(),
        config.flow_axis,
    );

    let geo_path = dir.join(geo_name);
    std::fs::write(&geo_path, script)
        .map_err(|e| AppError::Io(format!("Failed to write {}: {}", geo_path.display(), e)))?;

    let command = format!(
        "{} -3 -format su2 -o {} {}",
        config.gmsh_cmd, mesh_name, geo_name
    );
    process::run_tool(&command, Some(dir))
        .map_err(|e| AppError::Mesh(format!("Gmsh failed: {}", e)))?;

    let mesh_path = dir.join(mesh_name);
    if !mesh_path.is_file() {
        return Err(AppError::Mesh(format!(
            "Gmsh finished but produced no mesh at {}",
            mesh_path.display()
        )));
    }

    Ok(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> StepBounds {
        StepBounds {
            min: [0.0, -5.0, -0.5],
            max: [2.0, 5.0, 0.5],
        }
    }

    #[test]
    fn test_farfield_domain_axis_x() {
        // ref_len = 10 (span); Small preset: up 2.5, dn 6.0, h1/h2 1.5
        let domain = FarfieldDomain::from_bounds(&bounds(), DomainPreset::Small, FlowAxis::X);
        assert_eq!(domain.x0, 0.0 - 25.0);
        assert_eq!(domain.x1, 2.0 + 60.0);
        assert_eq!(domain.y0, -15.0);
        assert_eq!(domain.y1, 15.0);
        assert_eq!(domain.z0, -15.0);
        assert_eq!(domain.z1, 15.0);
    }

    #[test]
    fn test_farfield_domain_axis_z() {
        let domain = FarfieldDomain::from_bounds(&bounds(), DomainPreset::Tiny, FlowAxis::Z);
        assert_eq!(domain.z0, -0.5 - 15.0);
        assert_eq!(domain.z1, 0.5 + 35.0);
        // lateral half-extents centered on the box center
        assert_eq!(domain.x0, 1.0 - 10.0);
        assert_eq!(domain.x1, 1.0 + 10.0);
    }

    #[test]
    fn test_preset_ratios_distinct() {
        let tiny = DomainPreset::Tiny.ratios();
        let small = DomainPreset::Small.ratios();
        assert!(tiny.up < small.up);
        assert!(tiny.lc_near > small.lc_near);
    }

    #[test]
    fn test_domain_script_structure() {
        let b = bounds();
        let domain = FarfieldDomain::from_bounds(&b, DomainPreset::Small, FlowAxis::X);
        let script = build_domain_script(
            "plane.stp",
            &domain,
            &DomainPreset::Small.ratios(),
            b.ref_len(),
            FlowAxis::X,
        );

        assert!(script.contains("SetFactory(\"OpenCASCADE\");"));
        assert!(script.contains("Merge \"plane.stp\";"));
        assert!(script.contains("BooleanDifference"));
        for group in ["fluid", "inlet", "outlet", "walls", "farfield"] {
            assert!(
                script.contains(&format!("\"{}\"", group)),
                "missing physical group {}",
                group
            );
        }
        assert!(script.contains("Field[1] = Distance;"));
        assert!(script.contains("Background Field = 2;"));
        // near size = ref_len / 300 for the Small preset
        assert!(script.contains("Field[2].SizeMin = 0.033333333;"));
    }

    #[test]
    fn test_slab_is_thin_along_plane_axis() {
        let domain = FarfieldDomain::from_bounds(&bounds(), DomainPreset::Small, FlowAxis::X);
        let eps = domain.plane_tolerance();
        let slab = domain.slab(FlowAxis::X, domain.x0, eps);
        // lower and upper x bound of the slab bracket x0 tightly
        assert!(slab.starts_with("Surface In BoundingBox{"));
        assert!(slab.contains(&format!("{:.9}", domain.x0 - eps)));
        assert!(slab.contains(&format!("{:.9}", domain.x0 + eps)));
    }
}
