//! Through mortise and tenon with drawbore pegs.

use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::{StructuralRole, Vec3};

use super::geometry::{
    approach_direction, joint_end, rect_prism, section_center_at, section_prism,
    subtract_or_keep, CLEARANCE, OVERSHOOT,
};
use crate::definition::{angle_check, JointContext, JointInfo, TimberJointDefinition};
use crate::params::{JointParameter, ParameterSet};
use crate::types::{
    FabricationSignature, JointError, PegDefinition, SecondaryProfile, ValidationResult,
};

const MIN_TENON: f64 = 20.0;
const DEFAULT_PEG_DIAMETER: f64 = 25.4;
const DEFAULT_DRAWBORE: f64 = 3.2;
/// Secondary depth from which two pegs are used instead of one.
const TWO_PEG_HEIGHT: f64 = 150.0;
/// Pegs stick out this far beyond the primary in total.
const PEG_PROTRUSION: f64 = 20.0;

const MIN_CHEEK: f64 = 10.0;
const TALL_TENON_RATIO: f64 = 0.8;
const PEG_EDGE_RATIO: f64 = 1.5;

/// Default edge distance and spacing for a peg layout.
fn peg_layout(count: i64, diameter: f64, tenon_height: f64) -> (f64, f64) {
    match count {
        c if c >= 2 => {
            let edge = (2.5 * diameter).min(tenon_height / 4.0);
            (edge, tenon_height - 2.0 * edge)
        }
        _ => (tenon_height / 2.0, 0.0),
    }
}

/// Offsets of each peg along the tenon height axis, symmetric about zero.
fn peg_offsets(count: usize, span: f64) -> Vec<f64> {
    if count < 2 {
        return vec![0.0; count];
    }
    let pitch = span / (count - 1) as f64;
    (0..count)
        .map(|i| -span / 2.0 + pitch * i as f64)
        .collect()
}

struct Placement {
    approach: Vec3,
    through: f64,
    /// Tenon centre line at the middle of the primary.
    mortise_center: Vec3,
    /// Section centre at the secondary's joint end.
    root: Vec3,
    outward: Vec3,
    width_axis: Vec3,
    height_axis: Vec3,
}

impl Placement {
    fn new(ctx: &JointContext<'_>) -> Self {
        let approach = approach_direction(ctx);
        let end = joint_end(ctx.secondary, ctx.cs.origin);
        let frame = ctx.secondary.frame();
        let root = end.point + ctx.secondary.section_offset();
        let primary_center = section_center_at(ctx.primary, ctx.cs.origin);
        let mortise_center = root + approach * (primary_center - root).dot(&approach);
        Self {
            approach,
            through: ctx.primary.footprint_along(approach),
            mortise_center,
            root,
            outward: end.outward,
            width_axis: frame.y_axis,
            height_axis: frame.z_axis,
        }
    }
}

pub struct ThroughMortiseTenon {
    info: JointInfo,
}

impl ThroughMortiseTenon {
    pub fn new() -> Self {
        Self {
            info: JointInfo {
                id: "through_mortise_tenon".to_string(),
                name: "Through Mortise & Tenon".to_string(),
                category: "Mortise & Tenon".to_string(),
                description: "Tenon passing fully through the primary, secured with drawbored pegs."
                    .to_string(),
                primary_roles: vec![
                    StructuralRole::Post,
                    StructuralRole::Beam,
                    StructuralRole::Girt,
                    StructuralRole::TieBeam,
                    StructuralRole::Plate,
                    StructuralRole::Sill,
                    StructuralRole::SummerBeam,
                ],
                secondary_roles: vec![
                    StructuralRole::Beam,
                    StructuralRole::Girt,
                    StructuralRole::TieBeam,
                    StructuralRole::Rafter,
                    StructuralRole::Brace,
                    StructuralRole::FloorJoist,
                ],
                min_angle: 45.0,
                max_angle: 135.0,
            },
        }
    }
}

impl Default for ThroughMortiseTenon {
    fn default() -> Self {
        Self::new()
    }
}

impl TimberJointDefinition for ThroughMortiseTenon {
    fn info(&self) -> &JointInfo {
        &self.info
    }

    fn get_parameters(&self, ctx: &JointContext<'_>) -> ParameterSet {
        let sw = ctx.secondary.width;
        let sh = ctx.secondary.height;
        let through = ctx.primary.footprint_along(approach_direction(ctx));

        let tenon_width = (sw / 3.0).clamp(MIN_TENON, (0.9 * sw).max(MIN_TENON));
        let tenon_height = (0.75 * sh).clamp(MIN_TENON, (0.9 * sh).max(MIN_TENON));
        let peg_count: i64 = if sh >= TWO_PEG_HEIGHT { 2 } else { 1 };
        let (edge, spacing) = peg_layout(peg_count, DEFAULT_PEG_DIAMETER, tenon_height);

        [
            JointParameter::length("tenon_width", sw / 3.0)
                .bounds(MIN_TENON, 0.9 * sw)
                .group("Tenon")
                .describe("Tenon thickness across the secondary"),
            JointParameter::length("tenon_height", 0.75 * sh)
                .bounds(MIN_TENON, 0.9 * sh)
                .group("Tenon")
                .describe("Tenon depth along the secondary height"),
            JointParameter::length("tenon_length", through)
                .bounds(0.5 * through, 1.5 * through)
                .group("Tenon")
                .describe("How far the tenon projects from the shoulder"),
            JointParameter::length("mortise_width", tenon_width + 2.0 * CLEARANCE)
                .min(MIN_TENON)
                .group("Mortise"),
            JointParameter::length("mortise_height", tenon_height + 2.0 * CLEARANCE)
                .min(MIN_TENON)
                .group("Mortise"),
            JointParameter::length("shoulder_depth", ((sh - tenon_height) / 2.0).max(0.0))
                .min(0.0)
                .group("Tenon"),
            JointParameter::length("peg_diameter", DEFAULT_PEG_DIAMETER)
                .bounds(12.0, 38.0)
                .group("Pegs"),
            JointParameter::integer("peg_count", peg_count)
                .bounds(0.0, 4.0)
                .group("Pegs"),
            JointParameter::length("peg_edge_distance", edge)
                .min(0.0)
                .group("Pegs")
                .describe("Distance from the outer pegs to the tenon edge"),
            JointParameter::length("peg_spacing", spacing)
                .min(0.0)
                .group("Pegs")
                .describe("Distance between the outermost pegs"),
            JointParameter::length("drawbore_offset", DEFAULT_DRAWBORE)
                .bounds(0.0, 6.0)
                .group("Pegs")
                .describe("Offset of the peg hole in the tenon toward the shoulder"),
        ]
        .into_iter()
        .collect()
    }

    fn build_primary_tool(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<KernelSolidHandle, JointError> {
        let at = Placement::new(ctx);
        let reach = at.through / 2.0 + OVERSHOOT;
        rect_prism(
            kernel,
            at.mortise_center - at.approach * reach,
            at.width_axis,
            at.height_axis,
            params.number("mortise_width")?,
            params.number("mortise_height")?,
            at.approach,
            2.0 * reach,
        )
    }

    fn build_secondary_profile(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<SecondaryProfile, JointError> {
        let at = Placement::new(ctx);
        let width = params.number("tenon_width")?;
        let height = params.number("tenon_height")?;
        let length = params.number("tenon_length")?;

        let tenon = rect_prism(
            kernel,
            at.root,
            at.width_axis,
            at.height_axis,
            width,
            height,
            at.outward,
            length,
        )?;

        let end = joint_end(ctx.secondary, ctx.cs.origin).point;
        let waste = section_prism(kernel, ctx.secondary, end, -at.outward, length)?;
        let core = rect_prism(
            kernel,
            at.root,
            at.width_axis,
            at.height_axis,
            width,
            height,
            -at.outward,
            length,
        )?;
        let shoulder_cut = subtract_or_keep(kernel, &waste, &core, "tenon shoulder");

        Ok(SecondaryProfile {
            tenon_shape: tenon,
            shoulder_cut,
        })
    }

    fn build_pegs(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<Vec<PegDefinition>, JointError> {
        let count = params.integer("peg_count")?.max(0) as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        let at = Placement::new(ctx);
        let diameter = params.number("peg_diameter")?;
        let drawbore_offset = params.number("drawbore_offset")?;

        let mut span = params.number("peg_spacing")?;
        if count >= 2 && span <= 0.0 {
            let height = params.number("tenon_height")?;
            span = (height - 2.0 * params.number("peg_edge_distance")?).max(0.0);
        }

        Ok(peg_offsets(count, span)
            .into_iter()
            .map(|offset| PegDefinition {
                center: at.mortise_center + at.height_axis * offset,
                diameter,
                length: at.through + PEG_PROTRUSION,
                axis: at.approach,
                drawbore_offset,
            })
            .collect())
    }

    fn validate(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<Vec<ValidationResult>, JointError> {
        let sw = ctx.secondary.width;
        let sh = ctx.secondary.height;
        let tenon_width = params.number("tenon_width")?;
        let tenon_height = params.number("tenon_height")?;
        let mut results = Vec::new();

        if tenon_height > TALL_TENON_RATIO * sh {
            results.push(ValidationResult::warning(
                "TENON_TOO_TALL",
                format!(
                    "Tenon height {tenon_height:.1} mm exceeds 80% of the secondary's {sh:.1} mm depth"
                ),
            ));
        }
        let cheek = (sw - tenon_width) / 2.0;
        if cheek < MIN_CHEEK {
            results.push(ValidationResult::error(
                "CHEEK_TOO_THIN",
                format!("Cheeks of {cheek:.1} mm are thinner than {MIN_CHEEK:.0} mm"),
            ));
        }
        let diameter = params.number("peg_diameter")?;
        let edge = params.number("peg_edge_distance")?;
        if params.integer("peg_count")? > 0 && edge < PEG_EDGE_RATIO * diameter {
            results.push(ValidationResult::warning(
                "PEG_EDGE_DISTANCE",
                format!(
                    "Peg edge distance {edge:.1} mm is under 1.5 × the {diameter:.1} mm peg diameter"
                ),
            ));
        }
        results.extend(angle_check(&self.info, ctx.cs));
        Ok(results)
    }

    fn fabrication_signature(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<FabricationSignature, JointError> {
        let mut sig = FabricationSignature::new(&self.info.id);
        for name in [
            "tenon_width",
            "tenon_height",
            "tenon_length",
            "mortise_width",
            "mortise_height",
            "peg_diameter",
            "peg_spacing",
            "drawbore_offset",
        ] {
            sig.insert_length(name, params.number(name)?);
        }
        sig.insert_integer("peg_count", params.integer("peg_count")?);
        sig.insert_length("angle", ctx.cs.angle);
        Ok(sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use timber_kernel::{KernelIntrospect, MockKernel};
    use timber_types::MemberGeometry;

    use crate::types::JointCoordinateSystem;

    /// Beam (sec_h tall) framing into the side of a 200 × 200 post.
    fn beam_into_post(sec_h: f64) -> (MemberGeometry, MemberGeometry, JointCoordinateSystem) {
        let post = MemberGeometry::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 3000.0), 200.0, 200.0)
            .with_role(StructuralRole::Post);
        let beam = MemberGeometry::new(
            Vec3::new(-2000.0, 0.0, 2000.0),
            Vec3::new(0.0, 0.0, 2000.0),
            150.0,
            sec_h,
        );
        let cs = JointCoordinateSystem {
            origin: Vec3::new(0.0, 0.0, 2000.0),
            primary_axis: Vec3::Z,
            secondary_axis: Vec3::X,
            normal: Vec3::Y,
            angle: 90.0,
        };
        (post, beam, cs)
    }

    #[test]
    fn test_peg_count_follows_secondary_height() {
        let joint = ThroughMortiseTenon::new();

        let (p, s, cs) = beam_into_post(140.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let pegs = joint.build_pegs(&joint.get_parameters(&ctx), &ctx).unwrap();
        assert_eq!(pegs.len(), 1);

        let (p, s, cs) = beam_into_post(160.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let params = joint.get_parameters(&ctx);
        assert!(params.number("peg_edge_distance").unwrap() >= 0.0);
        let pegs = joint.build_pegs(&params, &ctx).unwrap();
        assert_eq!(pegs.len(), 2);

        // Symmetric about the tenon centre line.
        let center = pegs[0].center.midpoint(&pegs[1].center);
        let placement = Placement::new(&ctx);
        assert_relative_eq!(center.distance_to(&placement.mortise_center), 0.0, epsilon = 1e-9);
        assert_relative_eq!(pegs[0].center.distance_to(&pegs[1].center), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_defaults() {
        let (p, s, cs) = beam_into_post(200.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let params = ThroughMortiseTenon::new().get_parameters(&ctx);
        assert_relative_eq!(params.number("tenon_width").unwrap(), 50.0);
        assert_relative_eq!(params.number("tenon_height").unwrap(), 150.0);
        assert_relative_eq!(params.number("tenon_length").unwrap(), 200.0);
        assert_relative_eq!(params.number("mortise_width").unwrap(), 53.2);
        assert_relative_eq!(params.number("mortise_height").unwrap(), 153.2);
        assert_relative_eq!(params.number("shoulder_depth").unwrap(), 25.0);
        assert_eq!(params.integer("peg_count").unwrap(), 2);
        // min(2.5 × 25.4, 150 / 4)
        assert_relative_eq!(params.number("peg_edge_distance").unwrap(), 37.5);
        assert_relative_eq!(params.number("peg_spacing").unwrap(), 75.0);
    }

    #[test]
    fn test_mortise_passes_through_post() {
        let (p, s, cs) = beam_into_post(200.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = ThroughMortiseTenon::new();
        let params = joint.get_parameters(&ctx);
        let mut k = MockKernel::new();
        let tool = joint.build_primary_tool(&params, &ctx, &mut k).unwrap();
        let bb = k.bounding_box(&tool).unwrap();
        // Post spans x ∈ [-100, 100]; the beam approaches along +X.
        assert_relative_eq!(bb.min[0], -100.0 - OVERSHOOT, epsilon = 1e-9);
        assert_relative_eq!(bb.max[0], 100.0 + OVERSHOOT, epsilon = 1e-9);
        assert_relative_eq!(bb.size()[1], 53.2, epsilon = 1e-9);
        assert_relative_eq!(bb.size()[2], 153.2, epsilon = 1e-9);
        // Centred on the beam's section, which sits above its datum.
        assert_relative_eq!(bb.center()[2], 2100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tenon_projects_from_joint_end() {
        let (p, s, cs) = beam_into_post(200.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = ThroughMortiseTenon::new();
        let params = joint.get_parameters(&ctx);
        let mut k = MockKernel::new();
        let profile = joint.build_secondary_profile(&params, &ctx, &mut k).unwrap();

        let tenon = k.bounding_box(&profile.tenon_shape).unwrap();
        assert_relative_eq!(tenon.min[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(tenon.max[0], 200.0, epsilon = 1e-9);

        let waste = k.bounding_box(&profile.shoulder_cut).unwrap();
        assert_relative_eq!(waste.min[0], -200.0, epsilon = 1e-9);
        assert_relative_eq!(waste.max[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_pegs() {
        let (p, s, cs) = beam_into_post(200.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = ThroughMortiseTenon::new();
        let mut params = joint.get_parameters(&ctx);
        params.set_override("peg_count", 0i64.into()).unwrap();
        assert!(joint.build_pegs(&params, &ctx).unwrap().is_empty());
        assert!(joint
            .validate(&params, &ctx)
            .unwrap()
            .iter()
            .all(|r| r.code != "PEG_EDGE_DISTANCE"));
    }

    #[test]
    fn test_four_pegs_spread_over_span() {
        let (p, s, cs) = beam_into_post(200.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = ThroughMortiseTenon::new();
        let mut params = joint.get_parameters(&ctx);
        params.set_override("peg_count", 4i64.into()).unwrap();
        let pegs = joint.build_pegs(&params, &ctx).unwrap();
        assert_eq!(pegs.len(), 4);
        let first = pegs.first().unwrap().center;
        let last = pegs.last().unwrap().center;
        assert_relative_eq!(first.distance_to(&last), 75.0, epsilon = 1e-9);
        assert!(pegs.iter().all(|peg| peg.axis == Vec3::X));
    }

    #[test]
    fn test_thin_cheeks_are_an_error() {
        let (p, s, cs) = beam_into_post(200.0);
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = ThroughMortiseTenon::new();
        let mut params = joint.get_parameters(&ctx);
        params.set_override("tenon_width", 135.0.into()).unwrap();
        params.set_override("tenon_height", 170.0.into()).unwrap();
        let results = joint.validate(&params, &ctx).unwrap();
        assert!(results.iter().any(|r| r.code == "CHEEK_TOO_THIN" && r.is_error()));
        assert!(results.iter().any(|r| r.code == "TENON_TOO_TALL" && !r.is_error()));
    }
}
