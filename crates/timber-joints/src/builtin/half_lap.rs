//! Half-lap: each member is notched to half its depth so the two cross flush.

use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::{MemberGeometry, StructuralRole};

use super::geometry::{box_prism, CLEARANCE, OVERSHOOT};
use crate::definition::{angle_check, JointContext, JointInfo, TimberJointDefinition};
use crate::params::{JointParameter, ParameterSet};
use crate::types::{FabricationSignature, JointError, SecondaryProfile, ValidationResult};

const MIN_LAP_WIDTH: f64 = 10.0;
const DEEP_LAP_RATIO: f64 = 0.6;

/// Face a notch is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LapFace {
    Top,
    Bottom,
}

impl LapFace {
    fn parse(s: &str) -> Self {
        match s {
            "Bottom" => LapFace::Bottom,
            _ => LapFace::Top,
        }
    }

    fn opposite(self) -> Self {
        match self {
            LapFace::Top => LapFace::Bottom,
            LapFace::Bottom => LapFace::Top,
        }
    }
}

/// Notch geometry for one member, all in that member's own frame.
struct Notch<'a> {
    member: &'a MemberGeometry,
    /// Datum station of the notch centre.
    station: f64,
    width: f64,
    depth: f64,
    face: LapFace,
}

impl Notch<'_> {
    /// Height-axis span of the removed material, with `overshoot` past the face.
    fn z_span(&self, overshoot: f64) -> (f64, f64) {
        let bounds = self.member.section_bounds();
        match self.face {
            LapFace::Top => (bounds.z_max - self.depth, bounds.z_max + overshoot),
            LapFace::Bottom => (bounds.z_min - overshoot, bounds.z_min + self.depth),
        }
    }

    /// Height-axis span of the material left standing under the notch.
    fn remaining_z_span(&self) -> (f64, f64) {
        let bounds = self.member.section_bounds();
        match self.face {
            LapFace::Top => (bounds.z_min, bounds.z_max - self.depth),
            LapFace::Bottom => (bounds.z_min + self.depth, bounds.z_max),
        }
    }

    fn build(
        &self,
        kernel: &mut dyn Kernel,
        (z_lo, z_hi): (f64, f64),
        y_overshoot: f64,
    ) -> Result<KernelSolidHandle, JointError> {
        let frame = self.member.frame();
        let bounds = self.member.section_bounds();
        let corner = frame.point_at(
            self.station - self.width / 2.0,
            bounds.y_min - y_overshoot,
            z_lo,
        );
        box_prism(
            kernel,
            corner,
            frame.x_axis * self.width,
            frame.y_axis * (self.member.width + 2.0 * y_overshoot),
            frame.z_axis * (z_hi - z_lo),
        )
    }

    fn cut_tool(&self, kernel: &mut dyn Kernel) -> Result<KernelSolidHandle, JointError> {
        self.build(kernel, self.z_span(OVERSHOOT), OVERSHOOT)
    }

    fn remaining(&self, kernel: &mut dyn Kernel) -> Result<KernelSolidHandle, JointError> {
        self.build(kernel, self.remaining_z_span(), 0.0)
    }
}

fn lap_width_default(notched: &MemberGeometry, crossing: &MemberGeometry) -> f64 {
    let along = notched.frame().x_axis;
    (crossing.footprint_along(along) + CLEARANCE).max(MIN_LAP_WIDTH)
}

pub struct HalfLap {
    info: JointInfo,
}

impl HalfLap {
    pub fn new() -> Self {
        let roles = vec![
            StructuralRole::Beam,
            StructuralRole::Girt,
            StructuralRole::Plate,
            StructuralRole::Sill,
            StructuralRole::Purlin,
            StructuralRole::TieBeam,
        ];
        Self {
            info: JointInfo {
                id: "half_lap".to_string(),
                name: "Half Lap".to_string(),
                category: "Lap Joints".to_string(),
                description: "Both members notched to half depth so they cross flush.".to_string(),
                primary_roles: roles.clone(),
                secondary_roles: roles,
                min_angle: 60.0,
                max_angle: 120.0,
            },
        }
    }

    fn notches<'a>(
        params: &ParameterSet,
        ctx: &JointContext<'a>,
    ) -> Result<(Notch<'a>, Notch<'a>), JointError> {
        let primary_face = LapFace::parse(params.text("primary_face")?);
        let primary = Notch {
            member: ctx.primary,
            station: ctx.primary.datum_parameter(ctx.cs.origin),
            width: params.number("lap_width_primary")?,
            depth: params.number("lap_depth_primary")?,
            face: primary_face,
        };
        let secondary = Notch {
            member: ctx.secondary,
            station: ctx.secondary.datum_parameter(ctx.cs.origin),
            width: params.number("lap_width_secondary")?,
            depth: params.number("lap_depth_secondary")?,
            face: primary_face.opposite(),
        };
        Ok((primary, secondary))
    }
}

impl Default for HalfLap {
    fn default() -> Self {
        Self::new()
    }
}

impl TimberJointDefinition for HalfLap {
    fn info(&self) -> &JointInfo {
        &self.info
    }

    fn get_parameters(&self, ctx: &JointContext<'_>) -> ParameterSet {
        let ph = ctx.primary.height;
        let sh = ctx.secondary.height;
        [
            JointParameter::length("lap_depth_primary", ph / 2.0)
                .bounds(0.25 * ph, 0.75 * ph)
                .group("Primary")
                .describe("Depth of the notch in the primary member"),
            JointParameter::length("lap_width_primary", lap_width_default(ctx.primary, ctx.secondary))
                .min(MIN_LAP_WIDTH)
                .group("Primary")
                .describe("Length of the notch along the primary member"),
            JointParameter::length("lap_depth_secondary", sh / 2.0)
                .bounds(0.25 * sh, 0.75 * sh)
                .group("Secondary")
                .describe("Depth of the notch in the secondary member"),
            JointParameter::length(
                "lap_width_secondary",
                lap_width_default(ctx.secondary, ctx.primary),
            )
            .min(MIN_LAP_WIDTH)
            .group("Secondary")
            .describe("Length of the notch along the secondary member"),
            JointParameter::enumeration("primary_face", "Top", &["Top", "Bottom"])
                .describe("Face of the primary the notch opens onto"),
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
        let (primary, _) = Self::notches(params, ctx)?;
        primary.cut_tool(kernel)
    }

    fn build_secondary_profile(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<SecondaryProfile, JointError> {
        let (_, secondary) = Self::notches(params, ctx)?;
        Ok(SecondaryProfile {
            shoulder_cut: secondary.cut_tool(kernel)?,
            tenon_shape: secondary.remaining(kernel)?,
        })
    }

    fn validate(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<Vec<ValidationResult>, JointError> {
        let mut results = Vec::new();
        for (label, depth, height) in [
            ("primary", params.number("lap_depth_primary")?, ctx.primary.height),
            ("secondary", params.number("lap_depth_secondary")?, ctx.secondary.height),
        ] {
            if depth > DEEP_LAP_RATIO * height {
                results.push(ValidationResult::warning(
                    "LAP_TOO_DEEP",
                    format!(
                        "Lap depth {depth:.1} mm removes more than 60% of the {label} member's {height:.1} mm height"
                    ),
                ));
            }
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
            "lap_depth_primary",
            "lap_width_primary",
            "lap_depth_secondary",
            "lap_width_secondary",
        ] {
            sig.insert_length(name, params.number(name)?);
        }
        sig.insert_text("primary_face", params.text("primary_face")?);
        sig.insert_length("angle", ctx.cs.angle);
        Ok(sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use timber_kernel::{KernelIntrospect, MockKernel};
    use timber_types::Vec3;

    use crate::types::JointCoordinateSystem;

    fn crossing() -> (MemberGeometry, MemberGeometry, JointCoordinateSystem) {
        let primary = MemberGeometry::new(Vec3::ZERO, Vec3::new(2000.0, 0.0, 0.0), 150.0, 200.0);
        let secondary = MemberGeometry::new(
            Vec3::new(1000.0, -1000.0, 0.0),
            Vec3::new(1000.0, 1000.0, 0.0),
            100.0,
            180.0,
        );
        let cs = JointCoordinateSystem {
            origin: Vec3::new(1000.0, 0.0, 0.0),
            primary_axis: Vec3::X,
            secondary_axis: Vec3::Y,
            normal: Vec3::Z,
            angle: 90.0,
        };
        (primary, secondary, cs)
    }

    #[test]
    fn test_defaults_follow_sections() {
        let (p, s, cs) = crossing();
        let params = HalfLap::new().get_parameters(&JointContext::new(&p, &s, &cs));
        assert_relative_eq!(params.number("lap_depth_primary").unwrap(), 100.0);
        assert_relative_eq!(params.number("lap_depth_secondary").unwrap(), 90.0);
        // Secondary is 100 wide across the primary's axis.
        assert_relative_eq!(params.number("lap_width_primary").unwrap(), 101.6);
        assert_relative_eq!(params.number("lap_width_secondary").unwrap(), 151.6);
        assert_eq!(params.text("primary_face").unwrap(), "Top");
    }

    #[test]
    fn test_primary_notch_opens_on_top_face() {
        let (p, s, cs) = crossing();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = HalfLap::new();
        let params = joint.get_parameters(&ctx);
        let mut k = MockKernel::new();
        let tool = joint.build_primary_tool(&params, &ctx, &mut k).unwrap();
        let bb = k.bounding_box(&tool).unwrap();
        assert_relative_eq!(bb.min[0], 1000.0 - 50.8, epsilon = 1e-9);
        assert_relative_eq!(bb.max[0], 1000.0 + 50.8, epsilon = 1e-9);
        assert_relative_eq!(bb.min[2], 100.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max[2], 200.0 + OVERSHOOT, epsilon = 1e-9);
        assert_relative_eq!(bb.size()[1], 150.0 + 2.0 * OVERSHOOT, epsilon = 1e-9);
    }

    #[test]
    fn test_secondary_notch_is_cut_from_opposite_face() {
        let (p, s, cs) = crossing();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = HalfLap::new();
        let params = joint.get_parameters(&ctx);
        let mut k = MockKernel::new();
        let profile = joint.build_secondary_profile(&params, &ctx, &mut k).unwrap();

        let cut = k.bounding_box(&profile.shoulder_cut).unwrap();
        assert_relative_eq!(cut.min[2], -OVERSHOOT, epsilon = 1e-9);
        assert_relative_eq!(cut.max[2], 90.0, epsilon = 1e-9);

        let kept = k.bounding_box(&profile.tenon_shape).unwrap();
        assert_relative_eq!(kept.min[2], 90.0, epsilon = 1e-9);
        assert_relative_eq!(kept.max[2], 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bottom_face_flips_both_notches() {
        let (p, s, cs) = crossing();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = HalfLap::new();
        let mut params = joint.get_parameters(&ctx);
        params.set_override("primary_face", "Bottom".into()).unwrap();
        let mut k = MockKernel::new();
        let tool = joint.build_primary_tool(&params, &ctx, &mut k).unwrap();
        let bb = k.bounding_box(&tool).unwrap();
        assert_relative_eq!(bb.min[2], -OVERSHOOT, epsilon = 1e-9);
        assert_relative_eq!(bb.max[2], 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deep_lap_warns() {
        let (p, s, cs) = crossing();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = HalfLap::new();
        let mut params = joint.get_parameters(&ctx);
        assert!(joint.validate(&params, &ctx).unwrap().is_empty());

        params.set_override("lap_depth_primary", 140.0.into()).unwrap();
        let results = joint.validate(&params, &ctx).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, "LAP_TOO_DEEP");
        assert!(!results[0].is_error());
    }

    #[test]
    fn test_signature_matches_for_identical_crossings() {
        let (p, s, cs) = crossing();
        let joint = HalfLap::new();
        let ctx = JointContext::new(&p, &s, &cs);
        let a = joint
            .fabrication_signature(&joint.get_parameters(&ctx), &ctx)
            .unwrap();

        let shift = Vec3::new(0.0, 3000.0, 0.0);
        let (p2, s2) = (
            MemberGeometry::new(p.start + shift, p.end + shift, p.width, p.height),
            MemberGeometry::new(s.start + shift, s.end + shift, s.width, s.height),
        );
        let cs2 = JointCoordinateSystem {
            origin: cs.origin + shift,
            ..cs
        };
        let ctx2 = JointContext::new(&p2, &s2, &cs2);
        let b = joint
            .fabrication_signature(&joint.get_parameters(&ctx2), &ctx2)
            .unwrap();
        assert_eq!(a, b);
    }
}
