//! Sliding dovetail: a trapezoidal tail on the secondary drops into a
//! matching channel in the primary, narrow at the shoulder and wide at the
//! tip so it cannot pull out along the approach direction.
//!
//! The housed variant always uses a half channel and additionally lets the
//! secondary's full end section into the primary by `housing_depth`.

use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::{StructuralRole, Vec3};

use super::geometry::{
    approach_direction, joint_end, section_center_at, section_prism, subtract_or_keep,
    TrapezoidPrism, CLEARANCE, OVERSHOOT,
};
use crate::definition::{angle_check, JointContext, JointInfo, TimberJointDefinition};
use crate::params::{JointParameter, ParameterSet};
use crate::types::{FabricationSignature, JointError, SecondaryProfile, ValidationResult};

const DEFAULT_ANGLE: f64 = 14.0;
const DEFAULT_HOUSING_DEPTH: f64 = 12.7;
const MIN_TAIL: f64 = 20.0;

const TALL_TAIL_RATIO: f64 = 0.7;
const WIDE_TAIL_RATIO: f64 = 0.8;
const DEEP_SLOT_RATIO: f64 = 0.6;

/// Wide end of the tail for a given narrow end, height and flank angle.
pub fn tail_width_wide(narrow: f64, height: f64, angle_deg: f64) -> f64 {
    narrow + 2.0 * height * angle_deg.to_radians().tan()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Plain,
    Housed,
}

/// Which part of the primary's depth the channel runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Through,
    /// Open toward the +taper side, or −taper when flipped.
    Half { flip: bool },
}

/// Effective tail dimensions after overrides.
#[derive(Debug, Clone, Copy)]
struct Tail {
    narrow: f64,
    wide: f64,
    height: f64,
    slot_depth: f64,
    clearance: f64,
}

impl Tail {
    fn from_params(params: &ParameterSet) -> Result<Self, JointError> {
        let narrow = params.number("tail_width_narrow")?;
        let height = params.number("tail_height")?;
        let wide = if params.is_overridden("tail_width_wide") {
            params.number("tail_width_wide")?
        } else {
            tail_width_wide(narrow, height, params.number("dovetail_angle")?)
        };
        Ok(Self {
            narrow,
            wide,
            height,
            slot_depth: params.number("slot_depth")?,
            clearance: params.number("clearance")?,
        })
    }
}

/// Directions shared by the slot and the tail.
struct Layout {
    approach: Vec3,
    along: Vec3,
    taper: Vec3,
    /// Centre of the primary face the secondary enters through.
    entry: Vec3,
    taper_extent: f64,
}

impl Layout {
    fn new(ctx: &JointContext<'_>) -> Self {
        let approach = approach_direction(ctx);
        let along = ctx.primary.frame().x_axis;
        let taper = approach
            .cross(&along)
            .normalized()
            .unwrap_or(ctx.primary.frame().z_axis);
        let through = ctx.primary.footprint_along(approach);
        let entry = section_center_at(ctx.primary, ctx.cs.origin) - approach * (through / 2.0);
        Self {
            approach,
            along,
            taper,
            entry,
            taper_extent: ctx.primary.footprint_along(taper),
        }
    }

    /// Point on the secondary datum level with the entry face.
    fn shoulder_datum(&self, ctx: &JointContext<'_>) -> Vec3 {
        let frame = ctx.secondary.frame();
        ctx.secondary.start + frame.x_axis * ctx.secondary.datum_parameter(self.entry)
    }
}

pub struct Dovetail {
    info: JointInfo,
    variant: Variant,
}

impl Dovetail {
    fn with_variant(variant: Variant) -> Self {
        let (id, name, description) = match variant {
            Variant::Plain => (
                "dovetail",
                "Dovetail",
                "Trapezoidal tail sliding into a through or half channel.",
            ),
            Variant::Housed => (
                "housed_dovetail",
                "Housed Dovetail",
                "Half-channel dovetail with the full end section let into the primary.",
            ),
        };
        Self {
            info: JointInfo {
                id: id.to_string(),
                name: name.to_string(),
                category: "Dovetail".to_string(),
                description: description.to_string(),
                primary_roles: vec![
                    StructuralRole::Beam,
                    StructuralRole::Girt,
                    StructuralRole::SummerBeam,
                    StructuralRole::Plate,
                    StructuralRole::Post,
                ],
                secondary_roles: vec![
                    StructuralRole::FloorJoist,
                    StructuralRole::Rafter,
                    StructuralRole::Purlin,
                    StructuralRole::Girt,
                ],
                min_angle: 75.0,
                max_angle: 105.0,
            },
            variant,
        }
    }

    pub fn plain() -> Self {
        Self::with_variant(Variant::Plain)
    }

    pub fn housed() -> Self {
        Self::with_variant(Variant::Housed)
    }

    fn channel(&self, params: &ParameterSet) -> Result<Channel, JointError> {
        let flip = params.flag("flip_channel")?;
        Ok(match self.variant {
            Variant::Housed => Channel::Half { flip },
            Variant::Plain => match params.text("channel_mode")? {
                "Half" => Channel::Half { flip },
                _ => Channel::Through,
            },
        })
    }

    fn slot(
        &self,
        params: &ParameterSet,
        layout: &Layout,
        tail: &Tail,
    ) -> Result<TrapezoidPrism, JointError> {
        let (length, offset) = match self.channel(params)? {
            Channel::Through => (layout.taper_extent + 2.0 * OVERSHOOT, 0.0),
            Channel::Half { flip } => {
                let length = layout.taper_extent / 2.0 + OVERSHOOT;
                let side = if flip { -1.0 } else { 1.0 };
                (length, side * length / 2.0)
            }
        };
        Ok(TrapezoidPrism {
            origin: layout.entry + layout.taper * offset,
            width_dir: layout.along,
            height_dir: layout.taper,
            depth_dir: layout.approach,
            narrow: tail.narrow + 2.0 * tail.clearance,
            wide: tail.wide + 2.0 * tail.clearance,
            height: length,
            depth: tail.slot_depth,
        })
    }

    fn tail_prism(ctx: &JointContext<'_>, layout: &Layout, tail: &Tail) -> TrapezoidPrism {
        let shoulder = layout.shoulder_datum(ctx);
        let section_center = shoulder + ctx.secondary.section_offset();
        TrapezoidPrism {
            origin: section_center,
            width_dir: layout.along,
            height_dir: layout.taper,
            depth_dir: layout.approach,
            narrow: tail.narrow,
            wide: tail.wide,
            height: tail.height,
            depth: tail.slot_depth,
        }
    }
}

impl TimberJointDefinition for Dovetail {
    fn info(&self) -> &JointInfo {
        &self.info
    }

    fn get_parameters(&self, ctx: &JointContext<'_>) -> ParameterSet {
        let sw = ctx.secondary.width;
        let sh = ctx.secondary.height;
        let pw = ctx.primary.width;

        let narrow = JointParameter::length("tail_width_narrow", 0.6 * sw)
            .bounds(MIN_TAIL, 0.9 * sw)
            .group("Tail")
            .describe("Tail width at the shoulder");
        let height = JointParameter::length("tail_height", 0.5 * sh)
            .bounds(MIN_TAIL, 0.8 * sh)
            .group("Tail")
            .describe("Tail thickness along the channel");
        let angle = JointParameter::angle("dovetail_angle", DEFAULT_ANGLE)
            .bounds(8.0, 20.0)
            .group("Tail")
            .describe("Flank angle of the tail");
        let narrow_v = narrow.default_value.as_f64().unwrap_or(0.6 * sw);
        let height_v = height.default_value.as_f64().unwrap_or(0.5 * sh);
        let wide = JointParameter::length(
            "tail_width_wide",
            tail_width_wide(narrow_v, height_v, DEFAULT_ANGLE),
        )
        .min(MIN_TAIL)
        .group("Tail")
        .describe("Tail width at the tip; derived from the flank angle unless set");

        let mut params = vec![
            angle,
            narrow,
            wide,
            height,
            JointParameter::length("slot_depth", 0.5 * pw)
                .bounds(0.25 * pw, 0.75 * pw)
                .group("Slot")
                .describe("How far the tail reaches into the primary"),
            JointParameter::length("shoulder_depth", ((sh - height_v) / 2.0).max(0.0))
                .min(0.0)
                .group("Tail")
                .describe("Shoulder above and below the tail"),
            JointParameter::length("clearance", CLEARANCE)
                .bounds(0.0, 3.0)
                .group("Slot")
                .describe("Gap per side between tail and channel"),
        ];
        match self.variant {
            Variant::Plain => params.push(
                JointParameter::enumeration("channel_mode", "Through", &["Through", "Half"])
                    .group("Slot")
                    .describe("Run the channel through the primary or stop it halfway"),
            ),
            Variant::Housed => params.push(
                JointParameter::length("housing_depth", DEFAULT_HOUSING_DEPTH)
                    .bounds(0.0, 0.25 * pw)
                    .group("Slot")
                    .describe("Depth the full end section is let into the primary"),
            ),
        }
        params.push(
            JointParameter::boolean("flip_channel", false)
                .group("Slot")
                .describe("Open a half channel on the other side"),
        );
        params.into_iter().collect()
    }

    fn build_primary_tool(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<KernelSolidHandle, JointError> {
        let layout = Layout::new(ctx);
        let tail = Tail::from_params(params)?;
        let slot = self.slot(params, &layout, &tail)?.build(kernel)?;
        if self.variant == Variant::Plain {
            return Ok(slot);
        }

        let housing_depth = params.number("housing_depth")?;
        if housing_depth <= 0.0 {
            return Ok(slot);
        }
        let start = layout.shoulder_datum(ctx) - layout.approach * OVERSHOOT;
        let housing = section_prism(
            kernel,
            ctx.secondary,
            start,
            layout.approach,
            housing_depth + OVERSHOOT,
        )?;
        Ok(kernel.make_compound(&[slot, housing])?)
    }

    fn build_secondary_profile(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<SecondaryProfile, JointError> {
        let layout = Layout::new(ctx);
        let tail = Tail::from_params(params)?;
        let tenon = Self::tail_prism(ctx, &layout, &tail).build(kernel)?;

        // Waste runs from the shoulder to the member end, or the slot depth
        // if that reaches further.
        let shoulder = layout.shoulder_datum(ctx);
        let end = joint_end(ctx.secondary, ctx.cs.origin).point;
        let reach = (end - shoulder).dot(&layout.approach).max(tail.slot_depth) + OVERSHOOT;
        let waste = section_prism(kernel, ctx.secondary, shoulder, layout.approach, reach)?;
        let shoulder_cut = subtract_or_keep(kernel, &waste, &tenon, "dovetail shoulder");

        Ok(SecondaryProfile {
            tenon_shape: tenon,
            shoulder_cut,
        })
    }

    fn validate(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<Vec<ValidationResult>, JointError> {
        let tail = Tail::from_params(params)?;
        let sw = ctx.secondary.width;
        let sh = ctx.secondary.height;
        let pw = ctx.primary.width;
        let mut results = Vec::new();

        if tail.height > TALL_TAIL_RATIO * sh {
            results.push(ValidationResult::warning(
                "DOVETAIL_TOO_TALL",
                format!(
                    "Tail height {:.1} mm exceeds 70% of the secondary's {sh:.1} mm depth",
                    tail.height
                ),
            ));
        }
        if tail.narrow > WIDE_TAIL_RATIO * sw {
            results.push(ValidationResult::warning(
                "DOVETAIL_TOO_WIDE",
                format!(
                    "Tail width {:.1} mm exceeds 80% of the secondary's {sw:.1} mm width",
                    tail.narrow
                ),
            ));
        }
        let housing = match self.variant {
            Variant::Housed => params.number("housing_depth")?,
            Variant::Plain => 0.0,
        };
        let cut_depth = tail.slot_depth + housing;
        if cut_depth > DEEP_SLOT_RATIO * pw {
            results.push(ValidationResult::warning(
                "SLOT_TOO_DEEP",
                format!(
                    "Slot depth {cut_depth:.1} mm exceeds 60% of the primary's {pw:.1} mm width"
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
        let tail = Tail::from_params(params)?;
        let mut sig = FabricationSignature::new(&self.info.id);
        sig.insert_length("dovetail_angle", params.number("dovetail_angle")?);
        sig.insert_length("tail_width_narrow", tail.narrow);
        sig.insert_length("tail_width_wide", tail.wide);
        sig.insert_length("tail_height", tail.height);
        sig.insert_length("slot_depth", tail.slot_depth);
        sig.insert_length("clearance", tail.clearance);
        match self.channel(params)? {
            Channel::Through => sig.insert_text("channel", "through"),
            Channel::Half { flip } => {
                sig.insert_text("channel", if flip { "half_flipped" } else { "half" })
            }
        }
        if self.variant == Variant::Housed {
            sig.insert_length("housing_depth", params.number("housing_depth")?);
        }
        sig.insert_length("angle", ctx.cs.angle);
        Ok(sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use timber_kernel::{KernelIntrospect, MockKernel, MockShapeKind};
    use timber_types::MemberGeometry;

    use crate::types::JointCoordinateSystem;

    /// Joist (100 × 200) ending on the side of a beam (150 × 250) along X.
    fn joist_into_beam() -> (MemberGeometry, MemberGeometry, JointCoordinateSystem) {
        let beam = MemberGeometry::new(Vec3::ZERO, Vec3::new(3000.0, 0.0, 0.0), 150.0, 250.0);
        let joist = MemberGeometry::new(
            Vec3::new(1500.0, -2000.0, 0.0),
            Vec3::new(1500.0, 0.0, 0.0),
            100.0,
            200.0,
        );
        let cs = JointCoordinateSystem {
            origin: Vec3::new(1500.0, 0.0, 0.0),
            primary_axis: Vec3::X,
            secondary_axis: Vec3::Y,
            normal: Vec3::Z,
            angle: 90.0,
        };
        (beam, joist, cs)
    }

    #[test]
    fn test_wide_end_is_derived_until_overridden() {
        let (p, s, cs) = joist_into_beam();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = Dovetail::plain();
        let mut params = joint.get_parameters(&ctx);
        let expected = tail_width_wide(60.0, 100.0, 14.0);
        assert_relative_eq!(Tail::from_params(&params).unwrap().wide, expected);

        params.set_override("dovetail_angle", 10.0.into()).unwrap();
        assert_relative_eq!(
            Tail::from_params(&params).unwrap().wide,
            tail_width_wide(60.0, 100.0, 10.0)
        );

        params.set_override("tail_width_wide", 90.0.into()).unwrap();
        assert_relative_eq!(Tail::from_params(&params).unwrap().wide, 90.0);
    }

    #[test]
    fn test_through_slot_opens_on_entry_face() {
        let (p, s, cs) = joist_into_beam();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = Dovetail::plain();
        let params = joint.get_parameters(&ctx);
        let mut k = MockKernel::new();
        let slot = joint.build_primary_tool(&params, &ctx, &mut k).unwrap();
        assert!(matches!(k.shape_kind(&slot), Some(MockShapeKind::Sewn { .. })));

        let bb = k.bounding_box(&slot).unwrap();
        // Entry face at y = -75, slot depth 75 reaches the datum.
        assert_relative_eq!(bb.min[1], -75.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(bb.min[2], -OVERSHOOT, epsilon = 1e-9);
        assert_relative_eq!(bb.max[2], 250.0 + OVERSHOOT, epsilon = 1e-9);
        let wide = tail_width_wide(60.0, 100.0, 14.0) + 2.0 * CLEARANCE;
        assert_relative_eq!(bb.size()[0], wide, epsilon = 1e-9);
    }

    #[test]
    fn test_half_slot_flip_chooses_side() {
        let (p, s, cs) = joist_into_beam();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = Dovetail::plain();
        let mut params = joint.get_parameters(&ctx);
        params.set_override("channel_mode", "Half".into()).unwrap();
        let mut k = MockKernel::new();

        let a = joint.build_primary_tool(&params, &ctx, &mut k).unwrap();
        params.set_override("flip_channel", true.into()).unwrap();
        let b = joint.build_primary_tool(&params, &ctx, &mut k).unwrap();

        let (a, b) = (k.bounding_box(&a).unwrap(), k.bounding_box(&b).unwrap());
        let half = 125.0 + OVERSHOOT;
        assert_relative_eq!(a.size()[2], half, epsilon = 1e-9);
        assert_relative_eq!(b.size()[2], half, epsilon = 1e-9);
        // One half hangs from the section middle upward, the other downward.
        let mid = 125.0;
        let (low, high) = if a.min[2] < b.min[2] { (a, b) } else { (b, a) };
        assert_relative_eq!(low.max[2], mid, epsilon = 1e-9);
        assert_relative_eq!(high.min[2], mid, epsilon = 1e-9);
    }

    #[test]
    fn test_housed_variant_adds_pocket() {
        let (p, s, cs) = joist_into_beam();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = Dovetail::housed();
        let params = joint.get_parameters(&ctx);
        assert!(!params.contains("channel_mode"));
        let mut k = MockKernel::new();
        let tool = joint.build_primary_tool(&params, &ctx, &mut k).unwrap();
        match k.shape_kind(&tool) {
            Some(MockShapeKind::Compound { parts }) => assert_eq!(parts.len(), 2),
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn test_tail_is_narrow_at_shoulder() {
        let (p, s, cs) = joist_into_beam();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = Dovetail::plain();
        let params = joint.get_parameters(&ctx);
        let mut k = MockKernel::new();
        let profile = joint.build_secondary_profile(&params, &ctx, &mut k).unwrap();

        let Some(MockShapeKind::Sewn { faces }) = k.shape_kind(&profile.tenon_shape) else {
            panic!("tail should be a sewn solid");
        };
        let width_at = |y: f64| {
            let xs: Vec<f64> = faces
                .iter()
                .flatten()
                .filter(|p| (p[1] - y).abs() < 1e-9)
                .map(|p| p[0])
                .collect();
            xs.iter().cloned().fold(f64::MIN, f64::max) - xs.iter().cloned().fold(f64::MAX, f64::min)
        };
        assert_relative_eq!(width_at(-75.0), 60.0, epsilon = 1e-9);
        assert!(width_at(0.0) > 60.0);

        // The waste box keeps the base's bounds in the mock.
        let cut = k.bounding_box(&profile.shoulder_cut).unwrap();
        assert_relative_eq!(cut.min[1], -75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_validation_flags_oversized_tail_and_slot() {
        let (p, s, cs) = joist_into_beam();
        let ctx = JointContext::new(&p, &s, &cs);
        let joint = Dovetail::housed();
        let mut params = joint.get_parameters(&ctx);
        assert!(joint.validate(&params, &ctx).unwrap().iter().all(|r| r.code != "DOVETAIL_TOO_TALL"));

        params.set_override("tail_height", 150.0.into()).unwrap();
        params.set_override("tail_width_narrow", 85.0.into()).unwrap();
        params.set_override("slot_depth", 80.0.into()).unwrap();
        let codes: Vec<String> = joint
            .validate(&params, &ctx)
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert!(codes.contains(&"DOVETAIL_TOO_TALL".to_string()));
        assert!(codes.contains(&"DOVETAIL_TOO_WIDE".to_string()));
        assert!(codes.contains(&"SLOT_TOO_DEEP".to_string()));
    }

    #[test]
    fn test_housing_counts_toward_slot_depth() {
        let (p, s, cs) = joist_into_beam();
        let ctx = JointContext::new(&p, &s, &cs);
        let params_plain = Dovetail::plain().get_parameters(&ctx);
        let mut params_housed = Dovetail::housed().get_parameters(&ctx);
        params_housed.set_override("housing_depth", 20.0.into()).unwrap();
        // 75 + 20 passes 60% of the 150 mm beam, 75 alone does not.
        let plain = Dovetail::plain().validate(&params_plain, &ctx).unwrap();
        let housed = Dovetail::housed().validate(&params_housed, &ctx).unwrap();
        assert!(plain.iter().all(|r| r.code != "SLOT_TOO_DEEP"));
        assert!(housed.iter().any(|r| r.code == "SLOT_TOO_DEEP"));
    }
}
