//! Shared construction helpers for the built-in joints.

use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::{MemberGeometry, Vec3};
use tracing::warn;

use crate::definition::JointContext;
use crate::types::JointError;

/// Gap left on each side between mating faces, in mm.
pub const CLEARANCE: f64 = 1.6;

/// Extra length added to cut tools so they pass cleanly through faces.
pub const OVERSHOOT: f64 = 2.0;

const DIRECTION_EPS: f64 = 1e-6;

/// The end of the secondary member that sits in the joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointEnd {
    /// Datum endpoint nearer the joint origin.
    pub point: Vec3,
    /// Unit direction leaving the member body through that end.
    pub outward: Vec3,
    pub at_start: bool,
}

pub fn joint_end(secondary: &MemberGeometry, origin: Vec3) -> JointEnd {
    let along = secondary.frame().x_axis;
    let at_start = secondary.start.distance_to(&origin) <= secondary.end.distance_to(&origin);
    if at_start {
        JointEnd {
            point: secondary.start,
            outward: -along,
            at_start,
        }
    } else {
        JointEnd {
            point: secondary.end,
            outward: along,
            at_start,
        }
    }
}

/// Direction in which the secondary enters the primary: the secondary axis
/// projected into the primary's cross-section plane, pointing from the entry
/// face inward. Falls back to the primary width axis when the secondary runs
/// along the primary.
pub fn approach_direction(ctx: &JointContext<'_>) -> Vec3 {
    let primary = ctx.primary.frame();
    let secondary_axis = ctx.secondary.frame().x_axis;
    let dir = secondary_axis
        .reject_from(&primary.x_axis)
        .normalized_with(DIRECTION_EPS)
        .unwrap_or(primary.y_axis);
    if joint_end(ctx.secondary, ctx.cs.origin).at_start {
        -dir
    } else {
        dir
    }
}

/// Middle of `member`'s cross-section at the datum station nearest `point`.
pub fn section_center_at(member: &MemberGeometry, point: Vec3) -> Vec3 {
    let frame = member.frame();
    member.start + frame.x_axis * member.datum_parameter(point) + member.section_offset()
}

/// Box spanned by edge vectors `a` and `b` from `corner`, extruded by `extrude`.
pub fn box_prism(
    kernel: &mut dyn Kernel,
    corner: Vec3,
    a: Vec3,
    b: Vec3,
    extrude: Vec3,
) -> Result<KernelSolidHandle, JointError> {
    let depth = extrude.length();
    let direction = extrude
        .normalized_with(DIRECTION_EPS)
        .ok_or_else(|| JointError::Degenerate {
            reason: "box extrusion has zero length".to_string(),
        })?;
    if a.length() < DIRECTION_EPS || b.length() < DIRECTION_EPS {
        return Err(JointError::Degenerate {
            reason: "box profile has a zero-length side".to_string(),
        });
    }
    let profile = [corner, corner + a, corner + a + b, corner + b].map(|p| p.to_array());
    let face = kernel.make_polygon_face(&profile)?;
    Ok(kernel.extrude_face(face, direction.to_array(), depth)?)
}

/// Rectangle of `width` × `height` centred on `face_center` in the plane of
/// the unit axes `u`, `v`, extruded `length` along `direction`.
pub fn rect_prism(
    kernel: &mut dyn Kernel,
    face_center: Vec3,
    u: Vec3,
    v: Vec3,
    width: f64,
    height: f64,
    direction: Vec3,
    length: f64,
) -> Result<KernelSolidHandle, JointError> {
    let corner = face_center - u * (width / 2.0) - v * (height / 2.0);
    box_prism(kernel, corner, u * width, v * height, direction * length)
}

/// `member`'s full cross-section, starting on the datum at `at` and
/// running `length` along the unit `direction`.
pub fn section_prism(
    kernel: &mut dyn Kernel,
    member: &MemberGeometry,
    at: Vec3,
    direction: Vec3,
    length: f64,
) -> Result<KernelSolidHandle, JointError> {
    let frame = member.frame();
    let bounds = member.section_bounds();
    let corner = at + frame.y_axis * bounds.y_min + frame.z_axis * bounds.z_min;
    box_prism(
        kernel,
        corner,
        frame.y_axis * member.width,
        frame.z_axis * member.height,
        direction * length,
    )
}

/// A prism with a trapezoidal cross-section: `narrow` wide at the entry face,
/// `wide` at the back face `depth` further along `depth_dir`. Both faces are
/// `height` tall along `height_dir`.
#[derive(Debug, Clone, Copy)]
pub struct TrapezoidPrism {
    /// Centre of the entry face.
    pub origin: Vec3,
    pub width_dir: Vec3,
    pub height_dir: Vec3,
    pub depth_dir: Vec3,
    pub narrow: f64,
    pub wide: f64,
    pub height: f64,
    pub depth: f64,
}

impl TrapezoidPrism {
    fn corners(&self, center: Vec3, width: f64) -> [Vec3; 4] {
        let w = self.width_dir * (width / 2.0);
        let h = self.height_dir * (self.height / 2.0);
        [center - w - h, center + w - h, center + w + h, center - w + h]
    }

    /// Entry, back and four side quadrilaterals, wound consistently.
    pub fn faces(&self) -> Vec<Vec<[f64; 3]>> {
        let e = self.corners(self.origin, self.narrow);
        let b = self.corners(self.origin + self.depth_dir * self.depth, self.wide);
        let quad = |p: [Vec3; 4]| p.iter().map(Vec3::to_array).collect::<Vec<_>>();
        vec![
            quad([e[0], e[3], e[2], e[1]]),
            quad([b[0], b[1], b[2], b[3]]),
            quad([e[0], e[1], b[1], b[0]]),
            quad([e[1], e[2], b[2], b[1]]),
            quad([e[2], e[3], b[3], b[2]]),
            quad([e[3], e[0], b[0], b[3]]),
        ]
    }

    /// Sew the six faces into a solid.
    pub fn build(&self, kernel: &mut dyn Kernel) -> Result<KernelSolidHandle, JointError> {
        if self.narrow <= 0.0 || self.wide <= 0.0 || self.height <= 0.0 || self.depth <= 0.0 {
            return Err(JointError::Degenerate {
                reason: format!(
                    "trapezoid {}/{} x {} x {} has a non-positive dimension",
                    self.narrow, self.wide, self.height, self.depth
                ),
            });
        }
        Ok(kernel.sew_solid(&self.faces())?)
    }
}

/// `base − tool`, or `base` unchanged when the boolean fails.
pub fn subtract_or_keep(
    kernel: &mut dyn Kernel,
    base: &KernelSolidHandle,
    tool: &KernelSolidHandle,
    what: &str,
) -> KernelSolidHandle {
    match kernel.boolean_subtract(base, tool) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "{what}: boolean failed, keeping uncut shape");
            base.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use timber_kernel::{polygon_mesh_volume, KernelIntrospect, MockKernel};
    use crate::types::JointCoordinateSystem;

    fn cs_at(origin: Vec3) -> JointCoordinateSystem {
        JointCoordinateSystem {
            origin,
            primary_axis: Vec3::X,
            secondary_axis: Vec3::Y,
            normal: Vec3::Z,
            angle: 90.0,
        }
    }

    #[test]
    fn test_approach_points_into_primary_from_either_end() {
        let primary = MemberGeometry::new(Vec3::ZERO, Vec3::new(2000.0, 0.0, 0.0), 150.0, 200.0);
        let cs = cs_at(Vec3::new(1000.0, 0.0, 0.0));

        let ending = MemberGeometry::new(Vec3::new(1000.0, -1500.0, 0.0), Vec3::new(1000.0, 0.0, 0.0), 100.0, 150.0);
        let dir = approach_direction(&JointContext::new(&primary, &ending, &cs));
        assert_relative_eq!(dir.y, 1.0);

        let starting = MemberGeometry::new(Vec3::new(1000.0, 0.0, 0.0), Vec3::new(1000.0, -1500.0, 0.0), 100.0, 150.0);
        let dir = approach_direction(&JointContext::new(&primary, &starting, &cs));
        assert_relative_eq!(dir.y, 1.0);
    }

    #[test]
    fn test_approach_falls_back_to_primary_width_axis() {
        let primary = MemberGeometry::new(Vec3::ZERO, Vec3::new(2000.0, 0.0, 0.0), 150.0, 200.0);
        let collinear = MemberGeometry::new(Vec3::new(2000.0, 0.0, 0.0), Vec3::new(3000.0, 0.0, 0.0), 150.0, 200.0);
        let cs = cs_at(Vec3::new(2000.0, 0.0, 0.0));
        let dir = approach_direction(&JointContext::new(&primary, &collinear, &cs));
        // Joint is at the secondary's start, so the fallback is negated.
        assert_eq!(dir, -primary.frame().y_axis);
    }

    #[test]
    fn test_trapezoid_faces_enclose_positive_volume() {
        let t = TrapezoidPrism {
            origin: Vec3::ZERO,
            width_dir: Vec3::X,
            height_dir: Vec3::Z,
            depth_dir: Vec3::Y,
            narrow: 40.0,
            wide: 60.0,
            height: 10.0,
            depth: 20.0,
        };
        let v = polygon_mesh_volume(&t.faces()).abs();
        assert_relative_eq!(v, (40.0 + 60.0) / 2.0 * 20.0 * 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_section_prism_follows_reference_face() {
        let mut k = MockKernel::new();
        let beam = MemberGeometry::new(Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0), 100.0, 200.0);
        let h = section_prism(&mut k, &beam, Vec3::new(1000.0, 0.0, 0.0), -Vec3::X, 50.0).unwrap();
        let bb = k.bounding_box(&h).unwrap();
        assert_relative_eq!(bb.min[0], 950.0);
        assert_relative_eq!(bb.min[2], 0.0);
        assert_relative_eq!(bb.max[2], 200.0);
        assert_relative_eq!(bb.size()[1], 100.0);
    }

    #[test]
    fn test_subtract_or_keep_returns_base_on_failure() {
        let mut k = MockKernel::new();
        let a = k.make_placeholder([0.0; 3]);
        let b = k.make_placeholder([0.5; 3]);
        k.set_fail_booleans(true);
        assert_eq!(subtract_or_keep(&mut k, &a, &b, "test"), a);
    }
}
