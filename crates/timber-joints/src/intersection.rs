//! Datum-line intersection detection.
//!
//! Members meet where their datum segments pass within a tolerance of each
//! other. The closest-approach parameters classify the meeting, decide which
//! member is primary, and seed the joint coordinate system.

use timber_types::{IntersectionType, MemberGeometry, Vec3};
use uuid::Uuid;

use crate::settings::DetectionConfig;
use crate::types::JointCoordinateSystem;

/// Below this the 2×2 system is treated as singular (parallel segments).
const PARALLEL_EPS: f64 = 1e-10;

/// Axis vectors shorter than this are degenerate.
const AXIS_EPS: f64 = 1e-6;

/// A member identity plus the geometry the detector reads.
#[derive(Debug, Clone, Copy)]
pub struct MemberRef<'a> {
    pub id: Uuid,
    pub geometry: &'a MemberGeometry,
}

impl<'a> MemberRef<'a> {
    pub fn new(id: Uuid, geometry: &'a MemberGeometry) -> Self {
        Self { id, geometry }
    }
}

/// Closest points between two segments and their segment parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestApproach {
    pub point_a: Vec3,
    pub point_b: Vec3,
    pub distance: f64,
    /// Parameter of `point_a` on segment A, in [0, 1].
    pub t_a: f64,
    /// Parameter of `point_b` on segment B, in [0, 1].
    pub t_b: f64,
}

impl ClosestApproach {
    pub fn midpoint(&self) -> Vec3 {
        self.point_a.midpoint(&self.point_b)
    }
}

/// A detected joint candidate. Transient; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionResult {
    pub primary: Uuid,
    pub secondary: Uuid,
    pub point: Vec3,
    pub distance: f64,
    pub intersection_type: IntersectionType,
    pub joint_cs: JointCoordinateSystem,
}

/// Why a pair of members does not form a joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairRejection {
    OutOfTolerance { distance: f64, tolerance: f64 },
    /// Degenerate datum or datums closer to parallel than the minimum angle.
    NoValidFrame,
}

/// Closest points between segments `a_start..a_end` and `b_start..b_end`.
///
/// Solves the unconstrained 2×2 system, then clamps alternately: s into
/// [0,1], t re-solved from s and clamped, s re-solved from t and clamped.
/// Near-parallel segments start from s = 0.
pub fn closest_approach_segments(
    a_start: Vec3,
    a_end: Vec3,
    b_start: Vec3,
    b_end: Vec3,
) -> ClosestApproach {
    let u = a_end - a_start;
    let v = b_end - b_start;
    let w = a_start - b_start;

    let a = u.dot(&u);
    let b = u.dot(&v);
    let c = v.dot(&v);
    let d = u.dot(&w);
    let e = v.dot(&w);
    let denom = a * c - b * b;

    let solve_t = |s: f64| if c > PARALLEL_EPS { (b * s + e) / c } else { 0.0 };
    let solve_s = |t: f64| if a > PARALLEL_EPS { (b * t - d) / a } else { 0.0 };

    let mut s = if denom < PARALLEL_EPS {
        0.0
    } else {
        (b * e - c * d) / denom
    };
    s = s.clamp(0.0, 1.0);
    let t = solve_t(s).clamp(0.0, 1.0);
    s = solve_s(t).clamp(0.0, 1.0);

    let point_a = a_start + u * s;
    let point_b = b_start + v * t;
    ClosestApproach {
        point_a,
        point_b,
        distance: point_a.distance_to(&point_b),
        t_a: s,
        t_b: t,
    }
}

fn at_endpoint(t: f64, threshold: f64) -> bool {
    t <= threshold || t >= 1.0 - threshold
}

/// Classify a meeting by whether each parameter lies within `threshold` of
/// an end of its segment (inclusive).
pub fn classify_intersection(t_a: f64, t_b: f64, threshold: f64) -> IntersectionType {
    match (at_endpoint(t_a, threshold), at_endpoint(t_b, threshold)) {
        (true, true) => IntersectionType::EndpointToEndpoint,
        (true, false) | (false, true) => IntersectionType::EndpointToMidpoint,
        (false, false) => IntersectionType::MidpointToMidpoint,
    }
}

/// Decide (primary, secondary).
///
/// In a T-joint the member that ends is secondary. Otherwise the larger
/// cross-section is primary, with ties going to `a`.
pub fn assign_primary_secondary<'a>(
    a: MemberRef<'a>,
    b: MemberRef<'a>,
    intersection_type: IntersectionType,
    t_a: f64,
    threshold: f64,
) -> (MemberRef<'a>, MemberRef<'a>) {
    if intersection_type == IntersectionType::EndpointToMidpoint {
        if at_endpoint(t_a, threshold) {
            (b, a)
        } else {
            (a, b)
        }
    } else if a.geometry.cross_section_area() >= b.geometry.cross_section_area() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Joint frame at `point`, or `None` when either datum is degenerate or the
/// datums meet at less than `min_angle` degrees.
///
/// The reported angle is unsigned: acos(|cos θ|), so always within [0, 90].
pub fn compute_joint_cs(
    primary: &MemberGeometry,
    secondary: &MemberGeometry,
    point: Vec3,
    min_angle: f64,
) -> Option<JointCoordinateSystem> {
    let primary_axis = (primary.end - primary.start).normalized_with(AXIS_EPS)?;
    let secondary_axis = (secondary.end - secondary.start).normalized_with(AXIS_EPS)?;

    let cos = primary_axis.dot(&secondary_axis).clamp(-1.0, 1.0);
    let angle = cos.abs().acos().to_degrees();
    if angle < min_angle {
        return None;
    }

    let normal = primary_axis
        .cross(&secondary_axis)
        .normalized_with(AXIS_EPS)
        .unwrap_or_else(|| primary.frame().z_axis);

    Some(JointCoordinateSystem {
        origin: point,
        primary_axis,
        secondary_axis,
        normal,
        angle,
    })
}

/// Full pairwise test: proximity, classification, role assignment, frame.
pub fn evaluate_pair(
    a: MemberRef<'_>,
    b: MemberRef<'_>,
    config: &DetectionConfig,
) -> Result<IntersectionResult, PairRejection> {
    let approach = closest_approach_segments(
        a.geometry.start,
        a.geometry.end,
        b.geometry.start,
        b.geometry.end,
    );
    if approach.distance > config.tolerance {
        return Err(PairRejection::OutOfTolerance {
            distance: approach.distance,
            tolerance: config.tolerance,
        });
    }

    let point = approach.midpoint();
    let intersection_type =
        classify_intersection(approach.t_a, approach.t_b, config.endpoint_threshold);
    let (primary, secondary) = assign_primary_secondary(
        a,
        b,
        intersection_type,
        approach.t_a,
        config.endpoint_threshold,
    );
    let joint_cs = compute_joint_cs(primary.geometry, secondary.geometry, point, config.min_angle)
        .ok_or(PairRejection::NoValidFrame)?;

    Ok(IntersectionResult {
        primary: primary.id,
        secondary: secondary.id,
        point,
        distance: approach.distance,
        intersection_type,
        joint_cs,
    })
}

/// [`evaluate_pair`] without the rejection reason.
pub fn test_pair(
    a: MemberRef<'_>,
    b: MemberRef<'_>,
    config: &DetectionConfig,
) -> Option<IntersectionResult> {
    evaluate_pair(a, b, config).ok()
}

/// Re-run the geometric checks for an existing joint whose roles are fixed.
pub fn reevaluate_joint(
    primary: MemberRef<'_>,
    secondary: MemberRef<'_>,
    config: &DetectionConfig,
) -> Result<IntersectionResult, PairRejection> {
    let approach = closest_approach_segments(
        primary.geometry.start,
        primary.geometry.end,
        secondary.geometry.start,
        secondary.geometry.end,
    );
    if approach.distance > config.tolerance {
        return Err(PairRejection::OutOfTolerance {
            distance: approach.distance,
            tolerance: config.tolerance,
        });
    }

    let point = approach.midpoint();
    let joint_cs = compute_joint_cs(primary.geometry, secondary.geometry, point, config.min_angle)
        .ok_or(PairRejection::NoValidFrame)?;

    Ok(IntersectionResult {
        primary: primary.id,
        secondary: secondary.id,
        point,
        distance: approach.distance,
        intersection_type: classify_intersection(
            approach.t_a,
            approach.t_b,
            config.endpoint_threshold,
        ),
        joint_cs,
    })
}
