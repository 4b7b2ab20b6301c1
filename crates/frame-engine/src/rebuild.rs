//! Joint recompute pipeline and member rebuild.
//!
//! Each joint records the member generations and parameter revision it was
//! built from; each member records the geometry generation and the joint
//! output generations whose cuts it carries. Anything whose recorded inputs
//! differ from the current ones is dirty.

use timber_joints::builtin::geometry::section_prism;
use timber_joints::{
    default_joint_type, reevaluate_joint, DetectionConfig, FabricationSignature, JointContext,
    JointRegistry, MemberRef, PairRejection, PegDefinition, ValidationResult,
};
use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::MemberGeometry;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::types::{RecomputeReport, TimberJoint, TimberMember};

/// What a joint's outputs were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct JointInputs {
    pub primary_generation: u64,
    pub secondary_generation: u64,
    pub param_revision: u64,
}

impl JointInputs {
    pub fn of(joint: &TimberJoint, primary: &TimberMember, secondary: &TimberMember) -> Self {
        Self {
            primary_generation: primary.generation,
            secondary_generation: secondary.generation,
            param_revision: joint.param_revision,
        }
    }
}

/// Runtime geometry of a recomputed joint. Handles are only valid for the
/// kernel that built them and are never persisted.
#[derive(Debug, Clone)]
pub struct JointOutput {
    /// Removed from the primary member; `None` when nothing is cut.
    pub primary_tool: Option<KernelSolidHandle>,
    /// Removed from the secondary member; `None` when nothing is cut.
    pub secondary_cut: Option<KernelSolidHandle>,
    /// Tenon and pegs for display, or a placeholder.
    pub visual: KernelSolidHandle,
    pub pegs: Vec<PegDefinition>,
    pub signature: Option<FabricationSignature>,
    /// Distinct for every pipeline run. Members compare it to decide
    /// whether their cuts are stale.
    pub output_generation: u64,
    pub(crate) inputs: JointInputs,
}

/// Cut state a member solid was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberStamp {
    pub generation: u64,
    /// (joint, output generation) per joint touching the member.
    pub cuts: Vec<(Uuid, u64)>,
}

#[derive(Debug, Clone)]
pub(crate) struct MemberShape {
    pub solid: KernelSolidHandle,
    pub stamp: MemberStamp,
}

/// Run the full pipeline for one joint, updating its stored intersection,
/// parameters, findings and structural values in place.
///
/// Never fails: every problem ends up in `joint.validation` or `report`,
/// with "no cut" or a placeholder standing in for missing geometry.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(joint = %joint.id))]
pub fn recompute_joint(
    joint: &mut TimberJoint,
    primary: &TimberMember,
    secondary: &TimberMember,
    registry: &JointRegistry,
    kernel: &mut dyn Kernel,
    config: &DetectionConfig,
    output_generation: u64,
    report: &mut RecomputeReport,
) -> JointOutput {
    let inputs = JointInputs::of(joint, primary, secondary);
    let uncut = |visual: KernelSolidHandle| JointOutput {
        primary_tool: None,
        secondary_cut: None,
        visual,
        pegs: Vec::new(),
        signature: None,
        output_generation,
        inputs,
    };

    let result = match reevaluate_joint(
        MemberRef::new(primary.id, &primary.geometry),
        MemberRef::new(secondary.id, &secondary.geometry),
        config,
    ) {
        Ok(result) => result,
        Err(rejection) => {
            let finding = match rejection {
                PairRejection::OutOfTolerance {
                    distance,
                    tolerance,
                } => ValidationResult::error(
                    "OUT_OF_TOLERANCE",
                    format!("datums are {distance:.1} mm apart, tolerance is {tolerance:.1} mm"),
                ),
                PairRejection::NoValidFrame => ValidationResult::error(
                    "NO_INTERSECTION",
                    "members no longer meet at a usable angle",
                ),
            };
            warn!(code = %finding.code, "{}", finding.message);
            report.errors.push((joint.id, finding.message.clone()));
            joint.validation = vec![finding];
            return uncut(kernel.make_placeholder(joint.intersection_point.to_array()));
        }
    };
    joint.intersection_point = result.point;
    joint.intersection_angle = result.joint_cs.angle;
    joint.intersection_type = result.intersection_type;

    let type_id = if joint.joint_type.is_empty() {
        default_joint_type(result.intersection_type).to_string()
    } else {
        joint.joint_type.clone()
    };
    let Some(definition) = registry.get(&type_id) else {
        let message = format!("joint type {type_id:?} is not registered");
        warn!(joint_type = %type_id, "unknown joint type, using placeholder");
        report.errors.push((joint.id, message.clone()));
        joint.validation = vec![ValidationResult::error("UNKNOWN_JOINT_TYPE", message)];
        return uncut(kernel.make_placeholder(result.point.to_array()));
    };
    debug!(joint_type = %type_id, angle = result.joint_cs.angle, "resolved definition");

    let ctx = JointContext::new(&primary.geometry, &secondary.geometry, &result.joint_cs);
    let fresh = definition.get_parameters(&ctx);
    let params = match joint.parameters.take() {
        Some(mut existing) if existing.same_keys(&fresh) => {
            existing.refresh_from(&fresh);
            existing
        }
        _ => {
            debug!("starting from fresh parameters");
            fresh
        }
    };

    let primary_tool = match definition.build_primary_tool(&params, &ctx, kernel) {
        Ok(tool) => Some(tool),
        Err(e) => {
            warn!(error = %e, "primary tool failed, primary stays uncut");
            report
                .warnings
                .push(format!("joint {}: primary tool: {e}", joint.id));
            None
        }
    };
    let profile = match definition.build_secondary_profile(&params, &ctx, kernel) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!(error = %e, "secondary profile failed, secondary stays uncut");
            report
                .warnings
                .push(format!("joint {}: secondary profile: {e}", joint.id));
            None
        }
    };
    let pegs = definition.build_pegs(&params, &ctx).unwrap_or_else(|e| {
        warn!(error = %e, "peg layout failed");
        Vec::new()
    });

    let mut parts: Vec<KernelSolidHandle> =
        profile.iter().map(|p| p.tenon_shape.clone()).collect();
    for peg in &pegs {
        let base = peg.center - peg.axis * (peg.length / 2.0);
        match kernel.make_cylinder(
            base.to_array(),
            peg.axis.to_array(),
            peg.diameter / 2.0,
            peg.length,
        ) {
            Ok(solid) => parts.push(solid),
            Err(e) => warn!(error = %e, "peg solid failed, skipping"),
        }
    }
    let visual = if parts.is_empty() {
        kernel.make_placeholder(result.point.to_array())
    } else {
        kernel.make_compound(&parts).unwrap_or_else(|e| {
            warn!(error = %e, "visual compound failed, using placeholder");
            kernel.make_placeholder(result.point.to_array())
        })
    };

    joint.validation = definition
        .validate(&params, &ctx)
        .unwrap_or_else(|e| vec![ValidationResult::error("VALIDATION_FAILED", e.to_string())]);
    joint.structural = definition.structural_properties(&params, &ctx);
    let signature = match definition.fabrication_signature(&params, &ctx) {
        Ok(signature) => Some(signature),
        Err(e) => {
            warn!(error = %e, "fabrication signature failed");
            None
        }
    };
    joint.parameters = Some(params);
    debug!(
        pegs = pegs.len(),
        findings = joint.validation.len(),
        "joint recomputed"
    );

    JointOutput {
        primary_tool,
        secondary_cut: profile.map(|p| p.shoulder_cut),
        visual,
        pegs,
        signature,
        output_generation,
        inputs,
    }
}

/// Uncut solid of a member: its cross-section swept along the datum. A
/// degenerate member gets a placeholder at its start point.
pub fn member_base_solid(geometry: &MemberGeometry, kernel: &mut dyn Kernel) -> KernelSolidHandle {
    let along = geometry.frame().x_axis;
    match section_prism(kernel, geometry, geometry.start, along, geometry.length()) {
        Ok(solid) => solid,
        Err(e) => {
            debug!(error = %e, "degenerate member, using placeholder");
            kernel.make_placeholder(geometry.start.to_array())
        }
    }
}

/// Base solid minus every cut, in order. A failed boolean skips that cut.
#[instrument(skip_all, fields(member = %member.id, cuts = cuts.len()))]
pub fn rebuild_member(
    member: &TimberMember,
    cuts: &[(Uuid, KernelSolidHandle)],
    kernel: &mut dyn Kernel,
    report: &mut RecomputeReport,
) -> KernelSolidHandle {
    let mut solid = member_base_solid(&member.geometry, kernel);
    for (joint, tool) in cuts {
        match kernel.boolean_subtract(&solid, tool) {
            Ok(cut) => solid = cut,
            Err(e) => {
                warn!(%joint, error = %e, "cut failed, skipping");
                report.warnings.push(format!(
                    "member {}: cut from joint {joint} failed: {e}",
                    member.name
                ));
            }
        }
    }
    solid
}
