//! The contract every joint type fulfils.
//!
//! A definition turns two members and their joint frame into parameters,
//! kernel cut tools, pegs and validation findings. Definitions are stateless;
//! the same inputs always yield the same outputs.

use serde::{Deserialize, Serialize};
use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::{MemberGeometry, StructuralRole};

use crate::params::ParameterSet;
use crate::types::{
    FabricationSignature, JointCoordinateSystem, JointError, JointStructuralProperties,
    PegDefinition, SecondaryProfile, ValidationResult,
};

/// Declared capabilities of a joint type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointInfo {
    /// Stable identifier, e.g. `half_lap`.
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Roles this joint suits as primary. Empty means any.
    #[serde(default)]
    pub primary_roles: Vec<StructuralRole>,
    /// Roles this joint suits as secondary. Empty means any.
    #[serde(default)]
    pub secondary_roles: Vec<StructuralRole>,
    /// Inclusive angle range, in degrees.
    pub min_angle: f64,
    pub max_angle: f64,
}

impl JointInfo {
    pub fn accepts_angle(&self, angle: f64) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }

    pub fn accepts_roles(&self, primary: StructuralRole, secondary: StructuralRole) -> bool {
        (self.primary_roles.is_empty() || self.primary_roles.contains(&primary))
            && (self.secondary_roles.is_empty() || self.secondary_roles.contains(&secondary))
    }
}

/// The geometric inputs every definition operation reads.
#[derive(Debug, Clone, Copy)]
pub struct JointContext<'a> {
    pub primary: &'a MemberGeometry,
    pub secondary: &'a MemberGeometry,
    pub cs: &'a JointCoordinateSystem,
}

impl<'a> JointContext<'a> {
    pub fn new(
        primary: &'a MemberGeometry,
        secondary: &'a MemberGeometry,
        cs: &'a JointCoordinateSystem,
    ) -> Self {
        Self {
            primary,
            secondary,
            cs,
        }
    }
}

/// A joint type: parameter derivation plus geometry synthesis.
///
/// Implemented by the built-in algorithms, by user manifests, and by any
/// external plugin.
pub trait TimberJointDefinition {
    fn info(&self) -> &JointInfo;

    /// Geometry-derived parameters with defaults filled in.
    fn get_parameters(&self, ctx: &JointContext<'_>) -> ParameterSet;

    /// Solid removed from the primary member.
    fn build_primary_tool(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<KernelSolidHandle, JointError>;

    /// Tenon shape and shoulder cut for the secondary member.
    fn build_secondary_profile(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<SecondaryProfile, JointError>;

    fn build_pegs(
        &self,
        _params: &ParameterSet,
        _ctx: &JointContext<'_>,
    ) -> Result<Vec<PegDefinition>, JointError> {
        Ok(Vec::new())
    }

    fn validate(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<Vec<ValidationResult>, JointError>;

    fn fabrication_signature(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<FabricationSignature, JointError>;

    fn structural_properties(
        &self,
        _params: &ParameterSet,
        _ctx: &JointContext<'_>,
    ) -> JointStructuralProperties {
        JointStructuralProperties::default()
    }
}

/// `ANGLE_OUT_OF_RANGE` error when the joint angle falls outside the
/// definition's declared range.
pub fn angle_check(info: &JointInfo, cs: &JointCoordinateSystem) -> Option<ValidationResult> {
    if info.accepts_angle(cs.angle) {
        return None;
    }
    Some(ValidationResult::error(
        "ANGLE_OUT_OF_RANGE",
        format!(
            "Joint angle {:.1}° is outside the {} range of {:.0}°–{:.0}°",
            cs.angle, info.name, info.min_angle, info.max_angle
        ),
    ))
}
