use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use timber_joints::{
    IntersectionResult, JointStructuralProperties, ParamError, ParameterSet, ValidationResult,
};
use timber_types::{IntersectionType, MemberGeometry, Vec3};
use uuid::Uuid;

/// A frame document: members, the joints between them, and the
/// member → joint index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameModel {
    /// Members in insertion order.
    pub members: Vec<TimberMember>,
    /// Joints in insertion order.
    pub joints: Vec<TimberJoint>,
    /// Joint ids touching each member. Not persisted; see
    /// [`FrameModel::rebuild_index`].
    #[serde(skip)]
    pub(crate) index: HashMap<Uuid, Vec<Uuid>>,
}

/// A single timber in the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimberMember {
    pub id: Uuid,
    pub name: String,
    pub geometry: MemberGeometry,
    /// Bumped on every geometry edit. Cut application never touches it.
    #[serde(default)]
    pub generation: u64,
}

/// A joint between a primary and a secondary member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimberJoint {
    pub id: Uuid,
    pub primary: Uuid,
    pub secondary: Uuid,
    pub intersection_point: Vec3,
    /// Unsigned angle between the datums, in degrees.
    pub intersection_angle: f64,
    pub intersection_type: IntersectionType,
    /// Registry id of the joint type. Empty selects the default for the
    /// intersection type.
    #[serde(default)]
    pub joint_type: String,
    #[serde(default)]
    pub parameters: Option<ParameterSet>,
    #[serde(default)]
    pub validation: Vec<ValidationResult>,
    #[serde(default)]
    pub structural: JointStructuralProperties,
    /// Bumped on every parameter override and type change.
    #[serde(default)]
    pub param_revision: u64,
}

impl TimberJoint {
    /// A joint for a detected intersection, with parameters filled on the
    /// first recompute.
    pub fn from_intersection(result: &IntersectionResult, joint_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            primary: result.primary,
            secondary: result.secondary,
            intersection_point: result.point,
            intersection_angle: result.joint_cs.angle,
            intersection_type: result.intersection_type,
            joint_type: joint_type.into(),
            parameters: None,
            validation: Vec::new(),
            structural: JointStructuralProperties::default(),
            param_revision: 0,
        }
    }

    pub fn involves(&self, member: Uuid) -> bool {
        self.primary == member || self.secondary == member
    }

    pub fn has_errors(&self) -> bool {
        self.validation.iter().any(ValidationResult::is_error)
    }
}

/// Summary of one [`crate::Engine::recompute`] pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecomputeReport {
    /// Joints whose pipeline ran, in model order.
    pub joints_recomputed: Vec<Uuid>,
    /// Members whose solid was rebuilt, in model order.
    pub members_rebuilt: Vec<Uuid>,
    /// Recoverable problems: failed builders, failed booleans.
    pub warnings: Vec<String>,
    /// Joints that produced no cuts, with the reason.
    pub errors: Vec<(Uuid, String)>,
}

impl RecomputeReport {
    /// True when the pass found nothing to do.
    pub fn is_noop(&self) -> bool {
        self.joints_recomputed.is_empty() && self.members_rebuilt.is_empty()
    }
}

/// Errors from document and engine operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("member not found: {id}")]
    MemberNotFound { id: Uuid },

    #[error("joint not found: {id}")]
    JointNotFound { id: Uuid },

    #[error("members {a} and {b} are already joined by {existing}")]
    JointExists { a: Uuid, b: Uuid, existing: Uuid },

    #[error("a member cannot be joined to itself: {id}")]
    SelfJoint { id: Uuid },

    #[error("members {a} and {b} do not meet: {reason}")]
    NoIntersection { a: Uuid, b: Uuid, reason: String },

    #[error("joint {id} has no parameters yet; recompute first")]
    ParametersUnavailable { id: Uuid },

    #[error("parameter error: {0}")]
    Param(#[from] ParamError),
}
