use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use timber_kernel::{KernelError, KernelSolidHandle};
use timber_types::Vec3;

use crate::params::ParamError;

/// Local frame of a joint, derived from the two member datums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointCoordinateSystem {
    /// Midpoint of the two closest-approach points.
    pub origin: Vec3,
    /// Unit direction of the primary datum.
    pub primary_axis: Vec3,
    /// Unit direction of the secondary datum.
    pub secondary_axis: Vec3,
    /// Unit normal to both axes.
    pub normal: Vec3,
    /// Unsigned angle between the datum lines, in degrees within [0, 90].
    pub angle: f64,
}

/// Geometry a joint contributes to its secondary member.
#[derive(Debug, Clone)]
pub struct SecondaryProfile {
    /// The projecting part (tenon, tail, remaining lap) for display.
    pub tenon_shape: KernelSolidHandle,
    /// Material removed from the secondary around the tenon.
    pub shoulder_cut: KernelSolidHandle,
}

/// A drawbore peg, in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PegDefinition {
    pub center: Vec3,
    pub diameter: f64,
    pub length: f64,
    /// Unit direction of the peg axis.
    pub axis: Vec3,
    pub drawbore_offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

/// A single finding about a joint's parameters or geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub level: ValidationLevel,
    pub message: String,
    /// Stable machine-readable code, e.g. `ANGLE_OUT_OF_RANGE`.
    pub code: String,
}

impl ValidationResult {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Error,
            message: message.into(),
            code: code.to_string(),
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Warning,
            message: message.into(),
            code: code.to_string(),
        }
    }

    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: ValidationLevel::Info,
            message: message.into(),
            code: code.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == ValidationLevel::Error
    }
}

/// Structural capacity placeholder. Always zero until engineering values
/// are supplied by a definition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointStructuralProperties {
    pub allowable_moment: f64,
    pub allowable_shear: f64,
    pub rotational_stiffness: f64,
}

/// Normalized key/value description of a joint used to group identical
/// cuts for fabrication. Lengths and angles are rounded to 0.1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FabricationSignature(BTreeMap<String, String>);

impl FabricationSignature {
    pub fn new(joint_type: &str) -> Self {
        let mut sig = Self::default();
        sig.insert_text("joint_type", joint_type);
        sig
    }

    pub fn insert_text(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn insert_length(&mut self, key: &str, value: f64) {
        // Adding 0.0 folds -0.0 into 0.0 so both render identically.
        let rounded = (value * 10.0).round() / 10.0 + 0.0;
        self.0.insert(key.to_string(), format!("{rounded:.1}"));
    }

    pub fn insert_integer(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical `key=value;...` rendering, ordered by key.
    pub fn key(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Errors from joint geometry synthesis.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JointError {
    #[error("parameter error: {0}")]
    Param(#[from] ParamError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("degenerate joint geometry: {reason}")]
    Degenerate { reason: String },
}
