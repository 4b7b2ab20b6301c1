pub mod detect;
pub mod fabrication;
pub mod model;
pub mod rebuild;
pub mod types;

use std::collections::{BTreeMap, HashMap};

use timber_joints::{
    default_joint_type, evaluate_pair, DetectionConfig, IntersectionResult, JointRegistry,
    MemberRef, PairRejection, ParamValue,
};
use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::MemberGeometry;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub use crate::rebuild::JointOutput;
pub use crate::types::{EngineError, FrameModel, RecomputeReport, TimberJoint, TimberMember};

use crate::rebuild::{JointInputs, MemberShape, MemberStamp};

/// The frame update orchestrator.
///
/// Owns the frame document and the kernel geometry derived from it. Edits
/// only bump generation counters; [`Engine::recompute`] then brings every
/// stale joint and member up to date in one pass.
pub struct Engine {
    model: FrameModel,
    detection: DetectionConfig,
    /// Geometry from the last pipeline run of each joint.
    joint_outputs: HashMap<Uuid, JointOutput>,
    /// Cut solid of each member.
    member_shapes: HashMap<Uuid, MemberShape>,
    next_output_generation: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::from_model(FrameModel::new())
    }

    /// Wrap an existing document, e.g. one just loaded. Nothing is built
    /// until the first recompute.
    pub fn from_model(mut model: FrameModel) -> Self {
        model.rebuild_index();
        Self {
            model,
            detection: DetectionConfig::default(),
            joint_outputs: HashMap::new(),
            member_shapes: HashMap::new(),
            next_output_generation: 0,
        }
    }

    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }

    pub fn model(&self) -> &FrameModel {
        &self.model
    }

    pub fn into_model(self) -> FrameModel {
        self.model
    }

    pub fn detection(&self) -> &DetectionConfig {
        &self.detection
    }

    // ── Members ────────────────────────────────────────────────────────

    pub fn add_member(&mut self, name: impl Into<String>, geometry: MemberGeometry) -> Uuid {
        self.model.add_member(name, geometry)
    }

    /// Move or resize a member. Its joints and both sides of each are
    /// refreshed on the next recompute.
    pub fn set_member_geometry(
        &mut self,
        id: Uuid,
        geometry: MemberGeometry,
    ) -> Result<(), EngineError> {
        self.model.set_member_geometry(id, geometry)
    }

    /// Remove a member and every joint on it.
    pub fn remove_member(&mut self, id: Uuid) -> Result<TimberMember, EngineError> {
        let (member, joints) = self.model.remove_member(id)?;
        for joint in &joints {
            self.joint_outputs.remove(&joint.id);
        }
        self.member_shapes.remove(&id);
        Ok(member)
    }

    // ── Detection ──────────────────────────────────────────────────────

    pub fn detect_intersections(&self) -> Vec<IntersectionResult> {
        detect::detect_intersections(&self.model, &self.detection)
    }

    pub fn detect_for_member(&self, id: Uuid) -> Vec<IntersectionResult> {
        detect::detect_for_member(&self.model, id, &self.detection)
    }

    // ── Joints ─────────────────────────────────────────────────────────

    /// Join two members. Roles are decided by the detector; `joint_type`
    /// defaults to the usual joint for the intersection type.
    pub fn create_joint(
        &mut self,
        a: Uuid,
        b: Uuid,
        joint_type: Option<&str>,
    ) -> Result<Uuid, EngineError> {
        if a == b {
            return Err(EngineError::SelfJoint { id: a });
        }
        let ma = self
            .model
            .member(a)
            .ok_or(EngineError::MemberNotFound { id: a })?;
        let mb = self
            .model
            .member(b)
            .ok_or(EngineError::MemberNotFound { id: b })?;
        if let Some(existing) = self.model.joint_for_pair(a, b) {
            return Err(EngineError::JointExists { a, b, existing });
        }

        let result = evaluate_pair(
            MemberRef::new(a, &ma.geometry),
            MemberRef::new(b, &mb.geometry),
            &self.detection,
        )
        .map_err(|rejection| EngineError::NoIntersection {
            a,
            b,
            reason: match rejection {
                PairRejection::OutOfTolerance {
                    distance,
                    tolerance,
                } => format!("datums are {distance:.1} mm apart (tolerance {tolerance:.1} mm)"),
                PairRejection::NoValidFrame => "no valid joint frame".to_string(),
            },
        })?;

        let joint_type = joint_type.unwrap_or_else(|| default_joint_type(result.intersection_type));
        self.model
            .add_joint(TimberJoint::from_intersection(&result, joint_type))
    }

    /// Create a default joint for every unjoined intersection.
    #[instrument(skip_all)]
    pub fn auto_join(&mut self) -> Vec<Uuid> {
        let mut created = Vec::new();
        for result in self.detect_intersections() {
            let joint_type = default_joint_type(result.intersection_type);
            match self
                .model
                .add_joint(TimberJoint::from_intersection(&result, joint_type))
            {
                Ok(id) => created.push(id),
                Err(e) => warn!(error = %e, "skipping detected intersection"),
            }
        }
        debug!(created = created.len(), "auto join finished");
        created
    }

    pub fn remove_joint(&mut self, id: Uuid) -> Result<TimberJoint, EngineError> {
        let joint = self.model.remove_joint(id)?;
        self.joint_outputs.remove(&id);
        Ok(joint)
    }

    /// Switch a joint to another registered type. The parameter set is
    /// discarded and rebuilt on the next recompute.
    pub fn set_joint_type(&mut self, id: Uuid, joint_type: &str) -> Result<(), EngineError> {
        let joint = self.model.joint_mut(id)?;
        if joint.joint_type != joint_type {
            joint.joint_type = joint_type.to_string();
            joint.parameters = None;
            joint.param_revision += 1;
        }
        Ok(())
    }

    /// Pin a parameter to a user value.
    pub fn set_parameter_override(
        &mut self,
        id: Uuid,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), EngineError> {
        let joint = self.model.joint_mut(id)?;
        joint
            .parameters
            .as_mut()
            .ok_or(EngineError::ParametersUnavailable { id })?
            .set_override(name, value.into())?;
        joint.param_revision += 1;
        Ok(())
    }

    /// Return a parameter to its derived default.
    pub fn clear_parameter_override(&mut self, id: Uuid, name: &str) -> Result<(), EngineError> {
        let joint = self.model.joint_mut(id)?;
        joint
            .parameters
            .as_mut()
            .ok_or(EngineError::ParametersUnavailable { id })?
            .clear_override(name)?;
        joint.param_revision += 1;
        Ok(())
    }

    // ── Recompute ──────────────────────────────────────────────────────

    /// Recompute dirty joints, then rebuild dirty members.
    ///
    /// Applying cuts never bumps a member generation, so a second call with
    /// no edits in between does nothing.
    #[instrument(skip_all, fields(members = self.model.members.len(), joints = self.model.joints.len()))]
    pub fn recompute(
        &mut self,
        registry: &JointRegistry,
        kernel: &mut dyn Kernel,
    ) -> RecomputeReport {
        let mut report = RecomputeReport::default();

        let FrameModel {
            members, joints, ..
        } = &mut self.model;
        for joint in joints.iter_mut() {
            let primary = members.iter().find(|m| m.id == joint.primary);
            let secondary = members.iter().find(|m| m.id == joint.secondary);
            let (Some(primary), Some(secondary)) = (primary, secondary) else {
                warn!(joint = %joint.id, "joint references a missing member");
                report
                    .errors
                    .push((joint.id, "joint references a missing member".to_string()));
                continue;
            };

            let inputs = JointInputs::of(joint, primary, secondary);
            if self
                .joint_outputs
                .get(&joint.id)
                .is_some_and(|out| out.inputs == inputs)
            {
                continue;
            }

            self.next_output_generation += 1;
            let output = rebuild::recompute_joint(
                joint,
                primary,
                secondary,
                registry,
                kernel,
                &self.detection,
                self.next_output_generation,
                &mut report,
            );
            self.joint_outputs.insert(joint.id, output);
            report.joints_recomputed.push(joint.id);
        }

        for member in &self.model.members {
            let joint_ids = self.model.joints_for_member(member.id);
            let stamp = MemberStamp {
                generation: member.generation,
                cuts: joint_ids
                    .iter()
                    .filter_map(|j| {
                        self.joint_outputs
                            .get(j)
                            .map(|out| (*j, out.output_generation))
                    })
                    .collect(),
            };
            if self
                .member_shapes
                .get(&member.id)
                .is_some_and(|shape| shape.stamp == stamp)
            {
                continue;
            }

            let cuts: Vec<(Uuid, KernelSolidHandle)> = joint_ids
                .iter()
                .filter_map(|j| {
                    let joint = self.model.joint(*j)?;
                    let out = self.joint_outputs.get(j)?;
                    let tool = if joint.primary == member.id {
                        out.primary_tool.clone()
                    } else {
                        out.secondary_cut.clone()
                    };
                    tool.map(|t| (*j, t))
                })
                .collect();
            let solid = rebuild::rebuild_member(member, &cuts, kernel, &mut report);
            self.member_shapes
                .insert(member.id, MemberShape { solid, stamp });
            report.members_rebuilt.push(member.id);
        }

        debug!(
            joints = report.joints_recomputed.len(),
            members = report.members_rebuilt.len(),
            errors = report.errors.len(),
            "recompute finished"
        );
        report
    }

    pub fn joint_output(&self, id: Uuid) -> Option<&JointOutput> {
        self.joint_outputs.get(&id)
    }

    /// The member's solid with all joint cuts applied, as of the last
    /// recompute.
    pub fn member_solid(&self, id: Uuid) -> Option<&KernelSolidHandle> {
        self.member_shapes.get(&id).map(|shape| &shape.solid)
    }

    /// Joint ids grouped by identical cut: same joint signature and the
    /// same stock on both sides. Joints without a signature are left out.
    pub fn fabrication_groups(&self) -> BTreeMap<String, Vec<Uuid>> {
        let mut groups: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
        for joint in &self.model.joints {
            let Some(signature) = self
                .joint_outputs
                .get(&joint.id)
                .and_then(|out| out.signature.as_ref())
            else {
                continue;
            };
            let (Some(primary), Some(secondary)) = (
                self.model.member(joint.primary),
                self.model.member(joint.secondary),
            ) else {
                continue;
            };
            let key = fabrication::group_key(signature, &primary.geometry, &secondary.geometry);
            groups.entry(key).or_default().push(joint.id);
        }
        groups
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
