use uuid::Uuid;

use timber_types::MemberGeometry;

use crate::types::{EngineError, FrameModel, TimberJoint, TimberMember};

impl FrameModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member and return its id.
    pub fn add_member(&mut self, name: impl Into<String>, geometry: MemberGeometry) -> Uuid {
        let id = Uuid::new_v4();
        self.members.push(TimberMember {
            id,
            name: name.into(),
            geometry,
            generation: 0,
        });
        id
    }

    pub fn member(&self, id: Uuid) -> Option<&TimberMember> {
        self.members.iter().find(|m| m.id == id)
    }

    pub(crate) fn member_mut(&mut self, id: Uuid) -> Result<&mut TimberMember, EngineError> {
        self.members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(EngineError::MemberNotFound { id })
    }

    /// Replace a member's geometry and bump its generation.
    pub fn set_member_geometry(
        &mut self,
        id: Uuid,
        geometry: MemberGeometry,
    ) -> Result<(), EngineError> {
        let member = self.member_mut(id)?;
        member.geometry = geometry;
        member.generation += 1;
        Ok(())
    }

    /// Remove a member together with every joint that touches it.
    pub fn remove_member(
        &mut self,
        id: Uuid,
    ) -> Result<(TimberMember, Vec<TimberJoint>), EngineError> {
        let pos = self
            .members
            .iter()
            .position(|m| m.id == id)
            .ok_or(EngineError::MemberNotFound { id })?;
        let member = self.members.remove(pos);

        let mut removed = Vec::new();
        for joint_id in self.joints_for_member(id).to_vec() {
            removed.push(self.remove_joint(joint_id)?);
        }
        self.index.remove(&id);
        Ok((member, removed))
    }

    /// Insert a joint. Both members must exist and not already be joined.
    pub fn add_joint(&mut self, joint: TimberJoint) -> Result<Uuid, EngineError> {
        if joint.primary == joint.secondary {
            return Err(EngineError::SelfJoint { id: joint.primary });
        }
        for member in [joint.primary, joint.secondary] {
            if self.member(member).is_none() {
                return Err(EngineError::MemberNotFound { id: member });
            }
        }
        if let Some(existing) = self.joint_for_pair(joint.primary, joint.secondary) {
            return Err(EngineError::JointExists {
                a: joint.primary,
                b: joint.secondary,
                existing,
            });
        }

        let id = joint.id;
        self.index.entry(joint.primary).or_default().push(id);
        self.index.entry(joint.secondary).or_default().push(id);
        self.joints.push(joint);
        Ok(id)
    }

    pub fn remove_joint(&mut self, id: Uuid) -> Result<TimberJoint, EngineError> {
        let pos = self
            .joints
            .iter()
            .position(|j| j.id == id)
            .ok_or(EngineError::JointNotFound { id })?;
        let joint = self.joints.remove(pos);
        for member in [joint.primary, joint.secondary] {
            if let Some(ids) = self.index.get_mut(&member) {
                ids.retain(|j| *j != id);
                if ids.is_empty() {
                    self.index.remove(&member);
                }
            }
        }
        Ok(joint)
    }

    pub fn joint(&self, id: Uuid) -> Option<&TimberJoint> {
        self.joints.iter().find(|j| j.id == id)
    }

    pub(crate) fn joint_mut(&mut self, id: Uuid) -> Result<&mut TimberJoint, EngineError> {
        self.joints
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(EngineError::JointNotFound { id })
    }

    /// Joint ids touching `member`, in insertion order.
    pub fn joints_for_member(&self, member: Uuid) -> &[Uuid] {
        self.index.get(&member).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The joint between `a` and `b`, in either role.
    pub fn joint_for_pair(&self, a: Uuid, b: Uuid) -> Option<Uuid> {
        self.joints_for_member(a)
            .iter()
            .copied()
            .find(|id| self.joint(*id).is_some_and(|j| j.involves(b)))
    }

    /// Rebuild the member → joint index from the joint list. Call after
    /// deserializing.
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for joint in &self.joints {
            self.index.entry(joint.primary).or_default().push(joint.id);
            self.index.entry(joint.secondary).or_default().push(joint.id);
        }
    }
}
