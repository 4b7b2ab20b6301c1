//! Document-level intersection scans.

use timber_joints::{test_pair, DetectionConfig, IntersectionResult, MemberRef};
use uuid::Uuid;

use crate::types::FrameModel;

/// Every unjoined member pair whose datums meet. O(n²) in member count.
pub fn detect_intersections(model: &FrameModel, config: &DetectionConfig) -> Vec<IntersectionResult> {
    let mut found = Vec::new();
    for (i, a) in model.members.iter().enumerate() {
        for b in &model.members[i + 1..] {
            if model.joint_for_pair(a.id, b.id).is_some() {
                continue;
            }
            if let Some(result) = test_pair(
                MemberRef::new(a.id, &a.geometry),
                MemberRef::new(b.id, &b.geometry),
                config,
            ) {
                found.push(result);
            }
        }
    }
    found
}

/// Unjoined intersections between `member` and every other member.
/// Empty when `member` is not in the model.
pub fn detect_for_member(
    model: &FrameModel,
    member: Uuid,
    config: &DetectionConfig,
) -> Vec<IntersectionResult> {
    let Some(subject) = model.member(member) else {
        return Vec::new();
    };
    model
        .members
        .iter()
        .filter(|other| other.id != member)
        .filter(|other| model.joint_for_pair(member, other.id).is_none())
        .filter_map(|other| {
            test_pair(
                MemberRef::new(subject.id, &subject.geometry),
                MemberRef::new(other.id, &other.geometry),
                config,
            )
        })
        .collect()
}
