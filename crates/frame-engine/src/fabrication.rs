use timber_joints::FabricationSignature;
use timber_types::MemberGeometry;

/// Section, length and reference face of a member, rounded like joint
/// signatures so that identical stock compares equal.
pub fn member_signature(geometry: &MemberGeometry) -> String {
    let mut sig = FabricationSignature::default();
    sig.insert_length("width", geometry.width);
    sig.insert_length("height", geometry.height);
    sig.insert_length("length", geometry.length());
    sig.insert_text("reference_face", &format!("{:?}", geometry.reference_face));
    sig.key()
}

/// Grouping key for a joint cut: the joint's own signature plus the stock
/// on both sides.
pub fn group_key(
    joint: &FabricationSignature,
    primary: &MemberGeometry,
    secondary: &MemberGeometry,
) -> String {
    format!(
        "{}|primary:{}|secondary:{}",
        joint.key(),
        member_signature(primary),
        member_signature(secondary)
    )
}
