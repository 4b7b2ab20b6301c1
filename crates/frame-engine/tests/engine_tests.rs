use approx::assert_relative_eq;
use frame_engine::{Engine, EngineError};
use timber_joints::JointRegistry;
use timber_kernel::{KernelIntrospect, MockKernel, MockShapeKind};
use timber_types::{IntersectionType, MemberGeometry, StructuralRole, Vec3};
use uuid::Uuid;

fn beam() -> MemberGeometry {
    MemberGeometry::new(Vec3::ZERO, Vec3::new(4000.0, 0.0, 0.0), 200.0, 250.0)
}

/// A floor joist running in along -Y and ending on the beam datum at `x`.
fn joist(x: f64, height: f64) -> MemberGeometry {
    MemberGeometry::new(
        Vec3::new(x, -3000.0, 0.0),
        Vec3::new(x, 0.0, 0.0),
        150.0,
        height,
    )
    .with_role(StructuralRole::FloorJoist)
}

/// Beam plus one joist joined with the default joint, recomputed once.
fn joined() -> (Engine, JointRegistry, MockKernel, Uuid, Uuid, Uuid) {
    let mut engine = Engine::new();
    let registry = JointRegistry::with_builtins();
    let mut kernel = MockKernel::new();
    let b = engine.add_member("beam", beam());
    let j = engine.add_member("joist", joist(2000.0, 200.0));
    let joint = engine.create_joint(b, j, None).unwrap();
    engine.recompute(&registry, &mut kernel);
    (engine, registry, kernel, b, j, joint)
}

// ── Joint Creation Tests ───────────────────────────────────────────────────

#[test]
fn create_joint_uses_detected_roles_and_default_type() {
    let mut engine = Engine::new();
    let b = engine.add_member("beam", beam());
    let j = engine.add_member("joist", joist(2000.0, 200.0));

    // Argument order does not decide roles: the joist ends on the beam.
    let id = engine.create_joint(j, b, None).unwrap();
    let joint = engine.model().joint(id).unwrap();
    assert_eq!(joint.primary, b);
    assert_eq!(joint.secondary, j);
    assert_eq!(joint.intersection_type, IntersectionType::EndpointToMidpoint);
    assert_eq!(joint.joint_type, "through_mortise_tenon");
    assert!(joint.parameters.is_none());
}

#[test]
fn create_joint_rejects_bad_pairs() {
    let mut engine = Engine::new();
    let b = engine.add_member("beam", beam());
    let j = engine.add_member("joist", joist(2000.0, 200.0));
    let far = engine.add_member(
        "far",
        MemberGeometry::new(
            Vec3::new(0.0, 5000.0, 0.0),
            Vec3::new(4000.0, 5000.0, 0.0),
            150.0,
            150.0,
        ),
    );

    assert!(matches!(
        engine.create_joint(b, b, None),
        Err(EngineError::SelfJoint { .. })
    ));
    assert!(matches!(
        engine.create_joint(b, Uuid::new_v4(), None),
        Err(EngineError::MemberNotFound { .. })
    ));
    assert!(matches!(
        engine.create_joint(b, far, None),
        Err(EngineError::NoIntersection { .. })
    ));

    let first = engine.create_joint(b, j, Some("dovetail")).unwrap();
    match engine.create_joint(j, b, None) {
        Err(EngineError::JointExists { existing, .. }) => assert_eq!(existing, first),
        other => panic!("expected JointExists, got {other:?}"),
    }
}

#[test]
fn auto_join_creates_default_joints() {
    let mut engine = Engine::new();
    let sill = engine.add_member(
        "sill",
        MemberGeometry::new(Vec3::ZERO, Vec3::new(3000.0, 0.0, 0.0), 150.0, 150.0),
    );
    engine.add_member(
        "post",
        MemberGeometry::new(
            Vec3::new(1000.0, 0.0, 0.0),
            Vec3::new(1000.0, 0.0, 2400.0),
            150.0,
            150.0,
        ),
    );
    engine.add_member(
        "girt",
        MemberGeometry::new(
            Vec3::new(2000.0, -1000.0, 0.0),
            Vec3::new(2000.0, 1000.0, 0.0),
            150.0,
            150.0,
        ),
    );

    let created = engine.auto_join();
    assert_eq!(created.len(), 2);
    assert_eq!(engine.model().joints_for_member(sill).len(), 2);

    let mut types: Vec<&str> = engine
        .model()
        .joints
        .iter()
        .map(|j| j.joint_type.as_str())
        .collect();
    types.sort_unstable();
    assert_eq!(types, vec!["half_lap", "through_mortise_tenon"]);

    assert!(engine.auto_join().is_empty());
}

// ── Recompute Pipeline Tests ───────────────────────────────────────────────

#[test]
fn recompute_builds_joint_and_cuts_both_members() {
    let (engine, _, kernel, b, j, joint) = joined();

    let stored = engine.model().joint(joint).unwrap();
    let params = stored.parameters.as_ref().unwrap();
    assert_eq!(params.number("tenon_height").unwrap(), 150.0);
    assert!(!stored.has_errors());

    let output = engine.joint_output(joint).unwrap();
    let tool = output.primary_tool.clone().unwrap();
    let shoulder = output.secondary_cut.clone().unwrap();
    assert_eq!(output.pegs.len(), 2);
    match kernel.shape_kind(&output.visual) {
        Some(MockShapeKind::Compound { parts }) => assert_eq!(parts.len(), 3),
        other => panic!("expected a compound visual, got {other:?}"),
    }
    assert!(output.signature.is_some());

    let beam_solid = engine.member_solid(b).unwrap();
    assert_eq!(kernel.subtracted_tools(beam_solid), vec![tool]);
    let bb = kernel.bounding_box(&kernel.base_of(beam_solid)).unwrap();
    assert_relative_eq!(bb.max[0], 4000.0, epsilon = 1e-9);

    let joist_solid = engine.member_solid(j).unwrap();
    assert_eq!(kernel.subtracted_tools(joist_solid), vec![shoulder]);
}

#[test]
fn second_recompute_does_nothing() {
    let (mut engine, registry, mut kernel, _, _, _) = joined();
    let solids = kernel.solid_count();

    let report = engine.recompute(&registry, &mut kernel);
    assert!(report.is_noop());
    assert!(report.warnings.is_empty());
    assert_eq!(kernel.solid_count(), solids);
}

#[test]
fn moving_a_member_refreshes_its_joint_and_both_members() {
    let (mut engine, registry, mut kernel, b, j, joint) = joined();

    engine.set_member_geometry(j, joist(2100.0, 200.0)).unwrap();
    let report = engine.recompute(&registry, &mut kernel);
    assert_eq!(report.joints_recomputed, vec![joint]);
    assert_eq!(report.members_rebuilt, vec![b, j]);

    let point = engine.model().joint(joint).unwrap().intersection_point;
    assert_relative_eq!(point.x, 2100.0, epsilon = 1e-9);
    assert!(engine.recompute(&registry, &mut kernel).is_noop());
}

#[test]
fn unrelated_members_are_left_alone() {
    let (mut engine, registry, mut kernel, b, _, _) = joined();
    let lone = engine.add_member(
        "lone",
        MemberGeometry::new(
            Vec3::new(0.0, 8000.0, 0.0),
            Vec3::new(1000.0, 8000.0, 0.0),
            100.0,
            100.0,
        ),
    );
    let report = engine.recompute(&registry, &mut kernel);
    assert!(report.joints_recomputed.is_empty());
    assert_eq!(report.members_rebuilt, vec![lone]);

    let moved = MemberGeometry::new(
        Vec3::new(0.0, 9000.0, 0.0),
        Vec3::new(1000.0, 9000.0, 0.0),
        100.0,
        100.0,
    );
    engine.set_member_geometry(lone, moved).unwrap();
    let report = engine.recompute(&registry, &mut kernel);
    assert_eq!(report.members_rebuilt, vec![lone]);
    assert!(!report.members_rebuilt.contains(&b));
}

// ── Parameter Tests ────────────────────────────────────────────────────────

#[test]
fn overrides_survive_member_move_and_defaults_follow() {
    let (mut engine, registry, mut kernel, _, j, joint) = joined();
    engine
        .set_parameter_override(joint, "peg_diameter", 25.0)
        .unwrap();
    let report = engine.recompute(&registry, &mut kernel);
    assert_eq!(report.joints_recomputed, vec![joint]);

    engine.set_member_geometry(j, joist(2000.0, 240.0)).unwrap();
    engine.recompute(&registry, &mut kernel);

    let params = engine
        .model()
        .joint(joint)
        .unwrap()
        .parameters
        .clone()
        .unwrap();
    assert_eq!(params.number("peg_diameter").unwrap(), 25.0);
    assert!(params.is_overridden("peg_diameter"));
    assert_eq!(params.number("tenon_height").unwrap(), 180.0);
    assert!(!params.is_overridden("tenon_height"));
    assert_eq!(engine.joint_output(joint).unwrap().pegs[0].diameter, 25.0);
}

#[test]
fn parameter_bounds_follow_the_secondary_section() {
    let (mut engine, registry, mut kernel, _, j, joint) = joined();
    engine
        .set_parameter_override(joint, "tenon_width", 130.0)
        .unwrap();

    let mut narrow = joist(2000.0, 200.0);
    narrow.width = 60.0;
    engine.set_member_geometry(j, narrow).unwrap();
    engine.recompute(&registry, &mut kernel);
    let params = engine.model().joint(joint).unwrap().parameters.clone().unwrap();
    let width = params.get("tenon_width").unwrap();
    assert_relative_eq!(width.max_value.unwrap(), 54.0, epsilon = 1e-9);
    assert_relative_eq!(params.number("tenon_width").unwrap(), 54.0, epsilon = 1e-9);
    assert!(params.is_overridden("tenon_width"));

    let mut wide = joist(2000.0, 200.0);
    wide.width = 300.0;
    engine.set_member_geometry(j, wide).unwrap();
    engine.recompute(&registry, &mut kernel);
    engine
        .set_parameter_override(joint, "tenon_width", 200.0)
        .unwrap();
    let params = engine.model().joint(joint).unwrap().parameters.clone().unwrap();
    assert_eq!(params.number("tenon_width").unwrap(), 200.0);
}

#[test]
fn clearing_an_override_restores_the_derived_value() {
    let (mut engine, registry, mut kernel, _, _, joint) = joined();
    engine
        .set_parameter_override(joint, "tenon_width", 60.0)
        .unwrap();
    engine.clear_parameter_override(joint, "tenon_width").unwrap();
    engine.recompute(&registry, &mut kernel);

    let params = engine.model().joint(joint).unwrap().parameters.clone().unwrap();
    assert_eq!(params.number("tenon_width").unwrap(), 50.0);
    assert!(!params.is_overridden("tenon_width"));
}

#[test]
fn override_needs_a_recomputed_joint() {
    let mut engine = Engine::new();
    let b = engine.add_member("beam", beam());
    let j = engine.add_member("joist", joist(2000.0, 200.0));
    let joint = engine.create_joint(b, j, None).unwrap();

    assert!(matches!(
        engine.set_parameter_override(joint, "peg_count", 1i64),
        Err(EngineError::ParametersUnavailable { .. })
    ));
    assert!(matches!(
        engine.set_parameter_override(Uuid::new_v4(), "peg_count", 1i64),
        Err(EngineError::JointNotFound { .. })
    ));
}

#[test]
fn unknown_parameter_is_an_error() {
    let (mut engine, _, _, _, _, joint) = joined();
    assert!(matches!(
        engine.set_parameter_override(joint, "lap_depth_primary", 10.0),
        Err(EngineError::Param(_))
    ));
}

#[test]
fn changing_joint_type_replaces_parameter_set() {
    let (mut engine, registry, mut kernel, _, _, joint) = joined();
    engine
        .set_parameter_override(joint, "peg_count", 1i64)
        .unwrap();

    engine.set_joint_type(joint, "dovetail").unwrap();
    assert!(engine.model().joint(joint).unwrap().parameters.is_none());
    let report = engine.recompute(&registry, &mut kernel);
    assert_eq!(report.joints_recomputed, vec![joint]);

    let params = engine.model().joint(joint).unwrap().parameters.clone().unwrap();
    assert!(params.contains("dovetail_angle"));
    assert!(!params.contains("peg_count"));
    assert!(params.iter().all(|p| !p.is_overridden));
    assert!(engine.joint_output(joint).unwrap().pegs.is_empty());
}

// ── Failure Handling Tests ─────────────────────────────────────────────────

#[test]
fn unknown_joint_type_gets_placeholder_and_no_cuts() {
    let (mut engine, registry, mut kernel, b, _, joint) = joined();
    engine.set_joint_type(joint, "scarf_bladed").unwrap();
    let report = engine.recompute(&registry, &mut kernel);

    assert_eq!(report.errors.len(), 1);
    let stored = engine.model().joint(joint).unwrap();
    assert_eq!(stored.validation[0].code, "UNKNOWN_JOINT_TYPE");
    let output = engine.joint_output(joint).unwrap();
    assert!(output.primary_tool.is_none() && output.secondary_cut.is_none());
    assert_eq!(
        kernel.shape_kind(&output.visual),
        Some(&MockShapeKind::Placeholder)
    );
    assert!(kernel
        .subtracted_tools(engine.member_solid(b).unwrap())
        .is_empty());
}

#[test]
fn member_moved_out_of_tolerance_keeps_parameters_and_loses_cuts() {
    let (mut engine, registry, mut kernel, b, j, joint) = joined();
    let pulled_back = MemberGeometry::new(
        Vec3::new(2000.0, -3500.0, 0.0),
        Vec3::new(2000.0, -500.0, 0.0),
        150.0,
        200.0,
    );
    engine.set_member_geometry(j, pulled_back).unwrap();
    engine.recompute(&registry, &mut kernel);

    let stored = engine.model().joint(joint).unwrap();
    assert_eq!(stored.validation.len(), 1);
    assert_eq!(stored.validation[0].code, "OUT_OF_TOLERANCE");
    assert!(stored.parameters.is_some());
    assert!(engine.joint_output(joint).unwrap().primary_tool.is_none());
    assert!(kernel
        .subtracted_tools(engine.member_solid(b).unwrap())
        .is_empty());
}

#[test]
fn failed_booleans_leave_members_uncut() {
    let mut engine = Engine::new();
    let registry = JointRegistry::with_builtins();
    let mut kernel = MockKernel::new();
    kernel.set_fail_booleans(true);
    let b = engine.add_member("beam", beam());
    let j = engine.add_member("joist", joist(2000.0, 200.0));
    engine.create_joint(b, j, Some("half_lap")).unwrap();

    let report = engine.recompute(&registry, &mut kernel);
    assert!(report.errors.is_empty());
    assert!(report.warnings.iter().any(|w| w.contains("beam")));
    for member in [b, j] {
        let solid = engine.member_solid(member).unwrap();
        assert!(kernel.subtracted_tools(solid).is_empty());
    }
}

#[test]
fn removing_a_member_drops_its_joints_and_cuts() {
    let (mut engine, registry, mut kernel, b, j, joint) = joined();
    engine.remove_member(j).unwrap();
    assert!(engine.model().joints.is_empty());
    assert!(engine.joint_output(joint).is_none());
    assert!(engine.member_solid(j).is_none());

    let report = engine.recompute(&registry, &mut kernel);
    assert_eq!(report.members_rebuilt, vec![b]);
    assert!(kernel
        .subtracted_tools(engine.member_solid(b).unwrap())
        .is_empty());
}

// ── Fabrication Grouping Tests ─────────────────────────────────────────────

#[test]
fn identical_joints_share_a_fabrication_group() {
    let mut engine = Engine::new();
    let registry = JointRegistry::with_builtins();
    let mut kernel = MockKernel::new();
    let b = engine.add_member("beam", beam());
    let j1 = engine.add_member("joist 1", joist(1000.0, 200.0));
    let j2 = engine.add_member("joist 2", joist(3000.0, 200.0));
    let j3 = engine.add_member("joist 3", joist(2000.0, 240.0));
    let first = engine.create_joint(b, j1, None).unwrap();
    let second = engine.create_joint(b, j2, None).unwrap();
    let third = engine.create_joint(b, j3, None).unwrap();
    engine.recompute(&registry, &mut kernel);

    let groups = engine.fabrication_groups();
    assert_eq!(groups.len(), 2);
    assert!(groups.values().any(|ids| ids == &vec![first, second]));
    assert!(groups.values().any(|ids| ids == &vec![third]));
}
