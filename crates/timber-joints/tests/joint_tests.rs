use proptest::prelude::*;
use timber_joints::{
    builtin_definitions, evaluate_pair, DefinitionSource, DetectionConfig, JointContext,
    JointCoordinateSystem, JointParameter, JointRegistry, JointSettings, MemberRef, ParamValue,
    ParameterSet,
};
use timber_joints::settings::JOINTS_DIR_ENV;
use timber_kernel::{KernelIntrospect, MockKernel};
use timber_types::{IntersectionType, MemberGeometry, StructuralRole, Vec3};
use uuid::Uuid;

/// A joist ending square on the side of a beam.
fn t_joint(joist_height: f64) -> (MemberGeometry, MemberGeometry, JointCoordinateSystem) {
    let beam = MemberGeometry::new(Vec3::ZERO, Vec3::new(4000.0, 0.0, 0.0), 200.0, 250.0);
    let joist = MemberGeometry::new(
        Vec3::new(2000.0, -3000.0, 0.0),
        Vec3::new(2000.0, 0.0, 0.0),
        150.0,
        joist_height,
    )
    .with_role(StructuralRole::FloorJoist);
    let detected = evaluate_pair(
        MemberRef::new(Uuid::new_v4(), &beam),
        MemberRef::new(Uuid::new_v4(), &joist),
        &DetectionConfig::default(),
    )
    .expect("square T joint is detected");
    assert_eq!(detected.intersection_type, IntersectionType::EndpointToMidpoint);
    (beam, joist, detected.joint_cs)
}

// ── Built-in Geometry Tests ────────────────────────────────────────────────

#[test]
fn every_builtin_builds_tools_for_a_square_t_joint() {
    let (beam, joist, cs) = t_joint(200.0);
    let ctx = JointContext::new(&beam, &joist, &cs);

    for def in builtin_definitions() {
        let id = def.info().id.clone();
        let mut kernel = MockKernel::new();
        let params = def.get_parameters(&ctx);
        assert!(!params.is_empty(), "{id} declares parameters");

        let tool = def.build_primary_tool(&params, &ctx, &mut kernel).unwrap();
        let bb = kernel.bounding_box(&tool).unwrap();
        assert!(bb.size().iter().all(|s| *s > 0.0), "{id} tool has volume");

        let profile = def.build_secondary_profile(&params, &ctx, &mut kernel).unwrap();
        assert!(kernel.bounding_box(&profile.tenon_shape).is_some());
        assert!(kernel.bounding_box(&profile.shoulder_cut).is_some());

        let results = def.validate(&params, &ctx).unwrap();
        assert!(
            results.iter().all(|r| r.code != "ANGLE_OUT_OF_RANGE"),
            "{id} accepts a square joint"
        );
        let sig = def.fabrication_signature(&params, &ctx).unwrap();
        assert_eq!(sig.get("joint_type"), Some(id.as_str()));
    }
}

#[test]
fn every_builtin_rejects_angles_outside_its_range() {
    let (beam, joist, cs) = t_joint(200.0);

    for def in builtin_definitions() {
        let info = def.info().clone();
        for angle in [info.min_angle - 1.0, info.max_angle + 1.0] {
            let cs = JointCoordinateSystem { angle, ..cs };
            let ctx = JointContext::new(&beam, &joist, &cs);
            let params = def.get_parameters(&ctx);
            let results = def.validate(&params, &ctx).unwrap();
            let hit = results
                .iter()
                .find(|r| r.code == "ANGLE_OUT_OF_RANGE")
                .unwrap_or_else(|| panic!("{} at {angle}° should be out of range", info.id));
            assert!(hit.is_error());
        }
    }
}

#[test]
fn peg_count_switches_at_150mm() {
    let registry = JointRegistry::with_builtins();
    let def = registry.get("through_mortise_tenon").unwrap();

    let (beam, joist, cs) = t_joint(140.0);
    let ctx = JointContext::new(&beam, &joist, &cs);
    assert_eq!(def.build_pegs(&def.get_parameters(&ctx), &ctx).unwrap().len(), 1);

    let (beam, joist, cs) = t_joint(160.0);
    let ctx = JointContext::new(&beam, &joist, &cs);
    let params = def.get_parameters(&ctx);
    let pegs = def.build_pegs(&params, &ctx).unwrap();
    assert_eq!(pegs.len(), 2);
    assert!(params.number("peg_edge_distance").unwrap() >= 0.0);

    // Pegs sit either side of the tenon centre, which is level with the
    // joist's section middle.
    let heights: Vec<f64> = pegs.iter().map(|p| p.center.z).collect();
    assert!((heights[0] + heights[1] - 2.0 * 80.0).abs() < 1e-9);
    assert!((heights[0] - heights[1]).abs() > 0.0);
}

#[test]
fn dovetail_slot_is_a_sewn_solid_with_six_faces() {
    let (beam, joist, cs) = t_joint(200.0);
    let ctx = JointContext::new(&beam, &joist, &cs);
    let registry = JointRegistry::with_builtins();
    let def = registry.get("dovetail").unwrap();
    let mut kernel = MockKernel::new();
    let slot = def
        .build_primary_tool(&def.get_parameters(&ctx), &ctx, &mut kernel)
        .unwrap();
    assert_eq!(kernel.face_count(&slot), 6);
}

// ── Registry Discovery Tests ───────────────────────────────────────────────

#[test]
fn user_manifest_replaces_builtin_half_lap() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("half_lap.toml"),
        r#"
            id = "half_lap"
            name = "Shop Half Lap"
            base = "half_lap"

            [defaults]
            lap_depth_primary = 80.0
        "#,
    )
    .unwrap();
    std::fs::write(dir.path().join("_draft.toml"), "id = \"draft\"").unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut registry = JointRegistry::with_builtins();
    let report = registry.load_user_dir(dir.path());

    assert_eq!(report.loaded, vec!["half_lap".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].0.ends_with("broken.json"));
    assert!(!registry.contains("draft"));

    let def = registry.get("half_lap").unwrap();
    assert_eq!(def.info().name, "Shop Half Lap");
    assert_eq!(
        registry.source("half_lap"),
        Some(&DefinitionSource::UserFile(dir.path().join("half_lap.toml")))
    );

    let beam = MemberGeometry::new(Vec3::ZERO, Vec3::new(4000.0, 0.0, 0.0), 200.0, 200.0);
    let girt = MemberGeometry::new(
        Vec3::new(2000.0, -2000.0, 0.0),
        Vec3::new(2000.0, 2000.0, 0.0),
        200.0,
        200.0,
    );
    let cs = evaluate_pair(
        MemberRef::new(Uuid::new_v4(), &beam),
        MemberRef::new(Uuid::new_v4(), &girt),
        &DetectionConfig::default(),
    )
    .unwrap()
    .joint_cs;
    let params = def.get_parameters(&JointContext::new(&beam, &girt, &cs));
    assert_eq!(params.number("lap_depth_primary").unwrap(), 80.0);
}

#[test]
fn load_all_creates_configured_directory() {
    if std::env::var_os(JOINTS_DIR_ENV).is_some() {
        return;
    }
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("timber").join("joints");
    let settings = JointSettings {
        user_joints_dir: Some(dir.clone()),
        ..Default::default()
    };
    let mut registry = JointRegistry::new();
    let report = registry.load_all(&settings).unwrap();
    assert!(dir.is_dir());
    assert!(report.loaded.is_empty());
    assert_eq!(registry.len(), 4);
}

// ── Parameter Round-Trip Tests ─────────────────────────────────────────────

fn arb_parameter(index: usize) -> impl Strategy<Value = JointParameter> {
    let name = format!("p{index}");
    prop_oneof![
        (1.0f64..500.0, 0.0f64..1000.0, proptest::option::of(0.0f64..600.0)).prop_map({
            let name = name.clone();
            move |(min, default, value)| {
                let mut p = JointParameter::length(&name, default).bounds(min, min * 2.0);
                if let Some(v) = value {
                    p.value = ParamValue::Number(v.clamp(min, min * 2.0));
                    p.is_overridden = true;
                }
                p
            }
        }),
        (0i64..5).prop_map({
            let name = name.clone();
            move |n| JointParameter::integer(&name, n).bounds(0.0, 4.0)
        }),
        any::<bool>().prop_map({
            let name = name.clone();
            move |b| JointParameter::boolean(&name, b).group("Flags")
        }),
        prop::sample::select(vec!["Top", "Bottom"]).prop_map(move |face| {
            JointParameter::enumeration(&name, face, &["Top", "Bottom"]).describe("face")
        }),
    ]
}

fn arb_parameter_set() -> impl Strategy<Value = ParameterSet> {
    (0usize..8).prop_flat_map(|n| {
        (0..n)
            .map(arb_parameter)
            .collect::<Vec<_>>()
            .prop_map(|params| params.into_iter().collect::<ParameterSet>())
    })
}

proptest! {
    #[test]
    fn parameter_json_is_stable(set in arb_parameter_set()) {
        let first = set.to_json().unwrap();
        let decoded = ParameterSet::from_json(&first).unwrap();
        prop_assert_eq!(&decoded, &set);
        prop_assert_eq!(decoded.to_json().unwrap(), first);
    }
}
