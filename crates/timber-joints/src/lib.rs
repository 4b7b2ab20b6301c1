pub mod builtin;
pub mod definition;
pub mod intersection;
pub mod manifest;
pub mod params;
pub mod plugin;
pub mod registry;
pub mod settings;
pub mod types;

pub use builtin::{builtin_definition, builtin_definitions};
pub use definition::{angle_check, JointContext, JointInfo, TimberJointDefinition};
pub use intersection::{
    assign_primary_secondary, classify_intersection, closest_approach_segments, compute_joint_cs,
    evaluate_pair, reevaluate_joint, test_pair, ClosestApproach, IntersectionResult, MemberRef,
    PairRejection,
};
pub use manifest::{JointManifest, ManifestError, ManifestJoint};
pub use params::{JointParameter, ParamError, ParamType, ParamValue, ParameterSet};
pub use plugin::{JointPlugin, PLUGIN_API_VERSION};
pub use registry::{
    default_joint_type, DefinitionSource, DiscoveryReport, JointRegistry, RegistryError,
};
pub use settings::{DetectionConfig, JointSettings, SettingsError};
pub use types::*;
