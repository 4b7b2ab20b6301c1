use crate::definition::TimberJointDefinition;

/// Version of the definition contract plugins are built against.
pub const PLUGIN_API_VERSION: u32 = 1;

/// A bundle of joint definitions supplied from outside this crate.
///
/// The registry refuses plugins whose `api_version` differs from
/// [`PLUGIN_API_VERSION`].
pub trait JointPlugin {
    fn name(&self) -> &str;

    fn api_version(&self) -> u32 {
        PLUGIN_API_VERSION
    }

    fn definitions(&self) -> Vec<Box<dyn TimberJointDefinition>>;
}
