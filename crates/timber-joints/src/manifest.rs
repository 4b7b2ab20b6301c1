//! User joint manifests: a built-in algorithm under a new id, with its own
//! metadata and default overrides.
//!
//! ```toml
//! id = "shallow_lap"
//! name = "Shallow Lap"
//! base = "half_lap"
//! min_angle = 80.0
//!
//! [defaults]
//! lap_depth_primary = 60.0
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use timber_kernel::{Kernel, KernelSolidHandle};
use timber_types::StructuralRole;

use crate::builtin::builtin_definition;
use crate::definition::{angle_check, JointContext, JointInfo, TimberJointDefinition};
use crate::params::{ParamValue, ParameterSet};
use crate::plugin::PLUGIN_API_VERSION;
use crate::types::{
    FabricationSignature, JointError, JointStructuralProperties, PegDefinition, SecondaryProfile,
    ValidationResult,
};

fn default_api_version() -> u32 {
    PLUGIN_API_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointManifest {
    #[serde(default = "default_api_version")]
    pub api_version: u32,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Id of the built-in whose geometry this joint reuses.
    pub base: String,
    #[serde(default)]
    pub min_angle: Option<f64>,
    #[serde(default)]
    pub max_angle: Option<f64>,
    #[serde(default)]
    pub primary_roles: Option<Vec<StructuralRole>>,
    #[serde(default)]
    pub secondary_roles: Option<Vec<StructuralRole>>,
    /// Replacement defaults, by parameter name.
    #[serde(default)]
    pub defaults: BTreeMap<String, ParamValue>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path} is neither .toml nor .json")]
    UnsupportedFormat { path: PathBuf },

    #[error("manifest api_version {found} is not supported (expected {expected})")]
    ApiVersion { found: u32, expected: u32 },

    #[error("joint {id} is based on unknown built-in {base:?}")]
    UnknownBase { id: String, base: String },
}

impl JointManifest {
    pub fn from_toml_str(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a manifest, choosing the parser by file extension.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ManifestError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Build the definition this manifest describes.
    pub fn instantiate(self) -> Result<ManifestJoint, ManifestError> {
        if self.api_version != PLUGIN_API_VERSION {
            return Err(ManifestError::ApiVersion {
                found: self.api_version,
                expected: PLUGIN_API_VERSION,
            });
        }
        let base = builtin_definition(&self.base).ok_or_else(|| ManifestError::UnknownBase {
            id: self.id.clone(),
            base: self.base.clone(),
        })?;
        let inherited = base.info();
        let info = JointInfo {
            id: self.id,
            name: self.name,
            category: self.category.unwrap_or_else(|| inherited.category.clone()),
            description: self.description,
            primary_roles: self
                .primary_roles
                .unwrap_or_else(|| inherited.primary_roles.clone()),
            secondary_roles: self
                .secondary_roles
                .unwrap_or_else(|| inherited.secondary_roles.clone()),
            min_angle: self.min_angle.unwrap_or(inherited.min_angle),
            max_angle: self.max_angle.unwrap_or(inherited.max_angle),
        };
        Ok(ManifestJoint {
            info,
            base,
            defaults: self.defaults,
        })
    }
}

/// A manifest-declared joint. Geometry comes from the base built-in; id,
/// metadata, angle range and defaults come from the manifest.
pub struct ManifestJoint {
    info: JointInfo,
    base: Box<dyn TimberJointDefinition>,
    defaults: BTreeMap<String, ParamValue>,
}

impl ManifestJoint {
    pub fn base_id(&self) -> &str {
        &self.base.info().id
    }
}

impl TimberJointDefinition for ManifestJoint {
    fn info(&self) -> &JointInfo {
        &self.info
    }

    fn get_parameters(&self, ctx: &JointContext<'_>) -> ParameterSet {
        let mut params = self.base.get_parameters(ctx);
        params.update_defaults(self.defaults.iter().map(|(k, v)| (k.as_str(), v)));
        params
    }

    fn build_primary_tool(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<KernelSolidHandle, JointError> {
        self.base.build_primary_tool(params, ctx, kernel)
    }

    fn build_secondary_profile(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
        kernel: &mut dyn Kernel,
    ) -> Result<SecondaryProfile, JointError> {
        self.base.build_secondary_profile(params, ctx, kernel)
    }

    fn build_pegs(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<Vec<PegDefinition>, JointError> {
        self.base.build_pegs(params, ctx)
    }

    fn validate(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<Vec<ValidationResult>, JointError> {
        // The angle range is the manifest's, not the base's.
        let mut results: Vec<_> = self
            .base
            .validate(params, ctx)?
            .into_iter()
            .filter(|r| r.code != "ANGLE_OUT_OF_RANGE")
            .collect();
        results.extend(angle_check(&self.info, ctx.cs));
        Ok(results)
    }

    fn fabrication_signature(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> Result<FabricationSignature, JointError> {
        let mut sig = self.base.fabrication_signature(params, ctx)?;
        sig.insert_text("joint_type", &self.info.id);
        Ok(sig)
    }

    fn structural_properties(
        &self,
        params: &ParameterSet,
        ctx: &JointContext<'_>,
    ) -> JointStructuralProperties {
        self.base.structural_properties(params, ctx)
    }
}
