//! The set of joint types available to a project.
//!
//! Built-ins are registered first; plugins and user manifests registered
//! later replace entries with the same id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use timber_types::{IntersectionType, StructuralRole};
use tracing::{debug, info, instrument, warn};

use crate::builtin::builtin_definitions;
use crate::definition::{JointInfo, TimberJointDefinition};
use crate::manifest::JointManifest;
use crate::plugin::{JointPlugin, PLUGIN_API_VERSION};
use crate::settings::{JointSettings, SettingsError};

/// Where a registered definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionSource {
    BuiltIn,
    Plugin(String),
    UserFile(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("joint id {id:?} must be non-empty lowercase letters, digits or underscores")]
    InvalidId { id: String },

    #[error("joint {id} has no display name")]
    MissingName { id: String },

    #[error("joint {id} declares invalid angle range {min}..{max}")]
    InvalidAngleRange { id: String, min: f64, max: f64 },

    #[error("plugin {plugin} targets api version {found}, expected {expected}")]
    PluginApiVersion {
        plugin: String,
        found: u32,
        expected: u32,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Outcome of scanning a user joint directory.
#[derive(Debug, Default, Clone)]
pub struct DiscoveryReport {
    /// Ids registered, in load order.
    pub loaded: Vec<String>,
    /// Files that could not be loaded, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Joint type chosen when a new joint of this classification is created.
pub fn default_joint_type(kind: IntersectionType) -> &'static str {
    match kind {
        IntersectionType::EndpointToMidpoint => "through_mortise_tenon",
        IntersectionType::MidpointToMidpoint => "half_lap",
        IntersectionType::EndpointToEndpoint => "scarf_bladed",
    }
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Capability checks every definition must pass before it is registered.
fn check_info(info: &JointInfo) -> Result<(), RegistryError> {
    if !valid_id(&info.id) {
        return Err(RegistryError::InvalidId {
            id: info.id.clone(),
        });
    }
    if info.name.trim().is_empty() {
        return Err(RegistryError::MissingName {
            id: info.id.clone(),
        });
    }
    let (min, max) = (info.min_angle, info.max_angle);
    if !(min.is_finite() && max.is_finite() && 0.0 <= min && min <= max && max <= 180.0) {
        return Err(RegistryError::InvalidAngleRange {
            id: info.id.clone(),
            min,
            max,
        });
    }
    Ok(())
}

struct Entry {
    definition: Box<dyn TimberJointDefinition>,
    source: DefinitionSource,
}

#[derive(Default)]
pub struct JointRegistry {
    entries: BTreeMap<String, Entry>,
}

impl JointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.load_builtins();
        registry
    }

    /// Add a definition after checking its declared capabilities. Returns
    /// the source of the entry it replaced, if any.
    pub fn register(
        &mut self,
        definition: Box<dyn TimberJointDefinition>,
        source: DefinitionSource,
    ) -> Result<Option<DefinitionSource>, RegistryError> {
        check_info(definition.info())?;

        let id = definition.info().id.clone();
        let replaced = self
            .entries
            .insert(id.clone(), Entry { definition, source })
            .map(|old| old.source);
        if let Some(previous) = &replaced {
            debug!(%id, ?previous, "joint definition replaced");
        }
        Ok(replaced)
    }

    pub fn load_builtins(&mut self) {
        let mut count = 0;
        for definition in builtin_definitions() {
            let id = definition.info().id.clone();
            match self.register(definition, DefinitionSource::BuiltIn) {
                Ok(_) => count += 1,
                Err(e) => warn!(%id, error = %e, "built-in joint rejected"),
            }
        }
        info!(count, "built-in joints registered");
    }

    /// Register every definition a plugin supplies. A plugin with any
    /// invalid definition registers nothing.
    #[instrument(skip(self, plugin), fields(plugin = plugin.name()))]
    pub fn load_plugin(&mut self, plugin: &dyn JointPlugin) -> Result<usize, RegistryError> {
        if plugin.api_version() != PLUGIN_API_VERSION {
            return Err(RegistryError::PluginApiVersion {
                plugin: plugin.name().to_string(),
                found: plugin.api_version(),
                expected: PLUGIN_API_VERSION,
            });
        }
        let definitions = plugin.definitions();
        for definition in &definitions {
            check_info(definition.info())?;
        }
        let count = definitions.len();
        for definition in definitions {
            self.register(definition, DefinitionSource::Plugin(plugin.name().to_string()))?;
        }
        info!(count, "plugin joints registered");
        Ok(count)
    }

    /// Register every manifest in `dir`. Files whose name starts with `_`
    /// are ignored; unreadable or invalid manifests are skipped and reported.
    #[instrument(skip(self))]
    pub fn load_user_dir(&mut self, dir: &Path) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cannot read user joint directory");
                return report;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                let is_manifest = matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("toml") | Some("json")
                );
                let hidden = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('_'));
                path.is_file() && is_manifest && !hidden
            })
            .collect();
        paths.sort();

        for path in paths {
            let registered = JointManifest::load(&path)
                .and_then(JointManifest::instantiate)
                .map_err(|e| e.to_string())
                .and_then(|joint| {
                    let id = joint.info().id.clone();
                    self.register(Box::new(joint), DefinitionSource::UserFile(path.clone()))
                        .map(|_| id)
                        .map_err(|e| e.to_string())
                });
            match registered {
                Ok(id) => report.loaded.push(id),
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "skipping joint manifest");
                    report.skipped.push((path, reason));
                }
            }
        }
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "user joints scanned"
        );
        report
    }

    /// Built-ins, then the user directory (created if missing).
    #[instrument(skip(self, settings))]
    pub fn load_all(&mut self, settings: &JointSettings) -> Result<DiscoveryReport, RegistryError> {
        self.load_builtins();
        let dir = settings.ensure_user_joints_dir()?;
        Ok(self.load_user_dir(&dir))
    }

    pub fn get(&self, id: &str) -> Option<&dyn TimberJointDefinition> {
        self.entries.get(id).map(|e| e.definition.as_ref())
    }

    pub fn source(&self, id: &str) -> Option<&DefinitionSource> {
        self.entries.get(id).map(|e| &e.source)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_type_for(&self, kind: IntersectionType) -> &'static str {
        default_joint_type(kind)
    }

    /// Ids of joint types suited to this pair, the classification's default
    /// first when it qualifies.
    pub fn get_suggested_types(
        &self,
        kind: IntersectionType,
        primary_role: StructuralRole,
        secondary_role: StructuralRole,
        angle: f64,
    ) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                let info = e.definition.info();
                info.accepts_angle(angle) && info.accepts_roles(primary_role, secondary_role)
            })
            .map(|(id, _)| id.clone())
            .collect();
        let default = default_joint_type(kind);
        if let Some(pos) = ids.iter().position(|id| id == default) {
            let id = ids.remove(pos);
            ids.insert(0, id);
        }
        ids
    }
}
