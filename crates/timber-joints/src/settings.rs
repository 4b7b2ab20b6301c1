//! Detection tolerances and the per-user joint directory.
//!
//! Settings come from an optional TOML file; every field has a default so an
//! empty file (or no file) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the user joint directory.
pub const JOINTS_DIR_ENV: &str = "TIMBERFRAME_JOINTS_DIR";

/// Tolerances for finding and accepting member intersections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Maximum closest-approach distance between datums, in mm.
    pub tolerance: f64,
    /// Fraction of a segment's length treated as "at the endpoint".
    pub endpoint_threshold: f64,
    /// Smallest datum angle, in degrees, that still forms a joint.
    pub min_angle: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            tolerance: 12.7,
            endpoint_threshold: 0.02,
            min_angle: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointSettings {
    pub detection: DetectionConfig,
    /// Directory of user joint manifests. Resolved per
    /// [`JointSettings::user_joints_dir`] when absent.
    pub user_joints_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to create joint directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JointSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Where user joint manifests live: `$TIMBERFRAME_JOINTS_DIR`, then the
    /// configured directory, then the platform data directory, then
    /// `./joints`.
    pub fn user_joints_dir(&self) -> PathBuf {
        if let Some(dir) = std::env::var_os(JOINTS_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.user_joints_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("org", "timberframe", "TimberFrame")
            .map(|p| p.data_dir().join("joints"))
            .unwrap_or_else(|| PathBuf::from("joints"))
    }

    /// Resolve the user joint directory and create it if missing.
    pub fn ensure_user_joints_dir(&self) -> Result<PathBuf, SettingsError> {
        let dir = self.user_joints_dir();
        std::fs::create_dir_all(&dir).map_err(|source| SettingsError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DetectionConfig::default();
        assert_eq!(cfg.tolerance, 12.7);
        assert_eq!(cfg.endpoint_threshold, 0.02);
        assert_eq!(cfg.min_angle, 5.0);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let settings = JointSettings::from_toml_str(
            r#"
            user_joints_dir = "/tmp/joints"

            [detection]
            tolerance = 25.0
            "#,
        )
        .unwrap();
        assert_eq!(settings.detection.tolerance, 25.0);
        assert_eq!(settings.detection.min_angle, 5.0);
        assert_eq!(settings.user_joints_dir, Some(PathBuf::from("/tmp/joints")));
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(JointSettings::from_toml_str("").unwrap(), JointSettings::default());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        assert!(matches!(
            JointSettings::from_toml_str("[detection]\ntolerance = \"wide\""),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_ensure_creates_configured_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("joints");
        let settings = JointSettings {
            user_joints_dir: Some(dir.clone()),
            ..Default::default()
        };
        // The env override would win; only assert when it is unset.
        if std::env::var_os(JOINTS_DIR_ENV).is_none() {
            let created = settings.ensure_user_joints_dir().unwrap();
            assert_eq!(created, dir);
            assert!(dir.is_dir());
        }
    }
}
