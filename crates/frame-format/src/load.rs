use frame_engine::FrameModel;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::save::{FORMAT_ID, FORMAT_VERSION};

/// The envelope read before the frame itself, so that old versions can be
/// migrated before typed deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFileRaw {
    pub format: String,
    pub version: u32,
    pub project: ProjectMetadata,
    pub frame: Value,
}

/// Deserialize a project from a JSON string.
///
/// Validates the format identifier and version and migrates older files.
/// Returns the frame, with its member → joint index rebuilt, and the
/// project metadata.
pub fn load_project(json: &str) -> Result<(FrameModel, ProjectMetadata), LoadError> {
    let raw: ProjectFileRaw =
        serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    // Validate format identifier
    if raw.format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(raw.format));
    }

    // Validate version
    if raw.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }

    let frame = if raw.version < FORMAT_VERSION {
        info!(from = raw.version, to = FORMAT_VERSION, "migrating project file");
        crate::migrate::migrate(raw.frame, raw.version, FORMAT_VERSION)?
    } else {
        raw.frame
    };

    let mut model: FrameModel =
        serde_json::from_value(frame).map_err(|e| LoadError::ParseError(e.to_string()))?;
    model.rebuild_index();

    Ok((model, raw.project))
}
