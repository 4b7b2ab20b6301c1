use frame_engine::FrameModel;
use serde::Serialize;

use crate::errors::SaveError;
use crate::metadata::ProjectMetadata;

/// Format identifier written to every project file.
pub const FORMAT_ID: &str = "timber-frame";

/// Current file format version.
///
/// Version 1 stored joint parameters and validation results as embedded
/// JSON strings; version 2 stores them as typed lists.
pub const FORMAT_VERSION: u32 = 2;

/// The top-level file structure.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectFile<'a> {
    /// Format identifier.
    pub format: &'static str,
    /// Format version number.
    pub version: u32,
    /// Project metadata.
    pub project: &'a ProjectMetadata,
    /// Members and joints. Kernel geometry is never saved; it is rebuilt
    /// from this on load.
    pub frame: &'a FrameModel,
}

/// Serialize a project to a pretty-printed JSON string.
pub fn save_project(model: &FrameModel, metadata: &ProjectMetadata) -> Result<String, SaveError> {
    let file = ProjectFile {
        format: FORMAT_ID,
        version: FORMAT_VERSION,
        project: metadata,
        frame: model,
    };
    serde_json::to_string_pretty(&file).map_err(|e| SaveError::Serialize(e.to_string()))
}
