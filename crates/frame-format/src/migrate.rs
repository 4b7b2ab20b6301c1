use serde_json::Value;
use timber_joints::{ParamError, ParameterSet, ValidationResult};
use tracing::debug;

use crate::errors::LoadError;

/// Apply format migrations from `from_version` to `to_version` to the raw
/// `frame` value.
///
/// Migrations are applied sequentially: v1→v2, v2→v3, etc.
pub fn migrate(mut frame: Value, from_version: u32, to_version: u32) -> Result<Value, LoadError> {
    let mut version = from_version;
    while version < to_version {
        frame = match version {
            1 => migrate_v1_to_v2(frame)?,
            _ => {
                return Err(LoadError::MigrationFailed {
                    from: from_version,
                    to: to_version,
                    reason: format!("no migration path from v{version}"),
                })
            }
        };
        version += 1;
    }
    Ok(frame)
}

/// Version 1 joints carried `parameters` and `validation` as JSON text,
/// with an empty string meaning "not computed".
fn migrate_v1_to_v2(mut frame: Value) -> Result<Value, LoadError> {
    let Some(joints) = frame.get_mut("joints").and_then(Value::as_array_mut) else {
        return Ok(frame);
    };
    for joint in joints.iter_mut() {
        let id = joint
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        let Some(fields) = joint.as_object_mut() else {
            return Err(LoadError::MigrationFailed {
                from: 1,
                to: 2,
                reason: format!("joint {id} is not an object"),
            });
        };

        if let Some(Value::String(text)) = fields.get("parameters") {
            let typed = if text.trim().is_empty() {
                Value::Null
            } else {
                let params = ParameterSet::from_json(text).map_err(|source| {
                    LoadError::Parameters {
                        joint: id.clone(),
                        source,
                    }
                })?;
                to_value(&params, &id)?
            };
            fields.insert("parameters".to_string(), typed);
        }

        if let Some(Value::String(text)) = fields.get("validation") {
            let typed = if text.trim().is_empty() {
                Value::Array(Vec::new())
            } else {
                let results: Vec<ValidationResult> =
                    serde_json::from_str(text).map_err(|e| LoadError::MigrationFailed {
                        from: 1,
                        to: 2,
                        reason: format!("joint {id} has unreadable validation results: {e}"),
                    })?;
                to_value(&results, &id)?
            };
            fields.insert("validation".to_string(), typed);
        }
        debug!(joint = %id, "migrated joint to v2");
    }
    Ok(frame)
}

fn to_value<T: serde::Serialize>(value: &T, joint: &str) -> Result<Value, LoadError> {
    serde_json::to_value(value).map_err(|e| LoadError::Parameters {
        joint: joint.to_string(),
        source: ParamError::Encode(e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_v1_strings_become_typed_values() {
        let params = r#"[{"name":"lap_depth_primary","param_type":"length","default_value":75.0,"value":60.0,"is_overridden":true,"min_value":37.5,"max_value":112.5}]"#;
        let frame = json!({
            "members": [],
            "joints": [
                {"id": "a", "parameters": params, "validation": "[{\"level\":\"warning\",\"message\":\"m\",\"code\":\"C\"}]"},
                {"id": "b", "parameters": "", "validation": ""}
            ]
        });
        let migrated = migrate(frame, 1, 2).unwrap();

        let first = &migrated["joints"][0];
        assert_eq!(first["parameters"][0]["name"], "lap_depth_primary");
        assert_eq!(first["parameters"][0]["value"], 60.0);
        assert_eq!(first["validation"][0]["code"], "C");

        let second = &migrated["joints"][1];
        assert!(second["parameters"].is_null());
        assert_eq!(second["validation"], json!([]));
    }

    #[test]
    fn test_typed_values_pass_through() {
        let frame = json!({"joints": [{"id": "a", "parameters": null, "validation": []}]});
        assert_eq!(migrate(frame.clone(), 1, 2).unwrap(), frame);
    }

    #[test]
    fn test_bad_parameters_name_the_joint() {
        let frame = json!({"joints": [{"id": "j7", "parameters": "{ nope"}]});
        match migrate(frame, 1, 2) {
            Err(LoadError::Parameters { joint, source }) => {
                assert_eq!(joint, "j7");
                assert!(matches!(source, ParamError::Decode(_)));
            }
            other => panic!("expected a parameter error, got {other:?}"),
        }
    }

    #[test]
    fn test_version_zero_has_no_path() {
        assert!(matches!(
            migrate(json!({}), 0, 2),
            Err(LoadError::MigrationFailed { from: 0, .. })
        ));
    }
}
