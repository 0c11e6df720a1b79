use jsonschema::Validator;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, ToolServerError};

/// Validates `args` against `schema`, then deserializes into `T`. The
/// schema check runs first so a malformed argument produces a
/// field-qualified `VALIDATION_ERROR` (spec §4.4 step 2) before a type
/// mismatch could otherwise surface as a generic deserialize failure;
/// `serde_path_to_error` then gives the same field-path precision for any
/// shape still rejected after schema validation passes (e.g. a numeric
/// string the schema allows as `string` but `T` expects as `uuid::Uuid`).
pub fn validate_and_parse<T: DeserializeOwned>(schema: &Value, args: &Value) -> Result<T> {
    let validator = Validator::new(schema)
        .map_err(|e| ToolServerError::OperationFailed(format!("invalid tool schema: {e}")))?;

    if let Some(first) = validator.iter_errors(args).next() {
        return Err(ToolServerError::Validation {
            path: first.instance_path.to_string(),
            message: first.to_string(),
        });
    }

    let de = &mut serde_json::Deserializer::from_str(&args.to_string());
    serde_path_to_error::deserialize(de).map_err(|e| ToolServerError::Validation {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct ListEmployeesArgs {
        #[serde(default)]
        department: Option<String>,
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        cursor: Option<String>,
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "department": {"type": "string"},
                "limit": {"type": "integer", "maximum": 50},
                "cursor": {"type": "string"}
            },
            "additionalProperties": false
        })
    }

    #[test]
    fn valid_args_parse() {
        let args = json!({"department": "engineering", "limit": 10});
        let parsed: ListEmployeesArgs = validate_and_parse(&schema(), &args).unwrap();
        assert_eq!(parsed.department.as_deref(), Some("engineering"));
        assert_eq!(parsed.limit, Some(10));
        assert!(parsed.cursor.is_none());
    }

    #[test]
    fn limit_over_schema_max_is_rejected() {
        let args = json!({"limit": 999});
        let err = validate_and_parse::<ListEmployeesArgs>(&schema(), &args).unwrap_err();
        match err {
            ToolServerError::Validation { path, .. } => assert!(path.contains("limit")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn unknown_field_is_rejected_by_additional_properties_false() {
        let args = json!({"bogus": true});
        assert!(validate_and_parse::<ListEmployeesArgs>(&schema(), &args).is_err());
    }
}
