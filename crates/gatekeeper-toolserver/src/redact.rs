use serde_json::Value;

pub const HIDDEN_PLACEHOLDER: &str = "*** (Hidden)";

/// Replaces each of `sensitive_fields` in `obj` with [`HIDDEN_PLACEHOLDER`]
/// unless `unmasked` is true (spec §4.4 step 7). Applied per-object, so
/// callers run it once per row in a list result.
pub fn redact_fields(obj: &mut serde_json::Map<String, Value>, sensitive_fields: &[&str], unmasked: bool) {
    if unmasked {
        return;
    }
    for field in sensitive_fields {
        if let Some(v) = obj.get_mut(*field) {
            if !v.is_null() {
                *v = Value::String(HIDDEN_PLACEHOLDER.to_string());
            }
        }
    }
}

/// Runs [`redact_fields`] over every object in a JSON array, in place.
pub fn redact_rows(rows: &mut [Value], sensitive_fields: &[&str], unmasked: bool) {
    for row in rows {
        if let Value::Object(obj) = row {
            redact_fields(obj, sensitive_fields, unmasked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_sensitive_field_when_not_unmasked() {
        let mut row = json!({"name": "Bob", "salary": 90000});
        let Value::Object(obj) = &mut row else { unreachable!() };
        redact_fields(obj, &["salary"], false);
        assert_eq!(row["salary"], json!(HIDDEN_PLACEHOLDER));
        assert_eq!(row["name"], json!("Bob"));
    }

    #[test]
    fn leaves_field_untouched_when_unmasked() {
        let mut row = json!({"salary": 90000});
        let Value::Object(obj) = &mut row else { unreachable!() };
        redact_fields(obj, &["salary"], true);
        assert_eq!(row["salary"], json!(90000));
    }

    #[test]
    fn null_field_is_left_as_null_not_placeholder() {
        let mut row = json!({"gov_id": null});
        let Value::Object(obj) = &mut row else { unreachable!() };
        redact_fields(obj, &["gov_id"], false);
        assert!(row["gov_id"].is_null());
    }
}
