use serde_json::Value;

/// Fields such as `address` sometimes arrive as JSON encoded inside a string.
/// Decode those; anything else (including strings that are not JSON) is kept as is.
pub fn parse_json_field(value: Value) -> Value {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => Value::String(s),
        },
        other => other,
    }
}

/// Convert arbitrary JSON values into sanitized single-line strings for display.
pub fn value_to_string(value: Value) -> String {
    let raw = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    sanitize(raw)
}

fn sanitize(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

/// Quote a CSV cell when it contains a separator or a quote. Line breaks are dropped.
pub fn csv_cell(raw: &str) -> String {
    let clean = sanitize(raw.to_string());
    if clean.contains([',', '"']) {
        format!("\"{}\"", clean.replace('"', "\"\""))
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_field_decodes_embedded_object() {
        let raw = Value::String(r#"{"city": "Nairobi"}"#.to_string());
        assert_eq!(parse_json_field(raw), json!({"city": "Nairobi"}));
    }

    #[test]
    fn test_parse_json_field_keeps_plain_strings() {
        let raw = Value::String("12 Market Street".to_string());
        assert_eq!(parse_json_field(raw.clone()), raw);
        // A bare number inside a string stays a string
        let numeric = Value::String("42".to_string());
        assert_eq!(parse_json_field(numeric.clone()), numeric);
    }

    #[test]
    fn test_value_to_string_strips_control_characters() {
        assert_eq!(value_to_string(json!("a\u{7}b")), "ab");
        assert_eq!(value_to_string(Value::Null), "");
        assert_eq!(value_to_string(json!(7)), "7");
    }

    #[test]
    fn test_csv_cell_quotes_separators() {
        assert_eq!(csv_cell("Nurse"), "Nurse");
        assert_eq!(csv_cell("Smith, Jane"), "\"Smith, Jane\"");
        assert_eq!(csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
