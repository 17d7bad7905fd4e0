use serde::Deserialize;
use serde_json::Value;

/// The `{success, message, data}` wrapper most portal endpoints answer with.
#[derive(Deserialize, Debug, Clone)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub data: Option<T>,
}

/// Pull a human-readable failure reason out of an arbitrary error body.
pub fn failure_message(body: &Value) -> Option<String> {
    ["message", "error", "msg"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_message_prefers_message() {
        let body = json!({"success": false, "message": "unauthorized", "error": "x"});
        assert_eq!(failure_message(&body).as_deref(), Some("unauthorized"));
    }

    #[test]
    fn test_failure_message_reads_flask_msg() {
        let body = json!({"msg": "Bad username or password"});
        assert_eq!(
            failure_message(&body).as_deref(),
            Some("Bad username or password")
        );
        assert_eq!(failure_message(&json!({})), None);
    }
}
