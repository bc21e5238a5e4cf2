//! Config redaction: produce safe-to-share config snapshots by masking sensitive fields.
//!
//! Masks SMTP passwords, API keys, tokens and secrets.

use serde_json::Value;

use crate::schema::DripforgeConfig;

static SENSITIVE_KEYS: &[&str] = &[
    "password",
    "api_key",
    "apiKey",
    "token",
    "access_token",
    "secret",
    "client_secret",
];

/// Redact a config JSON value, replacing sensitive fields with a 4-char hint and `***`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Redacted JSON view of a typed config.
pub fn redacted_config(config: &DripforgeConfig) -> serde_json::Result<Value> {
    Ok(redact(&serde_json::to_value(config)?))
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) && !s.is_empty() {
        let hint = if s.chars().count() > 8 {
            format!("{}***", s.chars().take(4).collect::<String>())
        } else {
            "***".to_string()
        };
        return Value::String(hint);
    }
    Value::String(s.to_string())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => {
            Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect())
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

/// Collect all field paths that were redacted (for diagnostics).
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths_recursive(value, "", &mut paths);
    paths
}

fn collect_paths_recursive(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => {
            let key = path.rsplit('.').next().unwrap_or("");
            if is_sensitive_key(key) {
                out.push(path.to_string());
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                collect_paths_recursive(v, &format!("{path}[{i}]"), out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                collect_paths_recursive(v, &child_path, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_smtp_password() {
        let v = json!({ "smtp": { "username": "me@example.com", "password": "app-password-123" } });
        let redacted = redact(&v);
        assert_eq!(redacted["smtp"]["password"], "app-***");
        assert_eq!(redacted["smtp"]["username"], "me@example.com");
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let v = json!({ "discovery": { "api_key": "abc" } });
        assert_eq!(redact(&v)["discovery"]["api_key"], "***");
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({ "logging": { "level": "debug" } });
        let redacted = redact(&v);
        assert_eq!(redacted["logging"]["level"], "debug");
    }

    #[test]
    fn typed_config_is_redacted() {
        let mut cfg = DripforgeConfig::default();
        cfg.discovery.api_key = Some("AIzaSyExampleKey".into());
        let value = redacted_config(&cfg).unwrap();
        assert_eq!(value["discovery"]["api_key"], "AIza***");
        assert_eq!(collect_redacted_paths(&serde_json::to_value(&cfg).unwrap()), vec!["discovery.api_key"]);
    }
}
