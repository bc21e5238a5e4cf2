//! `${VAR}` substitution in config string values.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched. `$${VAR}` is an
//! escape and yields the literal text `${VAR}`.

use std::collections::HashMap;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Matches either an escaped (`$${NAME}`) or a live (`${NAME}`) reference.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute references using the given variables. Unset or empty variables
/// are an error naming the config path that referenced them.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> std::result::Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> std::result::Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<String> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(MissingEnvVarError {
            var_name,
            config_path: path.to_string(),
        }),
        None => Ok(substituted.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_values() {
        let v = json!({"smtp": {"password": "${SMTP_PASSWORD}", "port": 587}});
        let result = resolve_env_vars_with(&v, &env(&[("SMTP_PASSWORD", "hunter2")])).unwrap();
        assert_eq!(result["smtp"]["password"], "hunter2");
        assert_eq!(result["smtp"]["port"], 587);
    }

    #[test]
    fn missing_var_names_path() {
        let v = json!({"discovery": {"api_key": "${GOOGLE_API_KEY}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("GOOGLE_API_KEY"));
        assert!(err.contains("discovery.api_key"));
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"note": "cost $${PRICE} per ${UNIT}"});
        let result = resolve_env_vars_with(&v, &env(&[("UNIT", "lead")])).unwrap();
        assert_eq!(result["note"], "cost ${PRICE} per lead");
    }

    #[test]
    fn lowercase_names_are_left_alone() {
        let v = json!({"template": "${not_a_var}"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["template"], "${not_a_var}");
    }

    #[test]
    fn array_entries_are_substituted() {
        let v = json!({"districts": ["${AREA} London"]});
        let result = resolve_env_vars_with(&v, &env(&[("AREA", "Soho")])).unwrap();
        assert_eq!(result["districts"][0], "Soho London");
    }
}
