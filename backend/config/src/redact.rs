//! Config redaction: produce safe-to-display config snapshots.

use serde_json::Value;

/// Keys whose string values are secrets.
static SECRET_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "apikey",
    "credential",
    "subscriptionKey",
    "subscription_key",
    "token",
    "secret",
    "password",
];

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Replace every secret value with `"***"`, keeping a 4-char hint on long ones.
///
/// Unresolved `${VAR}` references are left visible: they are not secrets.
pub fn redact(value: &Value) -> Value {
    redact_under(value, "")
}

fn redact_under(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_secret_key(key) && !s.is_empty() && !s.starts_with("${") => {
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 8 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_under(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_under(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Dotted paths of every value `redact` would mask.
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    fn walk(value: &Value, path: &str, key: &str, out: &mut Vec<String>) {
        match value {
            Value::String(s) if is_secret_key(key) && !s.is_empty() && !s.starts_with("${") => {
                out.push(path.to_string());
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    walk(v, &format!("{path}[{i}]"), key, out);
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                    walk(v, &child, k, out);
                }
            }
            _ => {}
        }
    }

    let mut paths = Vec::new();
    walk(value, "", "", &mut paths);
    paths
}
