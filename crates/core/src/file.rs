//! Optional `app.yaml` configuration file.
//!
//! Nested keys are flattened into the names the environment uses:
//! segments are joined with `_`, `.` and `-` become `_`, and the result is
//! upper-cased. `fhir.server.auth.cert-location` therefore reads as
//! `FHIR_SERVER_AUTH_CERT_LOCATION`, and `password-file` (or a nested
//! `file:` key) as the matching `_FILE` secret reference.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde_yaml::Value;

use crate::error::ConfigError;

/// Name of the configuration file looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "app.yaml";

/// Read and flatten `path`. A missing file yields no values.
pub fn load(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No config file, using environment only");
            return Ok(HashMap::new());
        }
        Err(e) => {
            return Err(ConfigError::File {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    parse(&raw).map_err(|e| ConfigError::File {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Flatten a YAML document into environment-style keys.
///
/// Sequences are joined with `,` so a list of recipients reads the same
/// as the comma-separated variable. Nulls are skipped.
pub fn parse(raw: &str) -> Result<HashMap<String, String>, serde_yaml::Error> {
    let doc: Value = serde_yaml::from_str(raw)?;
    let mut values = HashMap::new();
    flatten(String::new(), &doc, &mut values);
    Ok(values)
}

fn flatten(prefix: String, value: &Value, values: &mut HashMap<String, String>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(segment) = scalar(k) else { continue };
                let key = if prefix.is_empty() {
                    env_key(&segment)
                } else {
                    format!("{prefix}_{}", env_key(&segment))
                };
                flatten(key, v, values);
            }
        }
        Value::Sequence(items) => {
            let joined = items.iter().filter_map(scalar).collect::<Vec<_>>().join(",");
            values.insert(prefix, joined);
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, values),
        Value::Null => {}
        other => {
            if let Some(s) = scalar(other) {
                if !prefix.is_empty() {
                    values.insert(prefix, s);
                }
            }
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn env_key(segment: &str) -> String {
    segment.replace(['.', '-'], "_").to_ascii_uppercase()
}
