//! Secret-file indirection for configuration values.
//!
//! Any setting `X` may instead be supplied as `X_FILE`, naming a file
//! whose contents become the value. This keeps passwords and keys out
//! of the environment when running under Docker or Kubernetes secrets.

use std::path::Path;

/// Suffix marking a variable whose value is a path to a secret file.
pub const FILE_SUFFIX: &str = "_FILE";

/// Resolve `key` through `lookup`, preferring the contents of the file
/// named by `<key>_FILE` when one is configured.
///
/// Leading and trailing newlines are stripped from file contents. An
/// unreadable secret file is logged and the plain `key` is used
/// instead. Empty values are treated as unset.
pub fn resolve<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let file_key = format!("{key}{FILE_SUFFIX}");

    if let Some(path) = lookup(&file_key).filter(|p| !p.is_empty()) {
        match read_secret(Path::new(&path)) {
            Ok(value) => return Some(value),
            Err(e) => {
                tracing::error!(
                    path = %path,
                    config_key = %file_key,
                    error = %e,
                    "Failed to read secrets file",
                );
            }
        }
    }

    lookup(key).filter(|v| !v.is_empty())
}

fn read_secret(path: &Path) -> std::io::Result<String> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.trim_matches('\n').to_string())
}
