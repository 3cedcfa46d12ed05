//! The directory file tools operate in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Root that relative tool paths are resolved against.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Arc<PathBuf>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` against the root. Absolute paths are used as given.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }
}

/// Uniform domain-failure payload.
pub(crate) fn failure(error: impl std::fmt::Display) -> serde_json::Value {
    serde_json::json!({ "success": false, "error": error.to_string() })
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(
    arguments: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, codewright_core::ToolError> {
    arguments[key].as_str().ok_or_else(|| {
        codewright_core::ToolError::InvalidArguments(format!("Missing '{key}' argument"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_the_root() {
        let ws = Workspace::new("/work");
        assert_eq!(ws.resolve("src/a.js"), PathBuf::from("/work/src/a.js"));
        assert_eq!(ws.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn required_str_reports_the_key() {
        let err = required_str(&serde_json::json!({}), "path").unwrap_err();
        assert!(err.to_string().contains("'path'"));
    }
}
