//! `list_files` and `search_files`: directory walking with glob and regex filters.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::Tool;
use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

use crate::workspace::{Workspace, failure, required_str};

/// Directories never descended into.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "target"];

/// File extensions `search_files` looks inside.
const SEARCHABLE_EXTENSIONS: &[&str] = &[
    "js", "ts", "jsx", "tsx", "json", "md", "rs", "py", "go", "java", "toml",
];

/// Cap on returned search matches.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Walk `root`, skipping ignored directories. Yields paths relative to `root`
/// with `/` separators, sorted.
fn walk(root: &Path) -> Vec<(String, PathBuf, bool)> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.file_name()
                    .to_str()
                    .is_some_and(|name| IGNORED_DIRS.contains(&name)))
        })
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some((rel, e.path().to_path_buf(), e.file_type().is_dir()))
        })
        .collect()
}

pub struct ListFilesTool {
    workspace: Workspace,
}

impl ListFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files in a directory"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path" },
                "pattern": { "type": "string", "description": "Optional glob pattern" }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let dir = arguments["path"].as_str().unwrap_or(".").to_string();
        let pattern_src = arguments["pattern"].as_str().unwrap_or("**/*").to_string();

        let pattern = match Pattern::new(&pattern_src) {
            Ok(p) => p,
            Err(e) => return Ok(failure(format!("invalid glob pattern '{pattern_src}': {e}"))),
        };

        let root = self.workspace.resolve(&dir);
        if !root.is_dir() {
            return Ok(failure(format!("not a directory: {}", root.display())));
        }
        debug!(root = %root.display(), pattern = %pattern_src, "Listing files");

        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::default()
        };
        let files = tokio::task::spawn_blocking(move || {
            walk(&root)
                .into_iter()
                .filter(|(rel, _, _)| pattern.matches_with(rel, options))
                .map(|(rel, full, is_dir)| {
                    let size = std::fs::metadata(&full).map(|m| m.len()).unwrap_or(0);
                    let kind = if is_dir { "directory" } else { "file" };
                    serde_json::json!({
                        "path": rel,
                        "type": kind,
                        "size": size,
                    })
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| ToolError::execution("list_files", e))?;

        Ok(serde_json::json!({
            "success": true,
            "path": dir,
            "count": files.len(),
            "files": files,
        }))
    }
}

pub struct SearchFilesTool {
    workspace: Workspace,
}

impl SearchFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for pattern in files"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Search pattern (regex)" },
                "path": { "type": "string", "description": "Directory to search in" }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let pattern = required_str(&arguments, "pattern")?.to_string();
        let dir = arguments["path"].as_str().unwrap_or(".");

        let regex = match regex_lite::RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(r) => r,
            Err(e) => return Ok(failure(format!("invalid search pattern: {e}"))),
        };

        let root = self.workspace.resolve(dir);
        if !root.is_dir() {
            return Ok(failure(format!("not a directory: {}", root.display())));
        }
        debug!(root = %root.display(), pattern = %pattern, "Searching files");

        let (total, results) = tokio::task::spawn_blocking(move || {
            let mut total = 0usize;
            let mut results = Vec::new();
            for (rel, full, is_dir) in walk(&root) {
                let searchable = !is_dir
                    && full
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| SEARCHABLE_EXTENSIONS.contains(&e));
                if !searchable {
                    continue;
                }
                // Binary or non-UTF-8 files are skipped
                let Ok(content) = std::fs::read_to_string(&full) else {
                    continue;
                };
                for (index, line) in content.lines().enumerate() {
                    if let Some(m) = regex.find(line) {
                        total += 1;
                        if results.len() < MAX_SEARCH_RESULTS {
                            results.push(serde_json::json!({
                                "file": rel,
                                "line": index + 1,
                                "content": line.trim(),
                                "match": m.as_str(),
                            }));
                        }
                    }
                }
            }
            (total, results)
        })
        .await
        .map_err(|e| ToolError::execution("search_files", e))?;

        Ok(serde_json::json!({
            "success": true,
            "pattern": pattern,
            "matches": total,
            "results": results,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/app.js"), "function main() {\n  // TODO wire up\n}\n").unwrap();
        std::fs::write(root.join("src/util.ts"), "export const todo = 1;\n").unwrap();
        std::fs::write(root.join("README.md"), "# Demo\n").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "// TODO hidden\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn list_skips_ignored_directories() {
        let dir = fixture();
        let tool = ListFilesTool::new(Workspace::new(dir.path()));
        let out = tool.execute(serde_json::json!({})).await.unwrap();

        assert_eq!(out["success"], true);
        let paths: Vec<&str> = out["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["README.md", "src", "src/app.js", "src/util.ts"]);
    }

    #[tokio::test]
    async fn list_with_glob_pattern() {
        let dir = fixture();
        let tool = ListFilesTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "path": ".", "pattern": "**/*.js" }))
            .await
            .unwrap();
        assert_eq!(out["count"], 1);
        assert_eq!(out["files"][0]["path"], "src/app.js");
        assert_eq!(out["files"][0]["type"], "file");
    }

    #[tokio::test]
    async fn list_missing_directory_is_a_domain_failure() {
        let dir = fixture();
        let tool = ListFilesTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "path": "does-not-exist" }))
            .await
            .unwrap();
        assert_eq!(out["success"], false);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let dir = fixture();
        let tool = SearchFilesTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "pattern": "todo" }))
            .await
            .unwrap();

        assert_eq!(out["matches"], 2);
        let first = &out["results"][0];
        assert_eq!(first["file"], "src/app.js");
        assert_eq!(first["line"], 2);
        assert_eq!(first["match"], "TODO");
    }

    #[tokio::test]
    async fn search_caps_results() {
        let dir = tempfile::tempdir().unwrap();
        let body = "hit\n".repeat(150);
        std::fs::write(dir.path().join("many.md"), body).unwrap();

        let tool = SearchFilesTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "pattern": "hit" }))
            .await
            .unwrap();
        assert_eq!(out["matches"], 150);
        assert_eq!(out["results"].as_array().unwrap().len(), MAX_SEARCH_RESULTS);
    }

    #[tokio::test]
    async fn invalid_regex_is_a_domain_failure() {
        let dir = fixture();
        let tool = SearchFilesTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "pattern": "(" }))
            .await
            .unwrap();
        assert_eq!(out["success"], false);
    }
}
