//! `read_file`: read file contents relative to the workspace.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::Tool;
use tracing::debug;

use crate::workspace::{Workspace, failure, required_str};

pub struct FileReadTool {
    workspace: Workspace,
}

impl FileReadTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let path = required_str(&arguments, "path")?;
        let full_path = self.workspace.resolve(path);
        debug!(path = %full_path.display(), "Reading file");

        let content = match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => content,
            Err(e) => return Ok(failure(format!("{}: {e}", full_path.display()))),
        };
        let metadata = tokio::fs::metadata(&full_path).await.ok();
        let modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

        Ok(serde_json::json!({
            "success": true,
            "path": path,
            "size": metadata.map(|m| m.len()).unwrap_or(content.len() as u64),
            "modified": modified,
            "content": content,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition() {
        let tool = FileReadTool::new(Workspace::new("."));
        assert_eq!(tool.name(), "read_file");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["path"]));
    }

    #[tokio::test]
    async fn read_relative_to_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("example.js"), "console.log('hi');\n").unwrap();

        let tool = FileReadTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "path": "example.js" }))
            .await
            .unwrap();

        assert_eq!(out["success"], true);
        assert_eq!(out["path"], "example.js");
        assert_eq!(out["size"], 19);
        assert!(out["content"].as_str().unwrap().contains("console.log"));
    }

    #[tokio::test]
    async fn missing_file_is_a_domain_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileReadTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "path": "nope.js" }))
            .await
            .unwrap();
        assert_eq!(out["success"], false);
        assert!(out["error"].as_str().unwrap().contains("nope.js"));
    }

    #[tokio::test]
    async fn missing_path_argument() {
        let tool = FileReadTool::new(Workspace::new("."));
        let result = tool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
