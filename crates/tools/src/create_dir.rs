//! `create_directory`: recursive mkdir.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::Tool;

use crate::workspace::{Workspace, failure, required_str};

pub struct CreateDirectoryTool {
    workspace: Workspace,
}

impl CreateDirectoryTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateDirectoryTool {
    fn name(&self) -> &str {
        "create_directory"
    }

    fn description(&self) -> &str {
        "Create a directory, including missing parents"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path to create" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let path = required_str(&arguments, "path")?;
        match tokio::fs::create_dir_all(self.workspace.resolve(path)).await {
            Ok(()) => Ok(serde_json::json!({ "success": true, "path": path })),
            Err(e) => Ok(failure(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CreateDirectoryTool::new(Workspace::new(dir.path()));
        let out = tool
            .execute(serde_json::json!({ "path": "a/b/c" }))
            .await
            .unwrap();
        assert_eq!(out["success"], true);
        assert!(dir.path().join("a/b/c").is_dir());
    }
}
