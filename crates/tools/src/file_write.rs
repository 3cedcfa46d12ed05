//! `write_file`: write or create files, creating parent directories.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::Tool;
use tracing::debug;

use crate::workspace::{Workspace, failure, required_str};

pub struct FileWriteTool {
    workspace: Workspace,
}

impl FileWriteTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file if it doesn't exist, overwrites if it does."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let path = required_str(&arguments, "path")?;
        let content = required_str(&arguments, "content")?;
        let full_path = self.workspace.resolve(path);

        if let Some(parent) = full_path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(failure(e));
        }

        debug!(path = %full_path.display(), bytes = content.len(), "Writing file");
        match tokio::fs::write(&full_path, content).await {
            Ok(()) => Ok(serde_json::json!({
                "success": true,
                "path": path,
                "size": content.len(),
            })),
            Err(e) => Ok(failure(e)),
        }
    }
}
